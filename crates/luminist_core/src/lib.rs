//! Core of the Luminist image editor.
//! Locator transformation, scene reconciliation and edit persistence live
//! here; front ends only supply a canvas and call into the services.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod repo;
pub mod scene;
pub mod service;

pub use config::{ConfigError, EditorConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::directive::{Directive, DirectiveFamily, DirectivePipeline, FlipDirection};
pub use model::project::{Dimensions, NewProject, ProjectDocument, ProjectId};
pub use model::scene::{FilterDescriptor, Geometry, NodeId, NodeKind, SceneGraph, SceneNode};
pub use persist::coordinator::{PersistenceCoordinator, PersistenceError};
pub use persist::store::{ProjectStore, SqliteProjectStore, StoreError};
pub use pipeline::apply_directive;
pub use pipeline::codec::LocatorError;
pub use repo::project_repo::{
    ProjectListQuery, ProjectRepository, RepoError, RepoResult, SqliteProjectRepository,
};
pub use scene::canvas::{Canvas, HeadlessCanvas};
pub use scene::loader::{HttpImageLoader, ImageLoader, LoadError, LoadedImage};
pub use scene::reconciler::{ReconcileError, ReplaceMode, SceneReconciler};
pub use service::admission::{can_create, AdmissionPolicy};
pub use service::edit_service::{
    EditError, EditOrchestrator, EditOutcome, EditSession, EditState, EditTool,
};
pub use service::project_service::{ProjectService, ProjectServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
