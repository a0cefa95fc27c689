//! Edit orchestration.
//!
//! # Responsibility
//! - Drive one editing tool through validation, fetch, reconciliation and
//!   persistence for a single project session.
//! - Keep the busy condition explicit so concurrent runs are refused.
//!
//! # Invariants
//! - At most one run per project is active at a time.
//! - The scene graph is only mutated in the `Reconciling` state.
//! - A failure before reconciliation leaves the graph and selection intact.
//! - A failure after reconciliation keeps the new graph and marks the
//!   session unflushed until `retry_flush` succeeds.
//! - Prompt text is never logged; only its length and encoding path are.
//!   Locators embed the prompt, so failures log an error code only.

use crate::model::directive::{Directive, FlipDirection};
use crate::model::project::{Dimensions, ProjectDocument, ProjectId};
use crate::model::scene::{NodeId, SceneGraph};
use crate::persist::coordinator::{PersistenceCoordinator, PersistenceError};
use crate::persist::store::ProjectStore;
use crate::pipeline::apply_directive;
use crate::pipeline::codec::LocatorError;
use crate::pipeline::encoder::{encode_prompt, EncoderError};
use crate::scene::canvas::Canvas;
use crate::scene::loader::{ImageLoader, LoadError};
use crate::scene::reconciler::{swap, ReconcileError, ReplaceMode, SceneReconciler};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Lifecycle state of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Validating,
    Fetching,
    Reconciling,
    Persisting,
}

impl EditState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::Persisting => "persisting",
        }
    }

    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

/// Editing tool invoked against the active image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTool {
    /// Mirrors the image; output dimensions equal the input's.
    Flip(FlipDirection),
    /// Generative edit driven by free-form text; output size is unknown.
    PromptEdit(String),
}

impl EditTool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flip(_) => "flip",
            Self::PromptEdit(_) => "prompt_edit",
        }
    }

    pub fn replace_mode(&self) -> ReplaceMode {
        match self {
            Self::Flip(_) => ReplaceMode::PreserveGeometry,
            Self::PromptEdit(_) => ReplaceMode::FitToViewport,
        }
    }

    fn directive(&self) -> Result<Directive, ValidationError> {
        match self {
            Self::Flip(direction) => Ok(Directive::Flip(*direction)),
            Self::PromptEdit(prompt) => encode_prompt(prompt).map_err(|err| match err {
                EncoderError::EmptyPrompt => ValidationError::EmptyPrompt,
                other => ValidationError::InvalidPrompt(other),
            }),
        }
    }
}

/// Preconditions checked before any network access.
#[derive(Debug)]
pub enum ValidationError {
    NoActiveImage,
    MissingSource(NodeId),
    EmptyPrompt,
    InvalidPrompt(EncoderError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveImage => write!(f, "no image is selected"),
            Self::MissingSource(id) => write!(f, "image node {id} has no source locator"),
            Self::EmptyPrompt => write!(f, "prompt must not be empty"),
            Self::InvalidPrompt(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPrompt(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures while deriving or loading the transformed resource.
#[derive(Debug)]
pub enum FetchError {
    Locator(LocatorError),
    Load(LoadError),
    EmptyImage { locator: String },
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locator(err) => write!(f, "cannot derive transformed locator: {err}"),
            Self::Load(err) => write!(f, "{err}"),
            Self::EmptyImage { locator } => write!(f, "image at {locator} has no pixels"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locator(err) => Some(err),
            Self::Load(err) => Some(err),
            Self::EmptyImage { .. } => None,
        }
    }
}

/// Edit run failures.
#[derive(Debug)]
pub enum EditError {
    Busy {
        project_id: ProjectId,
        state: EditState,
    },
    Validation(ValidationError),
    Fetch(FetchError),
    Reconcile(ReconcileError),
    /// The scene already shows the new image; the store still has the old
    /// state.
    Persistence {
        node_id: NodeId,
        locator: String,
        source: PersistenceError,
    },
    Snapshot(serde_json::Error),
}

impl EditError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy { .. } => "busy",
            Self::Validation(_) => "validation",
            Self::Fetch(_) => "fetch",
            Self::Reconcile(_) => "reconcile",
            Self::Persistence { .. } => "persistence",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy { project_id, state } => write!(
                f,
                "an edit for project {project_id} is already running ({})",
                state.as_str()
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Fetch(err) => write!(f, "{err}"),
            Self::Reconcile(err) => write!(f, "{err}"),
            Self::Persistence { source, .. } => {
                write!(f, "edit applied but not saved: {source}")
            }
            Self::Snapshot(err) => write!(f, "invalid scene snapshot: {err}"),
        }
    }
}

impl Error for EditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Busy { .. } => None,
            Self::Validation(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::Reconcile(err) => Some(err),
            Self::Persistence { source, .. } => Some(source),
            Self::Snapshot(err) => Some(err),
        }
    }
}

impl From<ValidationError> for EditError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<FetchError> for EditError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

/// Splits reconciler failures into fetch-stage and reconcile-stage errors.
fn fetch_stage(err: ReconcileError) -> EditError {
    match err {
        ReconcileError::Load(err) => EditError::Fetch(FetchError::Load(err)),
        ReconcileError::EmptyImage { locator } => {
            EditError::Fetch(FetchError::EmptyImage { locator })
        }
        other => EditError::Reconcile(other),
    }
}

/// Result of a successful edit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub node_id: NodeId,
    /// New canonical locator.
    pub locator: String,
    pub previous_locator: String,
}

/// Working state of one open project.
pub struct EditSession<C: Canvas> {
    project_id: ProjectId,
    dimensions: Dimensions,
    graph: SceneGraph,
    canvas: C,
    canonical_locator: String,
    state: EditState,
    unflushed: bool,
}

impl<C: Canvas> EditSession<C> {
    pub fn new(
        project_id: ProjectId,
        dimensions: Dimensions,
        graph: SceneGraph,
        canvas: C,
        canonical_locator: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            dimensions,
            graph,
            canvas,
            canonical_locator: canonical_locator.into(),
            state: EditState::Idle,
            unflushed: false,
        }
    }

    /// Builds a session from a stored project, restoring its scene snapshot.
    ///
    /// A project without a snapshot starts with an empty graph.
    pub fn from_document(
        document: &ProjectDocument,
        canvas: C,
    ) -> Result<Self, serde_json::Error> {
        let graph = match document.scene_snapshot.as_deref() {
            Some(snapshot) => SceneGraph::from_snapshot(snapshot)?,
            None => SceneGraph::new(),
        };
        Ok(Self::new(
            document.id,
            document.dimensions,
            graph,
            canvas,
            document.canonical_locator.clone(),
        ))
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// User-driven edits (selection, adding shapes) go through here.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canonical_locator(&self) -> &str {
        &self.canonical_locator
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// `true` while the scene shows state the store has not accepted yet.
    pub fn is_unflushed(&self) -> bool {
        self.unflushed
    }

    fn transition(&mut self, next: EditState) {
        debug!(
            "event=edit_state module=edit project_id={} from={} to={}",
            self.project_id,
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
    }
}

/// Runs editing tools and persists their results.
pub struct EditOrchestrator<L: ImageLoader, S: ProjectStore> {
    reconciler: SceneReconciler<L>,
    persistence: PersistenceCoordinator<S>,
    active_runs: Mutex<HashSet<ProjectId>>,
}

impl<L: ImageLoader, S: ProjectStore> EditOrchestrator<L, S> {
    pub fn new(loader: L, store: S) -> Self {
        Self {
            reconciler: SceneReconciler::new(loader),
            persistence: PersistenceCoordinator::new(store),
            active_runs: Mutex::new(HashSet::new()),
        }
    }

    pub fn reconciler(&self) -> &SceneReconciler<L> {
        &self.reconciler
    }

    pub fn persistence(&self) -> &PersistenceCoordinator<S> {
        &self.persistence
    }

    /// Returns whether a run for `project_id` is active.
    pub fn is_busy(&self, project_id: ProjectId) -> bool {
        self.active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&project_id)
    }

    /// Opens `document` for editing.
    ///
    /// Projects with a stored scene restore it. Otherwise the canonical
    /// image is loaded into a fresh graph and selected.
    pub async fn open_session<C: Canvas>(
        &self,
        document: &ProjectDocument,
        canvas: C,
    ) -> Result<EditSession<C>, EditError> {
        let mut session =
            EditSession::from_document(document, canvas).map_err(EditError::Snapshot)?;
        if document.scene_snapshot.is_none() {
            let locator = session.canonical_locator.clone();
            self.reconciler
                .insert_image(&mut session.graph, &mut session.canvas, &locator)
                .await
                .map_err(fetch_stage)?;
        }
        info!(
            "event=edit_session_open module=edit status=ok project_id={} nodes={} restored={}",
            session.project_id,
            session.graph.len(),
            document.scene_snapshot.is_some()
        );
        Ok(session)
    }

    /// Runs `tool` against the session's active image.
    pub async fn apply<C: Canvas>(
        &self,
        session: &mut EditSession<C>,
        tool: &EditTool,
    ) -> Result<EditOutcome, EditError> {
        let _run = self.begin_run(session)?;
        let started_at = Instant::now();
        log_run_start(session.project_id, tool);

        let result = self.run(session, tool).await;
        session.transition(EditState::Idle);

        match &result {
            Ok(outcome) => info!(
                "event=edit_run module=edit status=ok project_id={} tool={} node_id={} duration_ms={}",
                session.project_id,
                tool.name(),
                outcome.node_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=edit_run module=edit status=error project_id={} tool={} error_code={} duration_ms={} unflushed={}",
                session.project_id,
                tool.name(),
                err.code(),
                started_at.elapsed().as_millis(),
                session.unflushed
            ),
        }
        result
    }

    /// Re-issues the flush for a session left unflushed by a failed run.
    ///
    /// No-op when the store already has the current state.
    pub async fn retry_flush<C: Canvas>(
        &self,
        session: &mut EditSession<C>,
    ) -> Result<(), PersistenceError> {
        if !session.unflushed {
            return Ok(());
        }
        info!(
            "event=edit_retry_flush module=edit status=start project_id={}",
            session.project_id
        );
        self.flush_session(session).await
    }

    async fn run<C: Canvas>(
        &self,
        session: &mut EditSession<C>,
        tool: &EditTool,
    ) -> Result<EditOutcome, EditError> {
        session.transition(EditState::Validating);
        let target = session
            .graph
            .resolve_active_image()
            .ok_or(ValidationError::NoActiveImage)?;
        let target_id = target.id;
        let source = target
            .source
            .clone()
            .ok_or(ValidationError::MissingSource(target_id))?;
        let directive = tool.directive()?;

        session.transition(EditState::Fetching);
        let locator = apply_directive(&source, directive).map_err(FetchError::Locator)?;
        let image = self
            .reconciler
            .materialize(&locator)
            .await
            .map_err(fetch_stage)?;

        session.transition(EditState::Reconciling);
        let node_id = swap(
            &mut session.graph,
            &mut session.canvas,
            target_id,
            image,
            tool.replace_mode(),
        )
        .map_err(EditError::Reconcile)?;
        let previous_locator = std::mem::replace(&mut session.canonical_locator, locator.clone());
        session.unflushed = true;

        session.transition(EditState::Persisting);
        if let Err(source) = self.flush_session(session).await {
            return Err(EditError::Persistence {
                node_id,
                locator,
                source,
            });
        }

        Ok(EditOutcome {
            node_id,
            locator,
            previous_locator,
        })
    }

    async fn flush_session<C: Canvas>(
        &self,
        session: &mut EditSession<C>,
    ) -> Result<(), PersistenceError> {
        self.persistence
            .flush_scene(
                session.project_id,
                &session.graph,
                &session.canonical_locator,
                session.dimensions,
            )
            .await?;
        session.unflushed = false;
        Ok(())
    }

    /// Claims the project's run slot.
    ///
    /// `apply` holds the session exclusively, so a non-idle state seen here
    /// was left by a run whose future was dropped. The graph is whole at
    /// every await point, so the state resets to `Idle` and `unflushed`
    /// keeps whatever that run reached.
    fn begin_run<C: Canvas>(
        &self,
        session: &mut EditSession<C>,
    ) -> Result<RunGuard<'_>, EditError> {
        let project_id = session.project_id;
        let mut runs = self
            .active_runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !runs.insert(project_id) {
            warn!("event=edit_run module=edit status=rejected error_code=busy project_id={project_id}");
            return Err(EditError::Busy {
                project_id,
                state: session.state,
            });
        }
        if session.state.is_busy() {
            warn!(
                "event=edit_run module=edit status=recovered project_id={} stale_state={} unflushed={}",
                project_id,
                session.state.as_str(),
                session.unflushed
            );
            session.transition(EditState::Idle);
        }
        Ok(RunGuard {
            runs: &self.active_runs,
            project_id,
        })
    }
}

fn log_run_start(project_id: ProjectId, tool: &EditTool) {
    match tool {
        EditTool::Flip(direction) => info!(
            "event=edit_run module=edit status=start project_id={} tool=flip direction={}",
            project_id,
            direction.code()
        ),
        EditTool::PromptEdit(prompt) => info!(
            "event=edit_run module=edit status=start project_id={} tool=prompt_edit prompt_chars={} encoded={}",
            project_id,
            prompt.chars().count(),
            crate::pipeline::encoder::requires_escaping(prompt)
        ),
    }
}

/// Releases the project's run slot on drop.
struct RunGuard<'a> {
    runs: &'a Mutex<HashSet<ProjectId>>,
    project_id: ProjectId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.project_id);
    }
}
