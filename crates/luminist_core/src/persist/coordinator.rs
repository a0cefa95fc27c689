//! Single-flight persistence coordinator.
//!
//! # Responsibility
//! - Serialize the scene graph and hand it, with the canonical locator, to
//!   the project store.
//! - Refuse a second flush for a project while one is outstanding.
//!
//! # Invariants
//! - A refused flush is never issued to the store.
//! - The in-flight marker is released on every exit path.

use crate::model::project::{Dimensions, ProjectId, ProjectStateUpdate};
use crate::model::scene::SceneGraph;
use crate::persist::store::{ProjectStore, StoreError};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Flush failures.
#[derive(Debug)]
pub enum PersistenceError {
    /// Another flush for this project has not resolved yet.
    FlushInFlight(ProjectId),
    Snapshot(serde_json::Error),
    Store(StoreError),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FlushInFlight(id) => write!(f, "a flush for project {id} is already in flight"),
            Self::Snapshot(err) => write!(f, "scene snapshot serialization failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::FlushInFlight(_) => None,
            Self::Snapshot(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

/// Writes project working state through a `ProjectStore`, one flush per
/// project at a time.
pub struct PersistenceCoordinator<S: ProjectStore> {
    store: S,
    in_flight: Mutex<HashSet<ProjectId>>,
}

impl<S: ProjectStore> PersistenceCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_in_flight(&self, project_id: ProjectId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&project_id)
    }

    /// Snapshots `graph` and flushes it with `canonical_locator`.
    pub async fn flush_scene(
        &self,
        project_id: ProjectId,
        graph: &SceneGraph,
        canonical_locator: &str,
        dimensions: Dimensions,
    ) -> Result<(), PersistenceError> {
        let scene_snapshot = graph.to_snapshot().map_err(PersistenceError::Snapshot)?;
        self.flush(ProjectStateUpdate {
            project_id,
            scene_snapshot,
            canonical_locator: canonical_locator.to_string(),
            dimensions,
        })
        .await
    }

    /// Replaces the project's stored state with `update`.
    pub async fn flush(&self, update: ProjectStateUpdate) -> Result<(), PersistenceError> {
        let _guard = self.begin(update.project_id)?;
        let started_at = Instant::now();
        info!(
            "event=project_flush module=persist status=start project_id={} snapshot_bytes={}",
            update.project_id,
            update.scene_snapshot.len()
        );

        match self.store.replace_state(&update).await {
            Ok(()) => {
                info!(
                    "event=project_flush module=persist status=ok project_id={} duration_ms={}",
                    update.project_id,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=project_flush module=persist status=error project_id={} duration_ms={} error={}",
                    update.project_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(PersistenceError::Store(err))
            }
        }
    }

    fn begin(&self, project_id: ProjectId) -> Result<FlushGuard<'_>, PersistenceError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(project_id) {
            warn!(
                "event=project_flush module=persist status=rejected error_code=flush_in_flight project_id={}",
                project_id
            );
            return Err(PersistenceError::FlushInFlight(project_id));
        }
        Ok(FlushGuard {
            in_flight: &self.in_flight,
            project_id,
        })
    }
}

struct FlushGuard<'a> {
    in_flight: &'a Mutex<HashSet<ProjectId>>,
    project_id: ProjectId,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.project_id);
    }
}
