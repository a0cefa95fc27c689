//! Storage capability consumed by the persistence coordinator.

use crate::model::project::ProjectStateUpdate;
use crate::repo::project_repo::{ProjectRepository, RepoError, SqliteProjectRepository};
use async_trait::async_trait;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// Storage write failures.
#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// Backend-specific failure without a richer type.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "project store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Backing record store for project working state.
///
/// Implementations must apply an update atomically.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn replace_state(&self, update: &ProjectStateUpdate) -> Result<(), StoreError>;
}

/// `ProjectStore` over one owned SQLite connection.
pub struct SqliteProjectStore {
    conn: Mutex<Connection>,
}

impl SqliteProjectStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `op` against a repository bound to the store's connection.
    pub fn with_repository<T>(&self, op: impl FnOnce(&SqliteProjectRepository<'_>) -> T) -> T {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        op(&SqliteProjectRepository::new(&conn))
    }
}

#[async_trait]
impl ProjectStore for SqliteProjectStore {
    async fn replace_state(&self, update: &ProjectStateUpdate) -> Result<(), StoreError> {
        self.with_repository(|repo| repo.replace_state(update))?;
        Ok(())
    }
}
