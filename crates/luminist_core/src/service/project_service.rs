//! Project use-case service.
//!
//! # Responsibility
//! - Create projects behind admission control.
//! - Provide read/delete entry points for callers.
//!
//! # Invariants
//! - No project is inserted when the admission policy refuses it.
//! - Service APIs never bypass repository validation.

use crate::model::project::{NewProject, ProjectDocument, ProjectId};
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository, RepoError, RepoResult};
use crate::service::admission::AdmissionPolicy;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for project use-cases.
#[derive(Debug)]
pub enum ProjectServiceError {
    LimitReached { current: u32, limit: u32 },
    ProjectNotFound(ProjectId),
    Repo(RepoError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitReached { current, limit } => {
                write!(f, "project limit reached ({current}/{limit})")
            }
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent project state: {details}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Project service facade over a repository implementation.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
    admission: AdmissionPolicy,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R, admission: AdmissionPolicy) -> Self {
        Self { repo, admission }
    }

    pub fn admission(&self) -> AdmissionPolicy {
        self.admission
    }

    /// Returns whether the admission policy currently allows a new project.
    pub fn can_create_project(&self) -> RepoResult<bool> {
        Ok(self.admission.allows(self.repo.count_projects()?))
    }

    /// Creates a project after consulting admission control.
    pub fn create_project(
        &self,
        request: &NewProject,
    ) -> Result<ProjectDocument, ProjectServiceError> {
        let current = self.repo.count_projects()?;
        if !self.admission.allows(current) {
            let limit = self.admission.limit().unwrap_or(current);
            warn!(
                "event=project_create module=service status=rejected error_code=limit_reached current={} limit={}",
                current, limit
            );
            return Err(ProjectServiceError::LimitReached { current, limit });
        }

        let id = self.repo.create_project(request)?;
        info!(
            "event=project_create module=service status=ok project_id={} width={} height={}",
            id, request.dimensions.width, request.dimensions.height
        );
        self.repo
            .get_project(id)?
            .ok_or(ProjectServiceError::InconsistentState(
                "created project not found in read-back",
            ))
    }

    pub fn get_project(&self, id: ProjectId) -> RepoResult<Option<ProjectDocument>> {
        self.repo.get_project(id)
    }

    pub fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<ProjectDocument>> {
        self.repo.list_projects(query)
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ProjectServiceError> {
        self.repo.delete_project(id)?;
        info!("event=project_delete module=service status=ok project_id={id}");
        Ok(())
    }
}
