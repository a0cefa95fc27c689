//! Project repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/list/count/delete over the `projects` table.
//! - Replace a project's working state (locator + snapshot + size) atomically.
//!
//! # Invariants
//! - `replace_state` is a single UPDATE: all columns change or none do.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::project::{
    Dimensions, NewProject, ProjectDocument, ProjectId, ProjectStateUpdate, ProjectValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    original_locator,
    canonical_locator,
    scene_snapshot,
    width,
    height,
    created_at,
    updated_at
FROM projects";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for project persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ProjectValidationError),
    Db(DbError),
    NotFound(ProjectId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "project not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ProjectValidationError> for RepoError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Pagination for project listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Data access contract for project documents.
pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<ProjectDocument>>;
    /// Lists projects by `updated_at DESC, uuid ASC`.
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<ProjectDocument>>;
    fn count_projects(&self) -> RepoResult<u32>;
    fn replace_state(&self, update: &ProjectStateUpdate) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

impl<R: ProjectRepository + ?Sized> ProjectRepository for &R {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId> {
        (**self).create_project(project)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<ProjectDocument>> {
        (**self).get_project(id)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<ProjectDocument>> {
        (**self).list_projects(query)
    }

    fn count_projects(&self) -> RepoResult<u32> {
        (**self).count_projects()
    }

    fn replace_state(&self, update: &ProjectStateUpdate) -> RepoResult<()> {
        (**self).replace_state(update)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        (**self).delete_project(id)
    }
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                title,
                original_locator,
                canonical_locator,
                width,
                height
            ) VALUES (?1, ?2, ?3, ?3, ?4, ?5);",
            params![
                project.id.to_string(),
                project.title.trim(),
                project.image_locator.as_str(),
                i64::from(project.dimensions.width),
                i64::from(project.dimensions.height),
            ],
        )?;

        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<ProjectDocument>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<ProjectDocument>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} ORDER BY updated_at DESC, uuid ASC");
        let mut bind_values: Vec<Value> = Vec::new();

        match (query.limit, query.offset) {
            (Some(limit), 0) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
            }
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            (None, 0) => {}
            (None, offset) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(offset)));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn count_projects(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))?;
        u32::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("project count `{count}` out of range")))
    }

    fn replace_state(&self, update: &ProjectStateUpdate) -> RepoResult<()> {
        update.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                canonical_locator = ?1,
                scene_snapshot = ?2,
                width = ?3,
                height = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                update.canonical_locator.as_str(),
                update.scene_snapshot.as_str(),
                i64::from(update.dimensions.width),
                i64::from(update.dimensions.height),
                update.project_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(update.project_id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<ProjectDocument> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in projects.uuid"))
    })?;

    let project = ProjectDocument {
        id,
        title: row.get("title")?,
        original_locator: row.get("original_locator")?,
        canonical_locator: row.get("canonical_locator")?,
        scene_snapshot: row.get("scene_snapshot")?,
        dimensions: Dimensions::new(
            dimension_from_db(row.get("width")?, "width")?,
            dimension_from_db(row.get("height")?, "height")?,
        ),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    project.validate()?;
    Ok(project)
}

fn dimension_from_db(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid {column} `{value}` in projects.{column}"))
    })
}
