//! `luminist project` subcommands.
//!
//! Edits run against a headless canvas sized to the configured viewport and
//! fetch transformed images over HTTP.

use anyhow::{bail, Context, Result};
use luminist_core::db::{open_db, open_db_in_memory};
use luminist_core::model::project::{Dimensions, NewProject, ProjectDocument, ProjectId};
use luminist_core::{
    EditError, EditOrchestrator, EditTool, EditorConfig, HeadlessCanvas, HttpImageLoader,
    ProjectListQuery, ProjectRepository, ProjectService, SqliteProjectStore,
};

use crate::ProjectCommands;

pub async fn run(config: &EditorConfig, command: ProjectCommands) -> Result<()> {
    let conn = match &config.storage.database_path {
        Some(path) => open_db(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => {
            log::warn!("event=cli_storage module=cli status=ok mode=in_memory");
            open_db_in_memory().context("failed to open in-memory database")?
        }
    };
    let store = SqliteProjectStore::new(conn);

    match command {
        ProjectCommands::Create {
            title,
            locator,
            width,
            height,
        } => {
            let viewport = config.viewport();
            let request = NewProject::new(
                title,
                locator,
                Dimensions::new(
                    width.unwrap_or(viewport.width),
                    height.unwrap_or(viewport.height),
                ),
            );
            let project = store.with_repository(|repo| {
                ProjectService::new(repo, config.admission()).create_project(&request)
            })?;
            print_project(&project);
        }
        ProjectCommands::List { limit, offset } => {
            let projects =
                store.with_repository(|repo| repo.list_projects(&ProjectListQuery { limit, offset }))?;
            if projects.is_empty() {
                println!("no projects");
            }
            for project in projects {
                println!("{}  {}  {}", project.id, project.title, project.canonical_locator);
            }
        }
        ProjectCommands::Show { id } => print_project(&find(&store, id)?),
        ProjectCommands::Delete { id } => {
            store.with_repository(|repo| {
                ProjectService::new(repo, config.admission()).delete_project(id)
            })?;
            println!("deleted {id}");
        }
        ProjectCommands::Flip { id, direction } => {
            edit(config, store, id, EditTool::Flip(direction)).await?;
        }
        ProjectCommands::Edit { id, prompt } => {
            edit(config, store, id, EditTool::PromptEdit(prompt)).await?;
        }
    }
    Ok(())
}

async fn edit(
    config: &EditorConfig,
    store: SqliteProjectStore,
    id: ProjectId,
    tool: EditTool,
) -> Result<()> {
    let document = find(&store, id)?;
    let orchestrator = EditOrchestrator::new(HttpImageLoader::new(), store);
    let mut session = orchestrator
        .open_session(&document, HeadlessCanvas::new(config.viewport()))
        .await?;

    match orchestrator.apply(&mut session, &tool).await {
        Ok(outcome) => {
            println!("{}", outcome.locator);
            Ok(())
        }
        Err(EditError::Persistence { locator, .. }) => {
            // One retry; the scene already shows the edited image.
            orchestrator
                .retry_flush(&mut session)
                .await
                .with_context(|| format!("edit produced {locator} but saving failed"))?;
            println!("{locator}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn find(store: &SqliteProjectStore, id: ProjectId) -> Result<ProjectDocument> {
    match store.with_repository(|repo| repo.get_project(id))? {
        Some(project) => Ok(project),
        None => bail!("project not found: {id}"),
    }
}

fn print_project(project: &ProjectDocument) {
    println!("id: {}", project.id);
    println!("title: {}", project.title);
    println!("original: {}", project.original_locator);
    println!("canonical: {}", project.canonical_locator);
    println!(
        "canvas: {}x{}",
        project.dimensions.width, project.dimensions.height
    );
    println!(
        "scene: {}",
        if project.scene_snapshot.is_some() {
            "saved"
        } else {
            "not yet saved"
        }
    );
}
