mod common;

use common::{FakeLoader, RecordingStore};
use luminist_core::db::open_db_in_memory;
use luminist_core::model::directive::{Directive, DirectiveFamily, FlipDirection};
use luminist_core::model::project::{Dimensions, NewProject, ProjectDocument};
use luminist_core::model::scene::{Geometry, NodeKind, SceneGraph, SceneNode};
use luminist_core::persist::coordinator::PersistenceError;
use luminist_core::pipeline::codec;
use luminist_core::pipeline::encoder::decode_prompt;
use luminist_core::service::edit_service::{FetchError, ValidationError};
use luminist_core::{
    EditError, EditOrchestrator, EditSession, EditState, EditTool, HeadlessCanvas,
    LocatorError, ProjectRepository, SqliteProjectStore,
};
use uuid::Uuid;

const PHOTO: &str = "https://ik.io/acct/photo.jpg";
const FLIPPED_H: &str = "https://ik.io/acct/tr:fl-h/photo.jpg";
const VIEWPORT: Dimensions = Dimensions {
    width: 800,
    height: 600,
};

fn session_with_image(source: &str) -> EditSession<HeadlessCanvas> {
    let mut graph = SceneGraph::new();
    let id = graph.add(SceneNode::image(
        source,
        1200.0,
        900.0,
        Geometry::centered_at(kurbo::Point::new(400.0, 300.0), 0.5, 0.0),
    ));
    graph.set_active(id);
    EditSession::new(
        Uuid::new_v4(),
        VIEWPORT,
        graph,
        HeadlessCanvas::new(VIEWPORT),
        source,
    )
}

fn stored_project(store: &SqliteProjectStore) -> ProjectDocument {
    let request = NewProject::new("photo", PHOTO, VIEWPORT);
    store.with_repository(|repo| {
        let id = repo.create_project(&request).unwrap();
        repo.get_project(id).unwrap().unwrap()
    })
}

fn reload(store: &SqliteProjectStore, id: Uuid) -> ProjectDocument {
    store.with_repository(|repo| repo.get_project(id).unwrap().unwrap())
}

#[tokio::test]
async fn consecutive_flips_replace_the_flip_directive() {
    let store = SqliteProjectStore::new(open_db_in_memory().unwrap());
    let document = stored_project(&store);
    let orchestrator = EditOrchestrator::new(FakeLoader::uniform(1200, 900), store);

    let mut session = orchestrator
        .open_session(&document, HeadlessCanvas::new(VIEWPORT))
        .await
        .unwrap();
    assert_eq!(session.graph().len(), 1);

    let first = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap();
    assert_eq!(first.locator, FLIPPED_H);
    assert_eq!(first.previous_locator, PHOTO);

    let second = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Vertical))
        .await
        .unwrap();
    assert_eq!(second.locator, "https://ik.io/acct/tr:fl-v/photo.jpg");
    assert_eq!(session.canonical_locator(), second.locator);
    assert_eq!(session.state(), EditState::Idle);
    assert!(!session.is_unflushed());
    assert_eq!(session.graph().len(), 1);
    assert_eq!(session.graph().active_id(), Some(second.node_id));

    let stored = reload(orchestrator.persistence().store(), document.id);
    assert_eq!(stored.canonical_locator, second.locator);
    assert_eq!(stored.original_locator, PHOTO);
    let restored = SceneGraph::from_snapshot(stored.scene_snapshot.as_deref().unwrap()).unwrap();
    assert_eq!(&restored, session.graph());

    assert_eq!(
        orchestrator.reconciler().loader().requests(),
        vec![PHOTO.to_string(), FLIPPED_H.to_string(), second.locator.clone()]
    );
}

#[tokio::test]
async fn reopening_a_saved_project_restores_scene_without_loading() {
    let store = SqliteProjectStore::new(open_db_in_memory().unwrap());
    let document = stored_project(&store);
    let orchestrator = EditOrchestrator::new(FakeLoader::uniform(1200, 900), store);

    let mut session = orchestrator
        .open_session(&document, HeadlessCanvas::new(VIEWPORT))
        .await
        .unwrap();
    orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Both))
        .await
        .unwrap();
    let requests_before = orchestrator.reconciler().loader().requests().len();

    let saved = reload(orchestrator.persistence().store(), document.id);
    let reopened = orchestrator
        .open_session(&saved, HeadlessCanvas::new(VIEWPORT))
        .await
        .unwrap();

    assert_eq!(reopened.graph(), session.graph());
    assert_eq!(reopened.canonical_locator(), "https://ik.io/acct/tr:fl-h_v/photo.jpg");
    assert_eq!(
        orchestrator.reconciler().loader().requests().len(),
        requests_before
    );
}

#[tokio::test]
async fn prompt_edit_keeps_flip_and_fits_the_new_image() {
    let edited = "https://ik.io/acct/tr:fl-h,e-edit-prompt-add_flowers/photo.jpg";
    let loader = FakeLoader::failing().with_size(edited, 2048, 1536);
    let orchestrator = EditOrchestrator::new(loader, RecordingStore::new());
    let mut session = session_with_image(FLIPPED_H);
    let center_before = session.graph().nodes()[0].center_point();

    let outcome = orchestrator
        .apply(&mut session, &EditTool::PromptEdit("add flowers".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.locator, edited);
    let node = session.graph().get(outcome.node_id).unwrap();
    assert!(node.geometry.scale_x <= 1.0);
    assert!(node.width * node.geometry.scale_x <= f64::from(VIEWPORT.width));
    assert!(node.height * node.geometry.scale_y <= f64::from(VIEWPORT.height));
    let center_after = node.center_point();
    assert!((center_after.x - center_before.x).abs() < 1e-6);
    assert!((center_after.y - center_before.y).abs() < 1e-6);

    let updates = orchestrator.persistence().store().updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].canonical_locator, edited);
    assert_eq!(updates[0].dimensions, VIEWPORT);
}

#[tokio::test]
async fn prompt_with_reserved_characters_round_trips_through_locator() {
    let prompt = "before/after: changed";
    let orchestrator =
        EditOrchestrator::new(FakeLoader::uniform(640, 480), RecordingStore::new());
    let mut session = session_with_image(PHOTO);

    let outcome = orchestrator
        .apply(&mut session, &EditTool::PromptEdit(prompt.to_string()))
        .await
        .unwrap();

    let parsed = codec::parse(&outcome.locator).unwrap();
    assert_eq!(parsed.pipeline.len(), 1);
    let directive = parsed
        .pipeline
        .find_family(DirectiveFamily::PromptEdit)
        .unwrap();
    assert!(matches!(directive, Directive::PromptEdit { encoded: true, .. }));
    assert_eq!(decode_prompt(directive).unwrap(), prompt);
}

#[tokio::test]
async fn concurrent_run_on_same_project_is_busy() {
    let (loader, release) = FakeLoader::uniform(1200, 900).gated();
    let orchestrator = EditOrchestrator::new(loader, RecordingStore::new());
    let mut first = session_with_image(PHOTO);
    let project_id = first.project_id();
    let mut second = EditSession::new(
        project_id,
        VIEWPORT,
        first.graph().clone(),
        HeadlessCanvas::new(VIEWPORT),
        PHOTO,
    );

    let flip_h = EditTool::Flip(FlipDirection::Horizontal);
    let flip_v = EditTool::Flip(FlipDirection::Vertical);

    let (first_result, second_result, ()) = tokio::join!(
        orchestrator.apply(&mut first, &flip_h),
        orchestrator.apply(&mut second, &flip_v),
        async {
            release.send(()).unwrap();
        }
    );

    assert_eq!(first_result.unwrap().locator, FLIPPED_H);
    assert!(matches!(
        second_result,
        Err(EditError::Busy { project_id: id, .. }) if id == project_id
    ));
    assert_eq!(second.canonical_locator(), PHOTO);
    assert_eq!(second.state(), EditState::Idle);
    assert!(!orchestrator.is_busy(project_id));
    assert_eq!(orchestrator.reconciler().loader().requests(), vec![FLIPPED_H]);
}

#[tokio::test]
async fn validation_failures_touch_nothing() {
    let orchestrator =
        EditOrchestrator::new(FakeLoader::uniform(10, 10), RecordingStore::new());

    let mut empty = EditSession::new(
        Uuid::new_v4(),
        VIEWPORT,
        SceneGraph::new(),
        HeadlessCanvas::new(VIEWPORT),
        PHOTO,
    );
    let err = orchestrator
        .apply(&mut empty, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::NoActiveImage)
    ));
    assert_eq!(empty.state(), EditState::Idle);

    let mut session = session_with_image(PHOTO);
    let before = session.graph().clone();
    let err = orchestrator
        .apply(&mut session, &EditTool::PromptEdit("   ".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::EmptyPrompt)
    ));
    assert_eq!(session.graph(), &before);

    let mut sourceless = session_with_image(PHOTO);
    let node_id = sourceless.graph().nodes()[0].id;
    let mut node = sourceless.graph_mut().remove(node_id).unwrap();
    node.source = None;
    let node_id = sourceless.graph_mut().add(node);
    let err = orchestrator
        .apply(&mut sourceless, &EditTool::Flip(FlipDirection::Vertical))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditError::Validation(ValidationError::MissingSource(id)) if id == node_id
    ));

    assert!(orchestrator.reconciler().loader().requests().is_empty());
    assert!(orchestrator.persistence().store().updates().is_empty());
}

#[tokio::test]
async fn non_image_selection_falls_back_to_first_image() {
    let orchestrator =
        EditOrchestrator::new(FakeLoader::uniform(1200, 900), RecordingStore::new());
    let mut session = session_with_image(PHOTO);
    let text_id = session.graph_mut().add(SceneNode::primitive(
        NodeKind::Text,
        100.0,
        20.0,
        Geometry::default(),
    ));
    session.graph_mut().set_active(text_id);

    let outcome = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap();

    assert_eq!(outcome.locator, FLIPPED_H);
    assert_eq!(session.graph().len(), 2);
    assert_eq!(session.graph().index_of(outcome.node_id), Some(0));
    assert!(session.graph().get(text_id).is_some());
}

#[tokio::test]
async fn fetch_failures_leave_scene_and_locator_unchanged() {
    let orchestrator = EditOrchestrator::new(FakeLoader::failing(), RecordingStore::new());
    let mut session = session_with_image(PHOTO);
    let before = session.graph().clone();

    let err = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap_err();

    assert!(matches!(err, EditError::Fetch(FetchError::Load(_))));
    assert_eq!(session.graph(), &before);
    assert_eq!(session.graph().active_id(), before.active_id());
    assert_eq!(session.canonical_locator(), PHOTO);
    assert_eq!(session.state(), EditState::Idle);
    assert!(!session.is_unflushed());
    assert_eq!(session.canvas().render_requests(), 0);
}

#[tokio::test]
async fn malformed_locator_is_reported_as_fetch_error() {
    let orchestrator =
        EditOrchestrator::new(FakeLoader::uniform(10, 10), RecordingStore::new());
    let mut session = session_with_image("https://ik.io/photo.jpg");

    let err = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EditError::Fetch(FetchError::Locator(LocatorError::MissingResourcePath))
    ));
    assert!(orchestrator.reconciler().loader().requests().is_empty());
}

#[tokio::test]
async fn persistence_failure_keeps_new_scene_until_retry() {
    let orchestrator =
        EditOrchestrator::new(FakeLoader::uniform(1200, 900), RecordingStore::failing(1));
    let mut session = session_with_image(PHOTO);

    let err = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Horizontal))
        .await
        .unwrap_err();

    let (node_id, locator, source) = match err {
        EditError::Persistence {
            node_id,
            locator,
            source,
        } => (node_id, locator, source),
        other => panic!("expected persistence error, got {other}"),
    };
    assert!(matches!(source, PersistenceError::Store(_)));
    assert_eq!(locator, FLIPPED_H);
    assert!(session.graph().get(node_id).is_some());
    assert_eq!(session.canonical_locator(), FLIPPED_H);
    assert!(session.is_unflushed());
    assert_eq!(session.state(), EditState::Idle);
    assert!(orchestrator.persistence().store().updates().is_empty());

    orchestrator.retry_flush(&mut session).await.unwrap();
    assert!(!session.is_unflushed());
    let updates = orchestrator.persistence().store().updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].canonical_locator, FLIPPED_H);

    orchestrator.retry_flush(&mut session).await.unwrap();
    assert_eq!(orchestrator.persistence().store().updates().len(), 1);
}

#[tokio::test]
async fn run_dropped_while_fetching_leaves_session_usable() {
    let (loader, _release) = FakeLoader::uniform(1200, 900).gated();
    let orchestrator = EditOrchestrator::new(loader, RecordingStore::new());
    let mut session = session_with_image(PHOTO);
    let before = session.graph().clone();
    let flip_h = EditTool::Flip(FlipDirection::Horizontal);

    {
        let run = orchestrator.apply(&mut session, &flip_h);
        tokio::pin!(run);
        tokio::select! {
            biased;
            _ = &mut run => panic!("gated load should keep the run pending"),
            _ = std::future::ready(()) => {}
        }
    }
    assert_eq!(session.state(), EditState::Fetching);
    assert!(!orchestrator.is_busy(session.project_id()));

    let outcome = orchestrator.apply(&mut session, &flip_h).await.unwrap();
    assert_eq!(outcome.locator, FLIPPED_H);
    assert_eq!(outcome.previous_locator, PHOTO);
    assert_ne!(session.graph(), &before);
    assert_eq!(session.state(), EditState::Idle);
    assert_eq!(orchestrator.persistence().store().updates().len(), 1);
}

#[tokio::test]
async fn run_dropped_while_persisting_can_be_flushed_later() {
    let (store, _release) = RecordingStore::new().gated();
    let orchestrator = EditOrchestrator::new(FakeLoader::uniform(1200, 900), store);
    let mut session = session_with_image(PHOTO);
    let flip_h = EditTool::Flip(FlipDirection::Horizontal);

    {
        let run = orchestrator.apply(&mut session, &flip_h);
        tokio::pin!(run);
        tokio::select! {
            biased;
            _ = &mut run => panic!("gated store should keep the run pending"),
            _ = std::future::ready(()) => {}
        }
    }
    assert_eq!(session.state(), EditState::Persisting);
    assert_eq!(session.canonical_locator(), FLIPPED_H);
    assert!(session.is_unflushed());

    orchestrator.retry_flush(&mut session).await.unwrap();
    assert!(!session.is_unflushed());
    let updates = orchestrator.persistence().store().updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].canonical_locator, FLIPPED_H);

    let outcome = orchestrator
        .apply(&mut session, &EditTool::Flip(FlipDirection::Vertical))
        .await
        .unwrap();
    assert_eq!(outcome.locator, "https://ik.io/acct/tr:fl-v/photo.jpg");
    assert_eq!(session.state(), EditState::Idle);
}
