mod common;

use common::FakeLoader;
use kurbo::Point;
use luminist_core::model::project::Dimensions;
use luminist_core::model::scene::{
    FilterDescriptor, Geometry, NodeKind, OriginX, OriginY, SceneGraph, SceneNode,
};
use luminist_core::scene::loader::LoadError;
use luminist_core::scene::reconciler::swap;
use luminist_core::{HeadlessCanvas, LoadedImage, ReconcileError, ReplaceMode, SceneReconciler};

const SOURCE: &str = "https://ik.imagekit.io/acct/cat.jpg";
const FLIPPED: &str = "https://ik.imagekit.io/acct/tr:fl-h/cat.jpg";

fn tilted_geometry() -> Geometry {
    Geometry {
        position: Point::new(312.75, 141.5),
        scale_x: 0.3711,
        scale_y: 0.4125,
        angle: 17.5,
        origin_x: OriginX::Left,
        origin_y: OriginY::Top,
    }
}

/// Shape at index 0, filtered image at index 1, text at index 2.
fn layered_graph() -> (SceneGraph, uuid::Uuid) {
    let mut graph = SceneGraph::new();
    graph.add(SceneNode::primitive(
        NodeKind::Shape,
        50.0,
        50.0,
        Geometry::default(),
    ));
    let mut image = SceneNode::image(SOURCE, 1200.0, 900.0, tilted_geometry());
    image.filters = vec![
        FilterDescriptor::new("brightness").with_param("brightness", 0.15),
        FilterDescriptor::new("blur").with_param("blur", 0.3),
    ];
    let image_id = graph.add(image);
    graph.add(SceneNode::primitive(
        NodeKind::Text,
        120.0,
        40.0,
        Geometry::default(),
    ));
    graph.set_active(image_id);
    (graph, image_id)
}

fn approx(left: Point, right: Point) -> bool {
    (left.x - right.x).abs() < 1e-6 && (left.y - right.y).abs() < 1e-6
}

#[test]
fn preserve_geometry_keeps_placement_and_filters_exactly() {
    let (mut graph, target) = layered_graph();
    let before = graph.get(target).unwrap().clone();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));

    let new_id = swap(
        &mut graph,
        &mut canvas,
        target,
        LoadedImage {
            locator: FLIPPED.to_string(),
            width: 1200,
            height: 900,
        },
        ReplaceMode::PreserveGeometry,
    )
    .unwrap();

    let replacement = graph.get(new_id).unwrap();
    assert_ne!(new_id, target);
    assert!(graph.get(target).is_none());
    assert_eq!(replacement.geometry, before.geometry);
    assert_eq!(replacement.filters, before.filters);
    assert_eq!(replacement.source.as_deref(), Some(FLIPPED));
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.index_of(new_id), Some(1));
    assert_eq!(graph.active_id(), Some(new_id));
    assert_eq!(canvas.filter_passes(), &[(new_id, 2)]);
    assert_eq!(canvas.render_requests(), 1);
}

#[test]
fn fit_to_viewport_keeps_center_and_angle_and_shrinks_large_results() {
    let (mut graph, target) = layered_graph();
    let before = graph.get(target).unwrap().clone();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));

    let new_id = swap(
        &mut graph,
        &mut canvas,
        target,
        LoadedImage {
            locator: "https://ik.imagekit.io/acct/tr:e-edit-prompt-sunset/cat.jpg".to_string(),
            width: 2000,
            height: 1000,
        },
        ReplaceMode::FitToViewport,
    )
    .unwrap();

    let replacement = graph.get(new_id).unwrap();
    let geometry = replacement.geometry;
    assert!((geometry.scale_x - 0.4).abs() < 1e-12);
    assert_eq!(geometry.scale_x, geometry.scale_y);
    assert_eq!(geometry.angle, before.geometry.angle);
    assert!(approx(replacement.center_point(), before.center_point()));
    assert!(replacement.width * geometry.scale_x <= 800.0);
    assert!(replacement.height * geometry.scale_y <= 600.0);
    assert_eq!(replacement.filters, before.filters);
    assert_eq!(graph.index_of(new_id), Some(1));
}

#[test]
fn fit_to_viewport_never_upscales() {
    let (mut graph, target) = layered_graph();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));

    let new_id = swap(
        &mut graph,
        &mut canvas,
        target,
        LoadedImage {
            locator: FLIPPED.to_string(),
            width: 64,
            height: 48,
        },
        ReplaceMode::FitToViewport,
    )
    .unwrap();

    assert_eq!(graph.get(new_id).unwrap().geometry.scale_x, 1.0);
}

#[tokio::test]
async fn failed_load_leaves_scene_and_selection_untouched() {
    let (mut graph, target) = layered_graph();
    let snapshot = graph.clone();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));
    let reconciler = SceneReconciler::new(FakeLoader::failing());

    let err = reconciler
        .replace(
            &mut graph,
            &mut canvas,
            target,
            FLIPPED,
            ReplaceMode::PreserveGeometry,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Load(LoadError::Unavailable(_))));
    assert_eq!(graph, snapshot);
    assert_eq!(graph.active_id(), Some(target));
    assert_eq!(canvas.render_requests(), 0);
}

#[tokio::test]
async fn zero_sized_result_is_rejected_before_swap() {
    let (mut graph, target) = layered_graph();
    let snapshot = graph.clone();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));
    let reconciler = SceneReconciler::new(FakeLoader::uniform(0, 480));

    let err = reconciler
        .replace(
            &mut graph,
            &mut canvas,
            target,
            FLIPPED,
            ReplaceMode::FitToViewport,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::EmptyImage { .. }));
    assert_eq!(graph, snapshot);
}

#[tokio::test]
async fn missing_or_non_image_target_is_checked_before_loading() {
    let (mut graph, _) = layered_graph();
    let shape_id = graph.nodes()[0].id;
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));
    let reconciler = SceneReconciler::new(FakeLoader::uniform(10, 10));

    let err = reconciler
        .replace(
            &mut graph,
            &mut canvas,
            shape_id,
            FLIPPED,
            ReplaceMode::PreserveGeometry,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::TargetNotImage(id) if id == shape_id));

    let ghost = uuid::Uuid::new_v4();
    let err = reconciler
        .replace(
            &mut graph,
            &mut canvas,
            ghost,
            FLIPPED,
            ReplaceMode::PreserveGeometry,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::TargetNotFound(id) if id == ghost));
    assert!(reconciler.loader().requests().is_empty());
}

#[tokio::test]
async fn insert_image_centers_fits_and_selects() {
    let mut graph = SceneGraph::new();
    let mut canvas = HeadlessCanvas::new(Dimensions::new(800, 600));
    let reconciler = SceneReconciler::new(FakeLoader::uniform(1600, 1600));

    let id = reconciler
        .insert_image(&mut graph, &mut canvas, SOURCE)
        .await
        .unwrap();

    let node = graph.get(id).unwrap();
    assert_eq!(graph.active_id(), Some(id));
    assert_eq!(node.geometry.scale_x, 600.0 / 1600.0);
    assert!(approx(node.center_point(), Point::new(400.0, 300.0)));
    assert_eq!(canvas.render_requests(), 1);
}
