use orbit_viewer::{
    HeadlessRenderer, ResourceTracker, SceneRenderer, ViewerConfig, ViewerContext,
    config::RendererOptions,
    data_structures::scene_graph::{Label, NodeKind, Object3D},
    particles::PARTICLE_GROUP,
};

mod common;

#[test]
fn initialized_viewer_holds_lights_and_the_particle_field() {
    let viewer = common::headless_viewer(1280, 720);

    let top: Vec<_> = viewer.scene.children().iter().map(|n| &n.kind).collect();
    assert_eq!(top.len(), 4);
    assert_eq!(
        top.iter().filter(|k| matches!(k, NodeKind::Light(_))).count(),
        3
    );

    let field = viewer.particle_field().expect("particle group");
    assert_eq!(field.name, PARTICLE_GROUP);
    assert_eq!(field.children.len(), 1000);
    assert_eq!(field.descendant_count(), 1000);

    // one shared geometry, no textures yet
    let info = viewer.resources.info();
    assert_eq!(info.geometries, 1);
    assert_eq!(info.textures, 0);
}

#[test]
fn camera_starts_on_the_z_axis() {
    let viewer = common::headless_viewer(1280, 720);
    assert_eq!(viewer.camera.position, [0.0, 0.0, 400.0].into());
    assert_eq!((viewer.camera.znear, viewer.camera.zfar), (1.0, 1000.0));
    approx::assert_relative_eq!(viewer.camera.aspect, 1280.0 / 720.0);
}

#[test]
fn resize_updates_camera_and_both_renderers() {
    let mut viewer = common::headless_viewer(800, 600);
    viewer.resize(1000, 500);

    assert_eq!(viewer.renderer.size(), (1000, 500));
    assert_eq!(viewer.label_renderer.size(), (1000, 500));
    approx::assert_relative_eq!(viewer.camera.aspect, 2.0);
}

#[test]
fn each_frame_renders_once() {
    let mut viewer = common::headless_viewer(800, 600);
    for _ in 0..3 {
        viewer.frame().unwrap();
    }
    assert_eq!(viewer.renderer.frames(), 3);
    // all particles share geometry and material
    assert_eq!(viewer.renderer.last_draw_calls(), 1);
    assert_eq!(viewer.renderer.last_instance_count(), 1000);
}

#[test]
fn labels_follow_the_camera_each_frame() {
    let mut viewer = common::headless_viewer(800, 600);
    viewer
        .scene
        .add(Object3D::label("origin", Label::new("origin")));

    viewer.frame().unwrap();
    let layout = viewer.label_renderer.layouts()[0].clone();
    approx::assert_relative_eq!(layout.x, 400.0, epsilon = 1e-2);

    // panning moves the target, so the label drifts off centre
    viewer.controls.pan(&viewer.camera, 100.0, 0.0);
    viewer.frame().unwrap();
    assert!((viewer.label_renderer.layouts()[0].x - 400.0).abs() > 1.0);
}

#[test]
fn labels_stay_in_css_pixels_on_high_density_displays() {
    let config = ViewerConfig {
        width: 800,
        height: 600,
        renderer: RendererOptions {
            pixel_ratio: Some(2.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let tracker = ResourceTracker::new();
    let renderer = HeadlessRenderer::new(config.renderer.clone(), tracker.clone(), 800, 600);
    let mut viewer = ViewerContext::new(config, renderer, tracker);
    viewer
        .scene
        .add(Object3D::label("target", Label::new("target")));

    viewer.frame().unwrap();

    assert_eq!(viewer.renderer.drawing_buffer_size(), (1600, 1200));
    assert_eq!(viewer.label_renderer.size(), (800, 600));
    let layout = &viewer.label_renderer.layouts()[0];
    approx::assert_relative_eq!(layout.x, 400.0, epsilon = 1e-2);
    approx::assert_relative_eq!(layout.y, 300.0, epsilon = 1e-2);
}

#[test]
fn stopped_loop_handle_is_shared_with_clones() {
    let viewer = common::headless_viewer(800, 600);
    let handle = viewer.loop_handle.clone();
    assert!(viewer.loop_handle.is_running());
    handle.stop();
    assert!(!viewer.loop_handle.is_running());
    handle.resume();
    assert!(viewer.loop_handle.is_running());
}
