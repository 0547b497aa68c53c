#![cfg(target_arch = "wasm32")]

use orbit_viewer::{
    ViewerError,
    config::LabelConfig,
    flow::{append_canvas, find_container},
    label::LabelRenderer,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn fresh_container(id: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let container = document.create_element("div").unwrap();
    container.set_id(id);
    document.body().unwrap().append_child(&container).unwrap();
    container
}

#[wasm_bindgen_test]
fn mounting_appends_canvas_and_label_layer() {
    let container = fresh_container("container-3d-mount");
    let (document, found) = find_container("container-3d-mount").unwrap();
    append_canvas(&document, &found).unwrap();
    let mut labels = LabelRenderer::new(LabelConfig::default(), 640, 480);
    labels.mount(&document, &found).unwrap();

    assert_eq!(container.child_element_count(), 2);
    assert_eq!(container.first_element_child().unwrap().tag_name(), "CANVAS");

    let overlay = container.last_element_child().unwrap();
    let style = overlay.get_attribute("style").unwrap();
    assert!(style.contains("pointer-events: none"));
    assert!(style.contains("position: absolute"));
    assert!(style.contains("font-size: 10px"));
}

#[wasm_bindgen_test]
fn missing_container_is_reported() {
    match find_container("no-such-container") {
        Err(ViewerError::ContainerMissing(id)) => assert_eq!(id, "no-such-container"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
