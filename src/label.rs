//! HTML label overlay.
//!
//! [`LabelRenderer`] projects every visible [`Label`] node to viewport pixels
//! each frame. In the browser the layouts are written to absolutely positioned
//! `div`s inside an overlay element stacked on top of the canvas; natively the
//! layouts are only computed and can be read back with
//! [`LabelRenderer::layouts`].
//!
//! [`Label`]: crate::data_structures::scene_graph::Label

use crate::{
    camera::PerspectiveCamera,
    config::LabelConfig,
    data_structures::scene_graph::{NodeKind, Scene},
};

/// Where a label ends up on screen this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelLayout {
    pub node_id: u64,
    pub text: String,
    pub class: String,
    /// Pixels from the left edge of the viewport.
    pub x: f32,
    /// Pixels from the top edge of the viewport.
    pub y: f32,
    /// Normalized depth, 0 at the near plane and 1 at the far plane.
    pub depth: f32,
    pub visible: bool,
}

#[derive(Debug)]
pub struct LabelRenderer {
    width: u32,
    height: u32,
    config: LabelConfig,
    layouts: Vec<LabelLayout>,
    #[cfg(target_arch = "wasm32")]
    overlay: Option<dom::Overlay>,
}

impl LabelRenderer {
    pub fn new(config: LabelConfig, width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            config,
            layouts: Vec::new(),
            #[cfg(target_arch = "wasm32")]
            overlay: None,
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        #[cfg(target_arch = "wasm32")]
        if let Some(overlay) = &self.overlay {
            overlay.set_size(self.width, self.height);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layouts(&self) -> &[LabelLayout] {
        &self.layouts
    }

    /// Recomputes the screen position of every label in `scene`.
    pub fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let (w, h) = (self.width as f32, self.height as f32);
        let default_class = &self.config.class_name;
        let mut layouts = Vec::new();
        scene.traverse_visible_with_world(&mut |node, world| {
            let NodeKind::Label(label) = &node.kind else {
                return;
            };
            let anchor = cgmath::Point3::new(world.position.x, world.position.y, world.position.z);
            let (x, y, depth, visible) = match camera.project(anchor) {
                Some(ndc) => (
                    (ndc.x * 0.5 + 0.5) * w,
                    (-ndc.y * 0.5 + 0.5) * h,
                    ndc.z,
                    (0.0..=1.0).contains(&ndc.z),
                ),
                None => (0.0, 0.0, 1.0, false),
            };
            let class = match &label.class {
                Some(extra) => format!("{default_class} {extra}"),
                None => default_class.clone(),
            };
            layouts.push(LabelLayout {
                node_id: node.id(),
                text: label.text.clone(),
                class,
                x,
                y,
                depth,
                visible,
            });
        });
        self.layouts = layouts;

        #[cfg(target_arch = "wasm32")]
        if let Some(overlay) = &mut self.overlay {
            if let Err(e) = overlay.sync(&self.layouts) {
                log::error!("failed to update label overlay: {e}");
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod dom {
    use std::collections::HashMap;

    use wasm_bindgen::JsCast;
    use web_sys::{Document, Element, HtmlElement};

    use super::{LabelLayout, LabelRenderer};
    use crate::error::{Result, ViewerError};

    fn dom_err(e: wasm_bindgen::JsValue) -> ViewerError {
        ViewerError::Dom(format!("{e:?}"))
    }

    #[derive(Debug)]
    pub(super) struct Overlay {
        document: Document,
        root: HtmlElement,
        elements: HashMap<u64, HtmlElement>,
    }

    impl Overlay {
        pub(super) fn set_size(&self, width: u32, height: u32) {
            let style = self.root.style();
            let _ = style.set_property("width", &format!("{width}px"));
            let _ = style.set_property("height", &format!("{height}px"));
        }

        fn create_label(&self, layout: &LabelLayout) -> Result<HtmlElement> {
            let el: HtmlElement = self
                .document
                .create_element("div")
                .map_err(dom_err)?
                .dyn_into()
                .map_err(|_| ViewerError::Dom("created element is not an HtmlElement".into()))?;
            el.set_class_name(&layout.class);
            el.set_text_content(Some(&layout.text));
            el.style().set_property("position", "absolute").map_err(dom_err)?;
            self.root.append_child(&el).map_err(dom_err)?;
            Ok(el)
        }

        pub(super) fn sync(&mut self, layouts: &[LabelLayout]) -> Result<()> {
            self.elements.retain(|id, el| {
                let keep = layouts.iter().any(|l| l.node_id == *id);
                if !keep {
                    el.remove();
                }
                keep
            });
            for layout in layouts {
                if !self.elements.contains_key(&layout.node_id) {
                    let el = self.create_label(layout)?;
                    self.elements.insert(layout.node_id, el);
                }
                let Some(el) = self.elements.get(&layout.node_id) else {
                    continue;
                };
                if el.text_content().as_deref() != Some(layout.text.as_str()) {
                    el.set_text_content(Some(&layout.text));
                }
                let style = el.style();
                if layout.visible {
                    style
                        .set_property(
                            "transform",
                            &format!(
                                "translate(-50%, -50%) translate({}px, {}px)",
                                layout.x, layout.y
                            ),
                        )
                        .map_err(dom_err)?;
                    style.set_property("display", "").map_err(dom_err)?;
                    // nearer labels on top
                    let z = ((1.0 - layout.depth.clamp(0.0, 1.0)) * 1_000_000.0) as i64;
                    style.set_property("z-index", &z.to_string()).map_err(dom_err)?;
                } else {
                    style.set_property("display", "none").map_err(dom_err)?;
                }
            }
            Ok(())
        }
    }

    impl LabelRenderer {
        /// Creates the overlay element and appends it to `container`.
        pub fn mount(&mut self, document: &Document, container: &Element) -> Result<()> {
            let root: HtmlElement = document
                .create_element("div")
                .map_err(dom_err)?
                .dyn_into()
                .map_err(|_| ViewerError::Dom("created element is not an HtmlElement".into()))?;
            let style = root.style();
            style.set_property("position", "absolute").map_err(dom_err)?;
            style.set_property("top", "0px").map_err(dom_err)?;
            style
                .set_property("font-size", &format!("{}px", self.config.font_size_px))
                .map_err(dom_err)?;
            style.set_property("pointer-events", "none").map_err(dom_err)?;
            style.set_property("overflow", "hidden").map_err(dom_err)?;
            container.append_child(&root).map_err(dom_err)?;

            let overlay = Overlay {
                document: document.clone(),
                root,
                elements: HashMap::new(),
            };
            overlay.set_size(self.width, self.height);
            self.overlay = Some(overlay);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::CameraConfig,
        data_structures::scene_graph::{Label, Object3D},
    };
    use approx::assert_relative_eq;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(&CameraConfig::default(), 800, 600)
    }

    #[test]
    fn label_at_the_target_lands_in_the_centre() {
        let mut scene = Scene::new();
        scene.add(Object3D::label("origin", Label::new("0,0,0")));
        let mut labels = LabelRenderer::new(LabelConfig::default(), 800, 600);

        labels.render(&scene, &camera());

        let layout = &labels.layouts()[0];
        assert!(layout.visible);
        assert_relative_eq!(layout.x, 400.0, epsilon = 1e-2);
        assert_relative_eq!(layout.y, 300.0, epsilon = 1e-2);
        assert_eq!(layout.class, "label");
    }

    #[test]
    fn label_behind_the_camera_is_hidden() {
        let mut scene = Scene::new();
        let mut node = Object3D::label("behind", Label::new("x"));
        node.transform.position = [0.0, 0.0, 600.0].into();
        scene.add(node);
        let mut labels = LabelRenderer::new(LabelConfig::default(), 800, 600);

        labels.render(&scene, &camera());
        assert!(!labels.layouts()[0].visible);
    }

    #[test]
    fn positive_y_is_above_the_centre() {
        let mut scene = Scene::new();
        let mut node = Object3D::label("up", Label::new("up"));
        node.transform.position = [0.0, 50.0, 0.0].into();
        scene.add(node);
        let mut labels = LabelRenderer::new(LabelConfig::default(), 800, 600);

        labels.render(&scene, &camera());
        assert!(labels.layouts()[0].y < 300.0);
    }

    #[test]
    fn extra_classes_are_appended_and_size_is_clamped() {
        let mut scene = Scene::new();
        let mut label = Label::new("tagged");
        label.class = Some("warn".into());
        scene.add(Object3D::label("tagged", label));
        let mut labels = LabelRenderer::new(LabelConfig::default(), 0, 0);
        assert_eq!(labels.size(), (1, 1));
        labels.set_size(1024, 768);
        assert_eq!(labels.size(), (1024, 768));

        labels.render(&scene, &camera());
        assert_eq!(labels.layouts()[0].class, "label warn");
    }
}
