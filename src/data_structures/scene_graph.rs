//! Scene graph: a tree of [`Object3D`] nodes under a [`Scene`] root.
//!
//! Nodes own their children directly. Geometry and materials are shared
//! (`Arc`) because many nodes typically reference the same GPU resources; the
//! tree itself never frees them. Releasing GPU resources is the job of
//! [`crate::dispose`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::data_structures::{
    geometry::Geometry,
    instance::Instance,
    light::DirectionalLight,
    material::{Material, MaterialSlot},
};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// An HTML label anchored at its node's world position.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    /// Extra CSS class on top of the overlay's default one.
    pub class: Option<String>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh,
    Light(DirectionalLight),
    Label(Label),
}

#[derive(Debug)]
pub struct Object3D {
    id: u64,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Instance,
    pub visible: bool,
    pub geometry: Option<Arc<Geometry>>,
    pub material: Option<MaterialSlot>,
    pub children: Vec<Object3D>,
}

impl Object3D {
    fn with_kind(name: &str, kind: NodeKind) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            kind,
            transform: Instance::default(),
            visible: true,
            geometry: None,
            material: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::with_kind(name, NodeKind::Group)
    }

    pub fn mesh(name: &str, geometry: Arc<Geometry>, material: impl Into<MaterialSlot>) -> Self {
        let mut node = Self::with_kind(name, NodeKind::Mesh);
        node.geometry = Some(geometry);
        node.material = Some(material.into());
        node
    }

    pub fn light(name: &str, light: DirectionalLight) -> Self {
        // lights sit at their direction vector so world transforms can move them
        let position = light.direction.into();
        let mut node = Self::with_kind(name, NodeKind::Light(light));
        node.transform.position = position;
        node
    }

    pub fn label(name: &str, label: Label) -> Self {
        Self::with_kind(name, NodeKind::Label(label))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn add_child(&mut self, child: Object3D) {
        self.children.push(child);
    }

    /// Pre-order walk over `self` and all descendants.
    pub fn traverse<'a>(&'a self, visit: &mut dyn FnMut(&'a Object3D)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    pub fn traverse_mut(&mut self, visit: &mut dyn FnMut(&mut Object3D)) {
        visit(self);
        for child in &mut self.children {
            child.traverse_mut(visit);
        }
    }

    /// Pre-order walk that also hands out each node's world transform.
    /// Invisible nodes and their subtrees are skipped.
    pub fn traverse_visible_with_world<'a>(
        &'a self,
        parent: &Instance,
        visit: &mut dyn FnMut(&'a Object3D, &Instance),
    ) {
        if !self.visible {
            return;
        }
        let world = parent * &self.transform;
        visit(self, &world);
        for child in &self.children {
            child.traverse_visible_with_world(&world, visit);
        }
    }

    /// Number of nodes below `self`, not counting `self`.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Materials referenced by this node, in slot order.
    pub fn materials(&self) -> &[Arc<Material>] {
        self.material
            .as_ref()
            .map(MaterialSlot::materials)
            .unwrap_or(&[])
    }
}

/// Root of the scene graph. The root itself is never removed or disposed.
#[derive(Debug, Default)]
pub struct Scene {
    children: Vec<Object3D>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Object3D) {
        self.children.push(node);
    }

    /// Detaches the child at `index`. Detaching does not release GPU resources.
    pub fn remove(&mut self, index: usize) -> Option<Object3D> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            log::warn!(
                "tried to remove child {} from a scene with {} children",
                index,
                self.children.len()
            );
            None
        }
    }

    pub fn children(&self) -> &[Object3D] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Object3D] {
        &mut self.children
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Object3D> {
        let mut found = None;
        self.traverse(&mut |node| {
            if found.is_none() && node.name == name {
                found = Some(node);
            }
        });
        found
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Object3D> {
        fn search<'a>(nodes: &'a mut [Object3D], name: &str) -> Option<&'a mut Object3D> {
            for node in nodes {
                if node.name == name {
                    return Some(node);
                }
                if let Some(hit) = search(&mut node.children, name) {
                    return Some(hit);
                }
            }
            None
        }
        search(&mut self.children, name)
    }

    /// Pre-order walk over every node in the scene (the root has no node of its own).
    pub fn traverse<'a>(&'a self, visit: &mut dyn FnMut(&'a Object3D)) {
        for child in &self.children {
            child.traverse(visit);
        }
    }

    pub fn traverse_visible_with_world<'a>(&'a self, visit: &mut dyn FnMut(&'a Object3D, &Instance)) {
        let root = Instance::default();
        for child in &self.children {
            child.traverse_visible_with_world(&root, visit);
        }
    }

    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Directional lights with their world-space directions.
    pub fn lights(&self) -> Vec<DirectionalLight> {
        let mut lights = Vec::new();
        self.traverse_visible_with_world(&mut |node, world| {
            if let NodeKind::Light(light) = &node.kind {
                lights.push(DirectionalLight {
                    direction: world.position.into(),
                    ..light.clone()
                });
            }
        });
        lights
    }

    /// Detaches every top-level child, last one first.
    pub(crate) fn drain_children(&mut self) -> Vec<Object3D> {
        let mut removed = Vec::with_capacity(self.children.len());
        for i in (0..self.children.len()).rev() {
            removed.push(self.children.remove(i));
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceTracker;

    fn sample_scene(tracker: &ResourceTracker) -> Scene {
        let geometry = Arc::new(Geometry::tetrahedron(tracker, 1.0));
        let material = Arc::new(Material::new(tracker, "m", [1.0; 3]));

        let mut group = Object3D::group("group");
        group.add_child(Object3D::mesh("a", geometry.clone(), material.clone()));
        let mut b = Object3D::mesh("b", geometry, material);
        b.add_child(Object3D::label("tag", Label::new("hello")));
        group.add_child(b);

        let mut scene = Scene::new();
        scene.add(Object3D::light("sun", DirectionalLight::new(0xffffff, 1.0, [1.0, 0.0, 0.0])));
        scene.add(group);
        scene
    }

    #[test]
    fn traversal_is_pre_order() {
        let tracker = ResourceTracker::new();
        let scene = sample_scene(&tracker);
        let mut names = Vec::new();
        scene.traverse(&mut |node| names.push(node.name.clone()));
        assert_eq!(names, ["sun", "group", "a", "b", "tag"]);
        assert_eq!(scene.descendant_count(), 5);
    }

    #[test]
    fn invisible_subtrees_are_skipped() {
        let tracker = ResourceTracker::new();
        let mut scene = sample_scene(&tracker);
        scene.find_by_name_mut("b").unwrap().visible = false;

        let mut names = Vec::new();
        scene.traverse_visible_with_world(&mut |node, _| names.push(node.name.clone()));
        assert_eq!(names, ["sun", "group", "a"]);
    }

    #[test]
    fn world_transforms_accumulate() {
        let tracker = ResourceTracker::new();
        let mut scene = sample_scene(&tracker);
        scene.find_by_name_mut("group").unwrap().transform.position = [0.0, 5.0, 0.0].into();
        scene.find_by_name_mut("tag").unwrap().transform.position = [1.0, 0.0, 0.0].into();

        let mut tag_pos = None;
        scene.traverse_visible_with_world(&mut |node, world| {
            if node.name == "tag" {
                tag_pos = Some(world.position);
            }
        });
        assert_eq!(tag_pos, Some([1.0, 5.0, 0.0].into()));
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut scene = Scene::new();
        assert!(scene.remove(0).is_none());
        scene.add(Object3D::group("g"));
        assert_eq!(scene.remove(0).map(|n| n.name), Some("g".to_string()));
        assert!(scene.children().is_empty());
    }

    #[test]
    fn drain_children_empties_the_root() {
        let tracker = ResourceTracker::new();
        let mut scene = sample_scene(&tracker);
        let removed = scene.drain_children();
        assert!(scene.children().is_empty());
        let names: Vec<_> = removed.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["group", "sun"]);
    }

    #[test]
    fn node_ids_are_unique() {
        let a = Object3D::group("a");
        let b = Object3D::group("b");
        assert_ne!(a.id(), b.id());
    }
}
