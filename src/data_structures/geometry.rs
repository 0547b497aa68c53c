//! Vertex data and geometry handles.

use cgmath::InnerSpace;

use crate::resources::{ResourceHandle, ResourceKind, ResourceTracker};

/// Anything that can describe its own vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Triangle-list geometry. The GPU buffers are created by the renderer on first draw.
#[derive(Debug)]
pub struct Geometry {
    pub name: String,
    pub handle: ResourceHandle,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(
        tracker: &ResourceTracker,
        name: &str,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
    ) -> Self {
        if indices.len() % 3 != 0 {
            log::warn!(
                "geometry {name} has {} indices which is not a multiple of three",
                indices.len()
            );
        }
        Self {
            name: name.to_string(),
            handle: tracker.register(ResourceKind::Geometry),
            vertices,
            indices,
        }
    }

    /// Regular tetrahedron inscribed in a sphere of `radius`, one flat normal per face.
    pub fn tetrahedron(tracker: &ResourceTracker, radius: f32) -> Self {
        let corners: [cgmath::Vector3<f32>; 4] = [
            [1.0, 1.0, 1.0].into(),
            [-1.0, -1.0, 1.0].into(),
            [-1.0, 1.0, -1.0].into(),
            [1.0, -1.0, -1.0].into(),
        ];
        let faces = [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]];

        let mut vertices = Vec::with_capacity(faces.len() * 3);
        for face in faces {
            let [a, b, c] = face.map(|i| corners[i].normalize() * radius);
            let normal = (b - a).cross(c - a).normalize();
            for (corner, uv) in [a, b, c].into_iter().zip(uvs) {
                vertices.push(ModelVertex {
                    position: corner.into(),
                    normal: normal.into(),
                    tex_coords: uv,
                });
            }
        }
        let indices = (0..vertices.len() as u32).collect();
        Self::new(tracker, "tetrahedron", vertices, indices)
    }

    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn dispose(&self) -> bool {
        self.handle.dispose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tetrahedron_has_four_outward_faces() {
        let tracker = ResourceTracker::new();
        let tetra = Geometry::tetrahedron(&tracker, 1.0);

        assert_eq!(tetra.vertices.len(), 12);
        assert_eq!(tetra.num_elements(), 12);
        for face in tetra.vertices.chunks(3) {
            let centroid = face
                .iter()
                .map(|v| cgmath::Vector3::from(v.position))
                .fold(cgmath::Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p)
                / 3.0;
            let normal = cgmath::Vector3::from(face[0].normal);
            assert!(centroid.dot(normal) > 0.0);
        }
        for v in &tetra.vertices {
            assert_relative_eq!(cgmath::Vector3::from(v.position).magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn geometry_registers_with_tracker() {
        let tracker = ResourceTracker::new();
        let geometry = Geometry::tetrahedron(&tracker, 2.0);
        assert_eq!(tracker.info().geometries, 1);
        assert!(geometry.dispose());
        assert_eq!(tracker.info().geometries, 0);
    }
}
