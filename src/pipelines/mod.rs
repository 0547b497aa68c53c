//! Render pipelines for lit meshes.
//!
//! Both pipelines share one shader and one layout (material, camera, lights);
//! they differ only in blending and depth writes.

pub mod basic;
pub mod light;
pub mod material;
pub mod transparent;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub fn mk_camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

/// The mesh programs the renderer compiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Program {
    Opaque,
    Transparent,
}

impl Program {
    pub const ALL: [Program; 2] = [Program::Opaque, Program::Transparent];

    fn index(self) -> usize {
        match self {
            Program::Opaque => 0,
            Program::Transparent => 1,
        }
    }

    fn build(
        self,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        layout: &wgpu::PipelineLayout,
    ) -> wgpu::RenderPipeline {
        match self {
            Program::Opaque => basic::mk_basic_pipeline(device, color_format, sample_count, layout),
            Program::Transparent => {
                transparent::mk_transparent_pipeline(device, color_format, sample_count, layout)
            }
        }
    }
}

/// Compiled pipelines plus the layouts their bind groups are created from.
#[derive(Debug)]
pub struct Pipelines {
    programs: Vec<wgpu::RenderPipeline>,
    pub material_layout: wgpu::BindGroupLayout,
    pub camera_layout: wgpu::BindGroupLayout,
    pub light_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, sample_count: u32) -> Self {
        let material_layout = material::mk_bind_group_layout(device);
        let camera_layout = mk_camera_bind_group_layout(device);
        let light_layout = light::mk_bind_group_layout(device);
        let layout = basic::mk_mesh_pipeline_layout(
            device,
            &material_layout,
            &camera_layout,
            &light_layout,
        );
        Self {
            programs: Program::ALL
                .iter()
                .map(|program| program.build(device, color_format, sample_count, &layout))
                .collect(),
            material_layout,
            camera_layout,
            light_layout,
        }
    }

    pub fn get(&self, program: Program) -> &wgpu::RenderPipeline {
        &self.programs[program.index()]
    }

    /// Number of compiled programs.
    pub fn count(&self) -> usize {
        self.programs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_has_its_own_slot() {
        for (i, program) in Program::ALL.iter().enumerate() {
            assert_eq!(program.index(), i);
        }
    }
}
