use wgpu::util::DeviceExt;

use crate::data_structures::light::DirectionalLight;

/// Directional lights the mesh shader evaluates. Extra lights are ignored.
pub const MAX_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    /// Direction towards the light; w is unused.
    direction: [f32; 4],
    /// Linear colour in rgb, intensity in w.
    colour: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    lights: [LightRaw; MAX_LIGHTS],
    // vec4<u32> on the shader side for uniform alignment, only x is read
    count: [u32; 4],
}

impl LightUniform {
    pub fn new(lights: &[DirectionalLight]) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} directional lights in the scene, only the first {MAX_LIGHTS} are shaded",
                lights.len()
            );
        }
        let mut raw = [LightRaw::default(); MAX_LIGHTS];
        for (slot, light) in raw.iter_mut().zip(lights) {
            let [x, y, z] = light.direction;
            let [r, g, b] = light.colour;
            *slot = LightRaw {
                direction: [x, y, z, 0.0],
                colour: [r, g, b, light.intensity],
            };
        }
        Self {
            lights: raw,
            count: [lights.len().min(MAX_LIGHTS) as u32, 0, 0, 0],
        }
    }

    pub fn count(&self) -> u32 {
        self.count[0]
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_fills_three_slots() {
        let uniform = LightUniform::new(&DirectionalLight::default_rig());
        assert_eq!(uniform.count(), 3);
        assert_eq!(uniform.lights[0].direction, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(uniform.lights[0].colour[3], 1.0);
        assert_eq!(uniform.lights[3].colour, [0.0; 4]);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = vec![DirectionalLight::new(0xffffff, 1.0, [0.0, 1.0, 0.0]); 6];
        assert_eq!(LightUniform::new(&lights).count(), MAX_LIGHTS as u32);
    }

    #[test]
    fn uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }
}
