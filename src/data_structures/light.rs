//! Directional lights and the default three-light rig.

use crate::data_structures::material::hex_to_linear;

/// Light shining from `direction` towards the origin, like a sun.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub colour: [f32; 3],
    pub intensity: f32,
    /// Position of the light; the light points from here to the origin.
    pub direction: [f32; 3],
}

impl DirectionalLight {
    pub fn new(hex: u32, intensity: f32, direction: [f32; 3]) -> Self {
        Self {
            colour: hex_to_linear(hex),
            intensity,
            direction,
        }
    }

    /// White key light plus a teal and a purple fill.
    pub fn default_rig() -> Vec<DirectionalLight> {
        vec![
            DirectionalLight::new(0xffffff, 1.0, [1.0, 0.0, 0.0]),
            DirectionalLight::new(0x11e8bb, 1.0, [0.75, 1.0, 0.5]),
            DirectionalLight::new(0x8200c9, 1.0, [-0.75, -1.0, 0.5]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_is_white_key_and_two_fills() {
        let rig = DirectionalLight::default_rig();
        assert_eq!(rig.len(), 3);
        assert_eq!(rig[0].colour, [1.0, 1.0, 1.0]);
        assert_eq!(rig[0].direction, [1.0, 0.0, 0.0]);
        assert!(rig.iter().all(|light| light.intensity == 1.0));
        // purple fill: no green
        assert_eq!(rig[2].colour[1], 0.0);
    }
}
