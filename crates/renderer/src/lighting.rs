//! Scene lighting and color helpers.

use glam::Vec3;

/// Convert a `0xRRGGBB` sRGB color to linear RGBA.
pub fn hex_color(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0), 1.0]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// One directional light plus a flat ambient term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Clear color of the frame, linear.
    pub background: [f32; 4],
    /// Where the directional light sits; it shines toward the origin.
    pub light_position: Vec3,
    pub light_color: [f32; 4],
    pub light_intensity: f32,
    pub ambient_color: [f32; 4],
    pub ambient_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            background: hex_color(0x393a3d),
            light_position: Vec3::new(0.0, 50.0, -50.0),
            light_color: hex_color(0xffffff),
            light_intensity: 1.0,
            ambient_color: hex_color(0xbbbbbb),
            ambient_intensity: 1.0,
        }
    }
}

impl Lighting {
    /// Unit vector from a lit surface toward the light.
    pub fn light_direction(&self) -> Vec3 {
        self.light_position.try_normalize().unwrap_or(Vec3::Y)
    }

    pub fn light_radiance(&self) -> [f32; 4] {
        scale(self.light_color, self.light_intensity)
    }

    pub fn ambient_radiance(&self) -> [f32; 4] {
        scale(self.ambient_color, self.ambient_intensity)
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.background;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

fn scale(color: [f32; 4], intensity: f32) -> [f32; 4] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity, color[3]]
}
