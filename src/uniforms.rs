//! GPU-visible uniform layouts. Spec §6 "On-wire / GPU-visible layouts".

use cgmath::Matrix4;

pub type Mat4 = Matrix4<f32>;

/// `{ mat4 view; mat4 viewInverse; mat4 proj; }`, host-coherent. Written
/// into the `"MainCamera"` buffer at index `currentFrame` every tick
/// (spec §4.1 step 3).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct CameraUbo {
    pub view: Mat4,
    pub view_inverse: Mat4,
    pub proj: Mat4,
}

/// `{ f32 uvRotation; vec2 uvOffset; vec2 uvScale; }`, std140-compatible:
/// the float sits at offset 0, and each `vec2` is pushed out to its own
/// 8-byte-aligned offset with an explicit padding field, matching the
/// `std140` block the vertex shader declares. Spec §6.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct SpriteUbo {
    pub uv_rotation: f32,
    _pad: f32,
    pub uv_offset: [f32; 2],
    pub uv_scale: [f32; 2],
}

impl SpriteUbo {
    pub fn new(uv_rotation: f32, uv_offset: [f32; 2], uv_scale: [f32; 2]) -> Self {
        Self { uv_rotation, _pad: 0.0, uv_offset, uv_scale }
    }
}
