mod raster;
mod renderer;

pub use renderer::Renderer;

pub const CLEAR_COLOR: [u8; 4] = [0xe0, 0xff, 0xef, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
