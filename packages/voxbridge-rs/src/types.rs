use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which kind of sink a handle addresses. Renderers and servers share one
/// ID namespace, so the kind only matters at creation and destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkKind {
    Renderer,
    Server,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Renderer => "renderer",
            SinkKind::Server => "server",
        }
    }
}

/// Renderer creation parameters, immutable for the lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    pub window_width: i64,
    pub window_height: i64,
    pub bytes_per_voxel: i64,
    pub max_texture_width: i64,
    pub max_texture_height: i64,
}

/// Physical size of one voxel in real-world units (typically micrometers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelDimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Default for VoxelDimensions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

/// Storage width of one voxel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementSize {
    U8,
    U16,
}

impl ElementSize {
    pub fn bytes(self) -> u64 {
        match self {
            ElementSize::U8 => 1,
            ElementSize::U16 => 2,
        }
    }
}

/// One volume as handed to the engine: a copy of the caller's buffer plus
/// the sink session metadata that was current at upload time.
#[derive(Debug, Clone)]
pub struct Volume {
    pub channel: i64,
    pub data: Arc<[u8]>,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub element_size: ElementSize,
    pub voxel_dimensions: VoxelDimensions,
    pub volume_index: i64,
    pub volume_time: f64,
}
