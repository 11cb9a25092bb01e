use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};
use crate::types::{RendererConfig, SinkKind, VoxelDimensions};

/// Live state of one sink handle: its kind, the immutable renderer
/// configuration (renderers only), and the mutable session metadata that
/// gets stamped onto every subsequent upload.
#[derive(Debug, Clone)]
pub struct SinkEntry {
    kind: SinkKind,
    renderer_config: Option<RendererConfig>,
    voxel_dimensions: VoxelDimensions,
    volume_index: i64,
    volume_time: f64,
}

impl SinkEntry {
    pub fn renderer(config: RendererConfig) -> Self {
        Self {
            kind: SinkKind::Renderer,
            renderer_config: Some(config),
            voxel_dimensions: VoxelDimensions::default(),
            volume_index: 0,
            volume_time: 0.0,
        }
    }

    pub fn server() -> Self {
        Self {
            kind: SinkKind::Server,
            renderer_config: None,
            voxel_dimensions: VoxelDimensions::default(),
            volume_index: 0,
            volume_time: 0.0,
        }
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    pub fn renderer_config(&self) -> Option<&RendererConfig> {
        self.renderer_config.as_ref()
    }

    pub fn voxel_dimensions(&self) -> VoxelDimensions {
        self.voxel_dimensions
    }

    pub fn set_voxel_dimensions(&mut self, dimensions: VoxelDimensions) {
        self.voxel_dimensions = dimensions;
    }

    pub fn volume_index(&self) -> i64 {
        self.volume_index
    }

    pub fn volume_time(&self) -> f64 {
        self.volume_time
    }

    pub fn set_volume_index_and_time(&mut self, index: i64, time_seconds: f64) {
        self.volume_index = index;
        self.volume_time = time_seconds;
    }
}

/// In-memory table of active sinks.
///
/// Renderers and servers share one ID namespace: the same integer addresses
/// the sink in every later call, whichever kind it is, so both kinds live in
/// a single map and duplicate detection is a plain key lookup.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: HashMap<i64, SinkEntry>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.sinks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Register a new sink under `id`, failing if the ID is already active.
    pub fn insert(&mut self, id: i64, entry: SinkEntry) -> Result<()> {
        if self.sinks.contains_key(&id) {
            return Err(BridgeError::DuplicateHandle(id));
        }
        self.sinks.insert(id, entry);
        Ok(())
    }

    /// Remove the sink under `id`, failing unless an active handle of the
    /// given kind is registered there. The ID becomes free for reuse.
    pub fn remove(&mut self, id: i64, kind: SinkKind) -> Result<SinkEntry> {
        match self.sinks.entry(id) {
            Entry::Occupied(occupied) if occupied.get().kind() == kind => Ok(occupied.remove()),
            _ => Err(BridgeError::UnknownHandle(id)),
        }
    }

    pub fn get(&self, id: i64) -> Result<&SinkEntry> {
        self.sinks.get(&id).ok_or(BridgeError::UnknownHandle(id))
    }

    pub fn get_mut(&mut self, id: i64) -> Result<&mut SinkEntry> {
        self.sinks.get_mut(&id).ok_or(BridgeError::UnknownHandle(id))
    }

    pub fn clear(&mut self) {
        self.sinks.clear();
    }
}
