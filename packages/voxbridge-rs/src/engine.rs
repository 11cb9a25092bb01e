use std::collections::HashMap;
use std::path::Path;

use crate::error::EngineError;
use crate::types::{RendererConfig, Volume};

/// Seam to the embedded visualization runtime.
///
/// The runtime is an opaque collaborator: it is started from a jar path,
/// makes renderer/server sinks available under the caller's IDs, and may
/// fail any call. Failures cross this seam as [`EngineError`] messages.
pub trait VolumeEngine: Send {
    fn start(&mut self, jar_path: &Path) -> Result<(), EngineError>;

    fn stop(&mut self) -> Result<(), EngineError>;

    fn create_renderer(&mut self, id: i64, config: &RendererConfig) -> Result<(), EngineError>;

    fn create_server(&mut self, id: i64) -> Result<(), EngineError>;

    fn destroy_sink(&mut self, id: i64) -> Result<(), EngineError>;

    /// Accept one volume for the given sink. The volume is fully owned by
    /// the time this is called; the caller's buffer has already been copied.
    fn send_volume(&mut self, id: i64, volume: &Volume) -> Result<(), EngineError>;
}

/// What one headless sink has accepted so far.
#[derive(Debug, Default, Clone)]
pub struct SinkReceipt {
    pub volumes_received: u64,
    pub last_volume: Option<Volume>,
}

/// Engine implementation with no display or network attached.
///
/// `start` validates that the runtime jar exists; sinks record what they
/// receive. This is the default engine behind the C ABI and the one the
/// integration tests assert against — embedders hosting the real runtime
/// supply their own [`VolumeEngine`].
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    sinks: HashMap<i64, SinkReceipt>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volumes_received(&self, id: i64) -> u64 {
        self.sinks.get(&id).map_or(0, |r| r.volumes_received)
    }

    pub fn last_volume(&self, id: i64) -> Option<&Volume> {
        self.sinks.get(&id).and_then(|r| r.last_volume.as_ref())
    }
}

impl VolumeEngine for HeadlessEngine {
    fn start(&mut self, jar_path: &Path) -> Result<(), EngineError> {
        if !jar_path.exists() {
            return Err(EngineError(format!(
                "runtime jar not found at: {}",
                jar_path.display()
            )));
        }
        log::info!("starting embedded runtime from {}", jar_path.display());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        log::info!("stopping embedded runtime, releasing {} sink(s)", self.sinks.len());
        self.sinks.clear();
        Ok(())
    }

    fn create_renderer(&mut self, id: i64, config: &RendererConfig) -> Result<(), EngineError> {
        log::debug!(
            "creating renderer {id}: {}x{} window, {} byte(s)/voxel",
            config.window_width,
            config.window_height,
            config.bytes_per_voxel
        );
        self.sinks.insert(id, SinkReceipt::default());
        Ok(())
    }

    fn create_server(&mut self, id: i64) -> Result<(), EngineError> {
        log::debug!("creating server {id}");
        self.sinks.insert(id, SinkReceipt::default());
        Ok(())
    }

    fn destroy_sink(&mut self, id: i64) -> Result<(), EngineError> {
        self.sinks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| EngineError(format!("sink {id} is not known to the runtime")))
    }

    fn send_volume(&mut self, id: i64, volume: &Volume) -> Result<(), EngineError> {
        let receipt = self
            .sinks
            .get_mut(&id)
            .ok_or_else(|| EngineError(format!("sink {id} is not known to the runtime")))?;
        receipt.volumes_received += 1;
        receipt.last_volume = Some(volume.clone());
        Ok(())
    }
}
