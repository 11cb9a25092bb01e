use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::{HeadlessEngine, VolumeEngine};
use crate::error::{BridgeError, Result};
use crate::registry::{SinkEntry, SinkRegistry};
use crate::types::{ElementSize, RendererConfig, SinkKind, Volume, VoxelDimensions};
use crate::upload;

/// Lifecycle of the embedded runtime. `ShutDown` is terminal: once reached,
/// no call of any kind succeeds again in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    ShutDown,
}

/// The call boundary between an acquisition application and the embedded
/// visualization runtime.
///
/// Owns the runtime lifecycle, the shared sink handle table, and the
/// validated volume-upload path. All methods take `&mut self`: the bridge is
/// single-writer by construction, and the FFI layer serializes callers
/// through one global lock. A failed call leaves registry and session state
/// unchanged, except that a runtime exception may leave the runtime's own
/// state ahead of this layer's view.
pub struct VolumeBridge<E: VolumeEngine> {
    phase: Phase,
    jar_path: Option<PathBuf>,
    engine: E,
    registry: SinkRegistry,
}

impl VolumeBridge<HeadlessEngine> {
    /// Bridge backed by the in-process [`HeadlessEngine`].
    pub fn headless() -> Self {
        Self::with_engine(HeadlessEngine::new())
    }
}

impl<E: VolumeEngine> VolumeBridge<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            phase: Phase::Uninitialized,
            jar_path: None,
            engine,
            registry: SinkRegistry::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn jar_path(&self) -> Option<&Path> {
        self.jar_path.as_deref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn active_sinks(&self) -> usize {
        self.registry.len()
    }

    fn require_initialized(&self) -> Result<()> {
        match self.phase {
            Phase::Initialized => Ok(()),
            Phase::Uninitialized => Err(BridgeError::NotInitialized),
            Phase::ShutDown => Err(BridgeError::ShutDown),
        }
    }

    /// Start the embedded runtime from the given jar.
    ///
    /// Fails if the path is empty, the runtime cannot start, the bridge is
    /// already initialized, or it has been shut down (shutdown is terminal,
    /// re-initialization is not supported).
    pub fn initialize<P: AsRef<Path>>(&mut self, jar_path: P) -> Result<()> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Initialized => return Err(BridgeError::AlreadyInitialized),
            Phase::ShutDown => return Err(BridgeError::ShutDown),
        }
        let jar_path = jar_path.as_ref();
        if jar_path.as_os_str().is_empty() {
            return Err(BridgeError::InvalidParameter(
                "runtime jar path is empty".to_string(),
            ));
        }

        self.engine.start(jar_path)?;
        self.phase = Phase::Initialized;
        self.jar_path = Some(jar_path.to_path_buf());
        log::info!("bridge initialized with runtime jar {}", jar_path.display());
        Ok(())
    }

    /// Stop the embedded runtime, releasing all live handles implicitly.
    ///
    /// The bridge transitions to `ShutDown` even if the runtime reports a
    /// failure while stopping; the runtime's own state is authoritative at
    /// that point.
    pub fn shutdown(&mut self) -> Result<()> {
        self.require_initialized()?;
        let released = self.registry.len();
        let result = self.engine.stop();
        self.registry.clear();
        self.phase = Phase::ShutDown;
        log::info!("bridge shut down, released {released} sink(s)");
        result.map_err(Into::into)
    }

    /// Register a renderer sink under a caller-chosen ID.
    pub fn create_renderer(&mut self, id: i64, config: RendererConfig) -> Result<()> {
        self.require_initialized()?;
        validate_renderer_config(&config)?;
        if self.registry.contains(id) {
            return Err(BridgeError::DuplicateHandle(id));
        }
        self.engine.create_renderer(id, &config)?;
        self.registry.insert(id, SinkEntry::renderer(config))?;
        log::debug!("created renderer sink {id}");
        Ok(())
    }

    /// Register a server sink under a caller-chosen ID.
    pub fn create_server(&mut self, id: i64) -> Result<()> {
        self.require_initialized()?;
        if self.registry.contains(id) {
            return Err(BridgeError::DuplicateHandle(id));
        }
        self.engine.create_server(id)?;
        self.registry.insert(id, SinkEntry::server())?;
        log::debug!("created server sink {id}");
        Ok(())
    }

    pub fn destroy_renderer(&mut self, id: i64) -> Result<()> {
        self.destroy(id, SinkKind::Renderer)
    }

    pub fn destroy_server(&mut self, id: i64) -> Result<()> {
        self.destroy(id, SinkKind::Server)
    }

    fn destroy(&mut self, id: i64, kind: SinkKind) -> Result<()> {
        self.require_initialized()?;
        let entry = self.registry.get(id)?;
        if entry.kind() != kind {
            return Err(BridgeError::UnknownHandle(id));
        }
        self.engine.destroy_sink(id)?;
        self.registry.remove(id, kind)?;
        log::debug!("destroyed {} sink {id}", kind.as_str());
        Ok(())
    }

    /// Set the real-unit voxel size stamped onto subsequent uploads to this
    /// sink. Not retroactive.
    pub fn set_voxel_dimensions(&mut self, id: i64, width: f64, height: f64, depth: f64) -> Result<()> {
        self.require_initialized()?;
        if !(width > 0.0 && height > 0.0 && depth > 0.0) {
            return Err(BridgeError::InvalidParameter(format!(
                "voxel dimensions must be positive, got {width}x{height}x{depth}"
            )));
        }
        self.registry.get_mut(id)?.set_voxel_dimensions(VoxelDimensions {
            width,
            height,
            depth,
        });
        Ok(())
    }

    /// Set the volume index and acquisition time stamped onto subsequent
    /// uploads to this sink.
    pub fn set_volume_index_and_time(&mut self, id: i64, index: i64, time_seconds: f64) -> Result<()> {
        self.require_initialized()?;
        if index < 0 {
            return Err(BridgeError::InvalidParameter(format!(
                "volume index must be non-negative, got {index}"
            )));
        }
        self.registry
            .get_mut(id)?
            .set_volume_index_and_time(index, time_seconds);
        Ok(())
    }

    /// Upload a volume of 1-byte elements.
    pub fn send_volume_u8(
        &mut self,
        id: i64,
        channel: i64,
        data: &[u8],
        width: i64,
        height: i64,
        depth: i64,
    ) -> Result<()> {
        self.send_volume(id, channel, data, ElementSize::U8, width, height, depth)
    }

    /// Upload a volume of 2-byte elements.
    pub fn send_volume_u16(
        &mut self,
        id: i64,
        channel: i64,
        data: &[u16],
        width: i64,
        height: i64,
        depth: i64,
    ) -> Result<()> {
        self.send_volume(
            id,
            channel,
            bytemuck::cast_slice(data),
            ElementSize::U16,
            width,
            height,
            depth,
        )
    }

    /// Shared validated upload path for both element widths.
    ///
    /// `data` is the raw buffer; its byte length must equal
    /// `width * height * depth * element_size`. On success the buffer has
    /// been copied into an owned [`Volume`] and accepted by the engine
    /// before this returns, so the caller may reuse it immediately.
    pub fn send_volume(
        &mut self,
        id: i64,
        channel: i64,
        data: &[u8],
        element_size: ElementSize,
        width: i64,
        height: i64,
        depth: i64,
    ) -> Result<()> {
        self.require_initialized()?;
        let entry = self.registry.get(id)?;
        upload::validate_upload(channel, data.len() as u64, width, height, depth, element_size)?;

        let volume = Volume {
            channel,
            data: Arc::from(data),
            width,
            height,
            depth,
            element_size,
            voxel_dimensions: entry.voxel_dimensions(),
            volume_index: entry.volume_index(),
            volume_time: entry.volume_time(),
        };
        self.engine.send_volume(id, &volume)?;
        log::trace!(
            "sent {width}x{height}x{depth} volume ({} byte(s)/element) to sink {id} channel {channel}",
            element_size.bytes()
        );
        Ok(())
    }
}

fn validate_renderer_config(config: &RendererConfig) -> Result<()> {
    let fields = [
        ("window width", config.window_width),
        ("window height", config.window_height),
        ("bytes per voxel", config.bytes_per_voxel),
        ("max texture width", config.max_texture_width),
        ("max texture height", config.max_texture_height),
    ];
    for (name, value) in fields {
        if value <= 0 {
            return Err(BridgeError::InvalidParameter(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_fails_when_jar_is_missing() {
        let mut bridge = VolumeBridge::headless();
        let result = bridge.initialize("/nonexistent/clearvolume.jar");
        assert!(matches!(result, Err(BridgeError::Engine(_))));
        assert_eq!(bridge.phase(), Phase::Uninitialized);
    }

    #[test]
    fn initialize_rejects_empty_path() {
        let mut bridge = VolumeBridge::headless();
        let result = bridge.initialize("");
        assert!(matches!(result, Err(BridgeError::InvalidParameter(_))));
    }

    #[test]
    fn renderer_config_must_be_positive() {
        let config = RendererConfig {
            window_width: 512,
            window_height: 0,
            bytes_per_voxel: 1,
            max_texture_width: 1024,
            max_texture_height: 1024,
        };
        assert!(matches!(
            validate_renderer_config(&config),
            Err(BridgeError::InvalidParameter(_))
        ));
    }
}
