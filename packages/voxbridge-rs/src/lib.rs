pub mod bridge;
pub mod channel;
pub mod engine;
pub mod error;
pub mod registry;
pub mod timeshift;
pub mod types;
pub mod upload;

pub use bridge::{Phase, VolumeBridge};
pub use channel::ErrorChannel;
pub use engine::{HeadlessEngine, VolumeEngine};
pub use error::{BridgeError, EngineError, Result};
pub use types::*;
