//! C ABI over the voxbridge call boundary.
//!
//! All state lives behind one global lock: at most one call is inside the
//! bridge at a time, and a call that has started runs to completion before
//! the lock releases. Integer-returning calls yield `VOX_OK` (0) on success
//! or one of the `VOX_ERR_*` codes; the detail message is then available
//! through [`getLastError`] / [`getLastRuntimeExceptionMessage`] until the
//! next failure overwrites it or [`clearError`] resets it. Last-error state
//! is shared by every caller thread, so callers interleaving calls from
//! multiple threads see each other's errors unless they synchronize
//! externally.

use std::ffi::{c_char, CStr, CString};
use std::sync::OnceLock;

use parking_lot::Mutex;
use voxbridge_rs::{
    BridgeError, ElementSize, ErrorChannel, HeadlessEngine, RendererConfig, VolumeBridge,
};

/// Call succeeded.
pub const VOX_OK: i64 = 0;
/// Operation invoked before initialize, after shutdown, or double-initialize.
pub const VOX_ERR_LIFECYCLE: i64 = 1;
/// The given ID does not address an active handle of the expected kind.
pub const VOX_ERR_UNKNOWN_HANDLE: i64 = 2;
/// A create call reused an ID that is currently active.
pub const VOX_ERR_DUPLICATE_HANDLE: i64 = 3;
/// Malformed arguments: non-positive dimension, buffer/dimension mismatch,
/// negative index or channel, null pointer, or a non-UTF-8 path.
pub const VOX_ERR_VALIDATION: i64 = 4;
/// The embedded runtime raised an exception; see
/// [`getLastRuntimeExceptionMessage`].
pub const VOX_ERR_RUNTIME: i64 = 5;

struct NativeState {
    bridge: VolumeBridge<HeadlessEngine>,
    errors: ErrorChannel,
    string_slot: CString,
}

fn state() -> &'static Mutex<NativeState> {
    static STATE: OnceLock<Mutex<NativeState>> = OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(NativeState {
            bridge: VolumeBridge::headless(),
            errors: ErrorChannel::new(),
            string_slot: CString::default(),
        })
    })
}

fn error_code(error: &BridgeError) -> i64 {
    match error {
        BridgeError::NotInitialized | BridgeError::AlreadyInitialized | BridgeError::ShutDown => {
            VOX_ERR_LIFECYCLE
        }
        BridgeError::UnknownHandle(_) => VOX_ERR_UNKNOWN_HANDLE,
        BridgeError::DuplicateHandle(_) => VOX_ERR_DUPLICATE_HANDLE,
        BridgeError::InvalidParameter(_) | BridgeError::BufferSizeMismatch { .. } => {
            VOX_ERR_VALIDATION
        }
        BridgeError::Engine(_) => VOX_ERR_RUNTIME,
    }
}

/// Turn a call result into a return code, recording failures into the
/// last-error cache.
fn complete(state: &mut NativeState, result: voxbridge_rs::Result<()>) -> i64 {
    match result {
        Ok(()) => VOX_OK,
        Err(error) => {
            log::warn!("{error}");
            let code = error_code(&error);
            state.errors.record(&error);
            code
        }
    }
}

/// Null and UTF-8 guard for incoming strings.
fn cstr_arg<'a>(ptr: *const c_char, name: &str) -> voxbridge_rs::Result<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidParameter(format!("{name} pointer is null")));
    }
    // SAFETY: caller contract, ptr is a valid NUL-terminated C string.
    let cstr = unsafe { CStr::from_ptr(ptr) };
    cstr.to_str()
        .map_err(|_| BridgeError::InvalidParameter(format!("{name} is not valid UTF-8")))
}

/// Store a message in the shared string slot and hand out its pointer.
/// The pointer stays valid until the next call into the library.
fn store_string(state: &mut NativeState, message: &str) -> *const c_char {
    let message = CString::new(message.as_bytes()).unwrap_or_else(|e| {
        let position = e.nul_position();
        let mut bytes = e.into_vec();
        bytes.truncate(position);
        CString::new(bytes).unwrap_or_default()
    });
    state.string_slot = message;
    state.string_slot.as_ptr()
}

fn volume_call(
    sink_id: i64,
    channel_id: i64,
    buffer: *const u8,
    buffer_length_bytes: i64,
    width: i64,
    height: i64,
    depth: i64,
    element_size: ElementSize,
) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;

    if buffer.is_null() {
        return complete(
            state,
            Err(BridgeError::InvalidParameter("buffer pointer is null".to_string())),
        );
    }
    if buffer_length_bytes < 0 {
        return complete(
            state,
            Err(BridgeError::InvalidParameter(format!(
                "buffer length must be non-negative, got {buffer_length_bytes}"
            ))),
        );
    }
    // SAFETY: caller contract, buffer points at buffer_length_bytes readable
    // bytes. The bridge copies them before returning.
    let data = unsafe { std::slice::from_raw_parts(buffer, buffer_length_bytes as usize) };
    let result = state
        .bridge
        .send_volume(sink_id, channel_id, data, element_size, width, height, depth);
    complete(state, result)
}

/// Starts the embedded runtime from the given jar path. Must be called once
/// before any other operation; calling it again without success is an error
/// and the runtime cannot be restarted after [`shutdown`].
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn initialize(jarPath: *const c_char) -> i64 {
    let _ = env_logger::Builder::from_default_env().try_init();
    let mut guard = state().lock();
    let state = &mut *guard;

    let result = cstr_arg(jarPath, "jarPath").and_then(|path| state.bridge.initialize(path));
    complete(state, result)
}

/// Stops the embedded runtime and releases every live handle. Terminal.
#[no_mangle]
pub extern "C" fn shutdown() -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state.bridge.shutdown();
    complete(state, result)
}

/// Clears the last-error cache.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn clearError() {
    state().lock().errors.clear();
}

/// Last exception message raised by the embedded runtime, or an empty
/// string. The pointer is valid until the next call into the library;
/// callers must copy it before calling anything else.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn getLastRuntimeExceptionMessage() -> *const c_char {
    let mut guard = state().lock();
    let state = &mut *guard;
    let message = state.errors.last_runtime_exception().unwrap_or("").to_owned();
    store_string(state, &message)
}

/// Most recent error message (runtime exception preferred when both are
/// set), or an empty string. Same pointer lifetime as
/// [`getLastRuntimeExceptionMessage`].
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn getLastError() -> *const c_char {
    let mut guard = state().lock();
    let state = &mut *guard;
    let message = state.errors.last_error().unwrap_or("").to_owned();
    store_string(state, &message)
}

/// Registers a renderer sink under a caller-chosen ID. A sink of the same
/// ID number becomes addressable by the session and upload calls.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn createRenderer(
    rendererId: i64,
    windowWidth: i64,
    windowHeight: i64,
    bytesPerVoxel: i64,
    maxTextureWidth: i64,
    maxTextureHeight: i64,
) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let config = RendererConfig {
        window_width: windowWidth,
        window_height: windowHeight,
        bytes_per_voxel: bytesPerVoxel,
        max_texture_width: maxTextureWidth,
        max_texture_height: maxTextureHeight,
    };
    let result = state.bridge.create_renderer(rendererId, config);
    complete(state, result)
}

/// Destroys a renderer sink; its ID becomes free for reuse.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn destroyRenderer(rendererId: i64) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state.bridge.destroy_renderer(rendererId);
    complete(state, result)
}

/// Registers a server sink under a caller-chosen ID.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn createServer(serverId: i64) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state.bridge.create_server(serverId);
    complete(state, result)
}

/// Destroys a server sink; its ID becomes free for reuse.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn destroyServer(serverId: i64) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state.bridge.destroy_server(serverId);
    complete(state, result)
}

/// Sets the voxel size of a sink in real units. Applies to subsequent
/// uploads only.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn setVoxelDimensions(
    sinkId: i64,
    voxelWidthRealUnits: f64,
    voxelHeightRealUnits: f64,
    voxelDepthRealUnits: f64,
) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state.bridge.set_voxel_dimensions(
        sinkId,
        voxelWidthRealUnits,
        voxelHeightRealUnits,
        voxelDepthRealUnits,
    );
    complete(state, result)
}

/// Sets the volume index and acquisition time tagged onto subsequent
/// uploads to a sink.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn setVolumeIndexAndTime(
    sinkId: i64,
    volumeIndex: i64,
    volumeTimeSeconds: f64,
) -> i64 {
    let mut guard = state().lock();
    let state = &mut *guard;
    let result = state
        .bridge
        .set_volume_index_and_time(sinkId, volumeIndex, volumeTimeSeconds);
    complete(state, result)
}

/// Sends a volume of 8-bit unsigned elements to a sink. `bufferLengthBytes`
/// must equal `width * height * depth`. The buffer is copied before this
/// returns; the caller may reuse or free it immediately.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn sendVolume8Bit(
    sinkId: i64,
    channelId: i64,
    buffer: *const u8,
    bufferLengthBytes: i64,
    widthVoxels: i64,
    heightVoxels: i64,
    depthVoxels: i64,
) -> i64 {
    volume_call(
        sinkId,
        channelId,
        buffer,
        bufferLengthBytes,
        widthVoxels,
        heightVoxels,
        depthVoxels,
        ElementSize::U8,
    )
}

/// Sends a volume of 16-bit unsigned elements to a sink.
/// `bufferLengthBytes` is still a byte count and must equal
/// `width * height * depth * 2`. Same copy semantics as [`sendVolume8Bit`].
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn sendVolume16Bit(
    sinkId: i64,
    channelId: i64,
    buffer: *const u16,
    bufferLengthBytes: i64,
    widthVoxels: i64,
    heightVoxels: i64,
    depthVoxels: i64,
) -> i64 {
    volume_call(
        sinkId,
        channelId,
        buffer.cast::<u8>(),
        bufferLengthBytes,
        widthVoxels,
        heightVoxels,
        depthVoxels,
        ElementSize::U16,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error_string() -> String {
        // SAFETY: getLastError returns a pointer into the string slot, valid
        // until the next call.
        unsafe { CStr::from_ptr(getLastError()) }
            .to_string_lossy()
            .into_owned()
    }

    /// The whole boundary shares one global bridge, so the full external
    /// contract is exercised in a single sequential scenario.
    #[test]
    fn full_caller_scenario_through_the_c_abi() {
        let dir = tempfile::tempdir().expect("temp dir");
        let jar = dir.path().join("clearvolume.jar");
        std::fs::write(&jar, b"").expect("write jar");
        let jar_c = CString::new(jar.to_str().expect("utf-8 path")).expect("c string");

        // Null path is rejected before the bridge is touched.
        assert_eq!(initialize(std::ptr::null()), VOX_ERR_VALIDATION);
        assert!(!last_error_string().is_empty());

        // Operations before initialize fail with a lifecycle error.
        assert_eq!(createServer(1), VOX_ERR_LIFECYCLE);

        assert_eq!(initialize(jar_c.as_ptr()), VOX_OK);
        assert_eq!(initialize(jar_c.as_ptr()), VOX_ERR_LIFECYCLE);

        // One shared ID namespace for both sink kinds.
        assert_eq!(createRenderer(1, 512, 512, 1, 1024, 1024), VOX_OK);
        assert_eq!(createServer(1), VOX_ERR_DUPLICATE_HANDLE);
        assert_eq!(createRenderer(2, 512, 0, 1, 1024, 1024), VOX_ERR_VALIDATION);

        assert_eq!(setVoxelDimensions(1, 0.5, 0.5, 2.0), VOX_OK);
        assert_eq!(setVolumeIndexAndTime(1, 4, 0.4), VOX_OK);
        assert_eq!(setVolumeIndexAndTime(1, -1, 0.0), VOX_ERR_VALIDATION);

        // 4x4x4 volume of 1-byte elements: 64 bytes exactly.
        let volume = [0u8; 64];
        assert_eq!(
            sendVolume8Bit(1, 0, volume.as_ptr(), 64, 4, 4, 4),
            VOX_OK
        );
        assert_eq!(
            sendVolume8Bit(1, 0, volume.as_ptr(), 63, 4, 4, 4),
            VOX_ERR_VALIDATION
        );
        assert_eq!(
            sendVolume8Bit(1, 0, std::ptr::null(), 64, 4, 4, 4),
            VOX_ERR_VALIDATION
        );

        let volume16 = [0u16; 8];
        assert_eq!(
            sendVolume16Bit(1, 0, volume16.as_ptr(), 16, 2, 2, 2),
            VOX_OK
        );

        // Destroyed handles stop being addressable and free their ID.
        assert_eq!(destroyServer(1), VOX_ERR_UNKNOWN_HANDLE);
        assert_eq!(destroyRenderer(1), VOX_OK);
        assert_eq!(
            sendVolume8Bit(1, 0, volume.as_ptr(), 64, 4, 4, 4),
            VOX_ERR_UNKNOWN_HANDLE
        );
        assert_eq!(createServer(1), VOX_OK);

        // Error cache persists across successful calls until cleared.
        assert!(!last_error_string().is_empty());
        clearError();
        assert!(last_error_string().is_empty());
        let exception = unsafe { CStr::from_ptr(getLastRuntimeExceptionMessage()) };
        assert!(exception.to_bytes().is_empty());

        // Shutdown is terminal.
        assert_eq!(shutdown(), VOX_OK);
        assert_eq!(createServer(2), VOX_ERR_LIFECYCLE);
        assert_eq!(shutdown(), VOX_ERR_LIFECYCLE);
    }

    #[test]
    fn error_codes_partition_the_error_kinds() {
        assert_eq!(error_code(&BridgeError::NotInitialized), VOX_ERR_LIFECYCLE);
        assert_eq!(error_code(&BridgeError::ShutDown), VOX_ERR_LIFECYCLE);
        assert_eq!(error_code(&BridgeError::UnknownHandle(1)), VOX_ERR_UNKNOWN_HANDLE);
        assert_eq!(
            error_code(&BridgeError::DuplicateHandle(1)),
            VOX_ERR_DUPLICATE_HANDLE
        );
        assert_eq!(
            error_code(&BridgeError::BufferSizeMismatch {
                expected: 64,
                actual: 63
            }),
            VOX_ERR_VALIDATION
        );
        assert_eq!(
            error_code(&BridgeError::Engine(voxbridge_rs::EngineError("x".into()))),
            VOX_ERR_RUNTIME
        );
    }
}
