use crate::device::{Device, DeviceSpec};
use crate::line::{DeviceLine, LineState};

/// Failure inside a backend plugin.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Mixer device I/O failed (ioctl, sysctl, file access...).
    #[error("mixer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure description.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn other(msg: impl Into<String>) -> BackendError {
        BackendError::Other(msg.into())
    }

    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            BackendError::Io(e) => e.raw_os_error().unwrap_or(5), // EIO
            BackendError::Other(_) => 5,
        }
    }
}

/// Capability set implemented by each mixer backend (OSS, ALSA, ...).
///
/// This is the only boundary the core depends on. `list_devices`,
/// `device_init`, `line_read` and `line_write` are required; everything
/// else is optional. Optional actions default to no-ops and optional
/// queries return `None`, meaning the capability is absent and the caller
/// must not assume an answer. The two change queries are stateful and
/// edge-triggered: each call reports changes since the previous call.
///
/// Plugin-wide private context lives in the implementing type itself;
/// per-device and per-line private data go into the owned `data` slots on
/// [`Device`] and [`DeviceLine`], released through the destroy hooks at the
/// documented lifecycle points.
pub trait MixerBackend {
    /// Short backend name, also the fallback device name.
    fn name(&self) -> &str;

    /// Human readable backend description.
    fn description(&self) -> &str;

    /// Whether this backend can change the system default sound device.
    fn can_set_default_device(&self) -> bool {
        false
    }

    /// Optional plugin-wide setup. A failure excludes the plugin from the
    /// registry without failing registry construction.
    fn init(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Optional plugin-wide teardown.
    fn uninit(&mut self) {}

    /// `Some(true)` iff the system default device changed since the last
    /// call; `None` when the backend cannot tell.
    fn is_default_device_changed(&mut self) -> Option<bool> {
        None
    }

    /// `Some(true)` iff the set of devices changed since the last call;
    /// `None` when the backend cannot tell.
    fn is_device_list_changed(&mut self) -> Option<bool> {
        None
    }

    /// Enumerate currently present devices.
    fn list_devices(&mut self) -> Result<Vec<DeviceSpec>, BackendError>;

    /// Populate the device's lines. Called when the device is selected;
    /// one `add_line` per physical mixer channel the backend exposes.
    fn device_init(&mut self, dev: &mut Device) -> Result<(), BackendError>;

    /// Optional, called when the device is deselected.
    fn device_uninit(&mut self, _dev: &mut Device) {}

    /// Optional, releases backend-private device data set during
    /// `list_devices`. Called when the device list is cleared.
    fn device_destroy(&mut self, _dev: &mut Device) {}

    /// `Some(true)` iff this is the system default device; `None` when the
    /// backend cannot tell.
    fn device_is_default(&mut self, _dev: &Device) -> Option<bool> {
        None
    }

    /// Optional, make this device the system default. The default no-op
    /// succeeds so that callers need not branch on capability here; gate
    /// user-facing controls on [`MixerBackend::can_set_default_device`].
    fn device_set_default(&mut self, _dev: &Device) -> Result<(), BackendError> {
        Ok(())
    }

    /// Optional, releases backend-private line data set during
    /// `device_init`. Called for each line when the device is uninitialized.
    fn line_destroy(&mut self, _dev: &Device, _line: &mut DeviceLine) {}

    /// Transfer one line's state from the mixer into `state`. `state`
    /// arrives zeroed except for the line's current enabled flag, for
    /// backends that cannot report mute on their own.
    fn line_read(
        &mut self,
        dev: &Device,
        line_index: usize,
        state: &mut LineState,
    ) -> Result<(), BackendError>;

    /// Transfer `state` to the mixer for one line.
    fn line_write(
        &mut self,
        dev: &Device,
        line_index: usize,
        state: &LineState,
    ) -> Result<(), BackendError>;
}
