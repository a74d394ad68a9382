use crate::backend::BackendError;

/// Errors surfaced by the mixer core.
///
/// Backend failures during discovery or a read/write pass abort that pass
/// and bubble up unchanged; the polling driver is expected to retry on its
/// next tick. Per-plugin init failure is absorbed by the registry instead
/// and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// Malformed input to a core call (bad index, channel outside a line's
    /// mask, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No active plugins, or the device list is empty.
    #[error("no mixer devices available")]
    NoDevice,

    /// The backend does not implement the requested optional capability.
    #[error("operation not supported by this backend")]
    Unsupported,

    /// Failure originating inside a backend plugin.
    #[error("mixer backend failure: {0}")]
    Backend(#[from] BackendError),

    /// A collection could not grow.
    #[error("out of memory")]
    OutOfMemory,
}

impl MixerError {
    /// errno-style process exit code, used by the CLI for fatal
    /// registry/discovery failures at startup.
    pub fn exit_code(&self) -> i32 {
        match self {
            MixerError::InvalidArgument(_) => 22, // EINVAL
            MixerError::NoDevice => 19,           // ENODEV
            MixerError::Unsupported => 95,        // EOPNOTSUPP
            MixerError::Backend(e) => e.exit_code(),
            MixerError::OutOfMemory => 12, // ENOMEM
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(MixerError::NoDevice.exit_code(), 19);
        assert_eq!(MixerError::OutOfMemory.exit_code(), 12);
        assert_eq!(MixerError::InvalidArgument("x").exit_code(), 22);
        assert_eq!(
            MixerError::Backend(BackendError::other("boom")).exit_code(),
            5
        );
    }

    #[test]
    fn io_errors_keep_their_os_code() {
        let io = std::io::Error::from_raw_os_error(13);
        let err = MixerError::Backend(BackendError::from(io));
        assert_eq!(err.exit_code(), 13);
    }
}
