//! Cross-backend sound mixer abstraction.
//!
//! A [`registry::BackendRegistry`] owns one plugin per mixer backend (OSS,
//! ALSA, simulated...) behind the [`backend::MixerBackend`] capability
//! trait, aggregates device discovery into one [`device::DeviceList`], and
//! reconciles per-line state in both directions: a diff-based read path
//! pulls external changes (volume moved by another application, hot-plug,
//! default-device switch) and a write path pushes presentation edits out.
//! [`session::MixerSession`] wraps it all behind a polling-friendly
//! surface for a GUI or CLI front end.
//!
//! Everything runs on one control thread; no call blocks past the poll
//! tick budget and no internal locking exists.

pub mod backend;
pub mod channel;
pub mod device;
pub mod error;
pub mod line;
pub mod mock;
pub mod plugin;
mod reconcile;
pub mod registry;
pub mod session;
pub mod volume;

pub use backend::{BackendError, MixerBackend};
pub use channel::{Channel, ChannelMask, CHANNEL_COUNT};
pub use device::{Device, DeviceList, DeviceSpec};
pub use error::MixerError;
pub use line::{DeviceLine, LineState, LineUpdate};
pub use plugin::{Plugin, PluginId};
pub use registry::BackendRegistry;
pub use session::{MixerSession, PollSummary, UpdateScaler, UPDATE_INTERVAL};
pub use volume::VolumeLevel;
