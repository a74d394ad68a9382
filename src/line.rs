use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelMask, CHANNEL_COUNT};
use crate::volume;

/// Per-line mixer state as transferred to and from a backend.
///
/// A volume slot is meaningful only where the owning line's channel mask has
/// the corresponding bit set; unused slots stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineState {
    pub volumes: [i32; CHANNEL_COUNT],
    /// Line is audible / record-armed. Exact semantics are backend-dependent.
    pub enabled: bool,
}

impl Default for LineState {
    fn default() -> Self {
        LineState::muted()
    }
}

impl LineState {
    /// All channels at zero, disabled.
    pub fn muted() -> LineState {
        LineState {
            volumes: [0; CHANNEL_COUNT],
            enabled: false,
        }
    }

    /// Clamp every supported channel's volume into 0..=100.
    pub fn normalize(&mut self, channels: ChannelMask) {
        for ch in channels.iter() {
            self.volumes[ch.index()] = volume::clamp(self.volumes[ch.index()]);
        }
    }

    pub fn volume(&self, channel: Channel) -> i32 {
        self.volumes[channel.index()]
    }

    pub(crate) fn volumes_all_zero(&self) -> bool {
        self.volumes.iter().all(|v| *v == 0)
    }
}

/// Who last changed a line's stored state, deciding how the presentation
/// layer should treat the pending redraw.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    /// State matches what was last shown.
    #[default]
    None,
    /// Diff came in through a backend read.
    Backend,
    /// Diff was applied locally by the user and is on its way out.
    User,
}

/// One controllable line (PCM, Mic, Master...) on a mixer device.
///
/// Capability flags and the channel mask are populated by the owning
/// backend during device initialization; the change-tracking fields belong
/// to the reconciliation engine and the presentation layer.
pub struct DeviceLine {
    display_name: String,
    /// Capture line, as opposed to playback.
    pub is_capture: bool,
    /// Values may be displayed but never written.
    pub is_read_only: bool,
    /// Backend can mute/arm the line independently of its volumes.
    pub has_enable: bool,
    pub channels: ChannelMask,
    /// Current and last-known state.
    pub state: LineState,
    data: Option<Box<dyn Any>>,
    updated: LineUpdate,
    read_required: bool,
    write_required: bool,
}

impl DeviceLine {
    pub(crate) fn new(display_name: &str) -> DeviceLine {
        DeviceLine {
            // A line's display name never carries trailing whitespace,
            // whatever the backend supplied.
            display_name: display_name.trim_end().to_string(),
            is_capture: false,
            is_read_only: false,
            has_enable: false,
            channels: ChannelMask::EMPTY,
            state: LineState::muted(),
            data: None,
            updated: LineUpdate::None,
            read_required: false,
            write_required: false,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn channel_count(&self) -> usize {
        self.channels.count()
    }

    /// Attach backend-private data. Freed through the backend's
    /// `line_destroy` hook when the owning device is uninitialized.
    pub fn set_data(&mut self, data: Box<dyn Any>) {
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&dyn Any> {
        self.data.as_deref()
    }

    pub fn data_mut(&mut self) -> Option<&mut dyn Any> {
        self.data.as_deref_mut()
    }

    pub fn take_data(&mut self) -> Option<Box<dyn Any>> {
        self.data.take()
    }

    /// Pending-redraw marker, and who caused it.
    pub fn updated(&self) -> LineUpdate {
        self.updated
    }

    pub(crate) fn set_updated(&mut self, updated: LineUpdate) {
        self.updated = updated;
    }

    pub(crate) fn clear_updated(&mut self) -> bool {
        let was = self.updated != LineUpdate::None;
        self.updated = LineUpdate::None;
        was
    }

    pub fn read_required(&self) -> bool {
        self.read_required
    }

    pub fn write_required(&self) -> bool {
        self.write_required
    }

    /// Ask the next reconciliation pass to read this line from the backend
    /// even without a global force.
    pub fn request_read(&mut self) {
        self.read_required = true;
    }

    /// Ask the next reconciliation pass to push this line to the backend.
    pub fn request_write(&mut self) {
        self.write_required = true;
    }

    pub(crate) fn clear_read_required(&mut self) {
        self.read_required = false;
    }

    pub(crate) fn clear_write_required(&mut self) {
        self.write_required = false;
    }

    /// Effective level of the line: maximum over supported channel volumes,
    /// zero when no channels are set.
    pub fn max_volume(&self) -> i32 {
        self.channels
            .iter()
            .map(|ch| self.state.volume(ch))
            .max()
            .unwrap_or(0)
    }

    /// Set every supported channel to the same clamped volume. Linked
    /// (locked) channel semantics.
    pub fn set_global_volume(&mut self, vol: i32) {
        let vol = volume::clamp(vol);
        for ch in self.channels.iter() {
            self.state.volumes[ch.index()] = vol;
        }
    }

    /// Offset every supported channel, clamping each result. Used for
    /// scroll-wheel increment/decrement.
    pub fn add_global_volume(&mut self, delta: i32) {
        for ch in self.channels.iter() {
            let slot = &mut self.state.volumes[ch.index()];
            *slot = volume::clamp(slot.saturating_add(delta));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_trimmed() {
        let line = DeviceLine::new("Master   ");
        assert_eq!(line.display_name(), "Master");
        let line = DeviceLine::new("Mic\t ");
        assert_eq!(line.display_name(), "Mic");
    }

    #[test]
    fn max_volume_over_set_channels_only() {
        let mut line = DeviceLine::new("pcm");
        line.channels = ChannelMask::stereo();
        line.state.volumes[Channel::FrontLeft.index()] = 30;
        line.state.volumes[Channel::FrontRight.index()] = 55;
        // Not part of the mask, must be ignored.
        line.state.volumes[Channel::Lfe.index()] = 99;
        assert_eq!(line.max_volume(), 55);

        line.channels = ChannelMask::EMPTY;
        assert_eq!(line.max_volume(), 0);
    }

    #[test]
    fn global_volume_set_and_add_clamp() {
        let mut line = DeviceLine::new("pcm");
        line.channels = ChannelMask::stereo();
        line.set_global_volume(150);
        assert_eq!(line.state.volume(Channel::FrontLeft), 100);
        assert_eq!(line.state.volume(Channel::FrontRight), 100);

        line.add_global_volume(-30);
        assert_eq!(line.state.volume(Channel::FrontLeft), 70);

        line.add_global_volume(-200);
        assert_eq!(line.state.volume(Channel::FrontRight), 0);
        // Untouched outside the mask.
        assert_eq!(line.state.volume(Channel::Lfe), 0);
    }

    #[test]
    fn global_add_survives_extreme_deltas() {
        let mut line = DeviceLine::new("pcm");
        line.channels = ChannelMask::stereo();
        line.set_global_volume(100);
        line.add_global_volume(i32::MAX);
        assert_eq!(line.state.volume(Channel::FrontLeft), 100);

        line.add_global_volume(i32::MIN);
        assert_eq!(line.state.volume(Channel::FrontLeft), 0);
    }

    #[test]
    fn normalize_only_touches_masked_slots() {
        let mut state = LineState::muted();
        state.volumes[0] = 150;
        state.volumes[3] = -20;
        state.normalize(ChannelMask::of(&[Channel::FrontLeft]));
        assert_eq!(state.volumes[0], 100);
        assert_eq!(state.volumes[3], -20);
    }
}
