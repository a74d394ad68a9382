use std::time::Duration;

use tracing::warn;

use crate::channel::Channel;
use crate::device::{Device, DeviceList};
use crate::error::MixerError;
use crate::line::LineUpdate;
use crate::registry::BackendRegistry;
use crate::volume;

/// Base poll tick for the driving loop.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(100);
/// Idle cadence: full checks run every `UPDATE_INTERVAL * UPDATE_SKIP_MAX_COUNT`.
const UPDATE_SKIP_MAX_COUNT: usize = 10;
/// After a change, check every tick for `UPDATE_INTERVAL * UPDATE_FORCE_MAX_COUNT`.
const UPDATE_FORCE_MAX_COUNT: usize = 50;

/// Poll-rate backoff: slow cadence while nothing changes, full rate for a
/// bounded window after any observed change. The engine owns no timers;
/// call [`UpdateScaler::due`] once per base tick.
#[derive(Default)]
pub struct UpdateScaler {
    skip_counter: usize,
    force_counter: usize,
}

impl UpdateScaler {
    pub fn new() -> UpdateScaler {
        UpdateScaler::default()
    }

    /// Advance one base tick; true when a full check should run now.
    pub fn due(&mut self) -> bool {
        self.skip_counter += 1;
        if self.skip_counter < UPDATE_SKIP_MAX_COUNT {
            return false;
        }
        self.skip_counter = 0;
        true
    }

    /// Report how many changes the last full check observed.
    pub fn observe(&mut self, changes: usize) {
        if changes != 0 {
            self.force_counter = UPDATE_FORCE_MAX_COUNT;
        }
        if self.force_counter != 0 {
            self.force_counter -= 1;
            // Make the next tick due immediately.
            self.skip_counter = UPDATE_SKIP_MAX_COUNT;
        }
    }
}

/// What a poll tick found, for the presentation layer to act on.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollSummary {
    /// Tick was skipped by the update-rate scaler.
    pub skipped: bool,
    /// The device set changed and the list was regenerated.
    pub device_list_changed: bool,
    /// The system default device changed (list itself unchanged).
    pub default_device_changed: bool,
    /// Lines of the current device with pending redraws, now cleared.
    pub lines_updated: usize,
}

impl PollSummary {
    pub fn anything_changed(&self) -> bool {
        self.device_list_changed || self.default_device_changed || self.lines_updated != 0
    }
}

/// Presentation-facing mixer surface.
///
/// Owns the registry, the current device list and the selection, and
/// funnels every edit through the reconciliation write path. All calls
/// happen on one control thread; nothing here locks.
pub struct MixerSession {
    registry: BackendRegistry,
    devices: DeviceList,
    current: Option<usize>,
    /// Per-line linked-channels toggle for the current device.
    locked: Vec<bool>,
    /// A list refresh was needed but re-discovery failed; retry on the
    /// next full check even though the edge-triggered hook already fired.
    refresh_pending: bool,
    scaler: UpdateScaler,
}

impl MixerSession {
    /// Discover devices and select the default one (or the first, when no
    /// backend reports a default). Fails when no plugin yields a device
    /// list; the caller turns that into the process exit code.
    pub fn new(mut registry: BackendRegistry) -> Result<MixerSession, MixerError> {
        let devices = registry.list_devices()?;
        let mut session = MixerSession {
            registry,
            devices,
            current: None,
            locked: Vec::new(),
            refresh_pending: false,
            scaler: UpdateScaler::new(),
        };
        let initial = session
            .registry
            .default_device(&session.devices)
            .or(if session.devices.is_empty() { None } else { Some(0) });
        session.select_device(initial)?;
        Ok(session)
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current.and_then(|i| self.devices.get(i))
    }

    /// Select a device by list index (or deselect with `None`): the old
    /// selection's lines are released, the new device's lines are created
    /// and read.
    pub fn select_device(&mut self, index: Option<usize>) -> Result<(), MixerError> {
        if let Some(cur) = self.current.take() {
            if let Some(dev) = self.devices.devices.get_mut(cur) {
                self.registry.device_uninit(dev);
            }
        }
        self.locked.clear();
        let Some(index) = index else {
            return Ok(());
        };
        let dev = self
            .devices
            .devices
            .get_mut(index)
            .ok_or(MixerError::InvalidArgument("device index out of range"))?;
        self.registry.device_init(dev)?;
        // Start a line locked when all its channels sit at one level.
        self.locked = dev
            .lines()
            .iter()
            .map(|l| {
                let mut vols = l.channels.iter().map(|ch| l.state.volume(ch));
                match vols.next() {
                    Some(first) => vols.all(|v| v == first),
                    None => true,
                }
            })
            .collect();
        // The caller sees the freshly read state directly; pending-redraw
        // markers from the initial read would only produce a phantom
        // change on the first poll.
        dev.clear_updated();
        self.current = Some(index);
        Ok(())
    }

    /// One poll tick. Respects the update-rate scaler, refreshes the
    /// device list when a backend reports it changed (re-anchoring the
    /// selection by value identity), and pulls the current device's lines.
    pub fn poll(&mut self) -> Result<PollSummary, MixerError> {
        let mut summary = PollSummary::default();
        if !self.scaler.due() {
            summary.skipped = true;
            return Ok(summary);
        }

        let mut changes = 0;
        if self.registry.is_device_list_changed() || self.refresh_pending {
            changes += 1;
            summary.device_list_changed = self.refresh_devices()?;
            self.refresh_pending = !summary.device_list_changed;
        } else if self.registry.is_default_device_changed() {
            changes += 1;
            summary.default_device_changed = true;
        }

        if let Some(i) = self.current {
            let dev = self.devices.devices.get_mut(i).expect("selection in range");
            self.registry.read_device(dev, true)?;
            if dev.is_updated() {
                summary.lines_updated = dev.clear_updated();
                changes += summary.lines_updated;
            }
        }

        self.scaler.observe(changes);
        Ok(summary)
    }

    /// Regenerate the device list and restore the selection: the same
    /// device by value identity when still present, else the default.
    ///
    /// Returns whether the list was actually regenerated: on discovery
    /// failure the old list stays in place and `Ok(false)` tells the
    /// caller to retry later.
    pub fn refresh_devices(&mut self) -> Result<bool, MixerError> {
        let new_list = match self.registry.list_devices() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "device re-discovery failed, keeping old list");
                return Ok(false);
            }
        };
        let anchor = self.current_device().map(|d| {
            (
                d.plugin_id(),
                d.name().to_string(),
                d.description().to_string(),
            )
        });
        let next = anchor
            .and_then(|(plugin, name, descr)| new_list.find(plugin, &name, &descr))
            .or_else(|| {
                let mut registry_default = self.registry.default_device(&new_list);
                if registry_default.is_none() && !new_list.is_empty() {
                    registry_default = Some(0);
                }
                registry_default
            });

        let mut old = std::mem::replace(&mut self.devices, new_list);
        self.current = None;
        self.locked.clear();
        self.registry.clear_devices(&mut old);
        self.select_device(next)?;
        Ok(true)
    }

    fn current_mut(&mut self) -> Result<&mut Device, MixerError> {
        let index = self.current.ok_or(MixerError::NoDevice)?;
        self.devices
            .devices
            .get_mut(index)
            .ok_or(MixerError::NoDevice)
    }

    /// Toggle a line's enabled (mute/record-arm) flag and push it out.
    pub fn set_line_enabled(&mut self, line_index: usize, enabled: bool) -> Result<(), MixerError> {
        let dev = {
            let index = self.current.ok_or(MixerError::NoDevice)?;
            self.devices
                .devices
                .get_mut(index)
                .ok_or(MixerError::NoDevice)?
        };
        let line = dev
            .lines_mut()
            .get_mut(line_index)
            .ok_or(MixerError::InvalidArgument("line index out of range"))?;
        line.state.enabled = enabled;
        line.set_updated(LineUpdate::User);
        line.request_write();
        self.registry.write_device(dev, false)
    }

    /// Set one channel's volume on a line. When the line's channels are
    /// locked the value is applied to every channel first and a single
    /// write is issued, so no intermediate state reaches the backend.
    pub fn set_channel_volume(
        &mut self,
        line_index: usize,
        channel: Channel,
        vol: i32,
    ) -> Result<(), MixerError> {
        let locked = self.locked.get(line_index).copied().unwrap_or(false);
        let dev = {
            let index = self.current.ok_or(MixerError::NoDevice)?;
            self.devices
                .devices
                .get_mut(index)
                .ok_or(MixerError::NoDevice)?
        };
        let line = dev
            .lines_mut()
            .get_mut(line_index)
            .ok_or(MixerError::InvalidArgument("line index out of range"))?;
        if !line.channels.contains(channel) {
            return Err(MixerError::InvalidArgument("channel not on this line"));
        }
        if locked {
            line.set_global_volume(vol);
        } else {
            line.state.volumes[channel.index()] = volume::clamp(vol);
        }
        line.set_updated(LineUpdate::User);
        line.request_write();
        self.registry.write_device(dev, false)
    }

    /// Set every channel of a line to one clamped level.
    pub fn set_global_volume(&mut self, line_index: usize, vol: i32) -> Result<(), MixerError> {
        self.edit_line(line_index, |line| line.set_global_volume(vol))
    }

    /// Offset every channel of a line, for scroll-wheel steps.
    pub fn add_global_volume(&mut self, line_index: usize, delta: i32) -> Result<(), MixerError> {
        self.edit_line(line_index, |line| line.add_global_volume(delta))
    }

    fn edit_line(
        &mut self,
        line_index: usize,
        apply: impl FnOnce(&mut crate::line::DeviceLine),
    ) -> Result<(), MixerError> {
        let dev = {
            let index = self.current.ok_or(MixerError::NoDevice)?;
            self.devices
                .devices
                .get_mut(index)
                .ok_or(MixerError::NoDevice)?
        };
        let line = dev
            .lines_mut()
            .get_mut(line_index)
            .ok_or(MixerError::InvalidArgument("line index out of range"))?;
        apply(line);
        line.set_updated(LineUpdate::User);
        line.request_write();
        self.registry.write_device(dev, false)
    }

    pub fn line_locked(&self, line_index: usize) -> bool {
        self.locked.get(line_index).copied().unwrap_or(false)
    }

    /// Toggle linked-channels mode for a line. Locking levels all channels
    /// to the first channel's volume, like dragging the faders together.
    pub fn set_line_locked(&mut self, line_index: usize, locked: bool) -> Result<(), MixerError> {
        if line_index >= self.locked.len() {
            return Err(MixerError::InvalidArgument("line index out of range"));
        }
        self.locked[line_index] = locked;
        if !locked {
            return Ok(());
        }
        let level = {
            let dev = self.current_mut()?;
            let line = dev
                .lines()
                .get(line_index)
                .ok_or(MixerError::InvalidArgument("line index out of range"))?;
            line.channels.first_set().map(|ch| line.state.volume(ch))
        };
        match level {
            Some(level) => self.set_global_volume(line_index, level),
            None => Ok(()),
        }
    }

    /// Flag every line of the current device for a read on the next
    /// non-forced reconciliation pass.
    pub fn request_update_all(&mut self) -> Result<(), MixerError> {
        let dev = self.current_mut()?;
        for line in dev.lines_mut() {
            line.request_read();
        }
        Ok(())
    }

    /// Make a device the system default. `Unsupported` when the owning
    /// backend cannot set defaults, so controls can be hidden up front via
    /// [`crate::plugin::Plugin::can_set_default_device`].
    pub fn set_default_device(&mut self, index: usize) -> Result<(), MixerError> {
        let dev = self
            .devices
            .devices
            .get(index)
            .ok_or(MixerError::InvalidArgument("device index out of range"))?;
        let plugin = self
            .registry
            .plugin(dev.plugin_id())
            .ok_or(MixerError::InvalidArgument("stale plugin id"))?;
        if !plugin.can_set_default_device() {
            return Err(MixerError::Unsupported);
        }
        let dev = self.devices.devices.get(index).expect("checked above");
        self.registry.device_set_default(dev)
    }

    /// Release the device list and shut every plugin down.
    pub fn shutdown(mut self) {
        let _ = self.select_device(None);
        let mut list = std::mem::take(&mut self.devices);
        self.registry.clear_devices(&mut list);
        // Registry drop runs the plugin uninit hooks.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_runs_every_tenth_tick_when_idle() {
        let mut scaler = UpdateScaler::new();
        let mut due = 0;
        for _ in 0..100 {
            if scaler.due() {
                due += 1;
                scaler.observe(0);
            }
        }
        assert_eq!(due, 10);
    }

    #[test]
    fn scaler_switches_to_full_rate_after_change() {
        let mut scaler = UpdateScaler::new();
        // Reach the first due tick, then report a change.
        while !scaler.due() {}
        scaler.observe(1);
        // Fast window: every tick is due.
        for _ in 0..UPDATE_FORCE_MAX_COUNT - 1 {
            assert!(scaler.due());
            scaler.observe(0);
        }
        // Window exhausted, back to the slow cadence.
        assert!(!scaler.due());
    }
}
