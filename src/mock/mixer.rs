//! Simulated mixer backend for tests and demos.
//!
//! The backend's "hardware" lives behind a shared [`SimHandle`], so a test
//! or demo driver can change volumes, hot-plug devices or move the system
//! default behind the core's back and watch the reconciliation engine pick
//! it up. Change hooks are edge-triggered like a real backend's and can be
//! disabled to exercise the no-detection path.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::backend::{BackendError, MixerBackend};
use crate::channel::{Channel, ChannelMask, CHANNEL_COUNT};
use crate::device::{Device, DeviceSpec};
use crate::line::{DeviceLine, LineState};

/// One simulated mixer line.
#[derive(Debug, Clone)]
pub struct SimLine {
    pub name: String,
    pub is_capture: bool,
    pub is_read_only: bool,
    pub has_enable: bool,
    pub channels: ChannelMask,
    pub volumes: [i32; CHANNEL_COUNT],
    pub enabled: bool,
}

impl SimLine {
    pub fn stereo(name: &str, volume: i32) -> SimLine {
        let mut line = SimLine {
            name: name.to_string(),
            is_capture: false,
            is_read_only: false,
            has_enable: false,
            channels: ChannelMask::stereo(),
            volumes: [0; CHANNEL_COUNT],
            enabled: true,
        };
        line.set_all(volume);
        line
    }

    pub fn with_enable(mut self) -> SimLine {
        self.has_enable = true;
        self
    }

    pub fn capture(mut self) -> SimLine {
        self.is_capture = true;
        self
    }

    pub fn read_only(mut self) -> SimLine {
        self.is_read_only = true;
        self
    }

    /// Set every supported channel to `volume`.
    pub fn set_all(&mut self, volume: i32) {
        for ch in self.channels.iter() {
            self.volumes[ch.index()] = volume;
        }
    }
}

/// One simulated sound device.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub name: String,
    pub description: String,
    pub lines: Vec<SimLine>,
}

impl SimDevice {
    pub fn new(name: &str, description: &str, lines: Vec<SimLine>) -> SimDevice {
        SimDevice {
            name: name.to_string(),
            description: description.to_string(),
            lines,
        }
    }
}

/// Scriptable backing state shared between the backend and the driver.
#[derive(Default)]
pub struct SimState {
    pub devices: Vec<SimDevice>,
    pub default_index: Option<usize>,
    list_generation: u64,
    default_generation: u64,

    // Failure injection.
    pub fail_init: bool,
    pub fail_list: bool,
    pub fail_read: bool,
    pub fail_write: bool,

    // I/O accounting, for redundant-I/O assertions.
    pub reads: usize,
    pub writes: usize,
    pub destroyed_devices: usize,
    pub destroyed_lines: usize,
    pub uninit_calls: usize,
}

impl SimState {
    /// External volume change, as another application would make it.
    /// Visible to the core only through the next read.
    pub fn set_line_volume(&mut self, device: usize, line: usize, channel: Channel, volume: i32) {
        self.devices[device].lines[line].volumes[channel.index()] = volume;
    }

    pub fn set_line_all(&mut self, device: usize, line: usize, volume: i32) {
        self.devices[device].lines[line].set_all(volume);
    }

    pub fn set_line_enabled(&mut self, device: usize, line: usize, enabled: bool) {
        self.devices[device].lines[line].enabled = enabled;
    }

    /// Hot-plug a device; bumps the list generation the change hook sees.
    pub fn add_device(&mut self, device: SimDevice) {
        self.devices.push(device);
        self.list_generation += 1;
    }

    pub fn remove_device(&mut self, index: usize) {
        self.devices.remove(index);
        self.list_generation += 1;
        match self.default_index {
            Some(d) if d == index => self.default_index = None,
            Some(d) if d > index => self.default_index = Some(d - 1),
            _ => {}
        }
    }

    /// Move the system default device.
    pub fn set_default(&mut self, index: Option<usize>) {
        self.default_index = index;
        self.default_generation += 1;
    }
}

pub type SimHandle = Rc<RefCell<SimState>>;

/// JSON layout accepted by [`SimulatedMixer::from_config`].
#[derive(Deserialize)]
struct Layout {
    devices: Vec<DeviceLayout>,
    #[serde(default)]
    default_device: Option<usize>,
}

#[derive(Deserialize)]
struct DeviceLayout {
    name: String,
    #[serde(default)]
    description: String,
    lines: Vec<LineLayout>,
}

#[derive(Deserialize)]
struct LineLayout {
    name: String,
    #[serde(default)]
    capture: bool,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    has_enable: bool,
    #[serde(default = "default_channel_count")]
    channels: usize,
    #[serde(default = "default_volume")]
    volume: i32,
}

fn default_channel_count() -> usize {
    2
}

fn default_volume() -> i32 {
    75
}

/// Simulated mixer backend.
pub struct SimulatedMixer {
    state: Rc<RefCell<SimState>>,
    change_hooks: bool,
    seen_list_generation: u64,
    seen_default_generation: u64,
}

impl SimulatedMixer {
    pub fn new(devices: Vec<SimDevice>) -> SimulatedMixer {
        let mut state = SimState::default();
        if !devices.is_empty() {
            state.default_index = Some(0);
        }
        state.devices = devices;
        SimulatedMixer {
            state: Rc::new(RefCell::new(state)),
            change_hooks: true,
            seen_list_generation: 0,
            seen_default_generation: 0,
        }
    }

    /// Build the simulated hardware from a JSON layout, e.g.
    ///
    /// ```json
    /// { "devices": [ { "name": "sim0", "description": "Simulated card",
    ///                  "lines": [ { "name": "Master", "has_enable": true } ] } ],
    ///   "default_device": 0 }
    /// ```
    pub fn from_config(config: serde_json::Value) -> Result<SimulatedMixer, BackendError> {
        let layout: Layout = serde_json::from_value(config)
            .map_err(|e| BackendError::other(format!("bad simulated layout: {e}")))?;
        let devices = layout
            .devices
            .into_iter()
            .map(|d| {
                let lines = d
                    .lines
                    .into_iter()
                    .map(|l| {
                        let channels: ChannelMask = Channel::ALL
                            .iter()
                            .take(l.channels.min(CHANNEL_COUNT))
                            .copied()
                            .collect();
                        let mut line = SimLine {
                            name: l.name,
                            is_capture: l.capture,
                            is_read_only: l.read_only,
                            has_enable: l.has_enable,
                            channels,
                            volumes: [0; CHANNEL_COUNT],
                            enabled: true,
                        };
                        line.set_all(l.volume);
                        line
                    })
                    .collect();
                SimDevice::new(&d.name, &d.description, lines)
            })
            .collect();
        let mut mixer = SimulatedMixer::new(devices);
        mixer.state.borrow_mut().default_index = layout.default_device;
        Ok(mixer)
    }

    /// Disable the change hooks, modelling a backend without change
    /// detection.
    pub fn without_change_hooks(mut self) -> SimulatedMixer {
        self.change_hooks = false;
        self
    }

    /// Shared handle for scripting external changes.
    pub fn handle(&self) -> SimHandle {
        Rc::clone(&self.state)
    }

    fn sim_index(dev: &Device) -> Result<usize, BackendError> {
        dev.data()
            .and_then(|d| d.downcast_ref::<usize>())
            .copied()
            .ok_or_else(|| BackendError::other("device without simulated context"))
    }
}

impl MixerBackend for SimulatedMixer {
    fn name(&self) -> &str {
        "sim"
    }

    fn description(&self) -> &str {
        "Simulated mixer backend"
    }

    fn can_set_default_device(&self) -> bool {
        true
    }

    fn init(&mut self) -> Result<(), BackendError> {
        if self.state.borrow().fail_init {
            return Err(BackendError::other("simulated init failure"));
        }
        Ok(())
    }

    fn uninit(&mut self) {
        self.state.borrow_mut().uninit_calls += 1;
    }

    fn is_default_device_changed(&mut self) -> Option<bool> {
        if !self.change_hooks {
            return None;
        }
        let current = self.state.borrow().default_generation;
        let changed = current != self.seen_default_generation;
        self.seen_default_generation = current;
        Some(changed)
    }

    fn is_device_list_changed(&mut self) -> Option<bool> {
        if !self.change_hooks {
            return None;
        }
        let current = self.state.borrow().list_generation;
        let changed = current != self.seen_list_generation;
        self.seen_list_generation = current;
        Some(changed)
    }

    fn list_devices(&mut self) -> Result<Vec<DeviceSpec>, BackendError> {
        let state = self.state.borrow();
        if state.fail_list {
            return Err(BackendError::other("simulated discovery failure"));
        }
        Ok(state
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| {
                DeviceSpec::named(d.name.clone(), d.description.clone())
                    .with_data(Box::new(i) as Box<dyn Any>)
            })
            .collect())
    }

    fn device_init(&mut self, dev: &mut Device) -> Result<(), BackendError> {
        let index = Self::sim_index(dev)?;
        let sim_lines = {
            let state = self.state.borrow();
            let sim = state
                .devices
                .get(index)
                .ok_or_else(|| BackendError::other("simulated device vanished"))?;
            sim.lines.clone()
        };
        for (line_index, sl) in sim_lines.iter().enumerate() {
            let line = dev
                .add_line(&sl.name)
                .map_err(|e| BackendError::other(e.to_string()))?;
            line.is_capture = sl.is_capture;
            line.is_read_only = sl.is_read_only;
            line.has_enable = sl.has_enable;
            line.channels = sl.channels;
            line.set_data(Box::new(line_index));
        }
        Ok(())
    }

    fn device_destroy(&mut self, _dev: &mut Device) {
        self.state.borrow_mut().destroyed_devices += 1;
    }

    fn device_is_default(&mut self, dev: &Device) -> Option<bool> {
        let index = Self::sim_index(dev).ok()?;
        Some(self.state.borrow().default_index == Some(index))
    }

    fn device_set_default(&mut self, dev: &Device) -> Result<(), BackendError> {
        let index = Self::sim_index(dev)?;
        self.state.borrow_mut().set_default(Some(index));
        Ok(())
    }

    fn line_destroy(&mut self, _dev: &Device, _line: &mut DeviceLine) {
        self.state.borrow_mut().destroyed_lines += 1;
    }

    fn line_read(
        &mut self,
        dev: &Device,
        line_index: usize,
        state: &mut LineState,
    ) -> Result<(), BackendError> {
        let index = Self::sim_index(dev)?;
        let mut sim = self.state.borrow_mut();
        sim.reads += 1;
        if sim.fail_read {
            return Err(BackendError::other("simulated read failure"));
        }
        let line = sim
            .devices
            .get(index)
            .and_then(|d| d.lines.get(line_index))
            .ok_or_else(|| BackendError::other("simulated line vanished"))?;
        for ch in line.channels.iter() {
            state.volumes[ch.index()] = line.volumes[ch.index()];
        }
        if line.has_enable {
            // Only a backend with real mute support reports the flag;
            // otherwise the seeded value stays.
            state.enabled = line.enabled;
        }
        Ok(())
    }

    fn line_write(
        &mut self,
        dev: &Device,
        line_index: usize,
        state: &LineState,
    ) -> Result<(), BackendError> {
        let index = Self::sim_index(dev)?;
        let mut sim = self.state.borrow_mut();
        sim.writes += 1;
        if sim.fail_write {
            return Err(BackendError::other("simulated write failure"));
        }
        let line = sim
            .devices
            .get_mut(index)
            .and_then(|d| d.lines.get_mut(line_index))
            .ok_or_else(|| BackendError::other("simulated line vanished"))?;
        for ch in line.channels.iter() {
            line.volumes[ch.index()] = state.volumes[ch.index()];
        }
        if line.has_enable {
            line.enabled = state.enabled;
        }
        Ok(())
    }
}
