use std::any::Any;

use crate::error::MixerError;
use crate::line::DeviceLine;
use crate::plugin::PluginId;

/// Discovery output of a backend's `list_devices`.
///
/// `name` and `description` may be absent; the registry substitutes the
/// plugin name and an empty string when building the [`Device`].
#[derive(Default)]
pub struct DeviceSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Backend-private per-device data, released through the backend's
    /// `device_destroy` hook when the device list is cleared.
    pub data: Option<Box<dyn Any>>,
}

impl DeviceSpec {
    pub fn named(name: impl Into<String>, description: impl Into<String>) -> DeviceSpec {
        DeviceSpec {
            name: Some(name.into()),
            description: Some(description.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Box<dyn Any>) -> DeviceSpec {
        self.data = Some(data);
        self
    }
}

/// One mixer-capable endpoint (sound card or virtual mixer) exposed by a
/// backend plugin.
///
/// Lines are populated lazily when the device is selected (`device_init`)
/// and released on deselection; the device itself lives for as long as the
/// device list that discovered it.
pub struct Device {
    name: String,
    description: String,
    plugin: PluginId,
    data: Option<Box<dyn Any>>,
    pub(crate) lines: Vec<DeviceLine>,
}

impl Device {
    pub(crate) fn from_spec(plugin: PluginId, plugin_name: &str, spec: DeviceSpec) -> Device {
        let name = match spec.name {
            Some(n) if !n.is_empty() => n,
            _ => plugin_name.to_string(),
        };
        Device {
            name,
            description: spec.description.unwrap_or_default(),
            plugin,
            data: spec.data,
            lines: Vec::new(),
        }
    }

    /// Backend-assigned symbolic name, unique within the plugin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verbose human readable name. May be empty.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn plugin_id(&self) -> PluginId {
        self.plugin
    }

    pub fn data(&self) -> Option<&dyn Any> {
        self.data.as_deref()
    }

    pub fn data_mut(&mut self) -> Option<&mut dyn Any> {
        self.data.as_deref_mut()
    }

    pub fn set_data(&mut self, data: Box<dyn Any>) {
        self.data = Some(data);
    }

    pub(crate) fn take_data(&mut self) -> Option<Box<dyn Any>> {
        self.data.take()
    }

    /// Append a new line, trimming trailing whitespace from the display
    /// name, and return it for the backend to fill in capabilities.
    pub fn add_line(&mut self, display_name: &str) -> Result<&mut DeviceLine, MixerError> {
        self.lines
            .try_reserve(1)
            .map_err(|_| MixerError::OutOfMemory)?;
        self.lines.push(DeviceLine::new(display_name));
        Ok(self.lines.last_mut().expect("just pushed"))
    }

    pub fn lines(&self) -> &[DeviceLine] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [DeviceLine] {
        &mut self.lines
    }

    pub fn line(&self, index: usize) -> Option<&DeviceLine> {
        self.lines.get(index)
    }

    /// True if at least one line has a pending redraw.
    pub fn is_updated(&self) -> bool {
        self.lines.iter().any(|l| l.updated() != crate::line::LineUpdate::None)
    }

    /// Clear all pending-redraw markers, returning how many were set.
    pub fn clear_updated(&mut self) -> usize {
        self.lines
            .iter_mut()
            .map(|l| l.clear_updated())
            .filter(|was| *was)
            .count()
    }

    /// Value identity: same owning plugin, name and description. Backend
    /// private data does not participate, so a device survives list
    /// regeneration under this comparison.
    pub fn is_same(&self, other: &Device) -> bool {
        self.matches(other.plugin, &other.name, &other.description)
    }

    pub(crate) fn matches(&self, plugin: PluginId, name: &str, description: &str) -> bool {
        self.plugin == plugin && self.name == name && self.description == description
    }
}

/// Flat collection of all discovered devices across every plugin.
///
/// Devices are appended in discovery order. Entries are not stable across
/// regeneration; use [`DeviceList::find_same`] to re-anchor a selection.
#[derive(Default)]
pub struct DeviceList {
    pub(crate) devices: Vec<Device>,
}

impl DeviceList {
    pub fn new() -> DeviceList {
        DeviceList::default()
    }

    pub(crate) fn push(&mut self, device: Device) -> Result<(), MixerError> {
        self.devices
            .try_reserve(1)
            .map_err(|_| MixerError::OutOfMemory)?;
        self.devices.push(device);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.devices.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Linear search by device value identity.
    pub fn find_same(&self, device: &Device) -> Option<usize> {
        self.devices.iter().position(|d| d.is_same(device))
    }

    pub(crate) fn find(&self, plugin: PluginId, name: &str, description: &str) -> Option<usize> {
        self.devices
            .iter()
            .position(|d| d.matches(plugin, name, description))
    }
}
