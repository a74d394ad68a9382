use tracing::{debug, warn};

use crate::backend::MixerBackend;
use crate::device::{Device, DeviceList};
use crate::error::MixerError;
use crate::plugin::{Plugin, PluginId};
use crate::reconcile;

/// Owns every successfully initialized backend plugin and aggregates
/// discovery and change detection across them.
///
/// Construction is infallible: a backend whose `init` hook fails is logged
/// and excluded, and only the surviving plugins count for all later
/// fan-out calls. Plugin `uninit` hooks run when the registry is dropped.
pub struct BackendRegistry {
    plugins: Vec<Plugin>,
}

impl BackendRegistry {
    /// Initialize every supplied backend and keep the ones that succeed.
    ///
    /// After a successful init the plugin's change hooks are invoked once
    /// to prime their baselines, so the first subsequent change query does
    /// not report state that was already visible here.
    pub fn init(backends: Vec<Box<dyn MixerBackend>>) -> BackendRegistry {
        let mut plugins = Vec::new();
        for mut backend in backends {
            if let Err(e) = backend.init() {
                warn!(plugin = backend.name(), error = %e, "plugin init failed, excluded");
                continue;
            }
            let _ = backend.is_default_device_changed();
            let _ = backend.is_device_list_changed();
            let id = PluginId(plugins.len());
            debug!(plugin = backend.name(), "plugin initialized");
            plugins.push(Plugin::new(id, backend));
        }
        BackendRegistry { plugins }
    }

    pub fn plugins_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn plugin(&self, id: PluginId) -> Option<&Plugin> {
        self.plugins.get(id.0)
    }

    fn backend_for(&mut self, dev: &Device) -> &mut dyn MixerBackend {
        // A Device can only be produced by this registry's own discovery,
        // so the id is always in range.
        self.plugins[dev.plugin_id().0].backend_mut()
    }

    /// Discover devices across all plugins into one flat list.
    ///
    /// All-or-nothing: if any plugin's discovery fails, the partial list is
    /// released (running destroy hooks) and the error is surfaced.
    pub fn list_devices(&mut self) -> Result<DeviceList, MixerError> {
        if self.plugins.is_empty() {
            return Err(MixerError::NoDevice);
        }
        let mut list = DeviceList::new();
        for i in 0..self.plugins.len() {
            let plugin = &mut self.plugins[i];
            let id = plugin.id();
            let name = plugin.name().to_string();
            let specs = match plugin.backend_mut().list_devices() {
                Ok(specs) => specs,
                Err(e) => {
                    self.clear_devices(&mut list);
                    return Err(e.into());
                }
            };
            for spec in specs {
                let dev = Device::from_spec(id, &name, spec);
                if let Err(e) = list.push(dev) {
                    self.clear_devices(&mut list);
                    return Err(e);
                }
            }
        }
        Ok(list)
    }

    /// Release every device in the list: uninitialize lines, run the
    /// optional destroy hooks, drop private data.
    pub fn clear_devices(&mut self, list: &mut DeviceList) {
        for mut dev in list.devices.drain(..) {
            Self::uninit_device(self.plugins[dev.plugin_id().0].backend_mut(), &mut dev);
            self.plugins[dev.plugin_id().0]
                .backend_mut()
                .device_destroy(&mut dev);
            drop(dev.take_data());
        }
    }

    /// OR across all plugins' device-list change hooks. Plugins without
    /// the hook report no change through this path.
    pub fn is_device_list_changed(&mut self) -> bool {
        self.plugins
            .iter_mut()
            .any(|p| p.backend_mut().is_device_list_changed() == Some(true))
    }

    /// OR across all plugins' default-device change hooks.
    pub fn is_default_device_changed(&mut self) -> bool {
        self.plugins
            .iter_mut()
            .any(|p| p.backend_mut().is_default_device_changed() == Some(true))
    }

    /// Populate the device's lines and pull their initial state with a
    /// forced read. Called on device selection.
    ///
    /// On failure the device is left without lines, so the caller can
    /// retry the whole initialization on its next tick.
    pub fn device_init(&mut self, dev: &mut Device) -> Result<(), MixerError> {
        let result = self
            .backend_for(dev)
            .device_init(dev)
            .map_err(MixerError::from)
            .and_then(|_| self.read_device(dev, true));
        if result.is_err() {
            Self::uninit_device(self.backend_for(dev), dev);
        }
        result
    }

    /// Release the device's lines. Called on deselection.
    pub fn device_uninit(&mut self, dev: &mut Device) {
        Self::uninit_device(self.backend_for(dev), dev);
    }

    fn uninit_device(backend: &mut dyn MixerBackend, dev: &mut Device) {
        backend.device_uninit(dev);
        let mut lines = std::mem::take(&mut dev.lines);
        for line in &mut lines {
            backend.line_destroy(dev, line);
            drop(line.take_data());
        }
    }

    /// Whether the device is the system default. `false` when the backend
    /// cannot tell.
    pub fn device_is_default(&mut self, dev: &Device) -> bool {
        self.backend_for(dev).device_is_default(dev) == Some(true)
    }

    /// Make the device the system default. A no-op success for backends
    /// without the capability.
    pub fn device_set_default(&mut self, dev: &Device) -> Result<(), MixerError> {
        self.backend_for(dev)
            .device_set_default(dev)
            .map_err(MixerError::from)
    }

    /// First device in the list the owning backend reports as default.
    pub fn default_device(&mut self, list: &DeviceList) -> Option<usize> {
        (0..list.len()).find(|i| {
            let dev = list.get(*i).expect("index in range");
            self.device_is_default(dev)
        })
    }

    /// Run the reconciliation read path for the device. With `force` every
    /// line is read, otherwise only lines with a pending read request.
    pub fn read_device(&mut self, dev: &mut Device, force: bool) -> Result<(), MixerError> {
        let backend = self.plugins[dev.plugin_id().0].backend_mut();
        reconcile::read_pass(backend, dev, force).map_err(MixerError::from)
    }

    /// Run the reconciliation write path for the device. With `force`
    /// every writable line is written, otherwise only flagged ones.
    pub fn write_device(&mut self, dev: &mut Device, force: bool) -> Result<(), MixerError> {
        let backend = self.plugins[dev.plugin_id().0].backend_mut();
        reconcile::write_pass(backend, dev, force).map_err(MixerError::from)
    }
}

impl Drop for BackendRegistry {
    fn drop(&mut self) {
        for plugin in &mut self.plugins {
            plugin.backend_mut().uninit();
        }
    }
}
