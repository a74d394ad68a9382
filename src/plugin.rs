use crate::backend::MixerBackend;

/// Stable handle for an initialized plugin within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId(pub(crate) usize);

/// An initialized backend held by the registry.
///
/// Exactly one `Plugin` exists per active backend for the registry's
/// lifetime; devices reference their owner through [`PluginId`].
pub struct Plugin {
    id: PluginId,
    backend: Box<dyn MixerBackend>,
}

impl Plugin {
    pub(crate) fn new(id: PluginId, backend: Box<dyn MixerBackend>) -> Plugin {
        Plugin { id, backend }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn description(&self) -> &str {
        self.backend.description()
    }

    pub fn can_set_default_device(&self) -> bool {
        self.backend.can_set_default_device()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn MixerBackend {
        self.backend.as_mut()
    }
}
