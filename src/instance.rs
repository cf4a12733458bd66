//! The top-level handle an application holds: a plugin registry plus the
//! last-error string buffer, mirroring the source implementation's
//! per-instance diagnostic buffer (supplemented from the original
//! implementation — the distilled spec is otherwise silent on it).

use std::cell::RefCell;

use crate::plugin::PluginRegistry;

#[derive(Default)]
pub struct Instance {
    plugins: PluginRegistry,
    last_error: RefCell<Option<String>>,
}

impl Instance {
    pub fn new() -> Self {
        Instance::default()
    }

    pub fn register_plugin(&mut self, name: impl Into<String>, plugin: Box<dyn crate::plugin::Plugin>) {
        self.plugins.register(name, plugin);
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.borrow_mut() = Some(message.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn clear_last_error(&self) {
        *self.last_error.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_round_trips() {
        let instance = Instance::new();
        assert_eq!(instance.last_error(), None);
        instance.set_last_error("boom");
        assert_eq!(instance.last_error(), Some("boom".to_string()));
        instance.clear_last_error();
        assert_eq!(instance.last_error(), None);
    }
}
