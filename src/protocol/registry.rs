use std::collections::BTreeMap;

use super::engine::ProtocolEngine;
use super::lpd::LpdEngine;
use crate::configuration::types::Port;
use crate::error_handling::types::ConfigError;

/// A registered wire protocol: its default port and engine constructor.
#[derive(Clone)]
pub struct ProtocolDescriptor {
    pub name: &'static str,
    pub default_port: fn() -> Port,
    pub construct: fn() -> Box<dyn ProtocolEngine>,
}

impl ProtocolDescriptor {
    pub fn new_engine(&self) -> Box<dyn ProtocolEngine> {
        (self.construct)()
    }
}

impl std::fmt::Debug for ProtocolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolDescriptor")
            .field("name", &self.name)
            .field("default_port", &(self.default_port)())
            .finish()
    }
}

/// Name to protocol lookup supplied to the daemon by its bootstrap code.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    entries: BTreeMap<&'static str, ProtocolDescriptor>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every protocol built into this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ProtocolDescriptor {
            name: "lpd",
            default_port: LpdEngine::default_port,
            construct: LpdEngine::boxed,
        });
        registry
    }

    pub fn register(&mut self, descriptor: ProtocolDescriptor) {
        self.entries.insert(descriptor.name, descriptor);
    }

    pub fn get(&self, name: &str) -> Result<&ProtocolDescriptor, ConfigError> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProtocol(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registers_lpd() {
        let registry = ProtocolRegistry::builtin();
        let lpd = registry.get("lpd").unwrap();
        assert_eq!(lpd.name, "lpd");
        assert_eq!((lpd.default_port)(), Port::Service("printer".to_string()));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["lpd"]);
    }

    #[test]
    fn test_unknown_protocol() {
        let registry = ProtocolRegistry::builtin();
        assert!(matches!(
            registry.get("LPD"),
            Err(ConfigError::UnknownProtocol(name)) if name == "LPD"
        ));
    }
}
