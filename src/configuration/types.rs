use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::LevelFilter;

use crate::error_handling::types::ConfigError;
use crate::network::services::lookup_tcp_service;
use crate::protocol::ProtocolDescriptor;
use crate::storage::Storage;

/// A listening port, numeric or a TCP service name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Port {
    Number(u16),
    Service(String),
}

impl Port {
    pub fn resolve(&self) -> Result<u16, ConfigError> {
        match self {
            Port::Number(port) => Ok(*port),
            Port::Service(name) => lookup_tcp_service(name),
        }
    }
}

impl FromStr for Port {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConfigError::BadInterceptor("empty port".to_string()));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(Port::Number)
                .map_err(|_| ConfigError::BadInterceptor(format!("port out of range: {}", s)));
        }
        Ok(Port::Service(s.to_string()))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(port) => write!(f, "{}", port),
            Port::Service(name) => f.write_str(name),
        }
    }
}

/// `type[:port]` interceptor selector given on the command line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InterceptorArgument {
    pub name: String,
    pub port: Option<Port>,
}

impl InterceptorArgument {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let (name, port) = match value.split_once(':') {
            Some((name, port)) => (name, Some(port.parse()?)),
            None => (value, None),
        };
        if name.is_empty() {
            return Err(ConfigError::BadInterceptor(value.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            port,
        })
    }
}

/// Everything one listener needs: its protocol, port and the shared job store.
#[derive(Clone)]
pub struct ListenerConfig {
    pub protocol: ProtocolDescriptor,
    pub port: Port,
    pub storage: Arc<dyn Storage>,
}

impl ListenerConfig {
    /// Falls back to the protocol's default port when `port` is `None`.
    pub fn new(
        protocol: ProtocolDescriptor,
        port: Option<Port>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let port = port.unwrap_or_else(protocol.default_port);
        Self {
            protocol,
            port,
            storage,
        }
    }

    /// Diagnostic name, e.g. `lpd[printer]`.
    pub fn name(&self) -> String {
        format!("{}[{}]", self.protocol.name, self.port)
    }
}

const LOG_LEVELS: [LevelFilter; 4] = [
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
];

/// Maps `-v`/`-q` counts onto a log level, starting from info.
pub fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
    let index = 2 + i32::from(verbose) - i32::from(quiet);
    match usize::try_from(index) {
        Err(_) => LevelFilter::Error,
        Ok(i) if i >= LOG_LEVELS.len() => LevelFilter::Trace,
        Ok(i) => LOG_LEVELS[i],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolRegistry;
    use crate::storage::FileStorage;

    #[test]
    fn test_parse_interceptor_without_port() {
        let arg = InterceptorArgument::parse("lpd").unwrap();
        assert_eq!(arg.name, "lpd");
        assert_eq!(arg.port, None);
    }

    #[test]
    fn test_parse_interceptor_with_ports() {
        assert_eq!(
            InterceptorArgument::parse("lpd:515").unwrap().port,
            Some(Port::Number(515))
        );
        assert_eq!(
            InterceptorArgument::parse("lpd:printer").unwrap().port,
            Some(Port::Service("printer".to_string()))
        );
    }

    #[test]
    fn test_parse_interceptor_rejects_bad_values() {
        assert!(InterceptorArgument::parse(":515").is_err());
        assert!(InterceptorArgument::parse("lpd:").is_err());
        assert!(InterceptorArgument::parse("lpd:70000").is_err());
    }

    #[test]
    fn test_numeric_port_resolves_without_lookup() {
        assert_eq!(Port::Number(1515).resolve().unwrap(), 1515);
    }

    #[test]
    fn test_listener_config_defaults_port() {
        let registry = ProtocolRegistry::builtin();
        let storage = Arc::new(FileStorage::new("/tmp"));
        let lpd = registry.get("lpd").unwrap().clone();

        let default = ListenerConfig::new(lpd.clone(), None, storage.clone());
        assert_eq!(default.port, Port::Service("printer".to_string()));
        assert_eq!(default.name(), "lpd[printer]");

        let custom = ListenerConfig::new(lpd, Some(Port::Number(1515)), storage);
        assert_eq!(custom.name(), "lpd[1515]");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(0, 0), LevelFilter::Info);
        assert_eq!(log_level(1, 0), LevelFilter::Debug);
        assert_eq!(log_level(2, 0), LevelFilter::Trace);
        assert_eq!(log_level(0, 1), LevelFilter::Warn);
        assert_eq!(log_level(0, 2), LevelFilter::Error);
        assert_eq!(log_level(0, 5), LevelFilter::Error);
        assert_eq!(log_level(2, 2), LevelFilter::Info);
    }
}
