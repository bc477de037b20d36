use std::fs;

use crate::error_handling::types::ConfigError;

pub const SERVICES_PATH: &str = "/etc/services";

/// Resolves a TCP service name (e.g. `printer`) through the services database.
pub fn lookup_tcp_service(name: &str) -> Result<u16, ConfigError> {
    let contents = fs::read_to_string(SERVICES_PATH)?;
    find_tcp_service(&contents, name).ok_or_else(|| ConfigError::UnknownService(name.to_string()))
}

/// Finds `name` (or one of its aliases) among the `tcp` entries of a
/// services(5) formatted text.
pub fn find_tcp_service(contents: &str, name: &str) -> Option<u16> {
    for line in contents.lines() {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let (Some(service), Some(port_proto)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((port, proto)) = port_proto.split_once('/') else {
            continue;
        };
        if proto != "tcp" {
            continue;
        }
        if service == name || fields.any(|alias| alias == name) {
            if let Ok(port) = port.parse() {
                return Some(port);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = "\
# Network services, Internet style
tcpmux          1/tcp                           # TCP port service multiplexer
printer         515/udp
printer         515/tcp         spooler         # line printer spooler
ipp             631/tcp                         # Internet Printing Protocol
";

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_tcp_service(SERVICES, "printer"), Some(515));
        assert_eq!(find_tcp_service(SERVICES, "ipp"), Some(631));
    }

    #[test]
    fn test_find_by_alias() {
        assert_eq!(find_tcp_service(SERVICES, "spooler"), Some(515));
    }

    #[test]
    fn test_comments_are_not_aliases() {
        assert_eq!(find_tcp_service(SERVICES, "line"), None);
        assert_eq!(find_tcp_service(SERVICES, "Network"), None);
    }

    #[test]
    fn test_unknown_service() {
        assert_eq!(find_tcp_service(SERVICES, "gopher"), None);
        assert_eq!(find_tcp_service("", "printer"), None);
    }
}
