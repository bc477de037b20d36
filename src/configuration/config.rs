use super::types::*;
use crate::protocol::ProtocolRegistry;
use clap::{CommandFactory, FromArgMatches, Parser};
use log::LevelFilter;
use std::ffi::OsString;
use std::path::PathBuf;

/// Daemon configuration parsed from the command line.
///
/// # Fields Overview
///
/// - `output`: directory receiving one file per intercepted job
/// - `user` / `group`: identity to drop to once every listener is bound
/// - `verbose` / `quiet`: counted flags moving the log level from info
/// - `interceptors`: one or more `type[:port]` selectors
#[derive(Parser, Debug, Clone)]
#[command(name = "printtap")]
#[command(version)]
#[command(about = "Transparent print job interceptor daemon")]
pub struct Configuration {
    /// Output directory
    ///
    /// Every intercepted job is written here under the hex SHA-256 of its content.
    #[arg(long, short = 'o', env = "PRINTTAP_OUTPUT")]
    pub output: PathBuf,

    /// Run as user
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Run as group
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// Increase verbosity (repeatable)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease verbosity (repeatable)
    #[arg(long, short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Interceptor type[:port] (e.g. 'lpd' or 'lpd:515')
    #[arg(
        value_name = "INTERCEPTOR",
        required = true,
        num_args = 1..,
        value_parser = InterceptorArgument::parse
    )]
    pub interceptors: Vec<InterceptorArgument>,
}

impl Configuration {
    /// Parses the process arguments, exiting with a usage message on error.
    ///
    /// The help text lists the interceptor types available in `registry`.
    pub fn from_args(registry: &ProtocolRegistry) -> Self {
        let matches = Self::command_for(registry).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_from_args<I, T>(registry: &ProtocolRegistry, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command_for(registry).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    fn command_for(registry: &ProtocolRegistry) -> clap::Command {
        let available = registry
            .names()
            .map(|name| format!("    {}", name))
            .collect::<Vec<_>>()
            .join("\n");
        Self::command().after_help(format!("Available interceptor types:\n{}", available))
    }

    pub fn log_level(&self) -> LevelFilter {
        log_level(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(args: &[&str]) -> Result<Configuration, clap::Error> {
        Configuration::try_from_args(&ProtocolRegistry::builtin(), args)
    }

    #[test]
    #[serial]
    fn test_from_args() {
        let config = parse(&[
            "printtap", "-o", "/var/spool/printtap", "-u", "nobody", "-g", "nogroup", "-vv",
            "lpd", "lpd:1515",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        assert_eq!(config.output, PathBuf::from("/var/spool/printtap"));
        assert_eq!(config.user.as_deref(), Some("nobody"));
        assert_eq!(config.group.as_deref(), Some("nogroup"));
        assert_eq!(config.log_level(), LevelFilter::Trace);
        assert_eq!(
            config.interceptors,
            vec![
                InterceptorArgument {
                    name: "lpd".to_string(),
                    port: None
                },
                InterceptorArgument {
                    name: "lpd".to_string(),
                    port: Some(Port::Number(1515))
                },
            ]
        );
    }

    #[test]
    #[serial]
    fn test_quiet_lowers_level() {
        let config = parse(&["printtap", "--output", "/tmp", "-q", "lpd"]).unwrap();
        assert_eq!(config.log_level(), LevelFilter::Warn);
        assert!(config.user.is_none());
    }

    #[test]
    #[serial]
    fn test_requires_interceptor() {
        assert!(parse(&["printtap", "-o", "/tmp"]).is_err());
    }

    #[test]
    #[serial]
    fn test_rejects_malformed_interceptor() {
        assert!(parse(&["printtap", "-o", "/tmp", "lpd:"]).is_err());
    }

    #[test]
    #[serial]
    fn test_output_from_environment() {
        std::env::set_var("PRINTTAP_OUTPUT", "/srv/jobs");
        let config = parse(&["printtap", "lpd"]);
        std::env::remove_var("PRINTTAP_OUTPUT");
        assert_eq!(config.unwrap().output, PathBuf::from("/srv/jobs"));
    }

    #[test]
    #[serial]
    fn test_help_lists_registered_types() {
        let help = Configuration::command_for(&ProtocolRegistry::builtin())
            .render_long_help()
            .to_string();
        assert!(help.contains("Available interceptor types:\n    lpd"));
    }
}
