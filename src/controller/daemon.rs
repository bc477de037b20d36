use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::task::JoinSet;

use super::privileges::{describe_identity, RunAs};
use crate::configuration::types::{ListenerConfig, Port};
use crate::configuration::Configuration;
use crate::error_handling::types::ControllerError;
use crate::network::network_listener::{BoundListener, NetworkListener};
use crate::protocol::ProtocolRegistry;
use crate::storage::{FileStorage, Storage};

/// The interceptor daemon: a set of listeners sharing one output directory.
pub struct Daemon {
    user: Option<String>,
    group: Option<String>,
    storage: Arc<FileStorage>,
    listeners: Vec<ListenerConfig>,
}

impl Daemon {
    pub fn new<P: AsRef<Path>>(output: P, user: Option<String>, group: Option<String>) -> Self {
        Self {
            storage: Arc::new(FileStorage::new(output)),
            user,
            group,
            listeners: Vec::new(),
        }
    }

    /// Builds a daemon with one listener per command-line selector.
    pub fn from_configuration(
        config: &Configuration,
        registry: &ProtocolRegistry,
    ) -> Result<Self, ControllerError> {
        let mut daemon = Self::new(&config.output, config.user.clone(), config.group.clone());
        for interceptor in &config.interceptors {
            daemon.add(registry, &interceptor.name, interceptor.port.clone())?;
        }
        Ok(daemon)
    }

    /// Adds a listener for the protocol registered as `name`.
    pub fn add(
        &mut self,
        registry: &ProtocolRegistry,
        name: &str,
        port: Option<Port>,
    ) -> Result<(), ControllerError> {
        let protocol = registry.get(name)?.clone();
        let storage: Arc<dyn Storage> = self.storage.clone();
        self.listeners.push(ListenerConfig::new(protocol, port, storage));
        Ok(())
    }

    pub fn listeners(&self) -> &[ListenerConfig] {
        &self.listeners
    }

    pub fn output(&self) -> &Path {
        self.storage.base_path()
    }

    /// Binds every listener, drops privileges and serves until all listeners stop.
    ///
    /// Nothing is accepted before the privilege drop: any bind, lookup or
    /// identity change failure aborts startup.
    pub async fn run(self) -> Result<(), ControllerError> {
        let bound = self.bind_all()?;

        let run_as = RunAs::resolve(self.user.as_deref(), self.group.as_deref())?;
        if run_as.is_noop() {
            debug!("no run-as identity configured");
        } else {
            run_as.apply()?;
        }
        info!("started as {}", describe_identity());

        let output = self.output();
        std::fs::create_dir_all(output)
            .map_err(|e| ControllerError::OutputDirectory(output.to_path_buf(), e))?;

        let mut set = JoinSet::new();
        for listener in bound {
            set.spawn(listener.serve());
        }
        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                error!("listener task failed: {}", e);
            }
        }

        info!("stopped");
        Ok(())
    }

    fn bind_all(&self) -> Result<Vec<BoundListener>, ControllerError> {
        self.listeners
            .iter()
            .map(|config| NetworkListener::new(config.clone()).bind())
            .collect()
    }
}
