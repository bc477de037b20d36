//! # Network Listener Module
//!
//! This module provides the listening side of the interceptor: one
//! [`NetworkListener`] per configured protocol/port pair.
//!
//! Binding and serving are two separate phases. [`NetworkListener::bind`] creates
//! every listening socket with `IP_TRANSPARENT` enabled, which requires elevated
//! network capability; [`BoundListener::serve`] then accepts connections forever
//! and spawns one [`Session`] per connection, with no bound on concurrency. The
//! daemon drops privileges between the two phases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Redirected      │───▶│ BoundListener    │───▶│ Session         │
//! │ Connections     │    │ (accept loop per │    │ (one task per   │
//! └─────────────────┘    │  socket)         │    │  connection)    │
//!                        └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use printtap::configuration::types::{ListenerConfig, Port};
//! use printtap::network::network_listener::NetworkListener;
//! use printtap::protocol::ProtocolRegistry;
//! use printtap::storage::FileStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ProtocolRegistry::builtin();
//!     let config = ListenerConfig::new(
//!         registry.get("lpd")?.clone(),
//!         Some(Port::Number(515)),
//!         Arc::new(FileStorage::new("/var/spool/printtap")),
//!     );
//!
//!     let bound = NetworkListener::new(config).bind()?;
//!     bound.serve().await;
//!     Ok(())
//! }
//! ```

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{error, info, warn};
use nix::errno::Errno;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::configuration::types::ListenerConfig;
use crate::error_handling::types::{ControllerError, NetworkError, SessionError};
use crate::network::origin::OriginConnector;
use crate::session_management::session::Session;

const LISTEN_BACKLOG: i32 = 128;

/// Pause after a failed accept (e.g. file descriptor exhaustion) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// An unbound listener for one protocol/port pair.
pub struct NetworkListener {
    /// Protocol, port and shared storage handed to every session
    config: ListenerConfig,

    /// Diagnostic name, e.g. `lpd[printer]`
    name: String,
}

/// A listener whose sockets are bound and listening.
pub struct BoundListener {
    config: ListenerConfig,
    name: String,
    sockets: Vec<TcpListener>,
}

impl NetworkListener {
    pub fn new(config: ListenerConfig) -> Self {
        let name = config.name();
        Self { config, name }
    }

    /// Resolves the configured port and binds a transparent listening socket on
    /// the IPv4 and IPv6 wildcard addresses.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - the port is a service name unknown to the services database
    /// - `IP_TRANSPARENT` cannot be set (the process lacks `CAP_NET_ADMIN`)
    /// - any bind fails, except an IPv6 bind on a host without IPv6
    pub fn bind(self) -> Result<BoundListener, ControllerError> {
        info!("{} starting", self.name);
        let port = self.config.port.resolve()?;

        let mut sockets = Vec::new();
        for addr in wildcard_addrs(port) {
            match bind_transparent(addr) {
                Ok(socket) => sockets.push(socket),
                Err(NetworkError::SockError(e)) | Err(NetworkError::BindError(_, e))
                    if addr.is_ipv6() && ipv6_unavailable(&e) =>
                {
                    warn!("{} skipping {}: {}", self.name, addr, e);
                }
                Err(e) => {
                    error!("{} unable to listen on {}: {}", self.name, addr, e);
                    return Err(e.into());
                }
            }
        }

        info!("{} started", self.name);
        Ok(BoundListener {
            config: self.config,
            name: self.name,
            sockets,
        })
    }
}

impl BoundListener {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.sockets
            .iter()
            .filter_map(|s| s.local_addr().ok())
            .collect()
    }

    /// Accepts connections on every socket, forever.
    pub async fn serve(self) {
        info!("{} listening on {:?}", self.name(), self.local_addrs());
        let mut set = JoinSet::new();
        for socket in self.sockets {
            set.spawn(accept_loop(
                self.name.clone(),
                socket,
                self.config.clone(),
                OriginConnector::original_destination,
            ));
        }
        while let Some(res) = set.join_next().await {
            if let Err(e) = res {
                error!("{} accept loop failed: {}", self.name, e);
            }
        }
    }
}

/// Accepts connections forever, spawning one session per connection.
///
/// `resolve` yields the origin each accepted connection is relayed to. A
/// connection whose origin cannot be determined is dropped.
async fn accept_loop<F>(
    name: String,
    listener: TcpListener,
    config: ListenerConfig,
    resolve: F,
) where
    F: Fn(&TcpStream) -> Result<SocketAddr, SessionError>,
{
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("{} {}", name, NetworkError::AcceptFailed(e));
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let session = resolve(&stream).and_then(|destination| {
            Session::with_destination(
                stream,
                destination,
                config.protocol.new_engine(),
                config.storage.clone(),
            )
        });
        let session = match session {
            Ok(session) => session,
            Err(e) => {
                error!("{} session from {} failed: {}", name, peer, e);
                continue;
            }
        };

        let name = name.clone();
        tokio::spawn(async move {
            let session_name = session.name().to_string();
            if let Err(e) = session.serve().await {
                error!("{} session {} failed: {}", name, session_name, e);
            }
        });
    }
}

/// Wildcard listening addresses for `port`, IPv4 first.
pub fn wildcard_addrs(port: u16) -> [SocketAddr; 2] {
    [
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
    ]
}

/// Creates a listening socket on `addr` able to accept redirected connections.
pub fn bind_transparent(addr: SocketAddr) -> Result<TcpListener, NetworkError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket =
        Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(NetworkError::SockError)?;
    socket
        .set_reuse_address(true)
        .map_err(NetworkError::SockError)?;
    if addr.is_ipv6() {
        socket.set_only_v6(true).map_err(NetworkError::SockError)?;
    }
    socket
        .set_ip_transparent(true)
        .map_err(NetworkError::TransparentFailed)?;
    socket
        .set_nonblocking(true)
        .map_err(NetworkError::SockError)?;
    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindError(addr, e))?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| NetworkError::BindError(addr, e))?;
    TcpListener::from_std(socket.into()).map_err(NetworkError::SockError)
}

fn ipv6_unavailable(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error().map(Errno::from_i32),
        Some(Errno::EAFNOSUPPORT) | Some(Errno::EADDRNOTAVAIL)
    )
}
