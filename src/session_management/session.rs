use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::SessionStatus;
use crate::data_capture::{injected_channel, Direction, InjectedStream, StreamTee};
use crate::error_handling::types::SessionError;
use crate::network::origin::OriginConnector;
use crate::protocol::{JobContext, JobOutcome, ProtocolEngine};
use crate::storage::Storage;

/// One intercepted connection.
///
/// The session owns the accepted socket until [`Session::serve`] returns, and
/// opens exactly one origin connection for it.
pub struct Session {
    pub(crate) name: String,
    pub(crate) status: SessionStatus,
    pub(crate) accepted: TcpStream,
    /// Where the client was connecting to before redirection.
    pub(crate) destination: SocketAddr,
    pub(crate) engine: Box<dyn ProtocolEngine>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) start_time: DateTime<Utc>,
}

/// What a finished session relayed and intercepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub name: String,
    pub client_to_origin: u64,
    pub origin_to_client: u64,
    /// `None` when the protocol engine failed.
    pub outcome: Option<JobOutcome>,
}

/// Diagnostic name derived from the accepted socket's four-tuple.
pub fn session_name(peer: SocketAddr, local: SocketAddr) -> String {
    format!(
        "[{}:{}]-[{}:{}]",
        peer.ip(),
        peer.port(),
        local.ip(),
        local.port()
    )
}

impl Session {
    pub fn new(
        accepted: TcpStream,
        engine: Box<dyn ProtocolEngine>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, SessionError> {
        let destination = OriginConnector::original_destination(&accepted)?;
        Self::with_destination(accepted, destination, engine, storage)
    }

    /// Session relaying to an explicitly given origin.
    pub fn with_destination(
        accepted: TcpStream,
        destination: SocketAddr,
        engine: Box<dyn ProtocolEngine>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, SessionError> {
        let peer = accepted
            .peer_addr()
            .map_err(SessionError::AddressUnavailable)?;
        Ok(Self {
            name: session_name(peer, destination),
            status: SessionStatus::Opening,
            accepted,
            destination,
            engine,
            storage,
            start_time: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Relays the connection until both directions are closed.
    ///
    /// Bytes read from the client are forwarded to the origin and copied into
    /// the protocol engine; bytes read from the origin are forwarded back to the
    /// client. Protocol failures are logged and never interrupt the relay.
    ///
    /// A client half-close is forwarded and the origin may keep answering. Once
    /// the origin side ends, the client side is closed too.
    ///
    /// Errors
    /// - [`SessionError::OriginUnreachable`] if the origin refuses the connection.
    /// - [`SessionError::CaptureError`] if either relay direction fails; the
    ///   other direction is then torn down.
    pub async fn serve(self) -> Result<SessionSummary, SessionError> {
        let Session {
            name,
            mut status,
            accepted,
            destination,
            engine,
            storage,
            start_time,
        } = self;

        info!("[{}] opened", name);
        let origin = match OriginConnector::connect(destination).await {
            Ok(origin) => origin,
            Err(e) => {
                status.advance(SessionStatus::Closed, &name);
                return Err(e);
            }
        };
        status.advance(SessionStatus::Relaying, &name);

        let (accepted_read, accepted_write) = accepted.into_split();
        let (origin_read, origin_write) = origin.into_split();
        let (injector, injected) = injected_channel();
        let (origin_closed_tx, origin_closed) = watch::channel(false);

        let drain = tokio::spawn(drain_injected(name.clone(), engine, injected, storage));

        let mut relays = JoinSet::new();
        {
            let label = format!("[{}] {}", name, Direction::ClientToOrigin);
            let tee = StreamTee::new(label, accepted_read)
                .sink(origin_write)
                .injector(injector)
                .close_on(origin_closed);
            relays.spawn(async move { (Direction::ClientToOrigin, tee.run().await) });
        }
        {
            let label = format!("[{}] {}", name, Direction::OriginToClient);
            let tee = StreamTee::new(label, origin_read).sink(accepted_write);
            relays.spawn(async move { (Direction::OriginToClient, tee.run().await) });
        }

        let mut summary = SessionSummary {
            name: name.clone(),
            client_to_origin: 0,
            origin_to_client: 0,
            outcome: None,
        };
        let mut failure = None;
        while let Some(joined) = relays.join_next().await {
            match joined {
                Ok((Direction::ClientToOrigin, Ok(n))) => summary.client_to_origin = n,
                Ok((Direction::OriginToClient, Ok(n))) => {
                    summary.origin_to_client = n;
                    let _ = origin_closed_tx.send(true);
                }
                Ok((direction, Err(e))) => {
                    error!("[{}] {} relay failed: {}", name, direction, e);
                    failure.get_or_insert(SessionError::CaptureError(e));
                    relays.abort_all();
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    failure.get_or_insert(SessionError::TaskFailed(e.to_string()));
                    relays.abort_all();
                }
            }
        }

        summary.outcome = match drain.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[{}] protocol task failed: {}", name, e);
                None
            }
        };

        status.advance(SessionStatus::Closed, &name);
        info!(
            "[{}] closed: client->origin={} origin->client={} duration={:?}",
            name,
            summary.client_to_origin,
            summary.origin_to_client,
            Utc::now() - start_time
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// Feeds the injected copy into the engine, then discards whatever the engine
/// left unread so the injected stream is always consumed to end-of-stream.
async fn drain_injected(
    name: String,
    mut engine: Box<dyn ProtocolEngine>,
    injected: InjectedStream,
    storage: Arc<dyn Storage>,
) -> Option<JobOutcome> {
    let mut reader = BufReader::new(injected);
    let ctx = JobContext {
        session: &name,
        storage: storage.as_ref(),
    };
    let outcome = match engine.intercept(&mut reader, &ctx).await {
        Ok(outcome) => {
            debug!("[{}] engine finished: {:?}", name, outcome);
            Some(outcome)
        }
        Err(e) => {
            error!("[{}] {}", name, e);
            None
        }
    };
    match tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
        Ok(0) => {}
        Ok(n) => debug!("[{}] discarded {} uninterpreted byte(s)", name, n),
        Err(e) => error!("[{}] discarding failed: {}", name, e),
    }
    outcome
}
