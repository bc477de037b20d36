use std::net::SocketAddr;

use log::debug;
use tokio::net::{TcpSocket, TcpStream};

use crate::error_handling::types::SessionError;

/// Opens the connection a transparently redirected client originally asked for.
pub struct OriginConnector;

impl OriginConnector {
    /// The accepted socket's local address is the address the client was
    /// connecting to before redirection.
    pub fn original_destination(accepted: &TcpStream) -> Result<SocketAddr, SessionError> {
        accepted.local_addr().map_err(SessionError::AddressUnavailable)
    }

    /// Connects a fresh socket of the destination's family to `destination`.
    pub async fn connect(destination: SocketAddr) -> Result<TcpStream, SessionError> {
        let socket = if destination.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| SessionError::OriginUnreachable(destination, e))?;
        let stream = socket
            .connect(destination)
            .await
            .map_err(|e| SessionError::OriginUnreachable(destination, e))?;
        debug!("Connected to origin {}", destination);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_original_destination_is_local_address() {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await });
        let (accepted, _) = listener.accept().await.unwrap();
        let _client = client.await.unwrap().unwrap();

        assert_eq!(OriginConnector::original_destination(&accepted).unwrap(), addr);
    }

    #[tokio::test]
    async fn test_connect_reaches_origin() {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = OriginConnector::connect(addr).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = OriginConnector::connect(addr).await.unwrap_err();
        assert!(matches!(err, SessionError::OriginUnreachable(a, _) if a == addr));
    }
}
