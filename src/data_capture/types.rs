use std::fmt;

/// Direction of a relayed byte stream within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes read from the accepted socket and forwarded to the origin.
    ClientToOrigin,
    /// Bytes read from the origin and forwarded back to the client.
    OriginToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToOrigin => f.write_str("client->origin"),
            Direction::OriginToClient => f.write_str("origin->client"),
        }
    }
}
