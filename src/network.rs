pub mod network_listener;
pub mod origin;
pub mod services;

pub use network_listener::{BoundListener, NetworkListener};
pub use origin::OriginConnector;
