use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    BadInterceptor(String),
    UnknownProtocol(String),
    UnknownService(String),
    UnknownUser(String),
    UnknownGroup(String),
    IoError(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadInterceptor(e) => write!(f, "Invalid interceptor selector: {}", e),
            ConfigError::UnknownProtocol(e) => write!(f, "Unknown interceptor type: {}", e),
            ConfigError::UnknownService(e) => write!(f, "Unknown TCP service: {}", e),
            ConfigError::UnknownUser(e) => write!(f, "Unknown user: {}", e),
            ConfigError::UnknownGroup(e) => write!(f, "Unknown group: {}", e),
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    SockError(std::io::Error),
    TransparentFailed(std::io::Error),
    BindError(std::net::SocketAddr, std::io::Error),
    AcceptFailed(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::SockError(e) => write!(f, "Socket error: {}", e),
            NetworkError::TransparentFailed(e) => {
                write!(f, "Unable to enable transparent interception: {}", e)
            }
            NetworkError::BindError(addr, e) => write!(f, "Network bind error on {}: {}", addr, e),
            NetworkError::AcceptFailed(e) => write!(f, "Accept failed: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum StorageError {
    WriteFailed(std::path::PathBuf, std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WriteFailed(path, e) => {
                write!(f, "Storage write failed for {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum CaptureError {
    TcpStreamError(std::io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::TcpStreamError(e) => write!(f, "TCP stream relay error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::TcpStreamError(err)
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    Truncated(&'static str),
    MalformedCount(String),
    IoError(std::io::Error),
    StorageError(StorageError),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated(what) => write!(f, "Stream ended inside {}", what),
            ProtocolError::MalformedCount(e) => write!(f, "Malformed byte count: {:?}", e),
            ProtocolError::IoError(e) => write!(f, "Protocol stream error: {}", e),
            ProtocolError::StorageError(e) => write!(f, "Job storage error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::IoError(err)
    }
}

impl From<StorageError> for ProtocolError {
    fn from(err: StorageError) -> Self {
        ProtocolError::StorageError(err)
    }
}

#[derive(Debug)]
pub enum SessionError {
    AddressUnavailable(std::io::Error),
    OriginUnreachable(std::net::SocketAddr, std::io::Error),
    CaptureError(CaptureError),
    TaskFailed(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AddressUnavailable(e) => write!(f, "Socket address unavailable: {}", e),
            SessionError::OriginUnreachable(addr, e) => {
                write!(f, "Origin {} unreachable: {}", addr, e)
            }
            SessionError::CaptureError(e) => write!(f, "Capture error: {}", e),
            SessionError::TaskFailed(e) => write!(f, "Session task failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        SessionError::CaptureError(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    PrivilegeDropFailed(String),
    OutputDirectory(std::path::PathBuf, std::io::Error),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::PrivilegeDropFailed(e) => write!(f, "Privilege drop failed: {}", e),
            ControllerError::OutputDirectory(path, e) => {
                write!(f, "Unable to create output directory {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}
