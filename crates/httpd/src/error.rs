//! httpd error types.

use std::fmt;

#[derive(Debug)]
pub enum HttpdError {
    SocketCreate(i32),
    SetSockOpt(i32),
    Bind(i32),
    Listen(i32),
    Ring(ringcore::error::RingError),
}

impl fmt::Display for HttpdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SocketCreate(e) => write!(f, "socket() failed: errno {}", e),
            Self::SetSockOpt(e) => write!(f, "setsockopt() failed: errno {}", e),
            Self::Bind(e) => write!(f, "bind() failed: errno {}", e),
            Self::Listen(e) => write!(f, "listen() failed: errno {}", e),
            Self::Ring(e) => write!(f, "ring setup failed: {}", e),
        }
    }
}

impl std::error::Error for HttpdError {}

impl From<ringcore::error::RingError> for HttpdError {
    fn from(e: ringcore::error::RingError) -> Self {
        Self::Ring(e)
    }
}

pub type Result<T> = std::result::Result<T, HttpdError>;
