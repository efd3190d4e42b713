//! Error types shared across the ring engine and the HTTP server.

use std::fmt;

#[derive(Debug)]
pub enum RingError {
    /// `io_uring_setup` failed.
    Setup(i32),
    /// mmap of one of the ring regions failed.
    Mmap(i32),
    /// `io_uring_enter` failed.
    Enter(i32),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "io_uring_setup failed: errno {}", e),
            Self::Mmap(e) => write!(f, "mmap failed: errno {}", e),
            Self::Enter(e) => write!(f, "io_uring_enter failed: errno {}", e),
        }
    }
}

impl std::error::Error for RingError {}

pub type Result<T> = std::result::Result<T, RingError>;
