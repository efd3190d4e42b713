//! In-memory request representation.
//!
//! Only the request line is parsed; headers and body are not
//! interpreted beyond the `Connection` scan in [`crate::parse`].

use crate::method::Method;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
}
