//! The subset of HTTP methods this server routes.
//!
//! Anything other than `GET`/`POST` is rejected with `501 Not
//! Implemented` during parsing and never reaches the router — so the
//! router only ever needs to key on these two.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        match b {
            b"GET" => Some(Self::Get),
            b"POST" => Some(Self::Post),
            _ => None,
        }
    }
}
