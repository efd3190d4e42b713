//! # ringcore — shared primitives for the ring engine and the HTTP server
//!
//! This crate holds the types that sit at the boundary between the raw
//! io_uring engine (`ringreactor`) and anything that submits operations to
//! it (`httpd`): an owned file-descriptor handle, the completion-target
//! tagging scheme, and a small error type.
//!
//! Nothing here touches io_uring directly — that lives in `ringreactor`.

pub mod error;
pub mod fd;
pub mod tag;
