//! # ringreactor — the raw io_uring ring engine
//!
//! Talks to the kernel with two syscalls (`io_uring_setup`,
//! `io_uring_enter`) and three `mmap` regions. No `io-uring` crate, no
//! `mio`, no `tokio` — every struct here mirrors a kernel ABI type
//! byte-for-byte and every syscall is issued through `libc::syscall`
//! the same way the rest of this workspace reaches syscalls libc
//! doesn't wrap (see the futex parking backend).
//!
//! ## Implementors
//!
//! There is exactly one engine: [`ring::RawRing`]. It is intentionally
//! not generic over backend — unlike the syscall-routing traits
//! elsewhere in this workspace, there is only one kernel interface
//! worth targeting here.

pub mod ring;
pub mod sqe;
pub mod sys;
