//! Helpers that fill a [`RawSqe`](crate::sys::RawSqe) for the handful of
//! operations this server issues: accept, recv, send.

use crate::sys::{RawSqe, IORING_OP_ACCEPT, IORING_OP_RECV, IORING_OP_SEND};

/// Prepares `sqe` as an `IORING_OP_ACCEPT` on `fd`, writing the peer
/// address into `(addr, addrlen)`. `addr`/`addrlen` must remain valid
/// and unmoved until the matching completion is consumed.
pub fn prep_accept(sqe: &mut RawSqe, fd: i32, addr: *mut libc::sockaddr, addrlen: *mut libc::socklen_t, user_data: u64) {
    *sqe = RawSqe::default();
    sqe.opcode = IORING_OP_ACCEPT;
    sqe.fd = fd;
    sqe.addr = addr as u64;
    sqe.off = addrlen as u64; // addr2 union slot
    sqe.op_flags = 0;
    sqe.user_data = user_data;
}

/// Prepares `sqe` as an `IORING_OP_RECV` reading up to `len` bytes into
/// `buf`. `buf` must remain valid and unmoved until completion.
pub fn prep_recv(sqe: &mut RawSqe, fd: i32, buf: *mut u8, len: u32, user_data: u64) {
    *sqe = RawSqe::default();
    sqe.opcode = IORING_OP_RECV;
    sqe.fd = fd;
    sqe.addr = buf as u64;
    sqe.len = len;
    sqe.user_data = user_data;
}

/// Prepares `sqe` as an `IORING_OP_SEND` writing `len` bytes from `buf`.
/// `buf` must remain valid and unmoved until completion.
pub fn prep_send(sqe: &mut RawSqe, fd: i32, buf: *const u8, len: u32, user_data: u64) {
    *sqe = RawSqe::default();
    sqe.opcode = IORING_OP_SEND;
    sqe.fd = fd;
    sqe.addr = buf as u64;
    sqe.len = len;
    sqe.user_data = user_data;
}
