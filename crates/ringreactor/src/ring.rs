//! `RawRing` — the io_uring submission/completion ring pair.
//!
//! # Memory layout
//!
//! Three regions are mmap'd from the ring fd returned by
//! `io_uring_setup`:
//!
//! ```text
//! IORING_OFF_SQ_RING:  SQ ring header (head, tail, mask, entries, array)
//! IORING_OFF_SQES:     the SQE array itself
//! IORING_OFF_CQ_RING:  CQ ring header + CQE array
//! ```
//!
//! head/tail are `u32` fields living inside the mmap'd pages; we keep
//! raw pointers to them and access them with explicit acquire/release
//! atomic operations rather than wrapping them in `AtomicU32`, since
//! the fields are kernel-owned memory of fixed, ABI-mandated layout.
//!
//! # Atomics
//!
//! The SQ tail and CQ head are written by us and read by the kernel;
//! the SQ head and CQ tail are written by the kernel and read by us.
//! Every cross-boundary read is an acquire load of the counterpart's
//! published index; every cross-boundary write is a release store of
//! our own. This is single-threaded on the userspace side — only the
//! kernel/userspace boundary needs ordering, there is no contention
//! between Rust threads.

use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use ringcore::error::{RingError, Result};

use crate::sys::{self, IoUringParams, RawCqe, RawSqe, IORING_ENTER_GETEVENTS};

const PAGE_SIZE: usize = 4096;

fn round_up_page(n: usize) -> usize {
    (n + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE
}

struct Mapping {
    ptr: *mut libc::c_void,
    len: usize,
}

impl Mapping {
    fn new(fd: i32, len: usize, offset: libc::off_t) -> Result<Self> {
        let len = round_up_page(len);
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_POPULATE,
                fd,
                offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(RingError::Mmap(io_errno()));
        }
        Ok(Self { ptr, len })
    }

    unsafe fn field<T>(&self, byte_offset: u32) -> *mut T {
        (self.ptr as *mut u8).add(byte_offset as usize) as *mut T
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

fn io_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

/// Typed pointers into the SQ ring mapping.
struct SqRing {
    _map: Mapping,
    head: *const AtomicU32,
    tail: *const AtomicU32,
    ring_mask: u32,
    ring_entries: u32,
    array: *mut u32,
}

/// Typed pointers into the CQ ring mapping.
struct CqRing {
    _map: Mapping,
    head: *const AtomicU32,
    tail: *const AtomicU32,
    ring_mask: u32,
    cqes: *const RawCqe,
}

/// A decoded completion, copied out of the CQ ring.
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub user_data: u64,
    pub result: i32,
    pub flags: u32,
}

/// The io_uring ring pair plus the SQE array mapping.
///
/// Not `Send`/`Sync` — this is a single-threaded event loop and the
/// ring is never shared across threads.
pub struct RawRing {
    ring_fd: i32,
    sq: SqRing,
    sqes_map: Mapping,
    sqes: *mut RawSqe,
    cq: CqRing,
    /// Locally cached SQ tail; not yet visible to the kernel until `flush`.
    sq_tail_cached: u32,
}

impl RawRing {
    /// Creates a ring with at least `entries` submission slots.
    pub fn new(entries: u32) -> Result<Self> {
        let mut params = IoUringParams::default();
        let ring_fd = sys::io_uring_setup(entries, &mut params).map_err(|e| {
            RingError::Setup(e.raw_os_error().unwrap_or(-1))
        })?;

        let build = || -> Result<Self> {
            let sq_map_len = params.sq_off.array as usize
                + params.sq_entries as usize * std::mem::size_of::<u32>();
            let sq_map = Mapping::new(ring_fd, sq_map_len, sys::IORING_OFF_SQ_RING)?;

            let sqes_map_len = params.sq_entries as usize * std::mem::size_of::<RawSqe>();
            let sqes_map = Mapping::new(ring_fd, sqes_map_len, sys::IORING_OFF_SQES)?;
            let sqes = sqes_map.ptr as *mut RawSqe;

            let cq_map_len = params.cq_off.cqes as usize
                + params.cq_entries as usize * std::mem::size_of::<RawCqe>();
            let cq_map = Mapping::new(ring_fd, cq_map_len, sys::IORING_OFF_CQ_RING)?;

            let sq = unsafe {
                SqRing {
                    head: sq_map.field(params.sq_off.head),
                    tail: sq_map.field(params.sq_off.tail),
                    ring_mask: *sq_map.field::<u32>(params.sq_off.ring_mask),
                    ring_entries: *sq_map.field::<u32>(params.sq_off.ring_entries),
                    array: sq_map.field(params.sq_off.array),
                    _map: sq_map,
                }
            };

            let cq = unsafe {
                CqRing {
                    head: cq_map.field(params.cq_off.head),
                    tail: cq_map.field(params.cq_off.tail),
                    ring_mask: *cq_map.field::<u32>(params.cq_off.ring_mask),
                    cqes: cq_map.field(params.cq_off.cqes),
                    _map: cq_map,
                }
            };

            let sq_tail_cached = unsafe { (*sq.tail).load(Ordering::Acquire) };

            Ok(Self {
                ring_fd,
                sq,
                sqes_map,
                sqes,
                cq,
                sq_tail_cached,
            })
        };

        build().map_err(|e| {
            unsafe {
                libc::close(ring_fd);
            }
            e
        })
    }

    /// Allocates the next free SQE, zeroed, or `None` if the ring is
    /// currently full (after one attempt to flush and make room).
    pub fn acquire_sqe(&mut self) -> Option<&mut RawSqe> {
        let head = unsafe { (*self.sq.head).load(Ordering::Acquire) };
        if self.sq_tail_cached.wrapping_sub(head) >= self.sq.ring_entries {
            let _ = self.flush();
            let head = unsafe { (*self.sq.head).load(Ordering::Acquire) };
            if self.sq_tail_cached.wrapping_sub(head) >= self.sq.ring_entries {
                return None;
            }
        }

        let idx = self.sq_tail_cached & self.sq.ring_mask;
        self.sq_tail_cached = self.sq_tail_cached.wrapping_add(1);
        let sqe = unsafe { &mut *self.sqes.add(idx as usize) };
        *sqe = RawSqe::default();
        Some(sqe)
    }

    /// Publishes all SQEs queued since the last flush and wakes the kernel.
    /// Returns the number of entries the kernel accepted.
    pub fn flush(&mut self) -> Result<u32> {
        let published_tail = unsafe { (*self.sq.tail).load(Ordering::Relaxed) };
        let to_submit = self.sq_tail_cached.wrapping_sub(published_tail);
        if to_submit == 0 {
            return Ok(0);
        }

        for i in 0..to_submit {
            let slot = published_tail.wrapping_add(i) & self.sq.ring_mask;
            unsafe {
                ptr::write(self.sq.array.add(slot as usize), slot);
            }
        }

        unsafe {
            (*self.sq.tail).store(self.sq_tail_cached, Ordering::Release);
        }

        sys::io_uring_enter(self.ring_fd, to_submit, 0, 0)
            .map_err(|e| RingError::Enter(e.raw_os_error().unwrap_or(-1)))
    }

    /// Appends every currently visible completion to `out` (not
    /// cleared first). Non-blocking. Completions are copied out rather
    /// than dispatched via callback so that a handler reacting to one
    /// completion can freely call `acquire_sqe`/`flush` again without
    /// re-entering an already-borrowed `self`.
    pub fn drain_completions(&mut self, out: &mut Vec<Completion>) {
        let mut head = unsafe { (*self.cq.head).load(Ordering::Acquire) };
        let tail = unsafe { (*self.cq.tail).load(Ordering::Acquire) };

        while head != tail {
            let idx = (head & self.cq.ring_mask) as usize;
            let cqe = unsafe { ptr::read(self.cq.cqes.add(idx)) };
            if cqe.user_data != 0 {
                out.push(Completion {
                    user_data: cqe.user_data,
                    result: cqe.res,
                    flags: cqe.flags,
                });
            }
            head = head.wrapping_add(1);
        }

        unsafe {
            (*self.cq.head).store(head, Ordering::Release);
        }
    }

    /// Blocks in the kernel until at least one completion is available,
    /// then drains into `out`. Ignores `EINTR`; logs other
    /// `io_uring_enter` failures.
    pub fn wait_and_drain(&mut self, out: &mut Vec<Completion>) {
        match sys::io_uring_enter(self.ring_fd, 0, 1, IORING_ENTER_GETEVENTS) {
            Ok(_) => {}
            Err(e) if e.raw_os_error() == Some(libc::EINTR) => {}
            Err(e) => eprintln!("ringreactor: io_uring_enter failed: {}", e),
        }
        self.drain_completions(out);
    }

    pub fn raw_fd(&self) -> i32 {
        self.ring_fd
    }
}

impl Drop for RawRing {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.ring_fd);
        }
    }
}
