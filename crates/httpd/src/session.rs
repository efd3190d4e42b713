//! Per-connection state machine: recv, parse, dispatch, send, keep-alive,
//! teardown.
//!
//! A session never has both a recv and a send outstanding at once — one
//! op is posted per transition, by construction. `recv_buf`/`send_buf`
//! are only written while the matching op is not outstanding, so the
//! addresses handed to the kernel stay valid and unmoved for the
//! lifetime of that op.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ringreactor::ring::RawRing;

use crate::method::Method;
use crate::parse::{self, ParseOutcome};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reading,
    Writing,
    Closed,
}

/// What a recv completion led to, for the caller's stats and slab
/// bookkeeping. Freeing the slab slot is always decided by
/// [`Session::is_done`], not by this enum directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// More bytes are needed before a request line can be parsed.
    NeedMore,
    /// A request was parsed (or rejected as malformed) and a send was posted.
    Responded,
    /// The connection is being torn down.
    Closed,
}

pub struct Session {
    fd: ringcore::fd::OwnedFd,
    phase: Phase,
    recv_buf: Vec<u8>,
    recv_len: usize,
    send_buf: Vec<u8>,
    send_off: usize,
    pending_ops: u32,
    keep_alive: bool,
    router: Rc<Router>,
}

impl Session {
    /// `recv_buf_size` is also the hard limit on how large a request
    /// line + header block this session will accept before giving up
    /// with `400 Bad Request`.
    pub fn new(fd: ringcore::fd::OwnedFd, router: Rc<Router>, recv_buf_size: usize) -> Self {
        Self {
            fd,
            phase: Phase::Reading,
            recv_buf: vec![0u8; recv_buf_size],
            recv_len: 0,
            send_buf: Vec::new(),
            send_off: 0,
            pending_ops: 0,
            keep_alive: true,
            router,
        }
    }

    /// Posts the first recv. Returns `false` if the ring was full — the
    /// caller must close the connection immediately in that case.
    pub fn start(&mut self, ring: &mut RawRing, slot: usize) -> bool {
        self.post_recv(ring, slot)
    }

    /// True once the session holds no outstanding kernel operations and
    /// has transitioned to `Closed` — the only point at which the caller
    /// may free the slab slot (which drops `self.fd` and closes it).
    pub fn is_done(&self) -> bool {
        self.pending_ops == 0 && self.phase == Phase::Closed
    }

    fn post_recv(&mut self, ring: &mut RawRing, slot: usize) -> bool {
        let sqe = match ring.acquire_sqe() {
            Some(sqe) => sqe,
            None => {
                self.phase = Phase::Closed;
                return false;
            }
        };
        let ptr = unsafe { self.recv_buf.as_mut_ptr().add(self.recv_len) };
        let remaining = (self.recv_buf.len() - self.recv_len) as u32;
        let tag = ringcore::tag::make(ringcore::tag::OP_RECV, slot);
        ringreactor::sqe::prep_recv(sqe, self.fd.raw(), ptr, remaining, tag);
        let _ = ring.flush();
        self.phase = Phase::Reading;
        self.pending_ops += 1;
        true
    }

    fn post_send(&mut self, ring: &mut RawRing, slot: usize) -> bool {
        let sqe = match ring.acquire_sqe() {
            Some(sqe) => sqe,
            None => {
                self.phase = Phase::Closed;
                return false;
            }
        };
        let ptr = unsafe { self.send_buf.as_ptr().add(self.send_off) };
        let remaining = (self.send_buf.len() - self.send_off) as u32;
        let tag = ringcore::tag::make(ringcore::tag::OP_SEND, slot);
        ringreactor::sqe::prep_send(sqe, self.fd.raw(), ptr, remaining, tag);
        let _ = ring.flush();
        self.phase = Phase::Writing;
        self.pending_ops += 1;
        true
    }

    fn reset_for_next_request(&mut self) {
        self.recv_len = 0;
        self.send_buf.clear();
        self.send_off = 0;
        self.keep_alive = true;
    }

    fn dispatch(&self, req: &Request) -> Response {
        match self.router.find_handler(req.method, &req.path) {
            Some(handler) => {
                let mut response = Response::new();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(req, &mut response)));
                match outcome {
                    Ok(()) => response,
                    Err(_) => {
                        let mut response = Response::new();
                        response.set_status(500).set_body(&b"Internal Server Error"[..]);
                        response
                    }
                }
            }
            None => {
                let mut response = Response::new();
                response.set_status(404).set_body(&b"Not Found"[..]);
                response
            }
        }
    }

    fn handle_request_line(&mut self) -> Response {
        self.keep_alive = parse::scan_keep_alive(&self.recv_buf[..], self.recv_len);
        match parse::parse_request_line(&self.recv_buf[..], self.recv_len) {
            ParseOutcome::Ok(req) => self.dispatch(&req),
            ParseOutcome::BadRequest => {
                self.keep_alive = false;
                let mut response = Response::new();
                response.set_status(400).set_body(&b"Bad Request"[..]);
                response
            }
            ParseOutcome::NotImplemented => {
                self.keep_alive = false;
                let mut response = Response::new();
                response.set_status(501).set_body(&b"Not Implemented"[..]);
                response
            }
        }
    }

    /// Drives the `Reading -> Writing` (or `-> Closed`) transition on a
    /// recv completion.
    pub fn on_recv_complete(&mut self, ring: &mut RawRing, slot: usize, result: i32) -> RecvOutcome {
        self.pending_ops -= 1;
        if self.phase == Phase::Closed {
            return RecvOutcome::Closed;
        }
        if result <= 0 {
            self.phase = Phase::Closed;
            return RecvOutcome::Closed;
        }

        self.recv_len += result as usize;

        match parse::find_headers_end(&self.recv_buf[..], self.recv_len) {
            Some(_) => {
                let response = self.handle_request_line();
                self.send_buf = response.serialize(self.keep_alive);
                self.send_off = 0;
                self.post_send(ring, slot);
                RecvOutcome::Responded
            }
            None if self.recv_len >= self.recv_buf.len() => {
                self.keep_alive = false;
                let mut response = Response::new();
                response.set_status(400).set_body(&b"Bad Request"[..]);
                self.send_buf = response.serialize(false);
                self.send_off = 0;
                self.post_send(ring, slot);
                RecvOutcome::Responded
            }
            None => {
                self.post_recv(ring, slot);
                RecvOutcome::NeedMore
            }
        }
    }

    /// Drives the `Writing -> Reading` (keep-alive) or `-> Closed`
    /// transition on a send completion, including partial-send retry.
    pub fn on_send_complete(&mut self, ring: &mut RawRing, slot: usize, result: i32) -> bool {
        self.pending_ops -= 1;
        if self.phase == Phase::Closed {
            return self.is_done();
        }
        if result < 0 {
            self.phase = Phase::Closed;
            return self.is_done();
        }

        self.send_off += result as usize;
        if self.send_off < self.send_buf.len() {
            self.post_send(ring, slot);
            return self.is_done();
        }

        if self.keep_alive {
            self.reset_for_next_request();
            self.post_recv(ring, slot);
        } else {
            self.phase = Phase::Closed;
        }

        self.is_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteEntry;

    fn router_with_hello() -> Rc<Router> {
        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/hello".to_string(),
            handler: Box::new(|_req, res| {
                res.set_status(200).set_body(&b"hi"[..]);
            }),
        }]);
        Rc::new(router)
    }

    #[test]
    fn dispatch_hits_registered_route() {
        let fd = ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let session = Session::new(fd, router_with_hello(), 8192);
        let req = Request {
            method: Method::Get,
            path: "/hello".to_string(),
        };
        let response = session.dispatch(&req);
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"hi");
    }

    #[test]
    fn dispatch_misses_unregistered_path() {
        let fd = ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let session = Session::new(fd, router_with_hello(), 8192);
        let req = Request {
            method: Method::Get,
            path: "/missing".to_string(),
        };
        let response = session.dispatch(&req);
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn dispatch_converts_handler_panic_to_500() {
        let fd = ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/boom".to_string(),
            handler: Box::new(|_req, _res| panic!("handler blew up")),
        }]);
        let session = Session::new(fd, Rc::new(router), 8192);
        let req = Request {
            method: Method::Get,
            path: "/boom".to_string(),
        };
        let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| session.dispatch(&req)))
            .expect("catch_unwind inside dispatch must absorb the panic");
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn handle_request_line_sets_keep_alive_false_on_close_header() {
        let fd = ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let mut session = Session::new(fd, router_with_hello(), 8192);
        let line = b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n";
        session.recv_buf[..line.len()].copy_from_slice(line);
        session.recv_len = line.len();
        let _ = session.handle_request_line();
        assert!(!session.keep_alive);
    }

    #[test]
    fn handle_request_line_rejects_unsupported_method() {
        let fd = ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let mut session = Session::new(fd, router_with_hello(), 8192);
        let line = b"DELETE /hello HTTP/1.1\r\n\r\n";
        session.recv_buf[..line.len()].copy_from_slice(line);
        session.recv_len = line.len();
        let response = session.handle_request_line();
        assert_eq!(response.status(), 501);
        assert!(!session.keep_alive);
    }
}
