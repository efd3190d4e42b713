//! `Httpd` — wires the ring engine, listener, session slab, and router
//! into the single-threaded event loop.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use ringreactor::ring::{Completion, RawRing};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::listener::Listener;
use crate::router::Router;
use crate::session::{RecvOutcome, Session};
use crate::slab::SessionSlab;
use crate::stats::Stats;

pub struct Httpd {
    ring: RawRing,
    listener: Listener,
    sessions: SessionSlab,
    router: Rc<Router>,
    recv_buf_size: usize,
    stats: Stats,
    comp_buf: Vec<Completion>,
}

impl Httpd {
    pub fn new(config: ServerConfig, router: Router) -> Result<Self> {
        let ring = RawRing::new(config.sq_entries)?;
        let listener = Listener::create(config.port)?;
        let sessions = SessionSlab::new(config.max_sessions);
        Ok(Self {
            ring,
            listener,
            sessions,
            router: Rc::new(router),
            recv_buf_size: config.recv_buf_size,
            stats: Stats::new(),
            comp_buf: Vec::with_capacity(256),
        })
    }

    /// Starts listening and posts the first accept. Must be called
    /// before [`Httpd::run`].
    pub fn start(&mut self) -> Result<()> {
        self.listener.start(&mut self.ring)?;
        Ok(())
    }

    /// Runs the event loop until `running` is cleared (by a signal
    /// handler, typically). Never returns `Ok` early — a `false`
    /// `running` flag is the only way out.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            self.comp_buf.clear();
            self.ring.wait_and_drain(&mut self.comp_buf);
            let completions = std::mem::take(&mut self.comp_buf);
            for comp in &completions {
                self.dispatch_completion(*comp);
            }
            self.comp_buf = completions;
            self.stats.maybe_print(self.sessions.active());
        }
    }

    fn dispatch_completion(&mut self, comp: Completion) {
        let op = ringcore::tag::decode_op(comp.user_data);
        if op == ringcore::tag::OP_ACCEPT {
            self.handle_accept(comp.result);
        } else if op == ringcore::tag::OP_RECV {
            self.handle_recv(ringcore::tag::decode_idx(comp.user_data), comp.result);
        } else if op == ringcore::tag::OP_SEND {
            self.handle_send(ringcore::tag::decode_idx(comp.user_data), comp.result);
        }
    }

    fn handle_accept(&mut self, result: i32) {
        let accepted = self.listener.on_complete(&mut self.ring, result);
        let fd = match accepted {
            Some(fd) => fd,
            None => {
                self.stats.errors += 1;
                return;
            }
        };
        self.stats.accepts += 1;

        let session = Session::new(fd, self.router.clone(), self.recv_buf_size);
        let slot = match self.sessions.insert(session) {
            Some(slot) => slot,
            None => {
                eprintln!("httpd: session slab full, dropping new connection");
                return;
            }
        };
        let started = self
            .sessions
            .get_mut(slot)
            .expect("just inserted")
            .start(&mut self.ring, slot);
        if !started {
            self.sessions.remove(slot);
        }
    }

    fn handle_recv(&mut self, slot: usize, result: i32) {
        let session = match self.sessions.get_mut(slot) {
            Some(s) => s,
            None => return,
        };
        let outcome = session.on_recv_complete(&mut self.ring, slot, result);
        if outcome == RecvOutcome::Responded {
            self.stats.requests += 1;
        }
        if session.is_done() {
            self.sessions.remove(slot);
        }
    }

    fn handle_send(&mut self, slot: usize, result: i32) {
        let session = match self.sessions.get_mut(slot) {
            Some(s) => s,
            None => return,
        };
        session.on_send_complete(&mut self.ring, slot, result);
        if session.is_done() {
            self.sessions.remove(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    //! End-to-end scenarios driving a real server instance over
    //! loopback. Each test uses its own port to stay independent under
    //! parallel test execution.

    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::method::Method;
    use crate::router::RouteEntry;

    fn spawn_server(port: u16) -> (thread::JoinHandle<()>, &'static AtomicBool) {
        let running: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(true)));

        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/hello".to_string(),
            handler: Box::new(|_req, res| {
                res.set_status(200).set_body(&b"hi"[..]);
            }),
        }]);

        let config = ServerConfig::default().port(port).max_sessions(16);
        let handle = thread::spawn(move || {
            let mut server = Httpd::new(config, router).expect("ring/listener setup");
            server.start().expect("listen");
            server.run(running);
        });

        // Give the listener a moment to post its first accept.
        thread::sleep(Duration::from_millis(50));
        (handle, running)
    }

    fn shutdown(handle: thread::JoinHandle<()>, running: &'static AtomicBool, port: u16) {
        running.store(false, Ordering::Relaxed);
        // Wake the blocked io_uring_enter wait with one more accept completion.
        let _ = TcpStream::connect(("127.0.0.1", port));
        handle.join().expect("server thread panicked");
    }

    fn roundtrip(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
        stream.write_all(request.as_bytes()).expect("write request");
        let mut buf = Vec::new();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn registered_route_returns_200() {
        let (handle, running) = spawn_server(18081);
        let resp = roundtrip(18081, "GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(resp.ends_with("hi"));
        shutdown(handle, running, 18081);
    }

    #[test]
    fn unregistered_route_returns_404() {
        let (handle, running) = spawn_server(18082);
        let resp = roundtrip(18082, "GET /missing HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert!(resp.starts_with("HTTP/1.1 404 Not Found\r\n"));
        shutdown(handle, running, 18082);
    }

    #[test]
    fn unsupported_method_returns_501() {
        let (handle, running) = spawn_server(18083);
        let resp = roundtrip(18083, "DELETE /hello HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert!(resp.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        shutdown(handle, running, 18083);
    }

    #[test]
    fn malformed_request_line_returns_400() {
        let (handle, running) = spawn_server(18084);
        let resp = roundtrip(18084, "GARBAGE\r\n\r\n");
        assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        shutdown(handle, running, 18084);
    }

    #[test]
    fn keep_alive_serves_a_second_request_on_the_same_connection() {
        let (handle, running) = spawn_server(18085);
        let mut stream = TcpStream::connect(("127.0.0.1", 18085)).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        stream
            .write_all(b"GET /hello HTTP/1.1\r\n\r\n")
            .expect("write first request");
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).expect("read first response");
        let first = String::from_utf8_lossy(&buf[..n]);
        assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(first.contains("Connection: keep-alive\r\n"));

        stream
            .write_all(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n")
            .expect("write second request");
        let n = stream.read(&mut buf).expect("read second response");
        let second = String::from_utf8_lossy(&buf[..n]);
        assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(second.contains("Connection: close\r\n"));

        shutdown(handle, running, 18085);
    }

    #[test]
    fn connection_close_header_ends_the_connection() {
        let (handle, running) = spawn_server(18086);
        let mut stream = TcpStream::connect(("127.0.0.1", 18086)).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        stream
            .write_all(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n")
            .expect("write request");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            }
        }
        assert!(String::from_utf8_lossy(&buf).contains("Connection: close\r\n"));
        shutdown(handle, running, 18086);
    }
}
