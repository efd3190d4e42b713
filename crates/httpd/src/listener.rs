//! Listening socket: creation, the ever-pending accept, and handing off
//! new connections.

use ringreactor::ring::RawRing;

use crate::error::{HttpdError, Result};

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

fn set_sockopt_bool(fd: i32, level: i32, name: i32, on: bool) -> std::io::Result<()> {
    let val: libc::c_int = if on { 1 } else { 0 };
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &val as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub struct Listener {
    fd: ringcore::fd::OwnedFd,
    /// Reused across every pending accept — stable address for the
    /// kernel to write the peer address into.
    peer_addr: libc::sockaddr_in,
    peer_addrlen: libc::socklen_t,
}

impl Listener {
    /// Creates a non-blocking, `SO_REUSEADDR`/`SO_REUSEPORT` IPv4 stream
    /// socket bound to `port` on all interfaces.
    pub fn create(port: u16) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_STREAM | libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
                0,
            )
        };
        if fd < 0 {
            return Err(HttpdError::SocketCreate(last_errno()));
        }
        let fd = ringcore::fd::OwnedFd::from_raw(fd);

        set_sockopt_bool(fd.raw(), libc::SOL_SOCKET, libc::SO_REUSEADDR, true)
            .map_err(|_| HttpdError::SetSockOpt(last_errno()))?;
        set_sockopt_bool(fd.raw(), libc::SOL_SOCKET, libc::SO_REUSEPORT, true)
            .map_err(|_| HttpdError::SetSockOpt(last_errno()))?;
        set_sockopt_bool(fd.raw(), libc::IPPROTO_TCP, libc::TCP_NODELAY, true)
            .map_err(|_| HttpdError::SetSockOpt(last_errno()))?;

        let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = port.to_be();
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();

        let ret = unsafe {
            libc::bind(
                fd.raw(),
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(HttpdError::Bind(last_errno()));
        }

        Ok(Self {
            fd,
            peer_addr: unsafe { std::mem::zeroed() },
            peer_addrlen: std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        })
    }

    /// `listen()`s and posts the first accept.
    pub fn start(&mut self, ring: &mut RawRing) -> Result<()> {
        let ret = unsafe { libc::listen(self.fd.raw(), libc::SOMAXCONN) };
        if ret < 0 {
            return Err(HttpdError::Listen(last_errno()));
        }
        self.post_accept(ring);
        Ok(())
    }

    fn post_accept(&mut self, ring: &mut RawRing) {
        self.peer_addrlen = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        let sqe = match ring.acquire_sqe() {
            Some(sqe) => sqe,
            None => {
                eprintln!("httpd: accept queue full, dropping an accept cycle");
                return;
            }
        };
        let addr_ptr = &mut self.peer_addr as *mut libc::sockaddr_in as *mut libc::sockaddr;
        let addrlen_ptr = &mut self.peer_addrlen as *mut libc::socklen_t;
        let tag = ringcore::tag::make(ringcore::tag::OP_ACCEPT, 0);
        ringreactor::sqe::prep_accept(sqe, self.fd.raw(), addr_ptr, addrlen_ptr, tag);
        let _ = ring.flush();
    }

    /// Handles an accept completion. Always re-posts the next accept.
    /// Returns the new connection's fd on success.
    pub fn on_complete(&mut self, ring: &mut RawRing, result: i32) -> Option<ringcore::fd::OwnedFd> {
        let accepted = if result >= 0 {
            Some(ringcore::fd::OwnedFd::from_raw(result))
        } else {
            eprintln!("httpd: accept failed: errno {}", -result);
            None
        };
        self.post_accept(ring);
        accepted
    }
}
