//! Server configuration: compiled-in defaults layered with environment
//! variable overrides, builder-style (no config-file parser).
//!
//! Mirrors the override convention used elsewhere in this workspace for
//! runtime tuning knobs: compiled defaults, then an env var per field,
//! read once at startup.

use std::env;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub sq_entries: u32,
    pub max_sessions: usize,
    pub recv_buf_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            sq_entries: 4096,
            max_sessions: 4096,
            recv_buf_size: 8192,
        }
    }
}

impl ServerConfig {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn sq_entries(mut self, sq_entries: u32) -> Self {
        self.sq_entries = sq_entries;
        self
    }

    pub fn max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn recv_buf_size(mut self, recv_buf_size: usize) -> Self {
        self.recv_buf_size = recv_buf_size;
        self
    }

    /// Layers `HTTPD_PORT` / `HTTPD_SQ_ENTRIES` / `HTTPD_MAX_SESSIONS` /
    /// `HTTPD_RECV_BUF_SIZE` over the compiled-in defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_parsed::<u16>("HTTPD_PORT") {
            cfg.port = v;
        }
        if let Some(v) = env_parsed::<u32>("HTTPD_SQ_ENTRIES") {
            cfg.sq_entries = v;
        }
        if let Some(v) = env_parsed::<usize>("HTTPD_MAX_SESSIONS") {
            cfg.max_sessions = v;
        }
        if let Some(v) = env_parsed::<usize>("HTTPD_RECV_BUF_SIZE") {
            cfg.recv_buf_size = v;
        }
        cfg
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.sq_entries >= 1);
        assert!(cfg.max_sessions >= 1);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ServerConfig::default().port(9090).max_sessions(16);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.max_sessions, 16);
    }
}
