//! Periodic `eprintln!` diagnostics — no `log`/`tracing` dependency,
//! matching the rest of this workspace's ambient logging.

use std::time::Instant;

pub struct Stats {
    pub accepts: u64,
    pub requests: u64,
    pub errors: u64,
    last_print: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            accepts: 0,
            requests: 0,
            errors: 0,
            last_print: Instant::now(),
        }
    }

    /// Prints and resets the counters if at least five seconds have
    /// passed since the last print.
    pub fn maybe_print(&mut self, active_sessions: usize) {
        if self.last_print.elapsed().as_secs() < 5 {
            return;
        }
        eprintln!(
            "httpd: accepts={} requests={} errors={} active_sessions={}",
            self.accepts, self.requests, self.errors, active_sessions
        );
        self.last_print = Instant::now();
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
