//! Composition root: parse CLI/env config, install signal handlers,
//! register routes, and run the event loop.

use std::sync::atomic::{AtomicBool, Ordering};

use httpd::{Httpd, Method, RouteEntry, Router, ServerConfig};

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, handle_shutdown_signal as usize);
        libc::signal(libc::SIGTERM, handle_shutdown_signal as usize);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

fn parse_args(config: ServerConfig) -> ServerConfig {
    let mut config = config;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                    config.port = v;
                }
                i += 1;
            }
            "--sq-entries" => {
                if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                    config.sq_entries = v;
                }
                i += 1;
            }
            "--max-sessions" => {
                if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                    config.max_sessions = v;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    config
}

fn build_router() -> Router {
    let mut router = Router::new();
    router.load_routes(vec![
        RouteEntry {
            method: Method::Get,
            path: "/".to_string(),
            handler: Box::new(|_req, res| {
                res.set_status(200).set_body(&b"hello from httpd\n"[..]);
            }),
        },
        RouteEntry {
            method: Method::Get,
            path: "/health".to_string(),
            handler: Box::new(|_req, res| {
                res.set_status(200).set_body(&b"ok\n"[..]);
            }),
        },
    ]);
    router
}

fn main() {
    install_signal_handlers();

    let config = parse_args(ServerConfig::from_env());

    let mut server = match Httpd::new(config.clone(), build_router()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("httpd: failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start() {
        eprintln!("httpd: failed to start: {}", e);
        std::process::exit(1);
    }

    eprintln!("httpd: listening on port {}", config.port);
    server.run(&RUNNING);
    eprintln!("httpd: shut down");
}
