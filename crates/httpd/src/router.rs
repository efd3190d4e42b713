//! Method → path → handler routing table.
//!
//! Built once before the event loop starts and never mutated while
//! accepting connections — single-threaded, so no locking is needed.

use std::collections::HashMap;

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

pub type Handler = Box<dyn Fn(&Request, &mut Response) + Send + Sync>;

pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub handler: Handler,
}

#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, HashMap<String, Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the routing table with `entries`.
    pub fn load_routes(&mut self, entries: Vec<RouteEntry>) {
        self.routes.clear();
        for entry in entries {
            self.routes
                .entry(entry.method)
                .or_default()
                .insert(entry.path, entry.handler);
        }
    }

    /// Exact-match lookup.
    pub fn find_handler(&self, method: Method, path: &str) -> Option<&Handler> {
        self.routes.get(&method)?.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_registered_route() {
        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/hello".to_string(),
            handler: Box::new(|_req, res| {
                res.set_body(&b"hi"[..]);
            }),
        }]);
        assert!(router.find_handler(Method::Get, "/hello").is_some());
    }

    #[test]
    fn misses_unregistered_path() {
        let router = Router::new();
        assert!(router.find_handler(Method::Get, "/missing").is_none());
    }

    #[test]
    fn method_is_part_of_the_key() {
        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Post,
            path: "/same".to_string(),
            handler: Box::new(|_req, _res| {}),
        }]);
        assert!(router.find_handler(Method::Post, "/same").is_some());
        assert!(router.find_handler(Method::Get, "/same").is_none());
    }

    #[test]
    fn load_routes_replaces_previous_table() {
        let mut router = Router::new();
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/a".to_string(),
            handler: Box::new(|_req, _res| {}),
        }]);
        router.load_routes(vec![RouteEntry {
            method: Method::Get,
            path: "/b".to_string(),
            handler: Box::new(|_req, _res| {}),
        }]);
        assert!(router.find_handler(Method::Get, "/a").is_none());
        assert!(router.find_handler(Method::Get, "/b").is_some());
    }
}
