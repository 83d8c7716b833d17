//! Routing of inbound Discord messages.

use super::rpc::RpcPolicy;
use regex::Regex;

/// What to do with a Discord message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the message as a script.
    Rpc,
    /// Decode an addressing envelope and send it to IRC.
    Forward,
}

/// Ordered pattern table; the first pattern that matches decides the route.
#[derive(Debug, Clone)]
pub struct CommandTable {
    routes: Vec<(Regex, Route)>,
}

impl CommandTable {
    /// Build the table: the RPC prefix when enabled, then a catch-all that
    /// forwards to IRC.
    pub fn new(rpc: &RpcPolicy) -> Result<Self, regex::Error> {
        let mut routes = Vec::with_capacity(2);
        if rpc.enabled {
            let pattern = format!(r"^{}(\s|$)", regex::escape(&rpc.prefix));
            routes.push((Regex::new(&pattern)?, Route::Rpc));
        }
        // Replies carry no leading '#', so forwarding must see everything else.
        routes.push((Regex::new(r"(?s).*")?, Route::Forward));
        Ok(Self { routes })
    }

    pub fn route(&self, body: &str) -> Route {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(body))
            .map(|(_, route)| *route)
            .unwrap_or(Route::Forward)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
