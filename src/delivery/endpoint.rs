//! Candidate targets and the policy for moving between them.

use crate::config::Config;
use crate::error::Error;
use serde::Serialize;

/// Which candidate a target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Primary,
    Fallback,
}

impl TargetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetRole::Primary => "primary",
            TargetRole::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for TargetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `host:port` a request can be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: TargetRole,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(role: TargetRole, host: impl Into<String>, port: u16) -> Self {
        Self {
            role,
            host: host.into(),
            port,
        }
    }

    /// Full URL for a backend path such as `/event`.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://{}:{}/{path}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Ordered list of candidates, tried front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    candidates: Vec<Endpoint>,
}

impl Endpoints {
    /// Primary first, then the fallback on the same host.
    pub fn pair(host: &str, primary: u16, fallback: u16) -> Self {
        Self {
            candidates: vec![
                Endpoint::new(TargetRole::Primary, host, primary),
                Endpoint::new(TargetRole::Fallback, host, fallback),
            ],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::pair(
            &config.backend_host,
            config.backend_port,
            config.fallback_port(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Decides whether a failed attempt falls through to the next candidate.
///
/// Only transport failures do: a peer that answered with an error status is
/// most likely the same backend that would answer on the other port.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    pub fn should_try_next(&self, error: &Error) -> bool {
        error.is_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_pairs_8000_with_8001() {
        let endpoints = Endpoints::from_config(&Config::default());
        let ports: Vec<_> = endpoints.iter().map(|e| (e.role, e.port)).collect();
        assert_eq!(
            ports,
            vec![(TargetRole::Primary, 8000), (TargetRole::Fallback, 8001)]
        );
    }

    #[test]
    fn url_joins_path_once() {
        let endpoint = Endpoint::new(TargetRole::Primary, "127.0.0.1", 8000);
        assert_eq!(endpoint.url("/event"), "http://127.0.0.1:8000/event");
        assert_eq!(endpoint.url("timeline"), "http://127.0.0.1:8000/timeline");
    }

    #[test]
    fn only_transport_errors_fall_through() {
        let policy = RetryPolicy;
        assert!(policy.should_try_next(&Error::Transport {
            target: "127.0.0.1:8000".into(),
            message: "connection refused".into(),
        }));
        assert!(!policy.should_try_next(&Error::Protocol {
            target: "127.0.0.1:8000".into(),
            status: 500,
            body: String::new(),
        }));
    }
}
