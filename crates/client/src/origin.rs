//! Cached HTTP origins.
//!
//! Responsibilities:
//! - Parse an appliance URL into protocol, host label, domain suffix and port.
//! - Hold one named origin behind a read/write lock with time-boxed caching.
//! - Derive a sibling origin (the cluster leader) from the appliance origin.
//!
//! Does NOT handle:
//! - Deciding which origin a request targets (see `client::resolver`).
//!
//! Invariants:
//! - A write replaces every field and the cache timestamp together.
//! - URL parsing happens before the lock is taken.
//! - IP literal hosts are kept whole and never carry a domain suffix.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use url::{Host, Url};

use crate::error::{ClientError, Result};

/// URL scheme of an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub const fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

/// A parsed HTTP origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    protocol: Protocol,
    host: String,
    domain: Option<String>,
    port: u16,
    raw: String,
}

impl Origin {
    /// Parse an absolute `http`/`https` URL.
    ///
    /// The hostname is split on `.`: the first label is the host and the
    /// remaining labels form the domain suffix. A missing port defaults to
    /// the protocol's well-known port.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))?;

        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => return Err(ClientError::UnsupportedProtocol(other.to_string())),
        };

        let (host, domain) = match url.host() {
            Some(Host::Domain(name)) => match name.split_once('.') {
                Some((label, rest)) if !rest.is_empty() => {
                    (label.to_string(), Some(rest.to_string()))
                }
                _ => (name.trim_end_matches('.').to_string(), None),
            },
            Some(Host::Ipv4(addr)) => (addr.to_string(), None),
            Some(Host::Ipv6(addr)) => (format!("[{addr}]"), None),
            None => return Err(ClientError::InvalidUrl(format!("{raw}: missing host"))),
        };

        if host.is_empty() {
            return Err(ClientError::InvalidUrl(format!("{raw}: empty host label")));
        }

        let port = url.port().unwrap_or(protocol.default_port());

        Ok(Self {
            protocol,
            host,
            domain,
            port,
            raw: raw.trim_end_matches('/').to_string(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// First label of the hostname.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Hostname labels after the first, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The URL this origin was parsed from, without trailing slashes.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Full hostname, `host[.domain]`.
    pub fn hostname(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}.{}", self.host, domain),
            None => self.host.clone(),
        }
    }

    /// Canonical `protocol://hostname:port` form.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.protocol.as_str(),
            self.hostname(),
            self.port
        )
    }

    /// Sibling origin sharing this origin's protocol, domain suffix and port.
    pub fn with_host_label(&self, label: &str) -> Self {
        let mut sibling = Self {
            protocol: self.protocol,
            host: label.to_string(),
            domain: self.domain.clone(),
            port: self.port,
            raw: String::new(),
        };
        sibling.raw = sibling.url();
        sibling
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// How long a cached origin stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Never expires.
    Forever,
    /// Expires once the duration has elapsed. `Duration::ZERO` is always expired.
    Expiring(Duration),
}

impl From<Duration> for CacheTtl {
    fn from(duration: Duration) -> Self {
        CacheTtl::Expiring(duration)
    }
}

#[derive(Debug, Clone)]
struct CachedOrigin {
    origin: Origin,
    cached_at: Instant,
    ttl: CacheTtl,
}

/// Thread-safe holder for one named origin.
#[derive(Debug)]
pub struct EndpointCache {
    name: &'static str,
    state: RwLock<Option<CachedOrigin>>,
}

impl EndpointCache {
    /// Create an empty cache. An empty cache reads as `None` and is expired.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current origin URL, if one has been written.
    pub fn read(&self) -> Option<String> {
        self.origin().map(|origin| origin.url())
    }

    /// Current parsed origin, if one has been written.
    pub fn origin(&self) -> Option<Origin> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|cached| cached.origin.clone())
    }

    /// Parse `url` and replace the cached origin.
    pub fn write(&self, url: &str, ttl: CacheTtl) -> Result<()> {
        let origin = Origin::parse(url)?;
        self.store(origin, ttl);
        Ok(())
    }

    /// Replace the cached origin with an already parsed one.
    pub fn store(&self, origin: Origin, ttl: CacheTtl) {
        let cached = CachedOrigin {
            origin,
            cached_at: Instant::now(),
            ttl,
        };
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(cached);
    }

    /// True when nothing is cached or the cache duration has elapsed.
    pub fn is_expired(&self) -> bool {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            None => true,
            Some(cached) => match cached.ttl {
                CacheTtl::Forever => false,
                CacheTtl::Expiring(ttl) if ttl.is_zero() => true,
                CacheTtl::Expiring(ttl) => cached.cached_at.elapsed() > ttl,
            },
        }
    }
}
