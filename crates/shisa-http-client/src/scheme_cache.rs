use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Default lifetime of a negotiated scheme
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// The two HTTP signature schemes found in the wild
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureScheme {
    /// RFC 9421 HTTP Message Signatures
    Rfc9421,

    /// Legacy draft-cavage HTTP Signatures
    Cavage,
}

impl SignatureScheme {
    /// The respective other scheme
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Rfc9421 => Self::Cavage,
            Self::Cavage => Self::Rfc9421,
        }
    }
}

struct Entry {
    scheme: SignatureScheme,
    expires_at: Instant,
}

/// Per-host memory of which signature scheme a remote peer accepted
///
/// Peers can't be asked in advance which scheme they require, so the client
/// knocks with one scheme after the other ("double knocking") and remembers
/// the winner here for a bounded time. Entries are only ever written after a
/// completed negotiation and are evicted eagerly when a cached scheme bounces
/// off a 401/403.
///
/// Worst case on a lost race between two outbound calls to the same host is
/// one extra rejected request, which the next call corrects.
pub struct SchemeCache {
    inner: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl SchemeCache {
    /// Create a cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up the scheme negotiated with `host`
    ///
    /// Expired entries count as absent and are dropped on the way out.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<SignatureScheme> {
        let mut guard = self.inner.lock().unwrap();

        match guard.get(host) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.scheme),
            Some(..) => {
                guard.remove(host);
                None
            }
            None => None,
        }
    }

    /// Record the scheme `host` accepted
    pub fn set(&self, host: &str, scheme: SignatureScheme) {
        let entry = Entry {
            scheme,
            expires_at: Instant::now() + self.ttl,
        };

        self.inner.lock().unwrap().insert(host.to_string(), entry);
    }

    /// Forget what was negotiated with `host`
    pub fn evict(&self, host: &str) {
        self.inner.lock().unwrap().remove(host);
    }
}

impl Default for SchemeCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod test {
    use super::{SchemeCache, SignatureScheme};
    use std::time::Duration;

    #[test]
    fn set_get_evict() {
        let cache = SchemeCache::default();

        assert_eq!(cache.get("example.com"), None);

        cache.set("example.com", SignatureScheme::Cavage);
        assert_eq!(cache.get("example.com"), Some(SignatureScheme::Cavage));

        cache.evict("example.com");
        assert_eq!(cache.get("example.com"), None);
    }

    #[test]
    fn expired_entries_are_absent() {
        let cache = SchemeCache::new(Duration::ZERO);

        cache.set("example.com", SignatureScheme::Rfc9421);
        assert_eq!(cache.get("example.com"), None);
    }

    #[test]
    fn other_scheme() {
        assert_eq!(
            SignatureScheme::Rfc9421.other(),
            SignatureScheme::Cavage
        );
        assert_eq!(
            SignatureScheme::Cavage.other(),
            SignatureScheme::Rfc9421
        );
    }
}
