//! Known peer nodes, keyed by normalized `host:port`.

use crate::error::ChainError;
use std::collections::BTreeSet;
use url::Url;

/// Reduce a peer URL to the `host[:port]` it points at.
///
/// Scheme, credentials, path and query are dropped. An address without a
/// scheme such as `10.0.0.5:5000` is read as `http://10.0.0.5:5000`. Host
/// names are lowercased. A port that was written out is kept even when it is
/// the scheme default, since peers are always fetched over plain http.
pub fn normalize_peer_address(address: &str) -> Result<String, ChainError> {
    let trimmed = address.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ChainError::InvalidPeerAddress(format!("{}: {}", address, e)))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ChainError::InvalidPeerAddress(format!("{}: no host", address)))?;

    let port = match url.port() {
        Some(port) => Some(port),
        None if has_explicit_port(&with_scheme) => url.port_or_known_default(),
        None => None,
    };

    Ok(match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Whether the authority of `url` spells out a port.
fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    // Skip past an IPv6 literal so its colons are not read as a port.
    let after_host = host_port.rsplit(']').next().unwrap_or(host_port);
    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

/// Deduplicated set of peer addresses. Iteration is in sorted order, which
/// is also the order consensus scans peers in.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `address` and insert it. Returns `true` if it was not known yet.
    pub fn add(&mut self, address: &str) -> Result<bool, ChainError> {
        let normalized = normalize_peer_address(address)?;
        Ok(self.peers.insert(normalized))
    }

    pub fn list(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_and_bare_address_collapse() {
        let mut registry = PeerRegistry::new();
        assert!(registry.add("http://10.0.0.5:5000/get_chain").unwrap());
        assert!(!registry.add("10.0.0.5:5000").unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list(), vec!["10.0.0.5:5000".to_string()]);
    }

    #[test]
    fn test_normalize_strips_scheme_path_and_query() {
        assert_eq!(
            normalize_peer_address("https://node.example:8443/a/b?x=1#frag").unwrap(),
            "node.example:8443"
        );
        assert_eq!(
            normalize_peer_address("http://127.0.0.1:5001").unwrap(),
            "127.0.0.1:5001"
        );
        assert_eq!(
            normalize_peer_address("  localhost:5002  ").unwrap(),
            "localhost:5002"
        );
        assert_eq!(normalize_peer_address("http://peer").unwrap(), "peer");
    }

    #[test]
    fn test_default_ports_written_out_are_kept() {
        assert_eq!(
            normalize_peer_address("https://10.0.0.5:443/get_chain").unwrap(),
            "10.0.0.5:443"
        );
        assert_eq!(
            normalize_peer_address("http://10.0.0.5:80").unwrap(),
            "10.0.0.5:80"
        );
        assert_eq!(normalize_peer_address("10.0.0.5:80").unwrap(), "10.0.0.5:80");
        assert_eq!(
            normalize_peer_address("http://user:pw@Node.Example:80/x").unwrap(),
            "node.example:80"
        );
        assert_eq!(normalize_peer_address("http://[::1]:80").unwrap(), "[::1]:80");
        assert_eq!(normalize_peer_address("http://[::1]").unwrap(), "[::1]");
    }

    #[test]
    fn test_normalized_address_is_a_fixed_point() {
        for address in ["https://10.0.0.5:443", "http://peer:80/get_chain", "peer:5000"] {
            let once = normalize_peer_address(address).unwrap();
            assert_eq!(normalize_peer_address(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_invalid_addresses_are_rejected() {
        for bad in ["", "http://", "file:///tmp/chain"] {
            assert!(matches!(
                normalize_peer_address(bad),
                Err(ChainError::InvalidPeerAddress(_))
            ));
        }
    }

    #[test]
    fn test_list_is_sorted() {
        let mut registry = PeerRegistry::new();
        registry.add("http://c:5000").unwrap();
        registry.add("http://a:5000").unwrap();
        registry.add("http://b:5000").unwrap();
        assert_eq!(registry.list(), vec!["a:5000", "b:5000", "c:5000"]);
    }

    #[test]
    fn test_failed_add_leaves_registry_unchanged() {
        let mut registry = PeerRegistry::new();
        assert!(registry.add("http://").is_err());
        assert!(registry.is_empty());
    }
}
