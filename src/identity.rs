use std::net::SocketAddr;

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

// Client identity for cooldown records. Identities are anonymous on
// purpose: a bearer key is hashed before use so the raw key never reaches
// logs or the record map. Without a key, fall back to the nearest
// forwarded hop, then the peer address.
pub fn extract_identity(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(token) = bearer_token(headers) {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        return digest[..16].to_string();
    }

    if let Some(hop) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return hop.to_string();
    }

    peer.ip().to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.0.0.9:4321".parse().unwrap()
    }

    fn with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_key_is_hashed_and_stable() {
        let first = extract_identity(&with_bearer("sk-secret"), peer());
        let again = extract_identity(&with_bearer("sk-secret"), peer());
        let other = extract_identity(&with_bearer("sk-other"), peer());

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.len(), 16);
        assert!(!first.contains("sk-secret"));
    }

    #[test]
    fn forwarded_hop_beats_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(extract_identity(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn peer_address_is_the_last_resort() {
        assert_eq!(extract_identity(&HeaderMap::new(), peer()), "10.0.0.9");
    }

    #[test]
    fn non_bearer_auth_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(extract_identity(&headers, peer()), "10.0.0.9");
    }
}
