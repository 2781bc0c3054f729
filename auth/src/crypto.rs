//! Token material: random secrets, hashes, fingerprints.
//!
//! Presented secrets (refresh tokens, challenge tokens, device tokens,
//! backup codes, emailed codes) are never persisted in clear — stores only
//! ever see the SHA-256 digests produced here.

use base64::Engine;
use rand::Rng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::net::IpAddr;

/// Generate a 256-bit random secret encoded as base64url (43 characters).
#[must_use]
pub fn generate_opaque_token() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; 32];
    rng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// SHA-256 digest of a presented secret, base64url-encoded.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a short numeric one-time code with uniformly random digits.
#[must_use]
pub fn generate_numeric_code(digits: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..digits).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

/// Device fingerprint: SHA-256 over the user agent and the truncated
/// client address.
///
/// The address is truncated to /24 for IPv4 and /64 for IPv6 so ordinary
/// DHCP churn within one network does not break recognition, while a token
/// replayed from elsewhere still fails.
#[must_use]
pub fn device_fingerprint(user_agent: &str, client_ip: IpAddr) -> String {
    let prefix = ip_prefix(client_ip);
    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn ip_prefix(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.0/24", o[0], o[1], o[2])
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}:{:x}::/64", s[0], s[1], s[2], s[3])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_tokens_are_unique_and_url_safe() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[test]
    fn hashing_is_deterministic_and_one_way() {
        let token = generate_opaque_token();
        assert_eq!(hash_secret(&token), hash_secret(&token));
        assert_ne!(hash_secret(&token), token);
    }

    #[test]
    fn numeric_codes_have_requested_length() {
        let code = generate_numeric_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn fingerprint_ignores_host_bits() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)";
        let a = device_fingerprint(ua, "203.0.113.7".parse().unwrap());
        let b = device_fingerprint(ua, "203.0.113.250".parse().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_network_or_agent() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)";
        let base = device_fingerprint(ua, "203.0.113.7".parse().unwrap());

        let other_net = device_fingerprint(ua, "198.51.100.7".parse().unwrap());
        assert_ne!(base, other_net);

        let other_ua = device_fingerprint("curl/8.0", "203.0.113.7".parse().unwrap());
        assert_ne!(base, other_ua);
    }

    #[test]
    fn ipv6_fingerprint_truncates_to_prefix() {
        let ua = "test-agent";
        let a = device_fingerprint(ua, "2001:db8:1:2:aaaa::1".parse().unwrap());
        let b = device_fingerprint(ua, "2001:db8:1:2:bbbb::9".parse().unwrap());
        assert_eq!(a, b);

        let c = device_fingerprint(ua, "2001:db8:1:3::1".parse().unwrap());
        assert_ne!(a, c);
    }
}
