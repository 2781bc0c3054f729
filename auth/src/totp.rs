//! TOTP code derivation and window verification (RFC 6238).
//!
//! Secrets are base32-encoded (RFC 4648, unpadded) as provisioned by
//! standard authenticator apps. Derivation is HMAC-SHA1 with dynamic
//! truncation per the RFC; verification accepts a configurable number of
//! steps either side of the current one to absorb clock drift.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Derive the code for one time-step counter.
///
/// Returns `None` when the secret is not valid base32 or is too short to
/// key the HMAC — misconfigured secrets must fail closed, not panic.
#[must_use]
pub fn code_at(secret_base32: &str, counter: u64, digits: u32) -> Option<String> {
    let key_bytes = base32::decode(
        base32::Alphabet::Rfc4648 { padding: false },
        secret_base32.trim(),
    )?;

    let mut mac = HmacSha1::new_from_slice(&key_bytes).ok()?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 §5.3).
    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let truncated = (u32::from(hash[offset] & 0x7f) << 24)
        | (u32::from(hash[offset + 1]) << 16)
        | (u32::from(hash[offset + 2]) << 8)
        | u32::from(hash[offset + 3]);

    let code = truncated % 10u32.pow(digits);
    Some(format!("{code:0width$}", width = digits as usize))
}

/// Check a presented code against the window around `unix_time`.
///
/// Accepts the current step plus `skew_steps` either side. Comparison is
/// constant-time per candidate. A malformed secret or a pre-epoch clock
/// verifies nothing.
#[must_use]
pub fn verify_code(
    secret_base32: &str,
    presented: &str,
    unix_time: i64,
    step_seconds: u64,
    skew_steps: u64,
    digits: u32,
) -> bool {
    if unix_time < 0 || step_seconds == 0 {
        return false;
    }
    #[allow(clippy::cast_sign_loss)]
    let current = unix_time as u64 / step_seconds;

    let mut matched = false;
    for counter in current.saturating_sub(skew_steps)..=current.saturating_add(skew_steps) {
        if let Some(expected) = code_at(secret_base32, counter, digits) {
            // No early exit: every candidate is compared so timing does not
            // reveal which step matched.
            matched |= constant_time_eq::constant_time_eq(
                expected.as_bytes(),
                presented.as_bytes(),
            );
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B reference secret ("12345678901234567890" in
    // base32) and its SHA-1 vectors, truncated to six digits.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc6238_reference_codes() {
        for (unix_time, expected) in [
            (59_i64, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
        ] {
            #[allow(clippy::cast_sign_loss)]
            let counter = unix_time as u64 / 30;
            assert_eq!(
                code_at(RFC_SECRET, counter, 6).as_deref(),
                Some(expected),
                "t={unix_time}"
            );
        }
    }

    #[test]
    fn accepts_adjacent_steps_within_skew() {
        let now = 1_111_111_109_i64;
        let current = code_at(RFC_SECRET, 1_111_111_109 / 30, 6).unwrap();
        let previous = code_at(RFC_SECRET, 1_111_111_109 / 30 - 1, 6).unwrap();
        let two_back = code_at(RFC_SECRET, 1_111_111_109 / 30 - 2, 6).unwrap();

        assert!(verify_code(RFC_SECRET, &current, now, 30, 1, 6));
        assert!(verify_code(RFC_SECRET, &previous, now, 30, 1, 6));
        assert!(!verify_code(RFC_SECRET, &two_back, now, 30, 1, 6));
    }

    #[test]
    fn rejects_wrong_code() {
        assert!(!verify_code(RFC_SECRET, "000000", 59, 30, 1, 6));
    }

    #[test]
    fn malformed_secret_fails_closed() {
        assert_eq!(code_at("not base32!!", 1, 6), None);
        assert!(!verify_code("not base32!!", "287082", 59, 30, 1, 6));
    }

    #[test]
    fn pre_epoch_clock_fails_closed() {
        assert!(!verify_code(RFC_SECRET, "287082", -1, 30, 1, 6));
    }
}
