//! Access/refresh token pair and its expiry arithmetic.
//!
//! # Design
//! The server reports both expiries as epoch milliseconds. A token counts as
//! usable while `round(expiry_ms / 1000 - drift) > now`, with `now` in
//! fractional epoch seconds. Rounding is half-to-even and the comparison is
//! strict, so a token whose adjusted expiry equals `now` is already expired.

use std::time::Duration;

/// Tokens returned by sign-in or refresh. All four fields are always replaced
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_ms: i64,
    pub refresh_expires_ms: i64,
}

/// Where the session sits in the token lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token has ever been obtained.
    Unauthenticated,
    /// The access token is still usable; authenticating is a no-op.
    AccessValid,
    /// The access token expired but the refresh token can renew it.
    RefreshValid,
    /// Both tokens are expired (or the refresh token is empty).
    FullyExpired,
}

/// `true` when a token expiring at `expires_ms` is still usable at `now`.
pub fn is_unexpired(expires_ms: i64, drift: Duration, now: f64) -> bool {
    let adjusted = (expires_ms as f64 / 1000.0 - drift.as_secs_f64()).round_ties_even();
    adjusted > now
}

impl TokenState {
    pub fn status_at(&self, drift: Duration, now: f64) -> TokenStatus {
        if self.access_token.is_empty() {
            return TokenStatus::Unauthenticated;
        }
        if is_unexpired(self.access_expires_ms, drift, now) {
            TokenStatus::AccessValid
        } else if !self.refresh_token.is_empty()
            && is_unexpired(self.refresh_expires_ms, drift, now)
        {
            TokenStatus::RefreshValid
        } else {
            TokenStatus::FullyExpired
        }
    }
}

/// Status of an optional token pair; `None` means never authenticated.
pub fn status_of(token: Option<&TokenState>, drift: Duration, now: f64) -> TokenStatus {
    token.map_or(TokenStatus::Unauthenticated, |t| t.status_at(drift, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn tokens(access_secs: f64, refresh_secs: f64) -> TokenState {
        TokenState {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            access_expires_ms: ((NOW + access_secs) * 1000.0) as i64,
            refresh_expires_ms: ((NOW + refresh_secs) * 1000.0) as i64,
        }
    }

    #[test]
    fn none_is_unauthenticated() {
        assert_eq!(status_of(None, Duration::ZERO, NOW), TokenStatus::Unauthenticated);
    }

    #[test]
    fn future_access_token_is_valid() {
        let t = tokens(900.0, 86_400.0);
        assert_eq!(t.status_at(Duration::ZERO, NOW), TokenStatus::AccessValid);
    }

    #[test]
    fn expired_access_with_live_refresh() {
        let t = tokens(-1.0, 86_400.0);
        assert_eq!(t.status_at(Duration::ZERO, NOW), TokenStatus::RefreshValid);
    }

    #[test]
    fn both_expired() {
        let t = tokens(-10.0, -1.0);
        assert_eq!(t.status_at(Duration::ZERO, NOW), TokenStatus::FullyExpired);
    }

    #[test]
    fn empty_refresh_token_is_fully_expired() {
        let mut t = tokens(-10.0, 86_400.0);
        t.refresh_token.clear();
        assert_eq!(t.status_at(Duration::ZERO, NOW), TokenStatus::FullyExpired);
    }

    #[test]
    fn drift_equal_to_remaining_lifetime_is_expired() {
        let drift = Duration::from_secs(60);
        assert!(!is_unexpired(((NOW + 60.0) * 1000.0) as i64, drift, NOW));
        assert!(is_unexpired(((NOW + 61.0) * 1000.0) as i64, drift, NOW));
    }

    #[test]
    fn drift_pushes_access_into_refresh() {
        let t = tokens(30.0, 86_400.0);
        assert_eq!(t.status_at(Duration::ZERO, NOW), TokenStatus::AccessValid);
        assert_eq!(t.status_at(Duration::from_secs(30), NOW), TokenStatus::RefreshValid);
    }

    #[test]
    fn expiry_rounds_half_to_even() {
        // 1_700_000_000.5 rounds down to 1_700_000_000, which is not > NOW.
        assert!(!is_unexpired(1_700_000_000_500, Duration::ZERO, NOW));
        // 1_700_000_001.5 rounds up to 1_700_000_002.
        assert!(is_unexpired(1_700_000_001_500, Duration::ZERO, NOW + 1.9));
    }

    #[test]
    fn fractional_now_is_compared_directly() {
        assert!(is_unexpired(1_700_000_001_000, Duration::ZERO, NOW + 0.999));
        assert!(!is_unexpired(1_700_000_001_000, Duration::ZERO, NOW + 1.0));
    }
}
