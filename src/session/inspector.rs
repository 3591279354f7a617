//! Offline access-token expiry checks. Signatures are not verified here; the
//! backend remains the authority. Anything that cannot be decoded counts as
//! expired.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Deserialize)]
struct Claims {
    exp: f64,
}

/// Returns the `exp` claim (seconds since epoch) of a JWT-shaped token.
#[must_use]
pub fn expires_at(token: &str) -> Option<i64> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    if !claims.exp.is_finite() {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    Some(claims.exp.floor() as i64)
}

/// True when `now` (seconds since epoch) is at or past the token expiry.
#[must_use]
pub fn is_expired_at(token: &str, now: i64) -> bool {
    expires_at(token).map_or(true, |exp| now >= exp)
}

/// True when the token is expired or undecodable.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, unix_now())
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}
