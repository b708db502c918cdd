//! Voter origin extraction from request headers.

use axum::http::HeaderMap;
use poll_types::Origin;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";

/// Identify the voter from request metadata.
///
/// Uses the first entry of `X-Forwarded-For`, then `X-Real-IP`, then the
/// literal `"unknown"`. Headers that are absent, not valid UTF-8 or empty
/// after trimming count as missing. Nothing is verified: a client that sets
/// these headers itself picks its own origin.
pub fn extract_origin(headers: &HeaderMap) -> Origin {
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = header_str(headers, REAL_IP).map(str::trim);

    forwarded
        .into_iter()
        .chain(real_ip)
        .find_map(|candidate| Origin::new(candidate).ok())
        .unwrap_or_else(Origin::unknown)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
