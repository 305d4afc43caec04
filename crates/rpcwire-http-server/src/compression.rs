//! gzip bodies and the headers that announce them

use http::HeaderMap;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING};

pub use rpcwire_json_rpc::compression::{GunzipError, gunzip, gzip};

/// Whether the peer lists gzip in `Accept-Encoding`
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| {
            let mut parts = coding.split(';');
            let name = parts.next().unwrap_or("").trim();
            // `gzip;q=0` explicitly refuses the coding
            let refused = parts.any(|p| matches!(p.trim(), "q=0" | "q=0.0" | "q=0.00" | "q=0.000"));
            name.eq_ignore_ascii_case("gzip") && !refused
        })
}

/// Whether the body is announced as gzip via `Content-Encoding`
pub fn is_gzipped(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"))
}
