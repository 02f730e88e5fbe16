//! URL safety checks for server-side requests.

use reqwest::Url;
use std::net::IpAddr;
use thiserror::Error;

/// Reasons a URL is rejected for server-side requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafeUrl {
    #[error("Invalid URL: {0}")]
    Malformed(String),

    #[error("Invalid URL scheme: {0}. Must be http or https.")]
    Scheme(String),

    #[error("URL must have a hostname")]
    MissingHost,

    #[error("URLs pointing to localhost are not allowed")]
    Localhost,

    #[error("URLs pointing to {0} addresses are not allowed")]
    ForbiddenAddress(&'static str),

    #[error("URLs with internal TLD '{0}' are not allowed")]
    InternalTld(&'static str),
}

const INTERNAL_TLDS: [&str; 5] = [".local", ".internal", ".corp", ".lan", ".home"];

/// Validate that a URL is safe for server-side requests.
///
/// Rejects non-http(s) schemes, missing hosts, localhost, loopback /
/// private / link-local / multicast / unspecified / reserved literal
/// addresses, and common internal TLDs.
pub fn validate_safe_url(url: &str) -> Result<(), UnsafeUrl> {
    let parsed = Url::parse(url).map_err(|e| UnsafeUrl::Malformed(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UnsafeUrl::Scheme(other.to_string())),
    }

    let host = parsed.host_str().ok_or(UnsafeUrl::MissingHost)?;
    let host = host.to_ascii_lowercase();
    // IPv6 hosts come bracketed.
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');

    if matches!(bare_host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0") {
        return Err(UnsafeUrl::Localhost);
    }

    if let Ok(ip) = bare_host.parse::<IpAddr>() {
        check_ip(ip)?;
    } else {
        for tld in INTERNAL_TLDS {
            if bare_host.ends_with(tld) {
                return Err(UnsafeUrl::InternalTld(tld));
            }
        }
    }

    Ok(())
}

fn check_ip(ip: IpAddr) -> Result<(), UnsafeUrl> {
    if ip.is_loopback() {
        return Err(UnsafeUrl::ForbiddenAddress("loopback"));
    }
    if ip.is_multicast() {
        return Err(UnsafeUrl::ForbiddenAddress("multicast"));
    }
    if ip.is_unspecified() {
        return Err(UnsafeUrl::ForbiddenAddress("unspecified"));
    }
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_private() {
                return Err(UnsafeUrl::ForbiddenAddress("private"));
            }
            if v4.is_link_local() {
                return Err(UnsafeUrl::ForbiddenAddress("link-local"));
            }
            if v4.is_broadcast() {
                return Err(UnsafeUrl::ForbiddenAddress("broadcast"));
            }
            // 240.0.0.0/4, reserved for future use.
            if v4.octets()[0] & 0xf0 == 0xf0 {
                return Err(UnsafeUrl::ForbiddenAddress("reserved"));
            }
        }
        IpAddr::V6(v6) => {
            // fc00::/7 unique-local and fe80::/10 link-local.
            let first = v6.segments()[0];
            if first & 0xfe00 == 0xfc00 {
                return Err(UnsafeUrl::ForbiddenAddress("unique-local"));
            }
            if first & 0xffc0 == 0xfe80 {
                return Err(UnsafeUrl::ForbiddenAddress("link-local"));
            }
        }
    }
    Ok(())
}
