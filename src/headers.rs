//! Transport header names and a framework-neutral way to read them.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::net::IpAddr;

pub const TIMESTAMP: &str = "x-timestamp";
pub const NONCE: &str = "x-nonce";
pub const CONTEXT: &str = "x-context";
pub const STAMP: &str = "x-stamp";
pub const HMAC: &str = "x-hmac";

const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Identity used for rate limiting when no address is known.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Case-insensitive header lookup.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for http::HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

impl<S: BuildHasher> HeaderSource for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str).or_else(|| {
            self.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }
}

/// Fetch a header, treating an empty value as absent.
pub(crate) fn non_empty<'a, H: HeaderSource + ?Sized>(
    headers: &'a H,
    name: &str,
) -> Option<&'a str> {
    headers.header(name).filter(|v| !v.is_empty())
}

/// The four proof fields as they arrived on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofHeaders<'a> {
    pub timestamp: &'a str,
    pub nonce: &'a str,
    pub context: &'a str,
    pub stamp: &'a str,
}

impl<'a> ProofHeaders<'a> {
    /// All four fields, or `None` if any is missing or empty.
    pub fn extract<H: HeaderSource + ?Sized>(headers: &'a H) -> Option<Self> {
        Some(Self {
            timestamp: non_empty(headers, TIMESTAMP)?,
            nonce: non_empty(headers, NONCE)?,
            context: non_empty(headers, CONTEXT)?,
            stamp: non_empty(headers, STAMP)?,
        })
    }
}

/// Caller identity for rate limiting.
///
/// Proxy headers are client-controlled, so they are read only when
/// `trust_proxy` is set; the first hop of `x-forwarded-for` is used. Otherwise
/// the socket peer names the caller, and callers without one share
/// [`UNKNOWN_IDENTITY`].
pub fn client_identity<H: HeaderSource + ?Sized>(
    headers: &H,
    peer: Option<IpAddr>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        if let Some(ip) = proxy_address(headers) {
            return ip.to_string();
        }
    }
    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned())
}

fn proxy_address<H: HeaderSource + ?Sized>(headers: &H) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        non_empty(headers, name)?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()
    })
}
