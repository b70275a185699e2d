//! Domain helpers
//!
//! Nodes identify themselves by a bare `host[:port]` string. Callers are
//! sloppy about it, so every lookup and write goes through [`normalize_domain`].

use std::sync::LazyLock;

use regex::Regex;

/// Accepts `host`, `host:port`, `a.b.c:port` and bracketed IPv6 `[::1]:port`
static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?)(:[0-9]{1,5})?$")
        .expect("Invalid domain regex pattern")
});

/// Strip a leading `http://`/`https://` and a single trailing slash.
///
/// # Examples
///
/// ```
/// use rollcall_common::normalize_domain;
///
/// assert_eq!(normalize_domain("https://node.example.com/"), "node.example.com");
/// assert_eq!(normalize_domain("HTTP://localhost:3000"), "localhost:3000");
/// assert_eq!(normalize_domain("node.example.com"), "node.example.com");
/// ```
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|scheme| {
            trimmed
                .get(..scheme.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
                .map(|_| &trimmed[scheme.len()..])
        })
        .unwrap_or(trimmed);

    without_scheme
        .strip_suffix('/')
        .unwrap_or(without_scheme)
        .to_string()
}

/// Longest accepted domain, matching the `node_info.domain` column
pub const MAX_DOMAIN_LEN: usize = 255;

/// Check that a normalized domain is a plain `host[:port]`.
pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= MAX_DOMAIN_LEN && DOMAIN_PATTERN.is_match(domain)
}

/// Host part of a `host[:port]` string, without IPv6 brackets.
pub fn host_of(domain: &str) -> &str {
    if let Some(rest) = domain.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }

    match domain.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => domain,
    }
}

/// Loopback hosts are only ever probed over plain HTTP.
pub fn is_loopback_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "::1"
}
