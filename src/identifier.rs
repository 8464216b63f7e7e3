//! Parsing of compact service identifiers.
//!
//! An identifier looks like a URL:
//!
//! ```text
//! scheme://[user[:password]@]host[:port][/path/segments][?key=value&...]
//! ```
//!
//! Parsing is more lenient than RFC 3986: `#` is an ordinary path
//! character (Slack and Rocket.Chat channels are written `#general`) and
//! the host is not checked against DNS rules, as several services put
//! API keys in host position. What each part means is decided by the
//! service that consumes it.

use std::collections::BTreeMap;

/// A decoded service identifier.
///
/// Produced by [`ServiceUrl::parse`] and consumed by a notifier
/// constructor. All text fields are percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrl {
    /// Lower-cased scheme (e.g. `slack`, `jsons`).
    pub scheme: String,
    /// `true` for the TLS alias of a scheme (`jsons`, `mmosts`, ...).
    pub secure: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Decoded path as written, `/` when absent.
    pub fullpath: String,
    /// Non-empty path segments in order.
    pub path: Vec<String>,
    /// Query parameters; keys are lower-cased.
    pub query: BTreeMap<String, String>,
    /// The identifier this was parsed from.
    pub url: String,
}

impl ServiceUrl {
    /// Parse an identifier.
    ///
    /// Returns `None` for anything structurally malformed: empty input, a
    /// missing `scheme://`, an empty host or a port that is not a number.
    /// Never panics.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = raw.trim();
        if url.is_empty() {
            return None;
        }

        let (scheme, rest) = url.split_once("://")?;
        if !is_valid_scheme(scheme) {
            return None;
        }
        let scheme = scheme.to_ascii_lowercase();

        let (before_query, query_str) = match rest.split_once('?') {
            Some((before, query)) => (before, Some(query)),
            None => (rest, None),
        };

        let (authority, raw_path) = match before_query.find('/') {
            Some(idx) => before_query.split_at(idx),
            None => (before_query, ""),
        };

        let (userinfo, hostport) = match authority.rfind('@') {
            Some(idx) => (Some(&authority[..idx]), &authority[idx + 1..]),
            None => (None, authority),
        };

        let (user, password) = match userinfo {
            Some(info) => {
                let (user, password) = match info.split_once(':') {
                    Some((user, password)) => (user, Some(password)),
                    None => (info, None),
                };
                (non_empty(decode(user)), password.map(decode).and_then(non_empty))
            }
            None => (None, None),
        };

        let (host, port) = split_host_port(hostport)?;
        let host = decode(host);
        if host.is_empty() {
            return None;
        }

        let fullpath = if raw_path.is_empty() {
            "/".to_string()
        } else {
            decode(raw_path)
        };
        let path = raw_path
            .split('/')
            .map(decode)
            .map(|segment| segment.trim().to_string())
            .filter(|segment| !segment.is_empty())
            .collect();

        let query = query_str.map(parse_query).unwrap_or_default();
        let secure = scheme.len() > 1 && scheme.ends_with('s');

        Some(Self {
            scheme,
            secure,
            user,
            password,
            host,
            port,
            fullpath,
            path,
            query,
            url: url.to_string(),
        })
    }

    /// Look up a query parameter (keys are case-insensitive).
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Interpret a query parameter as a boolean flag.
    pub fn query_bool(&self, key: &str, default: bool) -> bool {
        parse_bool(self.query_value(key), default)
    }

    /// `https` for TLS aliases, `http` otherwise.
    pub fn http_scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}

/// Interpret a yes/no style value; anything unrecognised yields `default`.
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => match v.as_str() {
            "yes" | "y" | "true" | "1" | "on" | "enable" | "enabled" => true,
            "no" | "n" | "false" | "0" | "off" | "disable" | "disabled" => false,
            _ => default,
        },
        None => default,
    }
}

/// Split a recipient list on whitespace, commas, and slashes.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '\\'))
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Percent-encode one identifier component.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Percent-encode each segment of a decoded path, keeping the `/`s.
///
/// `?` and `#` inside a segment stay data instead of starting a query or
/// fragment.
pub fn encode_path(path: &str) -> String {
    path.split('/').map(encode).collect::<Vec<_>>().join("/")
}

/// Render `?k=v&...` (empty string when there are no pairs).
pub fn build_query<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return String::new();
    }
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k.as_ref()), encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{}", joined)
}

/// Render `user[:password]@` (empty string without a user).
pub fn build_auth(user: Option<&str>, password: Option<&str>) -> String {
    match (user, password) {
        (Some(user), Some(password)) => format!("{}:{}@", encode(user), encode(password)),
        (Some(user), None) => format!("{}@", encode(user)),
        _ => String::new(),
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_host_port(hostport: &str) -> Option<(&str, Option<u16>)> {
    // Bracketed IPv6 literal
    if let Some(stripped) = hostport.strip_prefix('[') {
        let end = stripped.find(']')?;
        let host = &hostport[..end + 2];
        let remainder = &stripped[end + 1..];
        return match remainder.strip_prefix(':') {
            Some(port) => Some((host, Some(parse_port(port)?))),
            None if remainder.is_empty() => Some((host, None)),
            None => None,
        };
    }

    match hostport.rsplit_once(':') {
        Some((host, port)) => Some((host, Some(parse_port(port)?))),
        None => Some((hostport, None)),
    }
}

fn parse_port(port: &str) -> Option<u16> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            // '+' in a key is significant (IFTTT uses `+key=value`)
            (
                decode(key).to_ascii_lowercase(),
                decode(&value.replace('+', " ")),
            )
        })
        .collect()
}

fn decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
