//! Identifier normalization: lower-casing, host extraction and the
//! canonical account URI used for queries and subject checks.

use url::{form_urlencoded, Url};

use crate::error::{ErrorKind, WebFingerError};

/// A normalized identifier ready for discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    normalized: String,
    host: String,
    account: String,
}

impl Identifier {
    /// Normalize `input`.
    ///
    /// `user@host` becomes `acct:user@host`; inputs with an explicit scheme
    /// (`acct:`, `xmpp:`, `mailto:`, `https://...`) are kept as they are.
    /// Everything is lower-cased.
    ///
    /// # Errors
    /// Returns an `InvalidIdentifier` error when no usable host can be found.
    pub fn parse(input: &str) -> Result<Self, WebFingerError> {
        let normalized = input.trim().to_lowercase();

        let (account, host) = match explicit_scheme(&normalized) {
            Some(scheme) => {
                let rest = &normalized[scheme.len() + 1..];
                let host = if rest.starts_with("//") {
                    Url::parse(&normalized)
                        .ok()
                        .and_then(|url| url.host_str().map(str::to_string))
                        .unwrap_or_default()
                } else {
                    account_host(rest).to_string()
                };
                (normalized.clone(), host)
            }
            None => (format!("acct:{normalized}"), account_host(&normalized).to_string()),
        };

        if host.is_empty() || Url::parse(&format!("https://{host}/")).is_err() {
            return Err(WebFingerError::new(
                ErrorKind::InvalidIdentifier,
                format!("No host found in identifier \"{input}\""),
            ));
        }

        Ok(Self {
            normalized,
            host,
            account,
        })
    }

    /// The lower-cased input.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Account URI, e.g. `acct:user@example.org`.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Account URI encoded as a query parameter value
    /// (`acct:user@example.org` → `acct%3Auser%40example.org`).
    pub fn encoded_account(&self) -> String {
        form_urlencoded::byte_serialize(self.account.as_bytes()).collect()
    }
}

/// The scheme of `s` when it starts with a valid RFC 3986 scheme followed by `:`.
/// `host:port` is not a scheme.
fn explicit_scheme(s: &str) -> Option<&str> {
    let (scheme, rest) = s.split_once(':')?;
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Host of an account-style string: after the last `@`, up to any path,
/// query or fragment.
fn account_host(s: &str) -> &str {
    let after_at = s.rsplit_once('@').map_or(s, |(_, host)| host);
    after_at
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_at)
}
