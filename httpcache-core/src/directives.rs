//! `Cache-Control` directive parsing.
//!
//! Parsing never fails. Unknown directives are skipped, directives whose
//! required value is missing or not an integer are dropped, and `max-stale`
//! without a usable value is kept as a bare flag.

use http::header::{self, HeaderMap};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Directives understood by the caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheDirective {
    MaxAge,
    MaxStale,
    MinFresh,
    SMaxAge,
    NoCache,
    NoStore,
    NoTransform,
    OnlyIfCached,
    MustRevalidate,
    Public,
    Private,
    ProxyRevalidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueRule {
    Flag,
    Optional,
    Required,
}

impl CacheDirective {
    /// Look up a directive by its lower-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        let directive = match name {
            "max-age" => Self::MaxAge,
            "max-stale" => Self::MaxStale,
            "min-fresh" => Self::MinFresh,
            "s-maxage" => Self::SMaxAge,
            "no-cache" => Self::NoCache,
            "no-store" => Self::NoStore,
            "no-transform" => Self::NoTransform,
            "only-if-cached" => Self::OnlyIfCached,
            "must-revalidate" => Self::MustRevalidate,
            "public" => Self::Public,
            "private" => Self::Private,
            "proxy-revalidate" => Self::ProxyRevalidate,
            _ => return None,
        };
        Some(directive)
    }

    /// Directive name as written in the header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxAge => "max-age",
            Self::MaxStale => "max-stale",
            Self::MinFresh => "min-fresh",
            Self::SMaxAge => "s-maxage",
            Self::NoCache => "no-cache",
            Self::NoStore => "no-store",
            Self::NoTransform => "no-transform",
            Self::OnlyIfCached => "only-if-cached",
            Self::MustRevalidate => "must-revalidate",
            Self::Public => "public",
            Self::Private => "private",
            Self::ProxyRevalidate => "proxy-revalidate",
        }
    }

    fn value_rule(&self) -> ValueRule {
        match self {
            Self::MaxAge | Self::MinFresh | Self::SMaxAge => ValueRule::Required,
            Self::MaxStale => ValueRule::Optional,
            _ => ValueRule::Flag,
        }
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `Cache-Control` directive set.
///
/// ```
/// use httpcache_core::CacheControl;
///
/// let cc = CacheControl::parse("max-age=abc, public, bogus-directive=1");
/// assert!(cc.is_public());
/// assert_eq!(cc.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: BTreeMap<CacheDirective, Option<i64>>,
}

impl CacheControl {
    /// Parse a single `Cache-Control` header value.
    pub fn parse(value: &str) -> Self {
        let mut directives = BTreeMap::new();

        for segment in value.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (name, raw_value) = match segment.split_once('=') {
                Some((name, value)) => (name, Some(value.trim())),
                None => (segment, None),
            };
            let name = name.trim().to_ascii_lowercase();

            let Some(directive) = CacheDirective::from_name(&name) else {
                debug!(directive = %name, "Ignoring unknown cache-control directive");
                continue;
            };

            let parsed = raw_value.and_then(|v| v.parse::<i64>().ok());
            match directive.value_rule() {
                ValueRule::Flag => {
                    directives.insert(directive, None);
                }
                ValueRule::Optional => {
                    directives.insert(directive, parsed);
                }
                ValueRule::Required => match parsed {
                    Some(v) => {
                        directives.insert(directive, Some(v));
                    }
                    None => {
                        debug!(
                            directive = %directive,
                            value = ?raw_value,
                            "Dropping cache-control directive with missing or invalid value"
                        );
                    }
                },
            }
        }

        Self { directives }
    }

    /// Parse every `Cache-Control` field in a header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let joined = headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&joined)
    }

    pub fn contains(&self, directive: CacheDirective) -> bool {
        self.directives.contains_key(&directive)
    }

    /// Value of a directive, `None` when absent or valueless.
    pub fn get(&self, directive: CacheDirective) -> Option<i64> {
        self.directives.get(&directive).copied().flatten()
    }

    pub fn max_age(&self) -> Option<i64> {
        self.get(CacheDirective::MaxAge)
    }

    pub fn min_fresh(&self) -> Option<i64> {
        self.get(CacheDirective::MinFresh)
    }

    pub fn max_stale(&self) -> Option<i64> {
        self.get(CacheDirective::MaxStale)
    }

    pub fn s_maxage(&self) -> Option<i64> {
        self.get(CacheDirective::SMaxAge)
    }

    pub fn is_no_cache(&self) -> bool {
        self.contains(CacheDirective::NoCache)
    }

    pub fn is_no_store(&self) -> bool {
        self.contains(CacheDirective::NoStore)
    }

    pub fn is_public(&self) -> bool {
        self.contains(CacheDirective::Public)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CacheDirective, Option<i64>)> + '_ {
        self.directives.iter().map(|(d, v)| (*d, *v))
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (directive, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match value {
                Some(v) => write!(f, "{}={}", directive, v)?,
                None => write!(f, "{}", directive)?,
            }
        }
        Ok(())
    }
}
