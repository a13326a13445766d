//! Resource normalization applied before counting unique URLs.
//!
//! Exact string match is the default. Stripping query strings or trailing
//! slashes is opt-in.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use url::Url;

/// Which normalizations to apply to resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Drop `?query` and `#fragment`
    #[serde(default)]
    pub strip_query: bool,
    /// Treat `/a/` and `/a` as the same resource
    #[serde(default)]
    pub trim_trailing_slash: bool,
}

/// Normalizes resource strings according to a [`NormalizationConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceNormalizer {
    config: NormalizationConfig,
}

impl ResourceNormalizer {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    /// Case-sensitive exact match, no rewriting.
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn is_exact(&self) -> bool {
        !self.config.strip_query && !self.config.trim_trailing_slash
    }

    /// Returns the normalized form of `resource`.
    pub fn normalize<'a>(&self, resource: &'a str) -> Cow<'a, str> {
        if self.is_exact() {
            return Cow::Borrowed(resource);
        }

        match Url::parse(resource) {
            Ok(url) if !url.cannot_be_a_base() => Cow::Owned(self.normalize_url(url)),
            _ => self.normalize_path(resource),
        }
    }

    fn normalize_url(&self, mut url: Url) -> String {
        if self.config.strip_query {
            url.set_query(None);
            url.set_fragment(None);
        }
        if self.config.trim_trailing_slash {
            let path = url.path();
            if path.len() > 1 && path.ends_with('/') {
                let trimmed = path.trim_end_matches('/').to_string();
                url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
            }
        }
        url.to_string()
    }

    /// Fallback for relative paths such as `/shop/cart?id=1`.
    fn normalize_path<'a>(&self, resource: &'a str) -> Cow<'a, str> {
        let mut out = resource;
        if self.config.strip_query {
            if let Some(idx) = out.find(['?', '#']) {
                out = &out[..idx];
            }
        }
        if self.config.trim_trailing_slash && out.len() > 1 {
            let trimmed = out.trim_end_matches('/');
            out = if trimmed.is_empty() { "/" } else { trimmed };
        }
        Cow::Borrowed(out)
    }
}
