//! Cookie string parsing.

use std::collections::HashMap;

use super::CookieSource;

/// Cookies parsed from a `document.cookie` style string (`a=1; b=2`).
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// A jar with no cookies.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a cookie string.
    ///
    /// Pairs are split on `;`, names and values on the first `=`. Pairs
    /// without `=` are skipped. A repeated name keeps its first value, which
    /// is the most specific path in browser ordering.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut cookies = HashMap::new();
        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cookies
                .entry(name.to_string())
                .or_insert_with(|| value.trim().to_string());
        }
        Self { cookies }
    }
}

impl CookieSource for CookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).filter(|v| !v.is_empty()).cloned()
    }
}
