//! Navigation URL backed by [`url::Url`].

use parking_lot::RwLock;
use url::Url;

use super::Location;

/// The current navigation URL, rewritable in place like `history.replaceState`.
#[derive(Debug)]
pub struct NavigationUrl {
    url: RwLock<Url>,
}

impl NavigationUrl {
    /// Wrap a parsed URL.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self {
            url: RwLock::new(url),
        }
    }

    /// Parse a URL string.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `href` is not an absolute URL.
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        Url::parse(href).map(Self::new)
    }
}

impl Location for NavigationUrl {
    fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .read()
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    fn strip_query_param(&self, name: &str) {
        let mut url = self.url.write();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    fn href(&self) -> String {
        self.url.read().to_string()
    }
}
