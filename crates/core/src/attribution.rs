//! Referrer and UTM attribution captured from the current page.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::limits::{MAX_REF_LEN, MAX_UTM_LEN};

/// The page an interaction happened on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    /// Current document URL
    pub url: Option<Url>,
    /// `document.referrer`, empty when the visit was direct
    pub referrer: Option<String>,
}

impl PageContext {
    pub fn new(url: Url) -> Self {
        Self {
            url: Some(url),
            referrer: None,
        }
    }

    /// Parses a page URL string.
    pub fn parse(url: &str) -> crate::Result<Self> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Returns the value of a query parameter, treating empty values as absent.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .as_ref()?
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

/// Attribution fields attached to every tracked event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

impl Attribution {
    /// Captures attribution from the page at tracking time.
    pub fn capture(page: &PageContext) -> Self {
        let referrer = page
            .referrer
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| truncate(r, MAX_REF_LEN));

        Self {
            referrer,
            utm_source: page.query_param("utm_source").map(|v| truncate(&v, MAX_UTM_LEN)),
            utm_medium: page.query_param("utm_medium").map(|v| truncate(&v, MAX_UTM_LEN)),
            utm_campaign: page
                .query_param("utm_campaign")
                .map(|v| truncate(&v, MAX_UTM_LEN)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.referrer.is_none()
            && self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
    }
}

/// Truncates to at most `max` chars without splitting a code point.
fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
