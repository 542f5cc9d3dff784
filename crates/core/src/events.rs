//! Tracked interaction events and the batch wire format.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::attribution::Attribution;
use crate::error::{DeliveryErrorCode, Error, Result};

/// All supported interaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PromoView,
    PromoCopy,
    PromoOpen,
    FinanceOpen,
    DealOpen,
    ShowcaseView,
    ShowcaseOpen,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromoView => "promo_view",
            Self::PromoCopy => "promo_copy",
            Self::PromoOpen => "promo_open",
            Self::FinanceOpen => "finance_open",
            Self::DealOpen => "deal_open",
            Self::ShowcaseView => "showcase_view",
            Self::ShowcaseOpen => "showcase_open",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded interaction.
///
/// Referenced ids are not checked client-side. `session_id` and the
/// attribution fields are filled in by the batcher when the event is tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrackEvent {
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showcase_id: Option<u64>,
    /// Session id (max 64 chars, matches the backend column)
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub session_id: String,
    /// Document referrer
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub utm_campaign: Option<String>,
}

impl TrackEvent {
    /// Creates a bare event of the given type.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            promo_id: None,
            store_id: None,
            showcase_id: None,
            session_id: String::new(),
            referrer: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
        }
    }

    pub fn with_promo(mut self, promo_id: u64) -> Self {
        self.promo_id = Some(promo_id);
        self
    }

    pub fn with_store(mut self, store_id: Option<u64>) -> Self {
        self.store_id = store_id;
        self
    }

    pub fn with_showcase(mut self, showcase_id: u64) -> Self {
        self.showcase_id = Some(showcase_id);
        self
    }

    pub fn promo_view(promo_id: u64) -> Self {
        Self::new(EventType::PromoView).with_promo(promo_id)
    }

    pub fn promo_copy(promo_id: u64) -> Self {
        Self::new(EventType::PromoCopy).with_promo(promo_id)
    }

    pub fn promo_open(promo_id: u64, store_id: Option<u64>) -> Self {
        Self::new(EventType::PromoOpen)
            .with_promo(promo_id)
            .with_store(store_id)
    }

    pub fn finance_open(promo_id: u64, store_id: Option<u64>) -> Self {
        Self::new(EventType::FinanceOpen)
            .with_promo(promo_id)
            .with_store(store_id)
    }

    pub fn deal_open(promo_id: u64, store_id: Option<u64>) -> Self {
        Self::new(EventType::DealOpen)
            .with_promo(promo_id)
            .with_store(store_id)
    }

    pub fn showcase_view(showcase_id: u64) -> Self {
        Self::new(EventType::ShowcaseView).with_showcase(showcase_id)
    }

    pub fn showcase_open(showcase_id: u64) -> Self {
        Self::new(EventType::ShowcaseOpen).with_showcase(showcase_id)
    }

    /// Stamps the session id and attribution captured at tracking time.
    ///
    /// Attribution replaces whatever the caller set, so every event in a
    /// session reflects the page it was tracked on.
    pub fn stamp(mut self, session_id: &str, attribution: &Attribution) -> Self {
        self.session_id = session_id.to_string();
        self.referrer = attribution.referrer.clone();
        self.utm_source = attribution.utm_source.clone();
        self.utm_medium = attribution.utm_medium.clone();
        self.utm_campaign = attribution.utm_campaign.clone();
        self
    }
}

/// Request body for the ingestion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackBatch {
    /// Events in this batch
    #[validate(length(min = 1, max = 500), nested)]
    pub events: Vec<TrackEvent>,
}

impl TrackBatch {
    pub fn new(events: Vec<TrackEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Validates and encodes the batch as the JSON request body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate().map_err(|e| {
            Error::delivery(
                DeliveryErrorCode::Serialization,
                format!("invalid batch: {}", e),
            )
        })?;
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a request body produced by [`TrackBatch::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
