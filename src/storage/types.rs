use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of history entries per page
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Largest accepted page size
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A store's chatbot and its remote assistant reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chatbot {
    pub id: i64,
    /// Owning store; unique across chatbots
    pub store_id: String,
    pub name: String,
    pub knowledge_base: String,
    pub greeting_message: String,
    pub model: String,
    pub is_active: bool,
    /// Remote assistant id; `None` until provisioning succeeds
    pub assistant_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a chatbot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewChatbot {
    pub store_id: String,
    pub name: String,
    #[serde(default)]
    pub knowledge_base: Option<String>,
    #[serde(default)]
    pub greeting_message: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Partial chatbot update; `None` fields are left unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub knowledge_base: Option<String>,
    #[serde(default)]
    pub greeting_message: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ChatbotUpdate {
    /// Whether the update touches anything the remote assistant is built from
    pub fn changes_assistant(&self) -> bool {
        self.name.is_some()
            || self.knowledge_base.is_some()
            || self.greeting_message.is_some()
            || self.model.is_some()
    }
}

/// Customer reaction to a logged response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserFeedback {
    Positive,
    Negative,
    #[default]
    None,
}

impl UserFeedback {
    pub fn as_str(self) -> &'static str {
        match self {
            UserFeedback::Positive => "positive",
            UserFeedback::Negative => "negative",
            UserFeedback::None => "none",
        }
    }
}

impl FromStr for UserFeedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(UserFeedback::Positive),
            "negative" => Ok(UserFeedback::Negative),
            "none" => Ok(UserFeedback::None),
            other => Err(format!("unknown feedback value: {}", other)),
        }
    }
}

/// Caller-supplied position, as sent by the map UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Stored geolocation point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    /// Convert a caller location, rejecting out-of-range coordinates
    pub fn from_location(location: Location) -> Option<Self> {
        let valid = location.latitude.is_finite()
            && location.longitude.is_finite()
            && (-90.0..=90.0).contains(&location.latitude)
            && (-180.0..=180.0).contains(&location.longitude);
        valid.then_some(Self {
            longitude: location.longitude,
            latitude: location.latitude,
        })
    }

    /// Coordinates in GeoJSON order: `[longitude, latitude]`
    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// A chat turn to persist
#[derive(Debug, Clone, PartialEq)]
pub struct NewChatLog {
    pub chatbot_id: i64,
    pub user_id: Option<String>,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub thread_id: Option<String>,
    pub location: Option<GeoPoint>,
}

/// A persisted chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogEntry {
    pub id: i64,
    pub chatbot_id: i64,
    pub user_id: Option<String>,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub thread_id: Option<String>,
    pub user_feedback: UserFeedback,
    pub location: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
}

/// Normalized page request (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Apply defaults and clamp to the accepted range
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Row offset of the first entry on this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned with a history page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(u64::from(request.limit)),
        }
    }
}

/// One page of a session transcript, oldest entry first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<ChatLogEntry>,
    pub pagination: Pagination,
}
