use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A validated research report for one company. Constructed once per request
/// through [`crate::report::contract::RawPayload::validate_into_payload`] and
/// read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub ticker: String,
    pub company_name: String,
    pub as_of_date: NaiveDate,
    pub price_today: Option<f64>,
    pub snapshot: Snapshot,
    pub ratings: Vec<Rating>,
    pub positives: Vec<String>,
    pub negatives: Vec<String>,
    pub competitors: Option<Vec<Competitor>>,
    pub risks: Option<Vec<String>>,
    pub watch: Option<Vec<String>>,
    pub tone: Tone,
    pub why_tone: String,
    pub sources: Option<Vec<String>>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub industry: String,
    pub business_model: String,
    pub market_cap: Option<String>,
    pub growth_focus: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub source: String,
    pub rating: String,
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub peer: String,
    pub mkt_cap: Option<f64>,
    pub pe: Option<f64>,
    pub note: Option<String>,
}

/// Overall analyst tone. Any other wire value is a deserialization error and
/// never reaches the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Bullish,
    Neutral,
    Bearish,
}

impl Tone {
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Bullish => "Bullish",
            Tone::Neutral => "Neutral",
            Tone::Bearish => "Bearish",
        }
    }
}

impl ReportPayload {
    /// Upside/downside for one price target against today's price, as the
    /// display string for the ratings table. `—` when today's price is
    /// unknown; a derived percentage is never fabricated.
    pub fn upside_cell(&self, target: f64) -> String {
        match self.price_today {
            Some(price) => format!("{:.1}%", (target - price) / price * 100.0),
            None => "—".to_string(),
        }
    }
}
