use crate::report::payload::{Competitor, Rating, ReportPayload, Snapshot, Tone};
use anyhow::ensure;
use chrono::NaiveDate;
use serde::Deserialize;

/// Wire shape of a report request, field names as the callers send them.
/// Unknown fields (`charts`, `discrepancies` from older callers) are accepted
/// and ignored. Validation happens in [`RawPayload::validate_into_payload`];
/// the composer only ever sees the validated [`ReportPayload`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    pub ticker: String,
    pub company_name: String,
    pub as_of_date: String,
    pub price_today: Option<f64>,
    pub snapshot: RawSnapshot,
    pub ratings: Vec<RawRating>,
    pub positives: Vec<String>,
    pub negatives: Vec<String>,
    pub competitors: Option<Vec<RawCompetitor>>,
    pub risks: Option<Vec<String>>,
    pub watch: Option<Vec<String>>,
    pub tone: Tone,
    pub why_tone: String,
    pub sources: Option<Vec<String>>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    pub industry: String,
    pub business_model: String,
    pub market_cap: Option<String>,
    pub growth_focus: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRating {
    pub source: String,
    pub rating: String,
    pub target: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompetitor {
    pub peer: String,
    pub mkt_cap: Option<f64>,
    pub pe: Option<f64>,
    pub note: Option<String>,
}

impl RawPayload {
    pub fn validate_into_payload(self) -> anyhow::Result<ReportPayload> {
        let ticker = self.ticker.trim().to_string();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");

        let company_name = self.company_name.trim().to_string();
        ensure!(!company_name.is_empty(), "companyName must be non-empty");

        let as_of_date = NaiveDate::parse_from_str(self.as_of_date.trim(), "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("asOfDate must be YYYY-MM-DD: {e}"))?;

        if let Some(price) = self.price_today {
            ensure!(price.is_finite(), "priceToday must be a finite number");
        }

        let mut ratings = Vec::with_capacity(self.ratings.len());
        for (i, r) in self.ratings.into_iter().enumerate() {
            ratings.push(r.validate_into_rating(i)?);
        }

        let competitors = match self.competitors {
            Some(list) => {
                let mut out = Vec::with_capacity(list.len());
                for (i, c) in list.into_iter().enumerate() {
                    out.push(c.validate_into_competitor(i)?);
                }
                Some(out)
            }
            None => None,
        };

        let why_tone = self.why_tone.trim().to_string();
        ensure!(!why_tone.is_empty(), "whyTone must be non-empty");

        let logo_url = self
            .logo_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Blank market cap renders as no line at all, same as absent.
        let market_cap = self
            .snapshot
            .market_cap
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ReportPayload {
            ticker,
            company_name,
            as_of_date,
            price_today: self.price_today,
            snapshot: Snapshot {
                industry: self.snapshot.industry,
                business_model: self.snapshot.business_model,
                market_cap,
                growth_focus: self.snapshot.growth_focus,
            },
            ratings,
            positives: self.positives,
            negatives: self.negatives,
            competitors,
            risks: self.risks,
            watch: self.watch,
            tone: self.tone,
            why_tone,
            sources: self.sources,
            logo_url,
        })
    }
}

impl RawRating {
    fn validate_into_rating(self, index: usize) -> anyhow::Result<Rating> {
        let source = self.source.trim().to_string();
        ensure!(!source.is_empty(), "ratings[{index}].source must be non-empty");
        ensure!(
            self.target.is_finite(),
            "ratings[{index}].target must be a finite number"
        );
        Ok(Rating {
            source,
            rating: self.rating,
            target: self.target,
        })
    }
}

impl RawCompetitor {
    fn validate_into_competitor(self, index: usize) -> anyhow::Result<Competitor> {
        let peer = self.peer.trim().to_string();
        ensure!(!peer.is_empty(), "competitors[{index}].peer must be non-empty");
        if let Some(cap) = self.mkt_cap {
            ensure!(
                cap.is_finite(),
                "competitors[{index}].mktCap must be a finite number"
            );
        }
        Ok(Competitor {
            peer,
            mkt_cap: self.mkt_cap,
            pe: self.pe,
            note: self.note,
        })
    }
}
