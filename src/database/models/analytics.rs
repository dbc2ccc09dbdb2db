use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewTapEvent {
    pub tag_id: Option<Uuid>,
    pub user_id: String,
    pub profile_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapEvent {
    pub id: Uuid,
    pub tag_id: Option<Uuid>,
    pub user_id: String,
    pub profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub taps: u64,
    pub leads: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub days: u32,
    pub total_taps: u64,
    pub total_leads: u64,
    /// leads / taps, 0 when there were no taps.
    pub conversion_rate: f64,
    pub buckets: Vec<DailyBucket>,
}
