use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::database::models::{AnalyticsSummary, DailyBucket};
use crate::database::Store;
use crate::services::{ServiceError, ServiceResult};

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 90;

/// Roll event times into one bucket per UTC day ending at `today`. Days
/// without events are present with zero counts; events outside the window
/// are ignored.
pub fn summarize(
    taps: &[DateTime<Utc>],
    leads: &[DateTime<Utc>],
    today: NaiveDate,
    days: u32,
) -> AnalyticsSummary {
    let first = today - Duration::days(i64::from(days.max(1)) - 1);
    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = first
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, (0, 0)))
        .collect();

    for t in taps {
        if let Some(bucket) = buckets.get_mut(&t.date_naive()) {
            bucket.0 += 1;
        }
    }
    for t in leads {
        if let Some(bucket) = buckets.get_mut(&t.date_naive()) {
            bucket.1 += 1;
        }
    }

    let buckets: Vec<DailyBucket> = buckets
        .into_iter()
        .map(|(date, (taps, leads))| DailyBucket { date, taps, leads })
        .collect();
    let total_taps: u64 = buckets.iter().map(|b| b.taps).sum();
    let total_leads: u64 = buckets.iter().map(|b| b.leads).sum();
    let conversion_rate = if total_taps == 0 {
        0.0
    } else {
        total_leads as f64 / total_taps as f64
    };

    AnalyticsSummary {
        days: buckets.len() as u32,
        total_taps,
        total_leads,
        conversion_rate,
        buckets,
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: Store,
}

impl AnalyticsService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn summary(&self, account_id: &str, days: Option<u32>) -> ServiceResult<AnalyticsSummary> {
        let days = days.unwrap_or(DEFAULT_DAYS);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(ServiceError::field("days", format!("days must be between 1 and {}", MAX_DAYS)));
        }

        let today = Utc::now().date_naive();
        let first = today - Duration::days(i64::from(days) - 1);
        let since = first.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();

        let taps = self.store.analytics.tap_times(account_id, since).await?;
        let leads = self.store.analytics.lead_times(account_id, since).await?;
        Ok(summarize(&taps, &leads, today, days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn buckets_by_day_with_gaps() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let taps = [at(2024, 3, 8, 9), at(2024, 3, 8, 23), at(2024, 3, 10, 1), at(2024, 2, 1, 0)];
        let leads = [at(2024, 3, 8, 12)];

        let summary = summarize(&taps, &leads, today, 3);
        assert_eq!(summary.days, 3);
        assert_eq!(summary.buckets[0].date, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!((summary.buckets[0].taps, summary.buckets[0].leads), (2, 1));
        assert_eq!((summary.buckets[1].taps, summary.buckets[1].leads), (0, 0));
        assert_eq!(summary.buckets[2].taps, 1);
        assert_eq!(summary.total_taps, 3);
        assert!((summary.conversion_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_taps_means_zero_conversion() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let summary = summarize(&[], &[at(2024, 3, 10, 5)], today, 7);
        assert_eq!(summary.buckets.len(), 7);
        assert_eq!(summary.total_leads, 1);
        assert_eq!(summary.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_windows() {
        let svc = AnalyticsService::new(Store::memory());
        assert!(svc.summary("acc", Some(0)).await.is_err());
        assert!(svc.summary("acc", Some(91)).await.is_err());
        assert_eq!(svc.summary("acc", None).await.unwrap().buckets.len(), 30);
    }
}
