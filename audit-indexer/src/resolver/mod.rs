//! Cursor resolver: checkpoint recovery from the sink.
//!
//! The sink is the system of record for the resume position. Every indexed
//! document carries `next_stream_position`, so the most recent document
//! (by `created_at`, descending) holds both the cursor to resume from and
//! the newest timestamp observed. When the index is empty, a bootstrap
//! window derived from the configured lookback is used instead.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use audit_indexer_repository::SearchIndexProvider;
use audit_indexer_shared::TIMESTAMP_FORMAT;
use box_events::START_OF_STREAM;

/// Fallback time range used to seed the initial fetch when no checkpoint
/// exists in the sink.
///
/// `to_duration` multiplies a 1000 ms base by each non-zero unit count in
/// turn, so configured units compound instead of adding: `hours = 2` alone
/// yields 2000 ms, and `hours = 2, minutes = 3` yields 6000 ms rather than
/// two hours and three minutes. Carried over verbatim from the previous
/// deployment so existing configurations keep their effective windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookbackWindow {
    pub seconds: u64,
    pub minutes: u64,
    pub hours: u64,
    pub days: u64,
}

impl LookbackWindow {
    pub fn new(seconds: u64, minutes: u64, hours: u64, days: u64) -> Self {
        Self {
            seconds,
            minutes,
            hours,
            days,
        }
    }

    /// Compute the effective lookback duration.
    pub fn to_duration(&self) -> Duration {
        let mut millis: i64 = 1000;
        for unit in [self.seconds, self.minutes, self.hours, self.days] {
            if unit > 0 {
                millis *= unit as i64;
            }
        }
        Duration::milliseconds(millis)
    }
}

/// The resolver's answer: where to resume and the newest timestamp seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCheckpoint {
    pub resume_cursor: String,
    pub max_observed_created_at: DateTime<Utc>,
}

/// Recovers the resume position from the most recently indexed document.
pub struct CursorResolver {
    provider: Arc<dyn SearchIndexProvider>,
    lookback: LookbackWindow,
}

impl CursorResolver {
    pub fn new(provider: Arc<dyn SearchIndexProvider>, lookback: LookbackWindow) -> Self {
        Self { provider, lookback }
    }

    /// Resolve the effective checkpoint.
    ///
    /// * Empty index: cursor [`START_OF_STREAM`] and `now - lookback`
    /// * Otherwise: the top document's `next_stream_position` / `created_at`
    /// * Transport or parse failure: `None`, logged; the caller treats this
    ///   as "no events fetchable this tick"
    pub async fn resolve(&self) -> Option<ResolvedCheckpoint> {
        match self.provider.latest_document().await {
            Ok(None) => {
                let max_observed_created_at = Utc::now() - self.lookback.to_duration();
                debug!(
                    lookback_ms = self.lookback.to_duration().num_milliseconds(),
                    since = %max_observed_created_at,
                    "Index is empty, bootstrapping from start of stream"
                );
                Some(ResolvedCheckpoint {
                    resume_cursor: START_OF_STREAM.to_string(),
                    max_observed_created_at,
                })
            }
            Ok(Some(last)) => match parse_created_at(&last.created_at) {
                Some(max_observed_created_at) => {
                    debug!(
                        cursor = %last.next_stream_position,
                        created_at = %max_observed_created_at,
                        "Recovered checkpoint from latest indexed document"
                    );
                    Some(ResolvedCheckpoint {
                        resume_cursor: last.next_stream_position,
                        max_observed_created_at,
                    })
                }
                None => {
                    warn!(
                        created_at = %last.created_at,
                        "Failed to parse created_at of latest document"
                    );
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to query latest document from sink");
                None
            }
        }
    }
}

/// Parse a stored `created_at` value.
///
/// Documents render millisecond precision without a timezone suffix; older
/// deployments stored bare dates, which resolve to midnight.
fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Some(Utc.from_utc_datetime(&ts));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
