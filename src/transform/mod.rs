//! Normalization of raw plays into canonical rows.

use crate::error::EtlError;
use crate::extract::RawPlayEvent;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

/// Wire format of `played_at`. The fraction may carry any number of digits.
const PLAYED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// One play, ready for storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CanonicalPlayRecord {
    /// Millisecond epoch of the UTC instant; independent of the target zone
    pub id: i64,
    /// `YYYY-MM-DD` in the target zone
    pub local_date: String,
    pub track_name: String,
    /// First credited artist
    pub artist_name: String,
    /// `YYYY-MM-DD HH:MM:SS` in the target zone
    pub local_played_at: String,
}

/// Converts raw plays into [`CanonicalPlayRecord`]s for one target zone.
#[derive(Clone, Debug)]
pub struct Transformer {
    target_timezone: Tz,
}

impl Transformer {
    pub fn new(target_timezone: Tz) -> Self {
        Self { target_timezone }
    }

    pub fn target_timezone(&self) -> Tz {
        self.target_timezone
    }

    /// Normalize a batch.
    ///
    /// A batch with an event lacking a track name or any artist is treated as
    /// malformed and yields no rows. A single unparseable `played_at` fails
    /// the whole batch with [`EtlError::Parse`].
    pub fn normalize(&self, raw: &[RawPlayEvent]) -> Result<Vec<CanonicalPlayRecord>, EtlError> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(bad) = raw.iter().find(|e| !has_expected_fields(e)) {
            warn!(played_at = %bad.played_at, "Malformed play in batch; nothing to transform");
            return Ok(Vec::new());
        }

        let records = raw
            .iter()
            .map(|event| self.normalize_event(event))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), timezone = %self.target_timezone, "Transformed plays");
        Ok(records)
    }

    fn normalize_event(&self, event: &RawPlayEvent) -> Result<CanonicalPlayRecord, EtlError> {
        let instant = parse_played_at(&event.played_at)?;
        let local = instant.with_timezone(&self.target_timezone);

        Ok(CanonicalPlayRecord {
            id: instant.timestamp_millis(),
            local_date: local.format("%Y-%m-%d").to_string(),
            track_name: event.track.name.clone(),
            artist_name: event.track.artists[0].name.clone(),
            local_played_at: local.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

fn has_expected_fields(event: &RawPlayEvent) -> bool {
    !event.played_at.is_empty()
        && !event.track.name.is_empty()
        && event.track.artists.first().is_some_and(|a| !a.name.is_empty())
}

/// Parses the provider's UTC timestamp; offsets other than `Z` are rejected.
///
/// The documented form has a six-digit fraction, but the provider also sends
/// millisecond and fraction-less values, so the fraction may be absent or of
/// any length. Fields that do not line up are still a [`EtlError::Parse`].
pub fn parse_played_at(value: &str) -> Result<DateTime<Utc>, EtlError> {
    NaiveDateTime::parse_from_str(value, PLAYED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| EtlError::Parse {
            value: value.to_string(),
        })
}
