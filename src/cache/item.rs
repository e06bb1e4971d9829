//! Cache Item Module
//!
//! Defines the cache row and the expiration algorithm evaluated over it.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{CacheError, Result};

/// Longest accepted sliding window: 100 years.
pub const MAX_SLIDING_EXPIRATION_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

// == Expiration Policy ==
/// The stored expiration policy of an item: a sliding window, an absolute
/// ceiling, or both. At least one is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    sliding_expiration_in_seconds: Option<i64>,
    absolute_expiration: Option<DateTime<Utc>>,
}

impl ExpirationPolicy {
    /// A fixed expiry that never slides.
    pub fn absolute(at: DateTime<Utc>) -> Self {
        Self {
            sliding_expiration_in_seconds: None,
            absolute_expiration: Some(at),
        }
    }

    /// A sliding window with no ceiling.
    pub fn sliding(seconds: i64) -> Result<Self> {
        Self::from_parts(Some(seconds), None)
    }

    /// A sliding window that may never extend past `ceiling`.
    pub fn sliding_with_ceiling(seconds: i64, ceiling: DateTime<Utc>) -> Result<Self> {
        Self::from_parts(Some(seconds), Some(ceiling))
    }

    /// Builds a policy from the nullable column pair.
    pub fn from_parts(
        sliding_expiration_in_seconds: Option<i64>,
        absolute_expiration: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        match (sliding_expiration_in_seconds, absolute_expiration) {
            (None, None) => Err(CacheError::InvalidRequest(
                "Either a sliding or an absolute expiration is required".to_string(),
            )),
            (Some(seconds), _) if seconds <= 0 => Err(CacheError::InvalidRequest(format!(
                "Sliding expiration must be positive, got {} seconds",
                seconds
            ))),
            (Some(seconds), _) if seconds > MAX_SLIDING_EXPIRATION_SECONDS => {
                Err(CacheError::InvalidRequest(format!(
                    "Sliding expiration of {} seconds exceeds the maximum of {} seconds",
                    seconds, MAX_SLIDING_EXPIRATION_SECONDS
                )))
            }
            _ => Ok(Self {
                sliding_expiration_in_seconds,
                absolute_expiration,
            }),
        }
    }

    pub fn sliding_expiration_in_seconds(&self) -> Option<i64> {
        self.sliding_expiration_in_seconds
    }

    pub fn absolute_expiration(&self) -> Option<DateTime<Utc>> {
        self.absolute_expiration
    }

    // == Initial Expiry ==
    /// Computes `ExpiresAtTime` for a freshly written item.
    ///
    /// Non-sliding items expire at their absolute instant. Sliding items
    /// expire one window from `now`, capped at the ceiling if one is set.
    ///
    /// # Errors
    /// `InvalidRequest` if one window from `now` is not a representable instant.
    pub fn initial_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match (self.sliding_expiration_in_seconds, self.absolute_expiration) {
            (None, Some(absolute)) => Ok(absolute),
            (Some(seconds), None) => add_seconds(now, seconds),
            (Some(seconds), Some(absolute)) => Ok(add_seconds(now, seconds)?.min(absolute)),
            // Unreachable through the constructors; treat as already expired.
            (None, None) => Ok(now),
        }
    }
}

// == Cache Item ==
/// One row of the backing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    /// Primary key
    pub id: String,
    /// Opaque payload
    pub value: Vec<u8>,
    /// Effective expiry used by reads and sweeps
    pub expires_at_time: DateTime<Utc>,
    /// Sliding window in whole seconds, None = never slides
    pub sliding_expiration_in_seconds: Option<i64>,
    /// Hard ceiling, None = no ceiling
    pub absolute_expiration: Option<DateTime<Utc>>,
}

impl CacheItem {
    // == Constructor ==
    /// Creates an item written at `now` under `policy`.
    pub fn new(
        id: impl Into<String>,
        value: Vec<u8>,
        policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            value,
            expires_at_time: policy.initial_expiry(now)?,
            sliding_expiration_in_seconds: policy.sliding_expiration_in_seconds(),
            absolute_expiration: policy.absolute_expiration(),
        })
    }

    /// The policy stored on this item.
    pub fn policy(&self) -> Result<ExpirationPolicy> {
        ExpirationPolicy::from_parts(self.sliding_expiration_in_seconds, self.absolute_expiration)
    }

    // == Is Expired ==
    /// An item is expired strictly after its `expires_at_time`; at the exact
    /// instant it is still visible.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at_time
    }

    // == Refreshed Expiry ==
    /// Computes the expiry a refresh at `now` would produce.
    ///
    /// Returns `None` when the refresh is a no-op: the item is expired, does
    /// not slide, has already been snapped to its ceiling, or the slid expiry
    /// would not be a representable instant.
    pub fn refreshed_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_expired(now) {
            return None;
        }
        let seconds = self.sliding_expiration_in_seconds?;
        if self.absolute_expiration == Some(self.expires_at_time) {
            return None;
        }

        let window = TimeDelta::try_seconds(seconds)?;
        match self.absolute_expiration {
            Some(absolute) if absolute - now <= window => Some(absolute),
            _ => now.checked_add_signed(window),
        }
    }

    // == Refresh ==
    /// Applies [`refreshed_expiry`](Self::refreshed_expiry) in place.
    ///
    /// Returns true if the expiry changed.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        match self.refreshed_expiry(now) {
            Some(expiry) => {
                self.expires_at_time = expiry;
                true
            }
            None => false,
        }
    }
}

// == Utility Functions ==
fn add_seconds(now: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(seconds)
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| {
            CacheError::InvalidRequest(format!(
                "Expiry {} seconds after {} is out of range",
                seconds,
                now.to_rfc3339()
            ))
        })
}

/// Converts stored Unix milliseconds into a timestamp.
pub fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CacheError::Internal(format!("Timestamp out of range: {} ms", ms)))
}
