//! Entry Options Module
//!
//! Caller-facing expiration settings for a single `set`, resolved against the
//! clock into the stored [`ExpirationPolicy`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::ExpirationPolicy;
use crate::error::{CacheError, Result};

// == Entry Options ==
/// Expiration settings for one cache entry.
///
/// When neither a sliding nor an absolute expiration is given, the cache's
/// default sliding window applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Fixed instant at which the entry expires
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Fixed lifetime measured from the time of the write
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Inactivity window renewed by every refresh
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    pub fn with_absolute_expiration_relative_to_now(mut self, lifetime: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(lifetime);
        self
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }

    // == Resolve ==
    /// Resolves the options at `now` into a stored policy.
    ///
    /// A relative lifetime takes precedence over an absolute instant. Sliding
    /// windows are truncated to whole seconds.
    ///
    /// # Errors
    /// `InvalidRequest` if the absolute expiration is not in the future or is
    /// out of range, or the sliding window is shorter than one second or longer
    /// than [`MAX_SLIDING_EXPIRATION_SECONDS`](crate::cache::MAX_SLIDING_EXPIRATION_SECONDS).
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        default_sliding: Duration,
    ) -> Result<ExpirationPolicy> {
        let absolute = match self.absolute_expiration_relative_to_now {
            Some(lifetime) => Some(after(now, lifetime)?),
            None => self.absolute_expiration,
        };

        if let Some(at) = absolute {
            if at <= now {
                return Err(CacheError::InvalidRequest(format!(
                    "Absolute expiration {} must be in the future",
                    at.to_rfc3339()
                )));
            }
        }

        let sliding = match (self.sliding_expiration, absolute) {
            (Some(window), _) => Some(window),
            (None, None) => Some(default_sliding),
            (None, Some(_)) => None,
        };
        let sliding_seconds = sliding.map(sliding_seconds).transpose()?;

        ExpirationPolicy::from_parts(sliding_seconds, absolute)
    }
}

fn sliding_seconds(window: Duration) -> Result<i64> {
    if window.as_secs() == 0 {
        return Err(CacheError::InvalidRequest(format!(
            "Sliding expiration must be at least one second, got {:?}",
            window
        )));
    }
    i64::try_from(window.as_secs()).map_err(|_| {
        CacheError::InvalidRequest(format!("Sliding expiration {:?} is out of range", window))
    })
}

fn after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            CacheError::InvalidRequest(format!("Expiration {:?} is out of range", lifetime))
        })
}
