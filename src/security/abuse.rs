//! Abuse tracking: per identifier and action attempt counters with block windows.
//!
//! # Responsibilities
//! - Map an action label to its limits (unknown labels use the default limits)
//! - Decide whether an attempt is allowed, counted, or blocked
//! - Persist the attempt record with compare-and-swap semantics
//!
//! # Design Decisions
//! - The decision is a pure function of the previous record and the clock
//! - Attempts made while blocked are not counted and write nothing
//! - The attempt that reaches the limit is rejected and starts the block
//! - Counters restart once the window or a previous block has lapsed
//!   (`reset_after_window`); with it off they accumulate indefinitely
//! - First records are inserted with ignore-duplicates, later ones are updated
//!   only if `attempt_count` and `last_attempt_at` still hold the values read;
//!   a lost race re-reads and re-evaluates after a jittered backoff

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{AbuseConfig, ActionLimits};
use crate::observability::metrics;
use crate::resilience::calculate_backoff;
use crate::store::{DataStore, Filter, OnConflict, Query, StoreError};

pub const ABUSE_TABLE: &str = "abuse_tracking";

/// Persisted attempt counter for one (identifier, action_type) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub identifier: String,
    pub action_type: String,
    pub attempt_count: u32,
    pub last_attempt_at: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Limits applied to one action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
    pub block: Duration,
}

impl From<ActionLimits> for RateLimitPolicy {
    fn from(limits: ActionLimits) -> Self {
        Self {
            max_attempts: limits.max_attempts,
            window: Duration::minutes(limits.window_minutes),
            block: Duration::minutes(limits.block_minutes),
        }
    }
}

/// Outcome of evaluating one attempt against the previous record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A block is still active. Nothing is written.
    Blocked { until: DateTime<Utc>, attempt_count: u32 },
    /// The attempt is counted and `next` must be persisted.
    Counted { next: AttemptRecord },
}

/// Evaluate an attempt made at `now`.
pub fn evaluate(
    policy: &RateLimitPolicy,
    previous: Option<&AttemptRecord>,
    identifier: &str,
    action_type: &str,
    now: DateTime<Utc>,
    reset_after_window: bool,
) -> Verdict {
    if let Some(prev) = previous {
        if let Some(until) = prev.blocked_until.filter(|until| *until > now) {
            return Verdict::Blocked { until, attempt_count: prev.attempt_count };
        }
    }

    let carried = match previous {
        None => 0,
        Some(prev)
            if reset_after_window
                && (prev.blocked_until.is_some() || now - prev.last_attempt_at >= policy.window) =>
        {
            0
        }
        Some(prev) => prev.attempt_count,
    };

    let attempt_count = carried.saturating_add(1);
    let blocked_until = (attempt_count >= policy.max_attempts).then(|| now + policy.block);

    Verdict::Counted {
        next: AttemptRecord {
            identifier: identifier.to_string(),
            action_type: action_type.to_string(),
            attempt_count,
            last_attempt_at: now,
            blocked_until,
        },
    }
}

/// Name of the limits applied to `action_type`. Callers may send any label,
/// so this closed set is also what metrics are labelled with.
pub fn policy_bucket(action_type: &str) -> &'static str {
    match action_type {
        "signup" => "signup",
        "login" => "login",
        _ => "default",
    }
}

/// Result of `check_and_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbuseCheck {
    pub rate_limit_ok: bool,
    pub attempt_count: u32,
    pub blocked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AbuseError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed attempt record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("attempt record still contended after {attempts} attempts")]
    Contention { attempts: u32 },
}

/// Rate limiter backed by the `abuse_tracking` table.
#[derive(Clone)]
pub struct AbuseTracker {
    store: Arc<dyn DataStore>,
    config: AbuseConfig,
}

impl AbuseTracker {
    pub fn new(store: Arc<dyn DataStore>, config: AbuseConfig) -> Self {
        Self { store, config }
    }

    pub fn policy_for(&self, action_type: &str) -> RateLimitPolicy {
        let limits = &self.config.limits;
        match policy_bucket(action_type) {
            "signup" => limits.signup.into(),
            "login" => limits.login.into(),
            _ => limits.default.into(),
        }
    }

    pub async fn check_and_record(&self, identifier: &str, action_type: &str) -> Result<AbuseCheck, AbuseError> {
        self.check_and_record_at(identifier, action_type, Utc::now()).await
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an explicit clock.
    pub async fn check_and_record_at(
        &self,
        identifier: &str,
        action_type: &str,
        now: DateTime<Utc>,
    ) -> Result<AbuseCheck, AbuseError> {
        // Stored timestamps carry microsecond precision.
        let now = now.trunc_subsecs(6);
        let policy = self.policy_for(action_type);
        let bucket = policy_bucket(action_type);

        for round in 1..=self.config.max_write_attempts {
            let previous = self.fetch(identifier, action_type).await?;

            let next = match evaluate(&policy, previous.as_ref(), identifier, action_type, now, self.config.reset_after_window) {
                Verdict::Blocked { until, attempt_count } => {
                    metrics::record_abuse_check(bucket, "blocked");
                    tracing::info!(action_type, attempt_count, blocked_until = %until, "Attempt rejected by active block");
                    return Ok(AbuseCheck {
                        rate_limit_ok: false,
                        attempt_count,
                        blocked_until: Some(until),
                    });
                }
                Verdict::Counted { next } => next,
            };

            if self.persist(previous.as_ref(), &next).await? {
                let rate_limit_ok = next.blocked_until.is_none();
                if rate_limit_ok {
                    metrics::record_abuse_check(bucket, "allowed");
                } else {
                    metrics::record_abuse_check(bucket, "block_started");
                    tracing::warn!(
                        action_type,
                        attempt_count = next.attempt_count,
                        blocked_until = ?next.blocked_until,
                        "Attempt limit reached, blocking"
                    );
                }
                return Ok(AbuseCheck {
                    rate_limit_ok,
                    attempt_count: next.attempt_count,
                    blocked_until: next.blocked_until,
                });
            }

            let delay = calculate_backoff(round, self.config.retry_base_delay_ms, self.config.retry_max_delay_ms);
            tracing::debug!(action_type, round, delay = ?delay, "Attempt record changed concurrently, re-evaluating");
            tokio::time::sleep(delay).await;
        }

        metrics::record_abuse_check(bucket, "contended");
        Err(AbuseError::Contention { attempts: self.config.max_write_attempts })
    }

    async fn fetch(&self, identifier: &str, action_type: &str) -> Result<Option<AttemptRecord>, AbuseError> {
        let query = Query::table(ABUSE_TABLE)
            .filter(Filter::eq("identifier", identifier))
            .filter(Filter::eq("action_type", action_type));
        match self.store.select_one(&query).await? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Write `next` if the stored record still equals `previous`.
    async fn persist(&self, previous: Option<&AttemptRecord>, next: &AttemptRecord) -> Result<bool, AbuseError> {
        let row = serde_json::to_value(next)?;
        let written = match previous {
            None => {
                let key = vec!["identifier".to_string(), "action_type".to_string()];
                self.store.insert(ABUSE_TABLE, row, OnConflict::Ignore(key)).await?
            }
            Some(prev) => {
                let filters = [
                    Filter::eq("identifier", prev.identifier.as_str()),
                    Filter::eq("action_type", prev.action_type.as_str()),
                    Filter::eq("attempt_count", prev.attempt_count),
                    Filter::eq("last_attempt_at", serde_json::to_value(prev.last_attempt_at)?),
                ];
                let patch = match row {
                    Value::Object(mut fields) => {
                        fields.remove("identifier");
                        fields.remove("action_type");
                        Value::Object(fields)
                    }
                    other => other,
                };
                self.store.update(ABUSE_TABLE, &filters, patch).await?
            }
        };
        Ok(!written.is_empty())
    }
}
