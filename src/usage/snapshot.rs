//! Snapshot parser: turns a `ccusage blocks --active --json` report into a
//! normalized [`UsageSnapshot`].
//!
//! Pure functions, no I/O. Individual missing or oddly-typed fields never
//! fail the parse; each falls back to a fixed default. Only a report without
//! a usable current block is rejected, with [`CcmError::NoData`].

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::errors::{CcmError, Result};

/// Length of one accounting block in minutes (five hours).
pub const BLOCK_DURATION_MINUTES: u32 = 300;

/// Normalized usage figures for the current accounting block.
///
/// Invariants (upheld by [`UsageSnapshot::from_block`]):
/// - `left_percent == 100.saturating_sub(used_percent)`
/// - `elapsed_minutes + remaining_minutes == BLOCK_DURATION_MINUTES`
/// - `tokens_left == token_limit.saturating_sub(total_tokens_used)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// Tokens consumed in the current block.
    pub total_tokens_used: u64,
    /// Effective ceiling: declared limit, projected total, or usage itself.
    pub token_limit: u64,
    /// Rounded percentage consumed.
    pub used_percent: u32,
    /// Percentage remaining, floored at zero.
    pub left_percent: u32,
    /// Minutes until the block resets.
    pub remaining_minutes: u32,
    /// Minutes since the block started.
    pub elapsed_minutes: u32,
    /// Tokens left before the ceiling, floored at zero.
    pub tokens_left: u64,
    /// Cost accrued so far in USD.
    pub cost_used_usd: f64,
    /// Projected cost minus accrued cost. Negative when the projection lags.
    pub cost_left_usd: f64,
    /// Absolute reset time (`now + remaining_minutes`).
    pub reset_at: DateTime<Local>,
}

impl UsageSnapshot {
    /// Build a snapshot from one block object using the fixed defaulting policy.
    #[must_use]
    pub fn from_block(block: &Map<String, Value>, now: DateTime<Local>) -> Self {
        let projection = block.get("projection").and_then(Value::as_object);
        let limit_status = block.get("tokenLimitStatus").and_then(Value::as_object);

        let total_tokens_used = count(block.get("totalTokens")).unwrap_or(1);

        let token_limit = limit_status
            .and_then(|s| count(s.get("limit")))
            .or_else(|| projection.and_then(|p| count(p.get("totalTokens"))))
            .unwrap_or(total_tokens_used);

        let remaining_minutes = projection
            .and_then(|p| count(p.get("remainingMinutes")))
            .map_or(0, |m| {
                u32::try_from(m.min(u64::from(BLOCK_DURATION_MINUTES)))
                    .unwrap_or(BLOCK_DURATION_MINUTES)
            });

        let cost_used_usd = amount(block.get("costUSD")).unwrap_or(0.0);
        let projected_cost = projection
            .and_then(|p| amount(p.get("totalCost")))
            .unwrap_or(0.0);

        let used_percent = limit_status
            .and_then(|s| s.get("percentUsed"))
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite() && *p >= 0.0)
            .map_or_else(
                || local_percent(total_tokens_used, token_limit),
                round_percent,
            );

        Self {
            total_tokens_used,
            token_limit,
            used_percent,
            left_percent: 100u32.saturating_sub(used_percent),
            remaining_minutes,
            elapsed_minutes: BLOCK_DURATION_MINUTES - remaining_minutes,
            tokens_left: token_limit.saturating_sub(total_tokens_used),
            cost_used_usd,
            cost_left_usd: projected_cost - cost_used_usd,
            reset_at: now + Duration::minutes(i64::from(remaining_minutes)),
        }
    }
}

/// Parse a raw report string into a snapshot, stamping the reset time from `now`.
pub fn parse_report(raw: &str, now: DateTime<Local>) -> Result<UsageSnapshot> {
    let doc: Value = serde_json::from_str(raw.trim()).map_err(|e| CcmError::NoData {
        details: format!("report is not valid JSON: {e}"),
    })?;
    parse_value(&doc, now)
}

/// Parse an already-decoded report document.
pub fn parse_value(doc: &Value, now: DateTime<Local>) -> Result<UsageSnapshot> {
    let block = current_block(doc)?;
    Ok(UsageSnapshot::from_block(block, now))
}

/// Locate the current accounting block: the first entry of `blocks`.
fn current_block(doc: &Value) -> Result<&Map<String, Value>> {
    let root = doc.as_object().ok_or_else(|| CcmError::NoData {
        details: "report root is not an object".to_string(),
    })?;
    let blocks = root
        .get("blocks")
        .and_then(Value::as_array)
        .ok_or_else(|| CcmError::NoData {
            details: "report has no blocks array".to_string(),
        })?;
    blocks
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| CcmError::NoData {
            details: "no active block in report".to_string(),
        })
}

/// Non-negative integer field. Floats are truncated; negatives and
/// non-numbers count as absent.
fn count(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}

/// Non-negative decimal field.
fn amount(value: Option<&Value>) -> Option<f64> {
    value?.as_f64().filter(|f| f.is_finite() && *f >= 0.0)
}

fn round_percent(pct: f64) -> u32 {
    let rounded = pct.round();
    if rounded <= 0.0 {
        0
    } else if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

fn local_percent(used: u64, limit: u64) -> u32 {
    if limit == 0 {
        return 0;
    }
    round_percent(used as f64 * 100.0 / limit as f64)
}
