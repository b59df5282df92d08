//! Property-based tests for the snapshot parser and metric formatter.
//!
//! Arbitrary blocks (any subset of fields, odd numeric shapes) must always
//! parse into a snapshot that upholds the percentage, time and token
//! invariants, and formatting must be a pure function of its inputs.

use chrono::{Local, TimeZone};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

use super::format::{NO_METRICS, SEPARATOR, format_metrics, status_line};
use super::snapshot::{BLOCK_DURATION_MINUTES, UsageSnapshot, parse_value};
use crate::display::options::{DisplayConfig, DisplayOption, Orientation};

// ──────────────────── strategies ────────────────────

/// A numeric field as ccusage might send it: integer, float, negative, or junk.
fn arb_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u64..5_000_000).prop_map(|n| json!(n)),
        (0.0f64..5_000_000.0).prop_map(|n| json!(n)),
        (-1_000i64..0).prop_map(|n| json!(n)),
        Just(json!("12")),
        Just(Value::Null),
    ]
}

fn arb_field(key: &'static str) -> impl Strategy<Value = Option<(&'static str, Value)>> {
    prop::option::of(arb_number().prop_map(move |v| (key, v)))
}

fn object(fields: Vec<Option<(&'static str, Value)>>) -> Map<String, Value> {
    fields
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn arb_block() -> impl Strategy<Value = Value> {
    (
        arb_field("totalTokens"),
        arb_field("costUSD"),
        prop::option::of((
            arb_field("totalTokens"),
            arb_field("totalCost"),
            arb_field("remainingMinutes"),
        )),
        prop::option::of((arb_field("limit"), arb_field("percentUsed"))),
    )
        .prop_map(|(tokens, cost, projection, limit_status)| {
            let mut block = object(vec![tokens, cost]);
            if let Some((t, c, r)) = projection {
                block.insert("projection".to_string(), Value::Object(object(vec![t, c, r])));
            }
            if let Some((l, p)) = limit_status {
                block.insert(
                    "tokenLimitStatus".to_string(),
                    Value::Object(object(vec![l, p])),
                );
            }
            json!({ "blocks": [Value::Object(block)] })
        })
}

fn arb_display() -> impl Strategy<Value = DisplayConfig> {
    (
        prop::collection::vec(prop::sample::select(DisplayOption::ALL.to_vec()), 0..5),
        any::<bool>(),
    )
        .prop_map(|(options, left)| {
            let orientation = if left {
                Orientation::Left
            } else {
                Orientation::Used
            };
            DisplayConfig::new(&options, orientation)
        })
}

fn parse(doc: &Value) -> UsageSnapshot {
    let now = Local
        .with_ymd_and_hms(2026, 3, 4, 12, 0, 0)
        .single()
        .expect("valid local time");
    parse_value(doc, now).expect("block present")
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every parsed snapshot upholds the derived-field invariants.
    #[test]
    fn parsed_snapshot_invariants(doc in arb_block()) {
        let s = parse(&doc);
        prop_assert_eq!(s.left_percent, 100u32.saturating_sub(s.used_percent));
        prop_assert_eq!(s.elapsed_minutes + s.remaining_minutes, BLOCK_DURATION_MINUTES);
        prop_assert_eq!(s.tokens_left, s.token_limit.saturating_sub(s.total_tokens_used));
        prop_assert!(s.cost_used_usd >= 0.0);
    }

    /// A missing token count never produces zero usage.
    #[test]
    fn absent_tokens_default_to_one(doc in arb_block()) {
        let has_tokens = doc["blocks"][0]["totalTokens"]
            .as_f64()
            .is_some_and(|n| n >= 0.0);
        let s = parse(&doc);
        if !has_tokens {
            prop_assert_eq!(s.total_tokens_used, 1);
        }
    }

    /// Formatting twice gives the same output.
    #[test]
    fn formatting_is_idempotent(doc in arb_block(), cfg in arb_display()) {
        let s = parse(&doc);
        prop_assert_eq!(status_line(&s, &cfg), status_line(&s, &cfg));
    }

    /// One token per rendered option, joined by the separator; never money under Left.
    #[test]
    fn status_line_shape(doc in arb_block(), cfg in arb_display()) {
        let s = parse(&doc);
        let tokens = format_metrics(&s, &cfg);
        let line = status_line(&s, &cfg);
        if tokens.is_empty() {
            prop_assert_eq!(line, NO_METRICS);
        } else {
            prop_assert_eq!(line.split(SEPARATOR).count(), tokens.len());
        }
        if cfg.orientation() == Orientation::Left {
            prop_assert!(tokens.iter().all(|t| !t.starts_with('$')));
        }
        prop_assert!(tokens.len() <= cfg.enabled_options().count());
    }
}
