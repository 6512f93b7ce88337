use serde_json::{Map, Value};

/// How a declared field is cleaned when it appears in an upstream payload.
#[derive(Clone, Copy)]
enum FieldKind {
    /// Trimmed string; placeholder tokens become "".
    Text,
    /// Finite number; malformed input becomes 0.0.
    Number,
    /// Finite number rescaled onto 0.0..=1.0.
    Metric,
    /// Nested object sanitized by the given shape; anything else becomes {}.
    Nested(fn(&Value) -> Value),
    /// Array whose elements are sanitized by the given shape; anything else becomes [].
    Items(fn(&Value) -> Value),
}

// Field tables for each payload shape the upstream services emit. Fields not
// listed here pass through untouched, so additive upstream changes never break
// the dashboard; fields listed here come out with a guaranteed type.
const AGENT_FIELDS: &[(&str, FieldKind)] = &[
    ("agent_id", FieldKind::Number),
    ("profile", FieldKind::Nested(sanitize_profile)),
    ("metrics", FieldKind::Nested(sanitize_agent_metrics)),
    ("recent_reviews", FieldKind::Items(sanitize_review)),
];

const PROFILE_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("agency", FieldKind::Text),
    ("email", FieldKind::Text),
    ("phone", FieldKind::Text),
    ("city", FieldKind::Text),
    ("state", FieldKind::Text),
    ("photo_url", FieldKind::Text),
    ("bio", FieldKind::Text),
    ("years_experience", FieldKind::Number),
    ("rating", FieldKind::Number),
    ("review_count", FieldKind::Number),
];

const AGENT_METRICS_FIELDS: &[(&str, FieldKind)] = &[
    ("responsiveness", FieldKind::Metric),
    ("negotiation", FieldKind::Metric),
    ("professionalism", FieldKind::Metric),
    ("market_expertise", FieldKind::Metric),
    ("q_prior", FieldKind::Metric),
    ("wilson_lower_bound", FieldKind::Metric),
    ("recency_score", FieldKind::Metric),
    ("deals_closed", FieldKind::Number),
    ("avg_days_on_market", FieldKind::Number),
];

const REVIEW_FIELDS: &[(&str, FieldKind)] = &[
    ("author", FieldKind::Text),
    ("comment", FieldKind::Text),
    ("date", FieldKind::Text),
    ("source", FieldKind::Text),
    ("rating", FieldKind::Number),
];

const SEARCH_RESPONSE_FIELDS: &[(&str, FieldKind)] = &[
    ("results", FieldKind::Items(sanitize_agent_record)),
    ("total_count", FieldKind::Number),
    ("query", FieldKind::Text),
];

const RECOMMENDATION_FIELDS: &[(&str, FieldKind)] = &[
    ("agent_id", FieldKind::Number),
    ("rank", FieldKind::Number),
    ("utility_score", FieldKind::Metric),
    ("q_prior", FieldKind::Metric),
    ("wilson_lower_bound", FieldKind::Metric),
    ("recency_score", FieldKind::Metric),
    ("availability_fit", FieldKind::Metric),
];

const FACTOR_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    // Factor weights are signed model coefficients, not scores; they keep
    // whatever magnitude the model assigned them.
    ("weight", FieldKind::Number),
];

const EXPLANATION_FIELDS: &[(&str, FieldKind)] = &[
    ("agent_id", FieldKind::Number),
    ("summary", FieldKind::Text),
    ("top_factor", FieldKind::Text),
    ("confidence_score", FieldKind::Metric),
    ("factors", FieldKind::Items(sanitize_factor)),
];

const RECOMMENDATION_RESPONSE_FIELDS: &[(&str, FieldKind)] = &[
    ("recommendations", FieldKind::Items(sanitize_recommendation)),
    ("explanations", FieldKind::Items(sanitize_explanation)),
    ("model_version", FieldKind::Text),
    ("query_id", FieldKind::Text),
];

const CLASSIFIED_REVIEW_FIELDS: &[(&str, FieldKind)] = &[
    ("text", FieldKind::Text),
    ("sentiment", FieldKind::Text),
    ("author", FieldKind::Text),
    ("rating", FieldKind::Number),
    ("confidence_score", FieldKind::Metric),
];

const SENTIMENT_SUMMARY_FIELDS: &[(&str, FieldKind)] = &[
    ("total", FieldKind::Number),
    ("positive", FieldKind::Number),
    ("negative", FieldKind::Number),
    ("neutral", FieldKind::Number),
    ("average_confidence", FieldKind::Metric),
];

const SENTIMENT_RESPONSE_FIELDS: &[(&str, FieldKind)] = &[
    ("classified_reviews", FieldKind::Items(sanitize_classified_review)),
    ("summary", FieldKind::Nested(sanitize_sentiment_summary)),
];

/// Coerce a raw JSON value into a display-safe string.
///
/// Null, the `"nan"` placeholder the feature pipeline leaks (any casing,
/// surrounding whitespace ignored) and non-scalar values all become `""`;
/// other scalars are stringified and trimmed.
pub fn clean_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                String::new()
            } else {
                trimmed.to_string()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Coerce a raw JSON value into a finite number.
///
/// Numeric strings are parsed after trimming; booleans count as 0/1. Null,
/// `"nan"`, unparseable strings and non-finite parses all become 0.0.
pub fn clean_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Coerce a model score onto the 0.0..=1.0 scale.
///
/// Contract: any value above 1.0 is treated as a percentage and divided by
/// 100, then capped at 1.0; negative values floor at 0.0. A legitimate
/// non-percentage score above 1.0 cannot survive this mapping, so upstream
/// services must emit either fractions or percentages, never a third scale.
pub fn normalize_metric(value: &Value) -> f64 {
    let n = clean_number(value);
    if n > 1.0 {
        (n / 100.0).min(1.0)
    } else {
        n.max(0.0)
    }
}

/// Normalize the agent detail payload (also each element of search results).
pub fn sanitize_agent_record(raw: &Value) -> Value {
    sanitize_record(raw, AGENT_FIELDS)
}

/// Normalize the agent search payload: `results`, `total_count`, `query`.
pub fn sanitize_search_response(raw: &Value) -> Value {
    sanitize_record(raw, SEARCH_RESPONSE_FIELDS)
}

/// Normalize the recommender payload: ranked `recommendations` plus their
/// `explanations`, `model_version` and `query_id`.
pub fn sanitize_recommendation_response(raw: &Value) -> Value {
    sanitize_record(raw, RECOMMENDATION_RESPONSE_FIELDS)
}

/// Normalize the sentiment payload: `classified_reviews` plus the count
/// `summary`.
pub fn sanitize_sentiment_response(raw: &Value) -> Value {
    sanitize_record(raw, SENTIMENT_RESPONSE_FIELDS)
}

fn sanitize_profile(raw: &Value) -> Value {
    sanitize_record(raw, PROFILE_FIELDS)
}

fn sanitize_agent_metrics(raw: &Value) -> Value {
    sanitize_record(raw, AGENT_METRICS_FIELDS)
}

fn sanitize_review(raw: &Value) -> Value {
    sanitize_record(raw, REVIEW_FIELDS)
}

fn sanitize_recommendation(raw: &Value) -> Value {
    sanitize_record(raw, RECOMMENDATION_FIELDS)
}

fn sanitize_factor(raw: &Value) -> Value {
    sanitize_record(raw, FACTOR_FIELDS)
}

fn sanitize_explanation(raw: &Value) -> Value {
    sanitize_record(raw, EXPLANATION_FIELDS)
}

fn sanitize_classified_review(raw: &Value) -> Value {
    sanitize_record(raw, CLASSIFIED_REVIEW_FIELDS)
}

fn sanitize_sentiment_summary(raw: &Value) -> Value {
    sanitize_record(raw, SENTIMENT_SUMMARY_FIELDS)
}

/// Apply a field table to one object. Declared scalar fields are coerced,
/// declared containers are sanitized recursively (and materialized as {} or
/// [] when absent or mistyped), undeclared fields are copied verbatim.
/// Non-object input yields an object holding only the container defaults.
fn sanitize_record(raw: &Value, fields: &[(&str, FieldKind)]) -> Value {
    let mut out = Map::new();
    if let Some(object) = raw.as_object() {
        for (key, value) in object {
            match field_kind(fields, key) {
                Some(FieldKind::Text) => {
                    out.insert(key.clone(), Value::String(clean_string(value)));
                }
                Some(FieldKind::Number) => {
                    out.insert(key.clone(), number_value(clean_number(value)));
                }
                Some(FieldKind::Metric) => {
                    out.insert(key.clone(), number_value(normalize_metric(value)));
                }
                Some(FieldKind::Nested(sanitize)) => {
                    out.insert(key.clone(), sanitize(value));
                }
                Some(FieldKind::Items(sanitize)) => {
                    out.insert(key.clone(), sanitize_elements(value, sanitize));
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }
    for (key, kind) in fields {
        if out.contains_key(*key) {
            continue;
        }
        match kind {
            FieldKind::Nested(_) => {
                out.insert((*key).to_string(), Value::Object(Map::new()));
            }
            FieldKind::Items(_) => {
                out.insert((*key).to_string(), Value::Array(Vec::new()));
            }
            _ => {}
        }
    }
    Value::Object(out)
}

fn field_kind(fields: &[(&str, FieldKind)], key: &str) -> Option<FieldKind> {
    fields
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

fn sanitize_elements(raw: &Value, sanitize: fn(&Value) -> Value) -> Value {
    match raw.as_array() {
        Some(items) => Value::Array(items.iter().map(sanitize).collect()),
        None => Value::Array(Vec::new()),
    }
}

/// Integral results are emitted as JSON integers so a value that survives a
/// clean pass unchanged also survives re-serialization unchanged.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_string_blanks_missing_markers() {
        assert_eq!(clean_string(&Value::Null), "");
        assert_eq!(clean_string(&json!("nan")), "");
        assert_eq!(clean_string(&json!("NaN")), "");
        assert_eq!(clean_string(&json!("  NAN  ")), "");
    }

    #[test]
    fn clean_string_trims_and_stringifies_scalars() {
        assert_eq!(clean_string(&json!("  Jane Doe  ")), "Jane Doe");
        assert_eq!(clean_string(&json!(42)), "42");
        assert_eq!(clean_string(&json!(true)), "true");
        assert_eq!(clean_string(&json!({"nested": 1})), "");
        assert_eq!(clean_string(&json!([1, 2])), "");
    }

    #[test]
    fn clean_number_defaults_malformed_to_zero() {
        assert_eq!(clean_number(&Value::Null), 0.0);
        assert_eq!(clean_number(&json!("nan")), 0.0);
        assert_eq!(clean_number(&json!("one hundred")), 0.0);
        assert_eq!(clean_number(&json!({})), 0.0);
        assert_eq!(clean_number(&json!([3])), 0.0);
    }

    #[test]
    fn clean_number_parses_numeric_strings() {
        assert_eq!(clean_number(&json!("42")), 42.0);
        assert_eq!(clean_number(&json!("  7.5  ")), 7.5);
        assert_eq!(clean_number(&json!("-3")), -3.0);
        assert_eq!(clean_number(&json!(true)), 1.0);
    }

    #[test]
    fn clean_number_rejects_non_finite() {
        // "inf" and "infinity" parse as f64 infinities; they must not leak.
        assert_eq!(clean_number(&json!("inf")), 0.0);
        assert_eq!(clean_number(&json!("-infinity")), 0.0);
    }

    #[test]
    fn normalize_metric_rescales_percentages() {
        assert_eq!(normalize_metric(&json!(85)), 0.85);
        assert_eq!(normalize_metric(&json!("85")), 0.85);
        assert_eq!(normalize_metric(&json!(0.85)), 0.85);
        assert_eq!(normalize_metric(&json!(1.0)), 1.0);
    }

    #[test]
    fn normalize_metric_clamps_out_of_range() {
        assert_eq!(normalize_metric(&json!(150)), 1.0);
        assert_eq!(normalize_metric(&json!(-5)), 0.0);
        assert_eq!(normalize_metric(&json!("nan")), 0.0);
    }

    #[test]
    fn agent_record_coerces_types_and_rescales_metrics() {
        let raw = json!({
            "agent_id": "14",
            "profile": {"rating": "nan", "name": "  Jane Doe "},
            "metrics": {"responsiveness": 92}
        });
        let cleaned = sanitize_agent_record(&raw);
        assert_eq!(cleaned["agent_id"], json!(14));
        assert_eq!(cleaned["profile"]["rating"], json!(0));
        assert_eq!(cleaned["profile"]["name"], json!("Jane Doe"));
        assert_eq!(cleaned["metrics"]["responsiveness"], json!(0.92));
        assert_eq!(cleaned["recent_reviews"], json!([]));
    }

    #[test]
    fn agent_record_materializes_missing_containers() {
        let cleaned = sanitize_agent_record(&json!({"agent_id": 7}));
        assert_eq!(cleaned["profile"], json!({}));
        assert_eq!(cleaned["metrics"], json!({}));
        assert_eq!(cleaned["recent_reviews"], json!([]));

        // A mistyped container degrades to the same defaults.
        let cleaned = sanitize_agent_record(&json!({
            "profile": "missing",
            "recent_reviews": "not an array"
        }));
        assert_eq!(cleaned["profile"], json!({}));
        assert_eq!(cleaned["recent_reviews"], json!([]));
    }

    #[test]
    fn agent_record_passes_unknown_fields_through() {
        let raw = json!({
            "source_system": "mls-east",
            "profile": {"team": ["listings", "rentals"]}
        });
        let cleaned = sanitize_agent_record(&raw);
        assert_eq!(cleaned["source_system"], json!("mls-east"));
        assert_eq!(cleaned["profile"]["team"], json!(["listings", "rentals"]));
    }

    #[test]
    fn review_ratings_keep_their_scale() {
        // Review ratings are 1-5 stars, not 0-1 metrics.
        let raw = json!({
            "recent_reviews": [{"rating": 4.8, "comment": " solid "}]
        });
        let cleaned = sanitize_agent_record(&raw);
        assert_eq!(cleaned["recent_reviews"][0]["rating"], json!(4.8));
        assert_eq!(cleaned["recent_reviews"][0]["comment"], json!("solid"));
    }

    #[test]
    fn malformed_review_entries_become_empty_records() {
        let raw = json!({"recent_reviews": ["five stars!!", 5, null]});
        let cleaned = sanitize_agent_record(&raw);
        assert_eq!(cleaned["recent_reviews"], json!([{}, {}, {}]));
    }

    #[test]
    fn sanitize_twice_equals_sanitize_once() {
        let raw = json!({
            "agent_id": "14",
            "profile": {
                "name": "  Jane Doe ",
                "rating": "4.9",
                "review_count": "nan",
                "languages": ["en", "es"]
            },
            "metrics": {
                "responsiveness": 92,
                "negotiation": 0.77,
                "q_prior": "nan",
                "deals_closed": "31"
            },
            "recent_reviews": [
                {"author": null, "rating": "5", "comment": " great "},
                "garbage"
            ],
            "ingested_at": "2026-08-21T09:30:00Z"
        });
        let once = sanitize_agent_record(&raw);
        let twice = sanitize_agent_record(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn search_response_defaults_malformed_results() {
        let cleaned = sanitize_search_response(&json!({
            "results": "not an array",
            "total_count": "12",
            "query": "  austin  "
        }));
        assert_eq!(cleaned["results"], json!([]));
        assert_eq!(cleaned["total_count"], json!(12));
        assert_eq!(cleaned["query"], json!("austin"));

        let cleaned = sanitize_search_response(&json!({}));
        assert_eq!(cleaned["results"], json!([]));
    }

    #[test]
    fn recommendation_response_cleans_nested_explanations() {
        let raw = json!({
            "recommendations": [
                {"agent_id": "3", "rank": 1, "utility_score": 88, "availability_fit": "nan"}
            ],
            "explanations": [
                {
                    "agent_id": "3",
                    "summary": "  strong closer  ",
                    "confidence_score": 97,
                    "factors": [{"name": " recency ", "weight": "0.4"}]
                }
            ],
            "model_version": "  v3.2.1 ",
            "query_id": null
        });
        let cleaned = sanitize_recommendation_response(&raw);
        assert_eq!(cleaned["recommendations"][0]["agent_id"], json!(3));
        assert_eq!(cleaned["recommendations"][0]["utility_score"], json!(0.88));
        assert_eq!(cleaned["recommendations"][0]["availability_fit"], json!(0));
        assert_eq!(cleaned["explanations"][0]["summary"], json!("strong closer"));
        assert_eq!(cleaned["explanations"][0]["confidence_score"], json!(0.97));
        assert_eq!(cleaned["explanations"][0]["factors"][0]["name"], json!("recency"));
        assert_eq!(cleaned["model_version"], json!("v3.2.1"));
        assert_eq!(cleaned["query_id"], json!(""));
    }

    #[test]
    fn recommendation_response_defaults_malformed_lists() {
        let cleaned = sanitize_recommendation_response(&json!({
            "recommendations": "not an array",
            "explanations": null
        }));
        assert_eq!(cleaned["recommendations"], json!([]));
        assert_eq!(cleaned["explanations"], json!([]));
    }

    #[test]
    fn factor_weights_are_not_clamped() {
        let raw = json!({
            "explanations": [{"factors": [{"name": "slow replies", "weight": -0.42}]}]
        });
        let cleaned = sanitize_recommendation_response(&raw);
        assert_eq!(
            cleaned["explanations"][0]["factors"][0]["weight"],
            json!(-0.42)
        );
    }

    #[test]
    fn sentiment_response_counts_are_coerced() {
        let raw = json!({
            "classified_reviews": [
                {"text": " loved it ", "sentiment": "positive", "confidence_score": 93, "rating": "5"}
            ],
            "summary": {"total": "12", "positive": 9, "negative": 2, "neutral": 1, "average_confidence": 88}
        });
        let cleaned = sanitize_sentiment_response(&raw);
        assert_eq!(cleaned["classified_reviews"][0]["text"], json!("loved it"));
        assert_eq!(cleaned["classified_reviews"][0]["confidence_score"], json!(0.93));
        assert_eq!(cleaned["classified_reviews"][0]["rating"], json!(5));
        assert_eq!(cleaned["summary"]["total"], json!(12));
        assert_eq!(cleaned["summary"]["average_confidence"], json!(0.88));

        let cleaned = sanitize_sentiment_response(&json!({"summary": null}));
        assert_eq!(cleaned["summary"], json!({}));
        assert_eq!(cleaned["classified_reviews"], json!([]));
    }
}
