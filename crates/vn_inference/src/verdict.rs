//! Turning the model's text answer into a [`Verdict`].

use serde::Deserialize;
use serde_json::Value;
use vn_core::{Classification, Criterion, Error, Result, SourceReference, Verdict};

const DEFAULT_SCORE: u8 = 50;

#[derive(Deserialize)]
struct RawVerdict {
    classification: String,
    #[serde(default)]
    score: Option<Value>,
    explanation: String,
    #[serde(default)]
    criteria: Option<Vec<RawCriterion>>,
    #[serde(default)]
    sources: Option<Vec<RawSource>>,
}

#[derive(Deserialize)]
struct RawCriterion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<Value>,
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    verified: Option<Value>,
}

/// Numbers and numeric strings are accepted; anything else is `None`.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn outermost_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Strips a fenced code block if present, then narrows the text to its
/// outermost object.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
            rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest).trim()
        }
        None => trimmed,
    };
    outermost_object(body)
}

pub fn try_parse_verdict(text: &str) -> Result<Verdict> {
    let raw: RawVerdict = serde_json::from_str(extract_json(text))?;
    let classification: Classification = raw.classification.parse()?;
    if raw.explanation.trim().is_empty() {
        return Err(Error::InvalidRequest("empty explanation".to_string()));
    }
    let score = match raw.score.as_ref().and_then(number) {
        Some(score) => score.round().clamp(0.0, 100.0) as u8,
        None => {
            tracing::debug!("Model answer has no usable score, using {}", DEFAULT_SCORE);
            DEFAULT_SCORE
        }
    };

    Ok(Verdict {
        classification,
        score,
        explanation: raw.explanation,
        criteria: raw
            .criteria
            .unwrap_or_default()
            .into_iter()
            .map(|criterion| Criterion {
                name: criterion.name,
                status: flag(criterion.status.as_ref()),
            })
            .collect(),
        sources: raw
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(|source| SourceReference {
                name: source.name,
                url: source.url.unwrap_or_default(),
                verified: flag(source.verified.as_ref()),
            })
            .collect(),
    })
}

/// Parses the model answer, falling back to [`Verdict::fallback`] when it
/// cannot be understood.
pub fn parse_verdict(text: &str) -> Verdict {
    match try_parse_verdict(text) {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!("Error parsing model response, using fallback verdict: {}", e);
            Verdict::fallback()
        }
    }
}
