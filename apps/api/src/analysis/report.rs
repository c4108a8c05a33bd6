//! Report types — the structured result the model is asked to emit.
//!
//! Field names and the 0-100 integer scale are a compatibility contract with
//! the frontend; they must match the schema the prompt dictates.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A score on the canonical 0-100 scale.
///
/// Deserializes tolerantly: integers, floats (rounded), and numeric strings
/// are accepted and clamped into range. Out-of-range values are model
/// sloppiness, not a fatal error; anything non-numeric fails the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        numeric(&value)
            .map(Score::new)
            .ok_or_else(|| D::Error::custom(format!("expected a numeric score, got {value}")))
    }
}

fn numeric(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// The model's yes/no judgement on whether the resume looks fabricated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspicious {
    Yes,
    No,
}

impl Serialize for Suspicious {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Suspicious::Yes => "Yes",
            Suspicious::No => "No",
        })
    }
}

impl<'de> Deserialize<'de> for Suspicious {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Bool(true) => Ok(Suspicious::Yes),
            serde_json::Value::Bool(false) => Ok(Suspicious::No),
            serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
                "yes" => Ok(Suspicious::Yes),
                "no" => Ok(Suspicious::No),
                _ => Err(D::Error::custom(format!(
                    "expected Yes/No judgement, got {s:?}"
                ))),
            },
            other => Err(D::Error::custom(format!(
                "expected Yes/No judgement, got {other}"
            ))),
        }
    }
}

/// Relevancy breakdown. `overall` is the minimum evidence of a real payload;
/// the per-dimension scores stay absent when the model skips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevancyScore {
    pub overall: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Score>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyAchievements {
    #[serde(default)]
    pub directly_relevant: Vec<String>,
    #[serde(default)]
    pub transferable: Vec<String>,
}

/// The structured payload parsed out of the model's reply.
///
/// Missing optional fields stay absent rather than defaulting to zero, so
/// "not assessed" is distinguishable from "assessed as zero."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub relevancy_score: RelevancyScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_potential: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious: Option<Suspicious>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub key_achievements: KeyAchievements,
}

/// Full caller-facing response: the report plus the audit trail of which
/// model answered and what it literally said.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub model_used: String,
    pub raw_model_text: String,
}
