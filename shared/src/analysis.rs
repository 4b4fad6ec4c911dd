use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use crate::de;

/// Outcome of a successful scan: the OCR text plus the server's assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub extracted_text: String,
    pub analysis: Analysis,
}

/// Every section is optional. Unknown keys are kept in `extra` so a result can be
/// sent back to the save endpoint unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(
        default,
        deserialize_with = "de::optional_whole",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmful_ingredients: Option<Vec<HarmfulIngredient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutritional_info: Option<NutritionalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_eat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_eat_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy_alternatives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Analysis {
    pub fn health_band(&self) -> Option<HealthBand> {
        self.health_score.map(HealthBand::from_score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalInfo {
    #[serde(
        default,
        deserialize_with = "de::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_sugar: Option<f64>,
    #[serde(
        default,
        deserialize_with = "de::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_sodium: Option<f64>,
    #[serde(
        default,
        deserialize_with = "de::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub calories_per_serving: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmfulIngredient {
    pub name: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub warning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

/// Unrecognised severities are shown with the lowest risk styling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    High,
    Medium,
    #[default]
    Low,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Severity::from_str(value.trim()).unwrap_or_default()
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: RecommendationType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecommendationType {
    Warning,
    Positive,
    #[default]
    Info,
    Other(String),
}

impl From<String> for RecommendationType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "warning" => RecommendationType::Warning,
            "positive" => RecommendationType::Positive,
            "info" => RecommendationType::Info,
            _ => RecommendationType::Other(value),
        }
    }
}

impl From<RecommendationType> for String {
    fn from(value: RecommendationType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationType::Warning => f.write_str("warning"),
            RecommendationType::Positive => f.write_str("positive"),
            RecommendationType::Info => f.write_str("info"),
            RecommendationType::Other(other) => f.write_str(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HealthBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    /// Band for a fresh scan result.
    pub fn from_score(score: u32) -> Self {
        Self::banded(score, 45)
    }

    /// Band for a scan read back from history, where Fair starts at 40.
    pub fn from_saved_score(score: u32) -> Self {
        Self::banded(score, 40)
    }

    fn banded(score: u32, fair: u32) -> Self {
        match score {
            s if s >= 80 => HealthBand::Excellent,
            s if s >= 60 => HealthBand::Good,
            s if s >= fair => HealthBand::Fair,
            _ => HealthBand::Poor,
        }
    }
}
