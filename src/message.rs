use std::fmt;

use serde::{Serialize, Serializer};

/// At or above this confidence a diagnosis is stated outright.
pub const CONFIDENT_THRESHOLD: f64 = 85.0;
/// At or above this confidence a diagnosis is stated with a caveat.
pub const MODERATE_THRESHOLD: f64 = 70.0;

/// Human-readable sentence for a parsed prediction.
pub fn generate_message(plant: &str, condition: &str, confidence_percent: f64) -> String {
    if condition.eq_ignore_ascii_case("healthy") {
        return format!("This looks like a healthy {plant}");
    }

    if confidence_percent >= CONFIDENT_THRESHOLD {
        format!("Your {plant} appears to have {condition}")
    } else if confidence_percent >= MODERATE_THRESHOLD {
        format!("Your {plant} might have {condition}, but I'm not entirely sure")
    } else {
        format!("I detected possible {condition} in your {plant}, but confidence is low.")
    }
}

/// Confidence bucket reported by the batch evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceStatus {
    Confident,
    Moderate,
    Uncertain,
    Error,
}

impl ConfidenceStatus {
    pub fn from_confidence(confidence_percent: f64) -> Self {
        if confidence_percent >= CONFIDENT_THRESHOLD {
            ConfidenceStatus::Confident
        } else if confidence_percent >= MODERATE_THRESHOLD {
            ConfidenceStatus::Moderate
        } else {
            ConfidenceStatus::Uncertain
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceStatus::Confident => "✅ Confident",
            ConfidenceStatus::Moderate => "⚠️ Moderate",
            ConfidenceStatus::Uncertain => "❌ Uncertain",
            ConfidenceStatus::Error => "❌ Error",
        }
    }
}

impl fmt::Display for ConfidenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ConfidenceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
