//! Violation kinds, ordered roughly by how hard they break consumers

use serde::{Deserialize, Serialize};

/// Classification of a reported violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Naming and layout conventions
    #[serde(rename = "STYLE_GUIDE")]
    StyleGuide,
    /// Practices that make schemas easier to evolve
    #[serde(rename = "BEST_PRACTICE")]
    BestPractice,
    /// Breaks code that refers to fields by name, e.g. field masks
    #[serde(rename = "FIELD_MASK_INCOMPATIBILITY")]
    FieldMaskIncompatibility,
    /// Breaks code generated from the previous schema
    #[serde(rename = "GENERATED_SOURCE_CODE_INCOMPATIBILITY")]
    GeneratedSourceCodeIncompatibility,
    /// Breaks decoding of previously serialized data
    #[serde(rename = "WIRE_INCOMPATIBILITY")]
    WireIncompatibility,
}

impl ViolationKind {
    /// Get the string identifier for this kind
    pub fn id(&self) -> &'static str {
        match self {
            ViolationKind::StyleGuide => "STYLE_GUIDE",
            ViolationKind::BestPractice => "BEST_PRACTICE",
            ViolationKind::FieldMaskIncompatibility => "FIELD_MASK_INCOMPATIBILITY",
            ViolationKind::GeneratedSourceCodeIncompatibility => {
                "GENERATED_SOURCE_CODE_INCOMPATIBILITY"
            }
            ViolationKind::WireIncompatibility => "WIRE_INCOMPATIBILITY",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ViolationKind::StyleGuide => "Does not follow the style guide.",
            ViolationKind::BestPractice => "Does not follow recommended practice.",
            ViolationKind::FieldMaskIncompatibility => {
                "Breaks consumers that reference fields by name, such as field masks."
            }
            ViolationKind::GeneratedSourceCodeIncompatibility => {
                "Breaks source code generated from the previous schema."
            }
            ViolationKind::WireIncompatibility => {
                "Breaks decoding of data serialized with the previous schema."
            }
        }
    }

    /// Parse kind from string ID
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "STYLE_GUIDE" => Some(ViolationKind::StyleGuide),
            "BEST_PRACTICE" => Some(ViolationKind::BestPractice),
            "FIELD_MASK_INCOMPATIBILITY" => Some(ViolationKind::FieldMaskIncompatibility),
            "GENERATED_SOURCE_CODE_INCOMPATIBILITY" => {
                Some(ViolationKind::GeneratedSourceCodeIncompatibility)
            }
            "WIRE_INCOMPATIBILITY" => Some(ViolationKind::WireIncompatibility),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            ViolationKind::StyleGuide,
            ViolationKind::BestPractice,
            ViolationKind::FieldMaskIncompatibility,
            ViolationKind::GeneratedSourceCodeIncompatibility,
            ViolationKind::WireIncompatibility,
        ]
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("Unknown violation kind: {s}"))
    }
}
