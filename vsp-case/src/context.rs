//! Clinical interview contexts.
//!
//! A query always arrives in one of three contexts, each served by its own
//! persona: the patient's companion (anamnesis), the examining physician's
//! objective findings (exam), and the resident reporting results (labs).

use serde::{Deserialize, Serialize};

/// The clinical context a query was asked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalContext {
    /// History taking, mediated by the patient or a companion.
    Anamnesis,
    /// Physical examination findings.
    Exam,
    /// Laboratory and imaging results.
    Labs,
}

impl ClinicalContext {
    /// All contexts, in interview order.
    pub const ALL: [ClinicalContext; 3] = [Self::Anamnesis, Self::Exam, Self::Labs];

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anamnesis => "anamnesis",
            Self::Exam => "exam",
            Self::Labs => "labs",
        }
    }
}

impl std::fmt::Display for ClinicalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ClinicalContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anamnesis" => Ok(Self::Anamnesis),
            "exam" => Ok(Self::Exam),
            "labs" => Ok(Self::Labs),
            other => Err(format!("unknown clinical context: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_parses_from_str() {
        assert_eq!("exam".parse::<ClinicalContext>(), Ok(ClinicalContext::Exam));
        assert!("surgery".parse::<ClinicalContext>().is_err());
    }
}
