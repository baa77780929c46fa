use std::fmt;

use serde::{Deserialize, Serialize};

/// Named step of a research workflow log.
///
/// Stored as free text; the closed variants define the display order of an
/// aggregated timeline and `Other` keeps step names this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowStep {
    InputParsing,
    DataGathering,
    AiProcessing,
    ResultPersistence,
    Error,
    Other(String),
}

impl WorkflowStep {
    /// Canonical timeline order.
    pub const TAXONOMY: [WorkflowStep; 5] = [
        WorkflowStep::InputParsing,
        WorkflowStep::DataGathering,
        WorkflowStep::AiProcessing,
        WorkflowStep::ResultPersistence,
        WorkflowStep::Error,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            WorkflowStep::InputParsing => "Input Parsing",
            WorkflowStep::DataGathering => "Data Gathering",
            WorkflowStep::AiProcessing => "AI Processing",
            WorkflowStep::ResultPersistence => "Result Persistence",
            WorkflowStep::Error => "Error",
            WorkflowStep::Other(name) => name,
        }
    }

    /// Position in [`Self::TAXONOMY`]; `None` for `Other`.
    pub fn rank(&self) -> Option<usize> {
        Self::TAXONOMY.iter().position(|step| step == self)
    }
}

impl From<String> for WorkflowStep {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Input Parsing" => WorkflowStep::InputParsing,
            "Data Gathering" => WorkflowStep::DataGathering,
            "AI Processing" => WorkflowStep::AiProcessing,
            "Result Persistence" => WorkflowStep::ResultPersistence,
            "Error" => WorkflowStep::Error,
            _ => WorkflowStep::Other(name),
        }
    }
}

impl From<&str> for WorkflowStep {
    fn from(name: &str) -> Self {
        WorkflowStep::from(name.to_string())
    }
}

impl From<WorkflowStep> for String {
    fn from(step: WorkflowStep) -> Self {
        match step {
            WorkflowStep::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_round_trip() {
        for step in WorkflowStep::TAXONOMY {
            assert_eq!(WorkflowStep::from(step.as_str()), step);
        }
    }

    #[test]
    fn test_unknown_name_is_preserved() {
        let step = WorkflowStep::from("Legacy Step");
        assert_eq!(step, WorkflowStep::Other("Legacy Step".into()));
        assert_eq!(step.rank(), None);
        assert_eq!(String::from(step), "Legacy Step");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(matches!(WorkflowStep::from("error"), WorkflowStep::Other(_)));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_value(WorkflowStep::AiProcessing).unwrap(),
            serde_json::json!("AI Processing")
        );
    }
}
