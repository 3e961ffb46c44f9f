//! Policy simulation: predicted employee reactions to a draft policy.

use crate::error::AssistantError;
use futures::StreamExt;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall, OutputSchema};
use switchboard_core::require_text;
use tracing::{info, instrument, warn};

const TEMPERATURE: f32 = 0.7;
const CONCURRENT_EMPLOYEES: usize = 4;

const SAMPLE_ROSTER: &str = r#"[
  {"employee_id": "E001", "position": "Software Engineer", "level": "Senior", "age": 34, "mbti_type": "INTJ"},
  {"employee_id": "E002", "position": "HR Specialist", "level": "Junior", "age": 26, "mbti_type": "ENFJ"},
  {"employee_id": "E003", "position": "Sales Manager", "level": "Manager", "age": 41, "mbti_type": "ESTP"},
  {"employee_id": "E004", "position": "Accountant", "level": "Mid", "age": 38, "mbti_type": "ISTJ"},
  {"employee_id": "E005", "position": "Product Designer", "level": "Mid", "age": 29, "mbti_type": "INFP"}
]"#;

/// One employee persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub position: String,
    pub level: String,
    pub age: u32,
    pub mbti_type: String,
}

/// The employees every policy is tested against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    employees: Vec<Employee>,
}

impl Roster {
    #[must_use]
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    /// The built-in five-person roster.
    ///
    /// # Errors
    ///
    /// Returns `Roster` if the embedded sample fails to parse.
    pub fn sample() -> Result<Self, Report<AssistantError>> {
        Self::parse("<built-in>", SAMPLE_ROSTER)
    }

    fn parse(path: &str, raw: &str) -> Result<Self, Report<AssistantError>> {
        let employees = serde_json::from_str(raw).map_err(|e| AssistantError::Roster {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { employees })
    }

    /// Reads a JSON array of employees.
    ///
    /// # Errors
    ///
    /// Returns `Roster` if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Report<AssistantError>> {
        let path_display = path.display().to_string();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AssistantError::Roster {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;
        let roster = Self::parse(&path_display, &raw)?;
        info!(path = %path_display, employees = roster.len(), "loaded employee roster");
        Ok(roster)
    }

    #[must_use]
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Sentiment {
    Agree,
    Disagree,
    Neutral,
}

impl Sentiment {
    fn as_str(self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Disagree => "disagree",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feedback {
    sentiment: Sentiment,
    comment: String,
}

/// An employee and their simulated reaction.
///
/// `sentiment` is `agree`, `disagree`, `neutral`, or `error` when the
/// model call for this employee failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationRow {
    #[serde(flatten)]
    pub employee: Employee,
    pub sentiment: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub data: Vec<SimulationRow>,
    pub policy_text: String,
}

fn feedback_schema() -> OutputSchema {
    OutputSchema::strict(
        "policy_feedback",
        json!({
            "type": "object",
            "properties": {
                "sentiment": {"type": "string", "enum": ["agree", "disagree", "neutral"]},
                "comment": {"type": "string", "description": "A brief, in-character comment explaining the sentiment."}
            },
            "required": ["sentiment", "comment"],
            "additionalProperties": false
        }),
    )
}

fn persona_prompt(policy_text: &str, employee: &Employee) -> String {
    format!(
        "You are simulating an employee's reaction to a new company policy.\n\
         Based on the employee profile provided, generate a realistic response.\n\n\
         Company Policy: \"{policy_text}\"\n\n\
         Employee Profile:\n\
         - Position: {}\n\
         - Level: {}\n\
         - Age: {}\n\
         - MBTI Type: {}\n\n\
         Based only on the persona described above, provide your feedback on the new policy.",
        employee.position, employee.level, employee.age, employee.mbti_type
    )
}

/// Runs a policy past every employee on the roster.
pub struct PolicySimulator {
    backend: Arc<dyn LlmBackend>,
    roster: Roster,
}

impl PolicySimulator {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, roster: Roster) -> Self {
        Self { backend, roster }
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    async fn react(&self, policy_text: &str, employee: &Employee) -> SimulationRow {
        let outcome = LlmCall::new(persona_prompt(policy_text, employee))
            .with_output_schema(feedback_schema())
            .with_temperature(TEMPERATURE)
            .run_structured::<Feedback>(self.backend.as_ref())
            .await;
        match outcome {
            Ok(feedback) => SimulationRow {
                employee: employee.clone(),
                sentiment: feedback.sentiment.as_str().to_string(),
                comment: feedback.comment,
            },
            Err(report) => {
                warn!(employee_id = %employee.employee_id, error = %report, "simulation failed for employee");
                SimulationRow {
                    employee: employee.clone(),
                    sentiment: "error".to_string(),
                    comment: report.to_string(),
                }
            }
        }
    }

    /// Collects one reaction per employee, in roster order.
    ///
    /// A failure for one employee is recorded in that employee's row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank policy text.
    #[instrument(skip_all, fields(employees = self.roster.len()))]
    pub async fn simulate(
        &self,
        policy_text: &str,
    ) -> Result<SimulationResult, Report<AssistantError>> {
        let policy = require_text("policy_text", policy_text).map_err(AssistantError::from)?;
        let reactions: Vec<_> = self
            .roster
            .employees()
            .iter()
            .map(|employee| self.react(policy, employee))
            .collect();
        let data = futures::stream::iter(reactions)
            .buffered(CONCURRENT_EMPLOYEES)
            .collect::<Vec<_>>()
            .await;
        Ok(SimulationResult {
            data,
            policy_text: policy_text.to_string(),
        })
    }
}
