//! Lead generation: natural-language customer filters to SQL.
//!
//! ```text
//! ask_for_lead --yes--> extract_conditions --> generate_report --> END
//!      |
//!      +--no--> END
//! ```

pub mod db;

pub use db::LEADS;

use crate::error::AssistantError;
use crate::sql::{SqlDatabase, clean_sql};
use async_trait::async_trait;
use rootcause::prelude::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall, OutputSchema};
use switchboard_core::require_text;
use switchboard_workflow::{CompiledGraph, END, GraphError, GraphState, Node, NodeError, StateGraph};
use tracing::{info, instrument, warn};

/// Products the condition extractor may mention.
pub const PRODUCTS: [&str; 8] = [
    "Laptop",
    "Mouse",
    "Keyboard",
    "Monitor",
    "Webcam",
    "USB Cable",
    "Headphones",
    "Docking Station",
];

pub const NO_CONDITIONS_MESSAGE: &str = "No valid conditions were found. I can only filter by 'age', 'product purchased', and 'wealth_status'.";
pub const NOT_A_LEAD_REQUEST_MESSAGE: &str =
    "This request does not ask for a list of customers, so no report was generated.";
pub const QUERY_FAILED_MESSAGE: &str =
    "I'm sorry, an error occurred while trying to generate the report from the database.";
pub const SUCCESS_MESSAGE: &str = "Success! I have generated a lead list.";

const CLASSIFY_PROMPT: &str = "You are an expert classifier. Your task is to determine if the user's query is asking for a list of customers, leads, or users.";

/// Final answer of a lead request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadReport {
    pub message: String,
    pub conditions: Vec<String>,
    pub sql: Option<String>,
    pub rows: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadState {
    pub query: String,
    pub is_lead_request: bool,
    pub conditions: Vec<String>,
    pub report: Option<LeadReport>,
}

#[derive(Debug, Clone)]
pub enum LeadUpdate {
    Classified(bool),
    Conditions(Vec<String>),
    Report(LeadReport),
}

impl GraphState for LeadState {
    type Update = LeadUpdate;

    fn apply(&mut self, update: LeadUpdate) {
        match update {
            LeadUpdate::Classified(is_lead) => self.is_lead_request = is_lead,
            LeadUpdate::Conditions(conditions) => self.conditions = conditions,
            LeadUpdate::Report(report) => self.report = Some(report),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeadClassification {
    is_lead_request: bool,
}

#[derive(Debug, Deserialize)]
struct ExtractedConditions {
    conditions: Vec<String>,
}

/// Drops blanks and the model's "no condition" placeholder.
fn usable_conditions(conditions: Vec<String>) -> Vec<String> {
    conditions
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("no condition"))
        .collect()
}

/// The question handed to the SQL writer.
#[must_use]
pub fn conditions_query(conditions: &[String]) -> String {
    format!("Find customers where {}", conditions.join(" and "))
}

struct AskForLead {
    backend: Arc<dyn LlmBackend>,
}

#[async_trait]
impl Node<LeadState> for AskForLead {
    async fn run(&self, state: &LeadState) -> Result<LeadUpdate, Report<NodeError>> {
        let schema = OutputSchema::strict(
            "lead_request",
            json!({
                "type": "object",
                "properties": {
                    "is_lead_request": {
                        "type": "boolean",
                        "description": "True if the user is asking for a list of customers/leads/users."
                    }
                },
                "required": ["is_lead_request"],
                "additionalProperties": false
            }),
        );
        let decision: LeadClassification = LlmCall::new(format!("Query: {}", state.query))
            .with_system_prompt(CLASSIFY_PROMPT)
            .with_output_schema(schema)
            .with_temperature(0.0)
            .run_structured(self.backend.as_ref())
            .await
            .context(NodeError::Step {
                operation: "lead request classification",
            })?;
        info!(is_lead_request = decision.is_lead_request, "lead request classified");
        Ok(LeadUpdate::Classified(decision.is_lead_request))
    }
}

struct ExtractConditions {
    backend: Arc<dyn LlmBackend>,
}

#[async_trait]
impl Node<LeadState> for ExtractConditions {
    async fn run(&self, state: &LeadState) -> Result<LeadUpdate, Report<NodeError>> {
        let system = format!(
            "You are an expert data analyst. Your job is to extract filtering conditions from a user's query based on these strict rules:\n\
             - You can ONLY process conditions related to 'age', 'product_purchased' (valid products: [{}]), and 'wealth_status'.\n\
             - You MUST IGNORE any other conditions.\n\
             - If no valid conditions are found, return an empty list.",
            PRODUCTS.join(", ")
        );
        let schema = OutputSchema::strict(
            "conditions",
            json!({
                "type": "object",
                "properties": {
                    "conditions": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["conditions"],
                "additionalProperties": false
            }),
        );
        let extracted: ExtractedConditions = LlmCall::new(format!(
            "Extract the valid conditions from this query: {}",
            state.query
        ))
        .with_system_prompt(system)
        .with_output_schema(schema)
        .with_temperature(0.0)
        .run_structured(self.backend.as_ref())
        .await
        .context(NodeError::Step {
            operation: "condition extraction",
        })?;
        let conditions = usable_conditions(extracted.conditions);
        info!(?conditions, "conditions extracted");
        Ok(LeadUpdate::Conditions(conditions))
    }
}

struct GenerateReport {
    backend: Arc<dyn LlmBackend>,
    database: SqlDatabase,
}

impl GenerateReport {
    async fn write_sql(&self, question: &str) -> Result<String, Report<NodeError>> {
        let schema = self
            .database
            .schema_description()
            .await
            .context(NodeError::Step {
                operation: "schema description",
            })?;
        let system = format!(
            "You are a SQLite expert. Given an input question, create a syntactically correct SQLite query to run. \
             Query only the columns needed to answer the question and wrap each column name in double quotes. \
             Use only the tables and columns listed below.\n\n{schema}"
        );
        let result = LlmCall::new(format!("Question: {question}\nSQLQuery:"))
            .with_system_prompt(system)
            .with_temperature(0.0)
            .run(self.backend.as_ref())
            .await
            .context(NodeError::Step {
                operation: "SQL generation",
            })?;
        Ok(clean_sql(&result.content))
    }
}

#[async_trait]
impl Node<LeadState> for GenerateReport {
    async fn run(&self, state: &LeadState) -> Result<LeadUpdate, Report<NodeError>> {
        if state.conditions.is_empty() {
            return Ok(LeadUpdate::Report(LeadReport {
                message: NO_CONDITIONS_MESSAGE.to_string(),
                ..LeadReport::default()
            }));
        }

        let question = conditions_query(&state.conditions);
        let sql = self.write_sql(&question).await?;
        info!(%sql, "generated lead query");

        let report = match self.database.run_select(&sql).await {
            Ok(rows) => LeadReport {
                message: SUCCESS_MESSAGE.to_string(),
                conditions: state.conditions.clone(),
                sql: Some(sql),
                rows,
            },
            Err(report) => {
                warn!(error = %report, "lead query failed");
                LeadReport {
                    message: QUERY_FAILED_MESSAGE.to_string(),
                    conditions: state.conditions.clone(),
                    sql: Some(sql),
                    rows: Vec::new(),
                }
            }
        };
        Ok(LeadUpdate::Report(report))
    }
}

/// Builds the lead graph.
///
/// # Errors
///
/// Returns a `GraphError` if the graph is malformed.
pub fn build_graph(
    backend: Arc<dyn LlmBackend>,
    database: SqlDatabase,
) -> Result<CompiledGraph<LeadState>, Report<GraphError>> {
    let mut graph = StateGraph::new();
    graph.add_node("ask_for_lead", AskForLead {
        backend: Arc::clone(&backend),
    })?;
    graph.add_node("extract_conditions", ExtractConditions {
        backend: Arc::clone(&backend),
    })?;
    graph.add_node("generate_report", GenerateReport { backend, database })?;

    graph.set_entry_point("ask_for_lead");
    graph.add_conditional_edges(
        "ask_for_lead",
        |state: &LeadState| (if state.is_lead_request { "continue" } else { "end" }).to_string(),
        [("continue", "extract_conditions"), ("end", END)],
    )?;
    graph.add_edge("extract_conditions", "generate_report")?;
    graph.add_edge("generate_report", END)?;
    graph.compile()
}

/// The lead generation assistant.
#[derive(Clone)]
pub struct LeadGenerator {
    graph: CompiledGraph<LeadState>,
}

impl LeadGenerator {
    /// # Errors
    ///
    /// Returns a `GraphError` if the graph is malformed.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        database: SqlDatabase,
    ) -> Result<Self, Report<GraphError>> {
        Ok(Self {
            graph: build_graph(backend, database)?,
        })
    }

    /// Turns `query` into a customer list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank query, or `Graph` if a model
    /// call fails.
    #[instrument(skip_all)]
    pub async fn generate_report(&self, query: &str) -> Result<LeadReport, Report<AssistantError>> {
        let query = require_text("query", query).map_err(AssistantError::from)?;
        let outcome = self
            .graph
            .invoke(LeadState {
                query: query.to_string(),
                ..LeadState::default()
            })
            .await
            .context(AssistantError::Graph {
                assistant: "lead generation",
            })?;

        let state = outcome.state;
        Ok(state.report.unwrap_or_else(|| LeadReport {
            message: NOT_A_LEAD_REQUEST_MESSAGE.to_string(),
            conditions: state.conditions,
            ..LeadReport::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_ai::{LlmResponse, ScriptedBackend};

    async fn generator(backend: &Arc<ScriptedBackend>) -> LeadGenerator {
        let database = SqlDatabase::connect("sqlite::memory:", &LEADS).await.expect("database");
        LeadGenerator::new(Arc::clone(backend) as Arc<dyn LlmBackend>, database).expect("graph")
    }

    fn lead(is_lead: bool) -> LlmResponse {
        LlmResponse::structured(json!({ "is_lead_request": is_lead }))
    }

    fn conditions(items: &[&str]) -> LlmResponse {
        LlmResponse::structured(json!({ "conditions": items }))
    }

    #[test]
    fn placeholder_conditions_are_dropped() {
        let kept = usable_conditions(vec![
            " age > 30 ".to_string(),
            "no condition".to_string(),
            String::new(),
        ]);
        assert_eq!(kept, vec!["age > 30"]);
        assert_eq!(
            conditions_query(&["age > 30".to_string(), "wealth_status is High".to_string()]),
            "Find customers where age > 30 and wealth_status is High"
        );
    }

    #[tokio::test]
    async fn lead_request_runs_generated_select() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(lead(true))
                .with_response(conditions(&["age > 30", "wealth_status is High"]))
                .with_response(LlmResponse::text(
                    "SQLQuery: ```sql\nSELECT \"name\", \"age\" FROM customer WHERE \"age\" > 30 AND \"wealth_status\" = 'High' ORDER BY \"age\";\n```",
                )),
        );
        let report = generator(&backend)
            .await
            .generate_report("Give me rich customers older than 30 who like red")
            .await
            .expect("report");

        assert_eq!(report.message, SUCCESS_MESSAGE);
        assert_eq!(report.conditions, vec!["age > 30", "wealth_status is High"]);
        assert_eq!(
            report.sql.as_deref(),
            Some("SELECT \"name\", \"age\" FROM customer WHERE \"age\" > 30 AND \"wealth_status\" = 'High' ORDER BY \"age\";")
        );
        let names: Vec<&str> = report.rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["Anan Chaiyaporn", "Chatchai Wong", "Fon Rattana"]);

        let sql_request = &backend.requests()[2];
        assert!(sql_request.system().is_some_and(|s| s.contains("3 rows from customer table")));
        assert_eq!(
            sql_request.last_user_text(),
            Some("Question: Find customers where age > 30 and wealth_status is High\nSQLQuery:")
        );
    }

    #[tokio::test]
    async fn non_lead_request_stops_after_classification() {
        let backend = Arc::new(ScriptedBackend::new().with_response(lead(false)));
        let report = generator(&backend).await.generate_report("What is SQL?").await.expect("report");
        assert_eq!(report.message, NOT_A_LEAD_REQUEST_MESSAGE);
        assert!(report.sql.is_none());
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn no_valid_conditions_explains_limits() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(lead(true))
                .with_response(conditions(&["no condition"])),
        );
        let report = generator(&backend)
            .await
            .generate_report("Customers who live in Paris")
            .await
            .expect("report");
        assert_eq!(report.message, NO_CONDITIONS_MESSAGE);
        assert!(report.conditions.is_empty());
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn unsafe_sql_is_not_executed() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(lead(true))
                .with_response(conditions(&["age < 25"]))
                .with_response(LlmResponse::text("DELETE FROM customer WHERE age < 25")),
        );
        let generator = generator(&backend).await;
        let report = generator.generate_report("young customers").await.expect("report");
        assert_eq!(report.message, QUERY_FAILED_MESSAGE);
        assert!(report.rows.is_empty());
        assert_eq!(report.sql.as_deref(), Some("DELETE FROM customer WHERE age < 25"));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let err = generator(&backend).await.generate_report("").await.unwrap_err();
        assert!(err.current_context().is_client_error());
    }
}
