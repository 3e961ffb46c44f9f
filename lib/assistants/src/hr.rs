//! HR assistant: one tool-calling agent over company facts, policy
//! retrieval, a floor directory and certificate requests.

use crate::error::AssistantError;
use crate::tools::{decode_args, string_args_spec};
use async_trait::async_trait;
use rootcause::prelude::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use switchboard_ai::{Agent, EmbeddingBackend, LlmBackend, LlmCall, ToolSpec};
use switchboard_conversation::{FnTool, Message, Tool, ToolError, ToolRegistry, parse_args, to_llm_messages};
use switchboard_core::require_text;
use switchboard_knowledge::KnowledgeBase;
use tracing::{debug, instrument};

/// Policy chunks retrieved per question.
pub const POLICY_TOP_K: usize = 5;

const POLICY_TEMPERATURE: f32 = 0.2;
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const AGENT_PROMPT: &str = "You are a helpful HR assistant for DOGBRAIN666. Use your tools to answer employee questions about the company, leave, salary and resignation policies, office floors, and certificates of employment. Answer in the language the employee uses.";

const COMPANY_NAME: &str = "DOGBRAIN666";
const COMPANY_DESCRIPTION: &str = "ผู้ให้บริการชั้นนำด้านโซลูชันเชิงนวัตกรรมในอุตสาหกรรมเทคโนโลยี";
const COMPANY_MISSION: &str = "เรามุ่งมั่นที่จะสร้างสรรค์ผลิตภัณฑ์ที่ล้ำสมัยเพื่อยกระดับคุณภาพชีวิตของผู้คนให้ดีขึ้น";
const COMPANY_EXPERTISE: [&str; 3] = [
    "ปัญญาประดิษฐ์ (AI)",
    "คลาวด์คอมพิวติ้ง (cloud computing)",
    "เทคโนโลยีที่ยั่งยืน",
];

/// Office directory: floor number and the items found there.
const FLOORS: [(u32, &str); 5] = [
    (1, "Reception, Lobby Cafe, Security Desk, Visitor Lounge"),
    (2, "HR Department, Meeting Room A, Printer, Water Dispenser"),
    (3, "Finance Department, Pantry, Photocopier, Lockers"),
    (4, "IT Support, Server Room, Stationery Cabinet, Meeting Room B"),
    (5, "Executive Offices, Boardroom, Library, First Aid Kit"),
];

/// The company summary; the same text for every query.
#[must_use]
pub fn company_info() -> String {
    format!(
        "เราคือ '{COMPANY_NAME}', {COMPANY_DESCRIPTION}. {COMPANY_MISSION}, โดยมีความเชี่ยวชาญด้าน {}.",
        COMPANY_EXPERTISE.join(", ")
    )
}

/// Finds a floor by the first number in `query`, or the floor holding an
/// item whose name contains `query`.
#[must_use]
pub fn search_floor_item(query: &str) -> String {
    let needle = query.to_lowercase();

    let number: String = needle
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    if let Ok(floor) = number.parse::<u32>()
        && let Some((_, items)) = FLOORS.iter().find(|(f, _)| *f == floor)
    {
        return format!("On Floor {floor}, you can find: {items}.");
    }

    FLOORS
        .iter()
        .find(|(_, items)| items.to_lowercase().contains(&needle))
        .map_or_else(
            || "I'm sorry, I couldn't find information for that item or floor.".to_string(),
            |(floor, items)| {
                format!("You can find '{query}' on Floor {floor}. The items on this floor are: {items}.")
            },
        )
}

/// Details needed for a certificate of employment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateRequest {
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub destination_country: Option<String>,
}

impl CertificateRequest {
    /// Confirms the certificate or lists the missing fields.
    #[must_use]
    pub fn generate(&self) -> String {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        let name = present(&self.employee_name);
        let id = present(&self.employee_id);
        let country = present(&self.destination_country);

        match (name, id, country) {
            (Some(name), Some(id), Some(country)) => format!(
                "Certificate generated for {name} (ID: {id}) to apply for visa to {country}."
            ),
            _ => {
                let missing: Vec<&str> = [
                    ("employee_name", name),
                    ("employee_id", id),
                    ("destination_country", country),
                ]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(field, _)| field)
                .collect();
                format!("Missing required fields: {}.", missing.join(", "))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionArgs {
    question: String,
}

/// Answers a policy question strictly from one retrieved collection.
struct PolicyQuestionTool {
    name: &'static str,
    description: &'static str,
    collection: &'static str,
    topic: &'static str,
    knowledge: Arc<KnowledgeBase>,
    embedder: Arc<dyn EmbeddingBackend>,
    backend: Arc<dyn LlmBackend>,
}

impl PolicyQuestionTool {
    fn failed(&self, reason: &str) -> ToolError {
        ToolError::ExecutionFailed {
            name: self.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for PolicyQuestionTool {
    fn definition(&self) -> ToolSpec {
        string_args_spec(
            self.name,
            self.description,
            &[("question", "The user's question about a specific HR policy.")],
            &["question"],
        )
    }

    async fn execute(&self, input: JsonValue) -> Result<String, Report<ToolError>> {
        let args: QuestionArgs = parse_args(self.name, input)?;
        let hits = self
            .knowledge
            .retrieve(self.collection, &args.question, self.embedder.as_ref(), POLICY_TOP_K)
            .await
            .context(self.failed("policy retrieval failed"))?;
        debug!(tool = self.name, collection = self.collection, hits = hits.len(), "retrieved policy context");

        let context = hits
            .iter()
            .map(|h| h.record.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let system = format!(
            "You are a professional HR assistant. Your role is to answer employee questions about the company's {} policy. \
             Base your answer strictly on the context provided below. \
             If the answer is not found in the provided context, clearly state that the information is not available \
             in the policy documents and advise the user to contact the HR department directly.",
            self.topic
        );
        let prompt = format!(
            "--- CONTEXT ---\n{context}\n--- END CONTEXT ---\n\nQuestion: {}\nAnswer:",
            args.question
        );

        let result = LlmCall::new(prompt)
            .with_system_prompt(system)
            .with_temperature(POLICY_TEMPERATURE)
            .run(self.backend.as_ref())
            .await
            .context(self.failed("policy answer failed"))?;
        Ok(result.content.trim().to_string())
    }
}

/// One prior turn supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    /// Only `user` and `assistant` turns are kept.
    fn to_message(&self) -> Option<Message> {
        match self.role.as_str() {
            "user" => Some(Message::user(self.content.clone())),
            "assistant" => Some(Message::assistant(self.content.clone())),
            _ => None,
        }
    }
}

/// The HR assistant.
pub struct HrAssistant {
    agent: Agent,
    backend: Arc<dyn LlmBackend>,
}

impl HrAssistant {
    /// Builds the agent and its tools.
    #[must_use]
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        embedder: Arc<dyn EmbeddingBackend>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        let policy_tool = |name: &'static str,
                           description: &'static str,
                           collection: &'static str,
                           topic: &'static str| PolicyQuestionTool {
            name,
            description,
            collection,
            topic,
            knowledge: Arc::clone(&knowledge),
            embedder: Arc::clone(&embedder),
            backend: Arc::clone(&backend),
        };

        let tools = ToolRegistry::new()
            .with_tool(FnTool::new(
                string_args_spec(
                    "get_company_info",
                    "Use this tool to get a general summary about our company, including its name, mission, and what it does.",
                    &[("query", "Anything the user asked about the company")],
                    &[],
                ),
                |_| Ok(company_info()),
            ))
            .with_tool(policy_tool(
                "answer_leave_question",
                "Answers an HR leave policy question. Use for any questions about vacation, sick leave, holidays, etc.",
                "leave_policy",
                "leave",
            ))
            .with_tool(policy_tool(
                "answer_salary_question",
                "Answers an HR salary policy question. Use for any questions about compensation, payroll, bonuses, pay grades, etc.",
                "salary_policy",
                "salary",
            ))
            .with_tool(policy_tool(
                "answer_resignation_question",
                "Answers an HR resignation policy question. Use for any questions about notice periods, final pay, handover, etc.",
                "resign_policy",
                "resignation",
            ))
            .with_tool(FnTool::new(
                string_args_spec(
                    "search_floor_item",
                    "Searches for items on a specific floor or finds which floor an item is located on.",
                    &[(
                        "query",
                        "The floor number (e.g., '5') or the item name (e.g., 'printer') to search for.",
                    )],
                    &["query"],
                ),
                |input| {
                    #[derive(Deserialize)]
                    struct Args {
                        query: String,
                    }
                    let args: Args = decode_args("search_floor_item", input)?;
                    Ok(search_floor_item(&args.query))
                },
            ))
            .with_tool(FnTool::new(
                string_args_spec(
                    "generate_certificate_of_employment",
                    "Generate a Certificate of Employment for visa application.",
                    &[
                        ("employee_name", "The full name of the employee."),
                        ("employee_id", "The unique identifier for the employee."),
                        (
                            "destination_country",
                            "The country the employee is applying for a visa to.",
                        ),
                    ],
                    &["employee_name"],
                ),
                |input| {
                    let request: CertificateRequest =
                        decode_args("generate_certificate_of_employment", input)?;
                    Ok(request.generate())
                },
            ));

        Self {
            agent: Agent::new("HrAgent", AGENT_PROMPT, Arc::new(tools)).with_temperature(0.0),
            backend,
        }
    }

    /// Answers `prompt` after the client-supplied `history`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank prompt or `ModelCall` when the
    /// agent fails.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn chat(
        &self,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<String, Report<AssistantError>> {
        let prompt = require_text("prompt", prompt).map_err(AssistantError::from)?;
        let mut messages: Vec<Message> = history.iter().filter_map(ChatTurn::to_message).collect();
        messages.push(Message::user(prompt));

        let outcome = self
            .agent
            .run(self.backend.as_ref(), &to_llm_messages(&messages))
            .await
            .context(AssistantError::ModelCall { step: "hr agent" })?;
        Ok(outcome.final_answer().to_string())
    }
}
