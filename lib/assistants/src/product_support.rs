//! Product support chatbot with per-thread memory.
//!
//! Each turn loads the thread's history, asks the model whether the newest
//! question concerns the company's products, and either answers from the
//! fixed catalog or returns a fixed off-topic reply. The user turn and the
//! reply are appended to the thread afterwards.

use crate::error::AssistantError;
use async_trait::async_trait;
use rootcause::prelude::{Report, ResultExt};
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall};
use switchboard_conversation::{Message, ThreadStore, to_llm_messages};
use switchboard_core::{ThreadId, require_text};
use switchboard_workflow::{CompiledGraph, END, GraphError, GraphState, Node, NodeError, StateGraph};
use tracing::{debug, instrument};

/// Reply to questions about anything but the catalog.
pub const OFF_TOPIC_REPLY: &str = "I'm sorry, I can only answer questions about DOGBRAIN666 products. How can I help you with our product line?";

/// The catalog the assistant may answer from.
pub const PRODUCT_CATALOG: &str = "DOGBRAIN666 Product Catalog:
1. DOGBRAIN666 Alpha Headset - Wireless gaming headset with 7.1 surround sound, 40hr battery, RGB lights.
2. DOGBRAIN666 Gamma Mouse - Ultra-light 55g gaming mouse with adjustable DPI up to 26,000.
3. DOGBRAIN666 Titan Keyboard - Mechanical keyboard with hot-swappable switches and customizable macros.
4. DOGBRAIN666 CloudPad - Game controller compatible with PC, mobile, and cloud gaming platforms.";

const ANSWER_NODE: &str = "answer_product_question";
const OFF_TOPIC_NODE: &str = "handle_off_topic";

/// Conversation plus the classification of its newest question.
#[derive(Debug, Clone, Default)]
pub struct SupportState {
    pub messages: Vec<Message>,
    pub is_product: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SupportUpdate {
    pub messages: Vec<Message>,
    pub is_product: Option<bool>,
}

impl GraphState for SupportState {
    type Update = SupportUpdate;

    fn apply(&mut self, update: SupportUpdate) {
        self.messages.extend(update.messages);
        if let Some(is_product) = update.is_product {
            self.is_product = is_product;
        }
    }
}

/// Reads a `True`/`False` answer; anything else counts as false.
#[must_use]
pub fn parse_boolean_reply(reply: &str) -> bool {
    reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .eq_ignore_ascii_case("true")
}

fn classification_prompt(question: &str) -> String {
    format!(
        "Determine if the user's question is about our company products.\n\
         Our company name is \"DOGBRAIN666\".\n\
         If yes, respond with 'True'. If no, respond with 'False'.\n\
         If the user is asking about a product but not ours, respond with 'False'.\n\n\
         User Question: \"{question}\"\n\
         Answer:"
    )
}

struct ClassifyRequest {
    backend: Arc<dyn LlmBackend>,
}

#[async_trait]
impl Node<SupportState> for ClassifyRequest {
    async fn run(&self, state: &SupportState) -> Result<SupportUpdate, Report<NodeError>> {
        let question = state.messages.last().map_or("", |m| m.content.as_str());
        let result = LlmCall::new(classification_prompt(question))
            .with_temperature(0.0)
            .run(self.backend.as_ref())
            .await
            .context(NodeError::Step {
                operation: "request classification",
            })?;
        let is_product = parse_boolean_reply(&result.content);
        debug!(is_product, "classified request");
        Ok(SupportUpdate {
            messages: Vec::new(),
            is_product: Some(is_product),
        })
    }
}

struct AnswerProductQuestion {
    backend: Arc<dyn LlmBackend>,
}

#[async_trait]
impl Node<SupportState> for AnswerProductQuestion {
    async fn run(&self, state: &SupportState) -> Result<SupportUpdate, Report<NodeError>> {
        let system = format!(
            "You are a helpful product support assistant for DOGBRAIN666. \
             Use ONLY the information below to answer the customer question, but use the conversation history for context. \
             If the answer is not in the product details, politely say you don't have that information.\n\n\
             Product Details:\n{PRODUCT_CATALOG}"
        );
        let result = LlmCall::from_history(to_llm_messages(&state.messages))
            .with_system_prompt(system)
            .with_temperature(0.0)
            .run(self.backend.as_ref())
            .await
            .context(NodeError::Step {
                operation: "product answer",
            })?;
        Ok(SupportUpdate {
            messages: vec![Message::assistant(result.content)],
            is_product: None,
        })
    }
}

struct HandleOffTopic;

#[async_trait]
impl Node<SupportState> for HandleOffTopic {
    async fn run(&self, _state: &SupportState) -> Result<SupportUpdate, Report<NodeError>> {
        Ok(SupportUpdate {
            messages: vec![Message::assistant(OFF_TOPIC_REPLY)],
            is_product: None,
        })
    }
}

/// Builds the classify-then-answer graph.
///
/// # Errors
///
/// Returns a `GraphError` if the graph is malformed.
pub fn build_graph(
    backend: Arc<dyn LlmBackend>,
) -> Result<CompiledGraph<SupportState>, Report<GraphError>> {
    let mut graph = StateGraph::new();
    graph.add_node("classify_request_type", ClassifyRequest {
        backend: Arc::clone(&backend),
    })?;
    graph.add_node(ANSWER_NODE, AnswerProductQuestion { backend })?;
    graph.add_node(OFF_TOPIC_NODE, HandleOffTopic)?;

    graph.set_entry_point("classify_request_type");
    graph.add_conditional_edges(
        "classify_request_type",
        |state: &SupportState| {
            let next = if state.is_product { ANSWER_NODE } else { OFF_TOPIC_NODE };
            next.to_string()
        },
        [(ANSWER_NODE, ANSWER_NODE), (OFF_TOPIC_NODE, OFF_TOPIC_NODE)],
    )?;
    graph.add_edge(ANSWER_NODE, END)?;
    graph.add_edge(OFF_TOPIC_NODE, END)?;
    graph.compile()
}

/// The product support assistant.
#[derive(Clone)]
pub struct ProductSupport {
    graph: CompiledGraph<SupportState>,
    threads: Arc<dyn ThreadStore>,
}

impl ProductSupport {
    /// Creates the assistant over a shared thread store.
    ///
    /// # Errors
    ///
    /// Returns a `GraphError` if the graph is malformed.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        threads: Arc<dyn ThreadStore>,
    ) -> Result<Self, Report<GraphError>> {
        Ok(Self {
            graph: build_graph(backend)?,
            threads,
        })
    }

    /// Answers `message` in the context of `thread_id` and records the turn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank message, `Graph` when the run
    /// fails, or `ThreadStore`.
    #[instrument(skip(self, message), fields(thread_id = %thread_id))]
    pub async fn invoke(
        &self,
        thread_id: &ThreadId,
        message: &str,
    ) -> Result<String, Report<AssistantError>> {
        let message = require_text("message", message).map_err(AssistantError::from)?;
        let thread = self
            .threads
            .get_or_create(thread_id)
            .await
            .context(AssistantError::ThreadStore)?;

        let prior = thread.messages.len();
        let mut messages = thread.messages;
        messages.push(Message::user(message));
        let outcome = self
            .graph
            .invoke(SupportState {
                messages,
                is_product: false,
            })
            .await
            .context(AssistantError::Graph {
                assistant: "product support",
            })?;

        let new_messages: Vec<Message> = outcome.state.messages.into_iter().skip(prior).collect();
        let reply = new_messages
            .last()
            .filter(|m| !m.is_user())
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.threads
            .append(thread_id, new_messages)
            .await
            .context(AssistantError::ThreadStore)?;
        Ok(reply)
    }

    /// The recorded conversation; empty for threads never used.
    ///
    /// # Errors
    ///
    /// Returns `ThreadStore` if the store fails.
    pub async fn history(&self, thread_id: &ThreadId) -> Result<Vec<Message>, Report<AssistantError>> {
        Ok(self
            .threads
            .history(thread_id)
            .await
            .context(AssistantError::ThreadStore)?
            .unwrap_or_default())
    }
}
