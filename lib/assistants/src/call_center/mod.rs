//! Furniture call center: a routed multi-agent graph.
//!
//! ```text
//! topic_checker --on_topic--> filter --single--> supervisor --agent--> <Agent> --+
//!       |                       |                    ^  |                       |
//!    off_topic               multi                   |  +--FINISH--> END       |
//!       v                       v                    +-------------------------+
//!      END                     END
//! ```
//!
//! Each decision is a forced choice from a closed label set. The supervisor
//! only routes when the newest message comes from the user, so a specialist
//! answer ends the run on the next visit.

pub mod tools;

use crate::error::AssistantError;
use async_trait::async_trait;
use futures::Stream;
use rootcause::prelude::{Report, ResultExt};
use std::sync::Arc;
use switchboard_ai::{Agent, AiError, Classifier, LlmBackend};
use switchboard_conversation::{Message, to_llm_messages};
use switchboard_core::require_text;
use switchboard_workflow::{
    CompiledGraph, END, GraphError, GraphEvent, GraphState, Node, NodeError, StateGraph,
};
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, warn};

/// Node executions allowed per question.
pub const RECURSION_LIMIT: u32 = 15;

/// Reply when the question is not about the catalog.
pub const OFF_TOPIC_REPLY: &str =
    "I can only assist with questions about our products. Please ask a relevant question.";

/// Reply when the message holds more than one question.
pub const MULTI_QUESTION_REPLY: &str =
    "I can only handle one question at a time. Please ask your questions separately.";

/// Specialist node names, which are also the supervisor's routing labels.
pub const AGENTS: [&str; 3] = ["ProductDetailAgent", "PricingAgent", "WarrantyAgent"];

const FINISH: &str = "FINISH";
const ROUTE_END: &str = "END";
/// Route for labels outside a gate's set. No path map has this key.
const UNROUTED: &str = "<unrouted>";

const TOPIC_CHECK_PROMPT: &str = "You are a topic analyzer. Your task is to determine if the user's query is related to furniture products (like sofas, desks, dimensions, price, warranty, origin). If the query is about these topics, classify it as 'on_topic'. If it is about anything else (e.g., weather, general conversation, greetings), classify it as 'off_topic'. The user's message will be the last in the list.";

const FILTER_PROMPT: &str = "You are a query analyzer. Your task is to determine if the user's message contains more than one distinct question. The user's message will be the last in the list. Respond with 'multi_question' if it does, and 'single_question' if it does not.";

const SUPERVISOR_PROMPT: &str = "You are a supervisor managing a team of expert agents. Based on the user's request, you will route them to the appropriate agent: ProductDetailAgent, PricingAgent, or WarrantyAgent. If the user is just making conversation, respond by choosing 'FINISH'. The user's message will be the last one in the list.";

const PRODUCT_DETAIL_PROMPT: &str = "You are an expert in product specifications and origins. Use your tools to answer questions about product details like dimensions, materials, and where it's made. Be concise in your responses.";

const PRICING_PROMPT: &str = "You are a pricing and promotions specialist. Use your tools to answer questions about product prices and available discounts.";

const WARRANTY_PROMPT: &str = "You are a warranty support agent. Use your tools to answer questions about warranty policies and how to file a claim. If you need an invoice ID to file a claim, you must ask the user for it.";

/// Conversation plus the latest routing decision.
#[derive(Debug, Clone, Default)]
pub struct CallCenterState {
    pub messages: Vec<Message>,
    pub next: String,
}

/// Messages to append and an optional new route.
#[derive(Debug, Clone, Default)]
pub struct CallCenterUpdate {
    pub messages: Vec<Message>,
    pub next: Option<String>,
}

impl CallCenterUpdate {
    fn route(next: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            next: Some(next.into()),
        }
    }

    fn reject(reply: &str) -> Self {
        Self {
            messages: vec![Message::assistant(reply)],
            next: Some(ROUTE_END.to_string()),
        }
    }
}

impl GraphState for CallCenterState {
    type Update = CallCenterUpdate;

    fn apply(&mut self, update: CallCenterUpdate) {
        self.messages.extend(update.messages);
        if let Some(next) = update.next {
            self.next = next;
        }
    }
}

/// A gate's classification.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Label(String),
    OutOfSet(String),
}

impl Decision {
    /// Routes an out-of-set label to [`UNROUTED`], which ends the run.
    fn unrouted(label: &str, operation: &'static str) -> CallCenterUpdate {
        warn!(%label, operation, "label outside the decision set");
        CallCenterUpdate::route(UNROUTED)
    }
}

/// Runs a classifier over the conversation.
///
/// A label outside the closed set is reported as [`Decision::OutOfSet`];
/// any other failure fails the node.
async fn decide(
    classifier: &Classifier,
    backend: &dyn LlmBackend,
    system: &str,
    messages: &[Message],
    operation: &'static str,
) -> Result<Decision, Report<NodeError>> {
    match classifier
        .classify(backend, system, &to_llm_messages(messages))
        .await
    {
        Ok(label) => Ok(Decision::Label(label)),
        Err(report) => match report.current_context() {
            AiError::LabelOutOfSet { label, .. } => Ok(Decision::OutOfSet(label.clone())),
            _ => Err(report).context(NodeError::Step { operation }),
        },
    }
}

struct TopicChecker {
    backend: Arc<dyn LlmBackend>,
    classifier: Classifier,
}

#[async_trait]
impl Node<CallCenterState> for TopicChecker {
    async fn run(&self, state: &CallCenterState) -> Result<CallCenterUpdate, Report<NodeError>> {
        let operation = "topic check";
        let decision = decide(
            &self.classifier,
            self.backend.as_ref(),
            TOPIC_CHECK_PROMPT,
            &state.messages,
            operation,
        )
        .await?;
        Ok(match decision {
            Decision::Label(label) if label == "on_topic" => CallCenterUpdate::route("filter"),
            Decision::Label(label) if label == "off_topic" => {
                info!("off-topic question rejected");
                CallCenterUpdate::reject(OFF_TOPIC_REPLY)
            }
            Decision::Label(label) | Decision::OutOfSet(label) => {
                Decision::unrouted(&label, operation)
            }
        })
    }
}

struct QuestionFilter {
    backend: Arc<dyn LlmBackend>,
    classifier: Classifier,
}

#[async_trait]
impl Node<CallCenterState> for QuestionFilter {
    async fn run(&self, state: &CallCenterState) -> Result<CallCenterUpdate, Report<NodeError>> {
        let operation = "question filter";
        let decision = decide(
            &self.classifier,
            self.backend.as_ref(),
            FILTER_PROMPT,
            &state.messages,
            operation,
        )
        .await?;
        Ok(match decision {
            Decision::Label(label) if label == "single_question" => {
                CallCenterUpdate::route("supervisor")
            }
            Decision::Label(label) if label == "multi_question" => {
                info!("multi-question message rejected");
                CallCenterUpdate::reject(MULTI_QUESTION_REPLY)
            }
            Decision::Label(label) | Decision::OutOfSet(label) => {
                Decision::unrouted(&label, operation)
            }
        })
    }
}

struct Supervisor {
    backend: Arc<dyn LlmBackend>,
    classifier: Classifier,
}

#[async_trait]
impl Node<CallCenterState> for Supervisor {
    async fn run(&self, state: &CallCenterState) -> Result<CallCenterUpdate, Report<NodeError>> {
        if !state.messages.last().is_some_and(Message::is_user) {
            debug!("last message is not from the user, finishing");
            return Ok(CallCenterUpdate::route(ROUTE_END));
        }
        let operation = "supervisor routing";
        let decision = decide(
            &self.classifier,
            self.backend.as_ref(),
            SUPERVISOR_PROMPT,
            &state.messages,
            operation,
        )
        .await?;
        Ok(match decision {
            Decision::Label(label) if label == FINISH => CallCenterUpdate::route(ROUTE_END),
            Decision::Label(label) if AGENTS.contains(&label.as_str()) => {
                info!(agent = %label, "routing to specialist");
                CallCenterUpdate::route(label)
            }
            Decision::Label(label) | Decision::OutOfSet(label) => {
                Decision::unrouted(&label, operation)
            }
        })
    }
}

struct SpecialistNode {
    backend: Arc<dyn LlmBackend>,
    agent: Agent,
}

#[async_trait]
impl Node<CallCenterState> for SpecialistNode {
    async fn run(&self, state: &CallCenterState) -> Result<CallCenterUpdate, Report<NodeError>> {
        let outcome = self
            .agent
            .run(self.backend.as_ref(), &to_llm_messages(&state.messages))
            .await
            .context(NodeError::Step {
                operation: "specialist agent",
            })?;
        Ok(CallCenterUpdate {
            messages: outcome.messages.into_iter().map(Message::from).collect(),
            next: None,
        })
    }
}

fn specialist(name: &str, prompt: &str, tools: switchboard_conversation::ToolRegistry) -> Agent {
    Agent::new(name, prompt, Arc::new(tools)).with_temperature(0.0)
}

/// Builds the call-center graph over `backend`.
///
/// # Errors
///
/// Returns a `GraphError` if the graph is malformed.
pub fn build_graph(
    backend: Arc<dyn LlmBackend>,
) -> Result<CompiledGraph<CallCenterState>, Report<GraphError>> {
    let mut graph = StateGraph::new();
    graph.add_node("topic_checker", TopicChecker {
        backend: Arc::clone(&backend),
        classifier: Classifier::new("decision", ["on_topic", "off_topic"]).with_description(
            "'on_topic' if the query is about furniture products, 'off_topic' otherwise",
        ),
    })?;
    graph.add_node("filter", QuestionFilter {
        backend: Arc::clone(&backend),
        classifier: Classifier::new("decision", ["single_question", "multi_question"])
            .with_description("whether the query holds a single or multiple distinct questions"),
    })?;
    graph.add_node("supervisor", Supervisor {
        backend: Arc::clone(&backend),
        classifier: Classifier::new(
            "next",
            AGENTS.iter().copied().chain([FINISH]),
        )
        .with_description("the next agent to route to, or 'FINISH' if the conversation is over"),
    })?;

    let specialists = [
        specialist(AGENTS[0], PRODUCT_DETAIL_PROMPT, tools::product_detail_tools()),
        specialist(AGENTS[1], PRICING_PROMPT, tools::pricing_tools()),
        specialist(AGENTS[2], WARRANTY_PROMPT, tools::warranty_tools()),
    ];
    for agent in specialists {
        let name = agent.name().to_string();
        graph.add_node(name.clone(), SpecialistNode {
            backend: Arc::clone(&backend),
            agent,
        })?;
        graph.add_edge(name, "supervisor")?;
    }

    let route = |state: &CallCenterState| state.next.clone();
    graph.set_entry_point("topic_checker");
    graph.add_conditional_edges("topic_checker", route, [
        ("filter", "filter"),
        (ROUTE_END, END),
    ])?;
    graph.add_conditional_edges("filter", route, [
        ("supervisor", "supervisor"),
        (ROUTE_END, END),
    ])?;
    graph.add_conditional_edges(
        "supervisor",
        route,
        AGENTS
            .iter()
            .map(|a| (*a, *a))
            .chain([(ROUTE_END, END)]),
    )?;

    Ok(graph.compile()?.with_recursion_limit(RECURSION_LIMIT))
}

/// The call-center assistant.
#[derive(Clone)]
pub struct CallCenter {
    graph: CompiledGraph<CallCenterState>,
}

impl CallCenter {
    /// Creates the assistant.
    ///
    /// # Errors
    ///
    /// Returns a `GraphError` if the graph is malformed.
    pub fn new(backend: Arc<dyn LlmBackend>) -> Result<Self, Report<GraphError>> {
        Ok(Self {
            graph: build_graph(backend)?,
        })
    }

    /// Overrides the recursion limit.
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.graph = self.graph.with_recursion_limit(limit);
        self
    }

    fn initial_state(query: &str) -> Result<CallCenterState, Report<AssistantError>> {
        let query = require_text("query", query).map_err(AssistantError::from)?;
        Ok(CallCenterState {
            messages: vec![Message::user(query)],
            next: String::new(),
        })
    }

    /// Answers `query`, returning every visible assistant reply in order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank query or `Graph` if the run fails.
    #[instrument(skip(self, query))]
    pub async fn ask(&self, query: &str) -> Result<Vec<String>, Report<AssistantError>> {
        let outcome = self
            .graph
            .invoke(Self::initial_state(query)?)
            .await
            .context(AssistantError::Graph {
                assistant: "call center",
            })?;
        Ok(outcome
            .state
            .messages
            .iter()
            .filter(|m| m.is_visible_reply())
            .map(|m| m.content.clone())
            .collect())
    }

    /// Streams assistant replies as the graph produces them.
    ///
    /// A step contributes its last message when that message is a visible
    /// assistant reply. A failed run ends the stream with an error item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank query.
    pub fn stream(
        &self,
        query: &str,
    ) -> Result<
        impl Stream<Item = Result<String, Report<AssistantError>>> + Send + 'static + use<>,
        Report<AssistantError>,
    > {
        let events = self.graph.stream(Self::initial_state(query)?);
        Ok(events.filter_map(|event| match event {
            GraphEvent::Step(step) => step
                .update
                .messages
                .last()
                .filter(|m| m.is_visible_reply())
                .map(|m| Ok(m.content.clone())),
            GraphEvent::Completed(_) => None,
            GraphEvent::Failed(report) => Some(Err(report).context(AssistantError::Graph {
                assistant: "call center",
            })),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::{Map, Value as JsonValue};
    use switchboard_ai::{LlmResponse, ScriptedBackend, ToolCall};

    fn decision(field: &str, label: &str) -> LlmResponse {
        let mut object = Map::new();
        object.insert(field.to_string(), JsonValue::from(label));
        LlmResponse::structured(JsonValue::Object(object))
    }

    fn call_center(backend: &Arc<ScriptedBackend>) -> CallCenter {
        CallCenter::new(Arc::clone(backend) as Arc<dyn LlmBackend>).expect("graph")
    }

    #[tokio::test]
    async fn off_topic_question_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new().with_response(decision("decision", "off_topic")));
        let replies = call_center(&backend)
            .ask("what's the weather?")
            .await
            .expect("ask");
        assert_eq!(replies, vec![OFF_TOPIC_REPLY]);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn multiple_questions_are_rejected() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "multi_question")),
        );
        let replies = call_center(&backend)
            .ask("price of the sofa and the desk warranty?")
            .await
            .expect("ask");
        assert_eq!(replies, vec![MULTI_QUESTION_REPLY]);
    }

    #[tokio::test]
    async fn pricing_question_runs_specialist_with_tools() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_response(decision("next", "PricingAgent"))
                .with_response(LlmResponse::tool_calls(vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "get_price_details".to_string(),
                    arguments: json!({"product_name": "sofa"}),
                }]))
                .with_response(LlmResponse::text("The sofa costs $1,500.")),
        );
        let replies = call_center(&backend)
            .ask("how much is the sofa?")
            .await
            .expect("ask");
        assert_eq!(replies, vec!["The sofa costs $1,500."]);

        let requests = backend.requests();
        assert_eq!(requests.len(), 5);
        let tool_result = requests[4]
            .messages
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call_1"))
            .expect("tool result sent back");
        assert_eq!(tool_result.content, "The Grand Comfort Sofa is priced at $1,500.");
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn supervisor_finish_ends_without_reply() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_response(decision("next", "FINISH")),
        );
        let replies = call_center(&backend).ask("thanks about the sofa").await.expect("ask");
        assert!(replies.is_empty());
    }

    #[tokio::test]
    async fn label_outside_the_set_stops_routing() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_response(decision("next", "RefundAgent")),
        );
        let replies = call_center(&backend)
            .ask("refund my desk")
            .await
            .expect("ask");
        assert!(replies.is_empty());
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn topic_label_naming_a_node_does_not_route() {
        let backend = Arc::new(ScriptedBackend::new().with_response(decision("decision", "filter")));
        let replies = call_center(&backend).ask("sofa size?").await.expect("ask");
        assert!(replies.is_empty());
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn filter_label_naming_a_node_does_not_route() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "supervisor")),
        );
        let replies = call_center(&backend).ask("sofa size?").await.expect("ask");
        assert!(replies.is_empty());
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn supervisor_label_naming_the_end_route_is_unrouted() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_response(decision("next", "END")),
        );
        let outcome = call_center(&backend)
            .graph
            .invoke(CallCenter::initial_state("sofa size?").expect("state"))
            .await
            .expect("run");
        assert_eq!(
            outcome.record.termination,
            switchboard_workflow::Termination::UnknownLabel {
                node: "supervisor".to_string(),
                label: UNROUTED.to_string(),
            }
        );
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn blank_query_is_invalid() {
        let backend = Arc::new(ScriptedBackend::new());
        let err = call_center(&backend).ask("   ").await.unwrap_err();
        assert!(err.current_context().is_client_error());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_fails_the_run() {
        let backend = Arc::new(ScriptedBackend::new());
        let err = call_center(&backend).ask("sofa size?").await.unwrap_err();
        assert_eq!(err.current_context(), &AssistantError::Graph {
            assistant: "call center"
        });
    }

    #[tokio::test]
    async fn stream_yields_replies_as_produced() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_response(decision("next", "WarrantyAgent"))
                .with_response(LlmResponse::text("Please share your invoice ID.")),
        );
        let replies: Vec<_> = call_center(&backend)
            .stream("I want to claim warranty on my desk")
            .expect("stream")
            .collect()
            .await;
        let replies: Vec<String> = replies.into_iter().map(|r| r.expect("reply")).collect();
        assert_eq!(replies, vec!["Please share your invoice ID."]);
    }

    #[tokio::test]
    async fn endless_routing_hits_recursion_limit() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(decision("decision", "on_topic"))
                .with_response(decision("decision", "single_question"))
                .with_fallback(decision("next", "PricingAgent")),
        );
        let replies: Vec<_> = call_center(&backend)
            .with_recursion_limit(3)
            .stream("sofa price")
            .expect("stream")
            .collect()
            .await;
        let err = replies
            .into_iter()
            .find_map(Result::err)
            .expect("recursion error");
        assert!(matches!(err.current_context(), AssistantError::Graph { .. }));
        assert_eq!(backend.requests().len(), 3);
    }
}
