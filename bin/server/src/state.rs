//! Shared application state.

use crate::config::ServerConfig;
use crate::error::StartupError;
use rootcause::prelude::{Report, ResultExt};
use std::sync::Arc;
use switchboard_ai::{EmbeddingBackend, LlmBackend, OpenAiBackend};
use switchboard_assistants::{
    CallCenter, HrAssistant, LEADS, LeadGenerator, PolicySimulator, ProductSupport,
    QuotationExtractor, Roster, SALES, SalesAnalyst, SqlDatabase, Summarizer, TourismGuide,
    Translator,
};
use switchboard_conversation::{InMemoryThreadStore, ThreadStore};
use switchboard_knowledge::KnowledgeBase;
use tracing::info;

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub backend: Arc<dyn LlmBackend>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub threads: Arc<dyn ThreadStore>,
    pub knowledge: Arc<KnowledgeBase>,
    pub call_center: CallCenter,
    pub product_support: ProductSupport,
    pub hr: HrAssistant,
    pub tourism: TourismGuide,
    pub leads: LeadGenerator,
    pub sales: SalesAnalyst,
    pub summarizer: Summarizer,
    pub translator: Translator,
    pub policy: PolicySimulator,
    pub quotation: QuotationExtractor,
}

/// Externally owned resources the assistants are wired to.
pub struct Resources {
    pub backend: Arc<dyn LlmBackend>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub knowledge: Arc<KnowledgeBase>,
    pub lead_database: SqlDatabase,
    pub sales_database: SqlDatabase,
    pub roster: Roster,
}

impl AppState {
    /// Wires every assistant to the given resources.
    ///
    /// # Errors
    ///
    /// Returns `Graph` if an assistant graph fails to compile.
    pub fn new(resources: Resources, recursion_limit: u32) -> Result<Self, Report<StartupError>> {
        let Resources {
            backend,
            embedder,
            knowledge,
            lead_database,
            sales_database,
            roster,
        } = resources;
        let threads: Arc<dyn ThreadStore> = Arc::new(InMemoryThreadStore::new());

        Ok(Self {
            call_center: CallCenter::new(Arc::clone(&backend))
                .context(StartupError::Graph {
                    assistant: "call center",
                })?
                .with_recursion_limit(recursion_limit),
            product_support: ProductSupport::new(Arc::clone(&backend), Arc::clone(&threads))
                .context(StartupError::Graph {
                    assistant: "product support",
                })?,
            hr: HrAssistant::new(
                Arc::clone(&backend),
                Arc::clone(&embedder),
                Arc::clone(&knowledge),
            ),
            tourism: TourismGuide::new(
                Arc::clone(&backend),
                Arc::clone(&embedder),
                Arc::clone(&knowledge),
            ),
            leads: LeadGenerator::new(Arc::clone(&backend), lead_database).context(
                StartupError::Graph {
                    assistant: "lead generation",
                },
            )?,
            sales: SalesAnalyst::new(Arc::clone(&backend), sales_database),
            summarizer: Summarizer::new(Arc::clone(&backend)),
            translator: Translator::new(Arc::clone(&backend)),
            policy: PolicySimulator::new(Arc::clone(&backend), roster),
            quotation: QuotationExtractor::new(Arc::clone(&backend)),
            backend,
            embedder,
            threads,
            knowledge,
        })
    }

    /// Opens the configured backends and stores, then wires the assistants.
    ///
    /// # Errors
    ///
    /// Returns the `StartupError` of the first resource that fails.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, Report<StartupError>> {
        let openai = Arc::new(
            OpenAiBackend::new(config.llm.backend_config()).context(StartupError::Backend)?,
        );
        info!(
            base_url = %config.llm.base_url,
            chat_model = %config.llm.chat_model,
            "model backend ready"
        );

        let knowledge = KnowledgeBase::open(config.knowledge.dir.clone())
            .await
            .context(StartupError::Knowledge)?;
        info!(
            dir = %config.knowledge.dir.display(),
            collections = ?knowledge.collection_names().await,
            "knowledge base opened"
        );

        let lead_database = SqlDatabase::connect(&config.lead_generation.database_url, &LEADS)
            .await
            .context(StartupError::Database)?;
        let sales_database = SqlDatabase::connect(&config.sales.database_url, &SALES)
            .await
            .context(StartupError::Database)?;

        let roster = match &config.policy.roster_path {
            Some(path) => Roster::load(path).await,
            None => Roster::sample(),
        }
        .context(StartupError::Roster)?;

        Self::new(
            Resources {
                backend: Arc::clone(&openai) as Arc<dyn LlmBackend>,
                embedder: openai,
                knowledge: Arc::new(knowledge),
                lead_database,
                sales_database,
                roster,
            },
            config.server.recursion_limit,
        )
    }
}
