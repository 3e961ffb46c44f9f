//! The switchboard assistants.
//!
//! Each module wires the shared primitives (LLM calls, agents, graphs,
//! retrieval, thread history) into one self-contained assistant:
//!
//! - [`CallCenter`]: supervisor routing between product, pricing, and warranty agents
//! - [`ProductSupport`]: threaded product Q&A with an on-topic gate
//! - [`HrAssistant`]: tool-calling HR agent over the policy collections
//! - [`TourismGuide`]: classify-then-retrieve travel answers
//! - [`LeadGenerator`]: natural language to a read-only SQL lead list
//! - [`SalesAnalyst`]: free-form sales questions to SQL over products and orders
//! - [`Summarizer`]: map-reduce PDF summaries
//! - [`Translator`]: detect-and-translate
//! - [`PolicySimulator`]: persona reactions to a draft policy
//! - [`QuotationExtractor`]: priced quotations from an order image

pub mod call_center;
pub mod error;
pub mod hr;
pub mod lead_generation;
pub mod policy;
pub mod product_support;
pub mod quotation;
pub mod sales;
pub mod sql;
pub mod summarizer;
mod tools;
pub mod tourism;
pub mod translator;

pub use call_center::CallCenter;
pub use error::AssistantError;
pub use hr::{ChatTurn, HrAssistant};
pub use lead_generation::{LEADS, LeadGenerator, LeadReport};
pub use policy::{Employee, PolicySimulator, Roster, SimulationResult, SimulationRow};
pub use product_support::ProductSupport;
pub use quotation::{CustomerInfo, Quotation, QuotationExtractor, QuotationLine};
pub use sales::{SALES, SalesAnalyst, SalesAnswer};
pub use sql::{Dataset, SqlDatabase};
pub use summarizer::{DocumentSummary, Summarizer};
pub use tourism::{Category, TourismAnswer, TourismGuide};
pub use translator::Translator;
