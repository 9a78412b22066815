//! Student record ingestion, performance prediction and risk classification.

pub mod error;
pub mod guard;
pub mod ingest;
pub mod models;
pub mod recommend;
pub mod report;
pub mod risk;
pub mod scoring;
pub mod seed;
pub mod service;
pub mod store;

pub use error::{CoreError, FormatError};
pub use models::{Prediction, Record, RecordFields, RecordUpdate, RiskTier, ScoringResult};
pub use risk::RiskPolicy;
pub use service::StudentService;
pub use store::{MemoryStore, RecordStore};
