pub mod batch;
pub mod config;
pub mod error;
pub mod fusion;
pub mod pipeline;
pub mod scanners;
pub mod semantic;
pub mod types;

pub use batch::{BatchSummary, BulkOrchestrator};
pub use config::Config;
pub use error::ValidationError;
pub use fusion::RiskFusionEngine;
pub use pipeline::EmailAnalyzer;
pub use scanners::IndicatorExtractor;
pub use semantic::{EmailSummary, HttpSemanticProvider, SemanticProvider};
pub use types::{
    AnalysisContext, AnalysisRequest, AuthOutcome, DeterministicScore, EmailMessage, Indicator,
    IndicatorKind, RiskAssessment, RiskLevel, SemanticScore,
};
