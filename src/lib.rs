//! Agent performance analytics for call-center spreadsheet exports.

pub mod cohort;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod report;
pub mod timeline;

pub use config::AnalyticsConfig;
pub use engine::{analyze, AnalysisReport};
pub use error::ScorecardError;
pub use filter::{AnalysisFilter, WeekWindow};
pub use models::{AgentRecord, AgentTotal, ChangeEvent, RiskAssessment};
pub use normalize::{normalize, RawRecord, RawValue};
