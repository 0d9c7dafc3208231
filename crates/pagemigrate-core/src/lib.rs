// Public fallible APIs in this crate share one concrete error contract (`MigrateError`).
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod audit;
pub mod breadcrumb;
pub mod config;
pub mod dates;
pub mod discover;
pub mod error;
pub mod fs;
pub mod home_pages;
pub mod index;
pub mod links;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod similarity;
pub(crate) mod text;

pub use config::MigrationConfig;
pub use error::{MigrateError, Result};
pub use index::{CorpusEntry, TitleIndex};
pub use normalize::normalize;
pub use pipeline::{
    AnnotateDatesReport, AnnotateDatesRequest, MatchReport, ReorganizeReport, ReorganizeRequest,
    annotate_dates, match_corpora, reorganize,
};
pub use reconcile::{Correspondence, PathAssignmentMap};
pub use similarity::SimilarityMetric;
