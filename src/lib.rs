// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod columns;
pub mod csv_io;
pub mod dataset;
pub mod decision;
pub mod excel;
pub mod lexicon;
pub mod metrics;
pub mod moderator;
pub mod policy;
pub mod signals;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::dataset::{classify_dataset, classify_texts, duplicate_mask, Dataset};
pub use crate::decision::{Classification, Decision, Rule};
pub use crate::moderator::classify;
pub use crate::policy::Policy;
