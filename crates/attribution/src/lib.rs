//! `icpp-attribution` - IC++ fee attribution engine.
//!
//! Pure engine crate: receives pre-loaded ledger and fee tables, returns
//! per-(region, card type) fee breakdowns. No CLI or IO dependencies.

pub mod aggregate;
pub mod category;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod rules;

pub use category::FeeCategory;
pub use config::AttributionConfig;
pub use engine::run;
pub use error::AttributionError;
pub use model::{AggregateRecord, AttributionInput, AttributionReport, RawTable, Warning};
