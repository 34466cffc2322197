//! Core tutoring engine.
//!
//! Leaf-first: the [`catalog`] resolves activities, the [`evaluator`]
//! classifies responses, [`help`] walks the hint ladder, [`event`] builds
//! interaction records, and [`session`] drives all of them turn by turn.

pub mod activity;
pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod help;
pub mod session;

pub use activity::{Activity, HelpKind, HelpLevel, ResponseRule, SubTask};
pub use catalog::{Catalog, InMemoryCatalog};
pub use error::CatalogError;
pub use evaluator::{Outcome, OutcomeTag, evaluate};
pub use event::{EnvelopeConfig, EventRecorder, InteractionEvent, Verb};
pub use session::{Outputs, Phase, Resolution, Session, SubTaskCounters};
