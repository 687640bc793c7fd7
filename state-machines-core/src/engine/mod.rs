//! The interpretation engine: pure algorithm (`algorithm`), the per-instance
//! resolved-callback cache (`resolve`), and the shared microstep/macrostep loop
//! (`core`) that `SyncEngine`/`AsyncEngine` drive.

pub mod algorithm;
#[cfg(feature = "async")]
pub mod async_engine;
pub mod core;
pub mod resolve;
pub mod sync;

pub use algorithm::HistoryValues;
#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
pub use core::{EngineConfig, EngineCore, EngineError, ErrorPolicy};
pub use resolve::ResolvedDefinition;
pub use sync::SyncEngine;
