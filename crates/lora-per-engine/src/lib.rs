//! lora-per-engine: the PER test state machine and session orchestration.
//!
//! - [`PerEngine`] arms the radio from a [`TestConfig`](lora_per_core::TestConfig)
//!   snapshot and counts radio notifications until the frame target is
//!   reached.
//! - [`PerReport`] holds the final counters and the PER figure.
//! - [`PerRig`] ties a console, the standard AT command table and an engine
//!   into one session; [`PerRigBuilder`] constructs it.

pub mod builder;
pub mod engine;
pub mod report;
pub mod rig;
pub mod settings;

pub use builder::PerRigBuilder;
pub use engine::{PerEngine, PerState};
pub use report::{PerCounters, PerReport, per_percent};
pub use rig::PerRig;
pub use settings::EngineSettings;
