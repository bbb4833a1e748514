pub mod debounce;
pub mod engine;
pub mod machine;

pub use engine::{EngineConfig, EngineView, SyncEngine};
pub use machine::{transition, Action, SyncEvent, SyncPhase};
