// =============================================================================
// Orchestrator — lifecycle supervision for the five services (spec §4.7)
// =============================================================================

pub mod api;
pub mod pidfile;
pub mod supervisor;

pub use supervisor::{Supervisor, SUPERVISED_SERVICES};
