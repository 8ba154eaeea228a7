// Adapters layer: concrete implementations for external systems (child processes, input files).

pub mod intake;
pub mod process;
