// All core functionality is in fileplacer-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod locations;

// Re-export core types for convenience
pub use fileplacer_core::*;
