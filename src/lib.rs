// Library surface for headless/integration tests and reuse.
// The TUI (main.rs, ui.rs) stays bin-only.
pub mod config;
pub mod engine;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod text;
pub mod timer;
