/*!
 * Monitoring Module
 * Structured tracing initialization and the append-only debug log
 */

mod debug_log;
mod tracer;

pub use debug_log::DebugLog;
pub use tracer::init_tracing;
