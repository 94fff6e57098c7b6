/// Runtime execution layer
///
/// Dispatching compiled plans to the external engine: the engine client seam,
/// the request orchestrator (resolve, compile, dispatch, map result), and the
/// queue-triggered async execution channel.

// Engine/codegen HTTP client behind an injectable trait
pub mod engine;

// Resolve -> Compile -> Dispatch -> MapResult per execution request
pub mod orchestrator;

// Async job channel with result envelopes
pub mod channel;

// Re-export commonly used types
pub use channel::{ExecutionJob, ExecutionOutcome, LogPublisher, QueuedJob, ResultPublisher};
pub use engine::{EngineClient, ExecutionResponse, HttpEngineClient};
pub use orchestrator::{Orchestrator, RunConfig};
