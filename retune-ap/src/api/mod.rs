//! HTTP API handlers for retune-ap
//!
//! REST endpoints for job submission and lookup, plus an SSE stream of job events.

pub mod health;
pub mod jobs;
pub mod process;
pub mod sse;

pub use health::health_routes;
pub use jobs::job_routes;
pub use process::process_routes;
pub use sse::job_event_stream;
