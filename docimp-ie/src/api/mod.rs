//! HTTP API handlers for docimp-ie
//!
//! REST routes drive the import wizard; `/events` streams every
//! `ImportEvent` over SSE.

pub mod health;
pub mod sessions;
pub mod sse;

pub use health::health_routes;
pub use sessions::session_routes;
pub use sse::event_stream;
