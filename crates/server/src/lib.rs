//! Library surface for the `server` crate, split out so integration tests
//! can drive the axum router directly without going through the binary.
pub mod routes;
