//! Adapters layer: Concrete implementations of ports.
//!
//! - `http`: reqwest client for the screening API (all three ports)
//! - `sanitize`: redaction of user data in log output

pub mod http;
pub mod sanitize;

pub use http::OculusApiClient;
