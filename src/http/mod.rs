//! HTTP client module
//!
//! Thin layer over `reqwest` used by the CityBikes fetchers.
//!
//! # Features
//!
//! - **Status classification**: non-success responses become `Error::HttpStatus`
//! - **JSON decoding**: malformed bodies become `Error::Decode`
//! - **Optional retries**: transient failures retried with backoff
//! - **Rate limiting**: token bucket shared across fan-out workers

mod client;
mod rate_limit;

pub(crate) use client::excerpt;
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
