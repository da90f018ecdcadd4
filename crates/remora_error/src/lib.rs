//! Error types for the Remora library.
//!
//! This crate provides the foundation error types used throughout the Remora
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use remora_error::{RemoraResult, HttpError};
//!
//! fn fetch_data() -> RemoraResult<String> {
//!     Err(HttpError::new("Connection refused"))?
//! }
//!
//! match fetch_data() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod http;
mod provider;
mod sink;

pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{RemoraError, RemoraErrorKind, RemoraResult};
pub use http::HttpError;
pub use provider::{ProviderError, ProviderErrorKind};
pub use sink::{SinkError, SinkErrorKind};
