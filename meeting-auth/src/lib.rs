//! # meeting-auth
//!
//! Single source of truth for authentication and vendor HTTP plumbing in the gateway:
//! - Access key verification for inbound callers (the Access Gate)
//! - Bearer credential attachment for the video-conferencing vendor's API
//! - HTTP client building with middleware (correlation logging, retry, auth)
//! - The explicit upstream status classification table
//!
//! ## Architecture
//!
//! This crate provides the authentication foundation that other crates build upon:
//! - `domain` uses the HTTP client builder and the status table to talk to the vendor
//! - `web` uses the access key verifier to guard every gateway endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_auth::{
//!     api_key::{AccessKeyVerifier, BearerTokenAuth},
//!     http::{AuthenticatedClientBuilder, ResponseClass},
//! };
//! ```

pub mod api_key;
pub mod error;
pub mod http;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
