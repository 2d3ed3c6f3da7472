//! Credential handling on both sides of the gateway.
//!
//! Outbound: attaching the vendor's bearer credential to every vendor call.
//! Inbound: verifying the caller's access key in constant time.

mod access_key;
mod auth;
mod bearer;

pub use access_key::{AccessContext, AccessKeyVerifier};
pub use auth::{AuthMethod, ProviderAuth};
pub use bearer::BearerTokenAuth;
