//! Clients for the external vendor APIs this gateway consumes.

pub mod zoom;

pub use zoom::ZoomClient;
