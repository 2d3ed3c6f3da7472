//! Transcript retrieval and normalization, plus the recording listings around it.
//!
//! Control flow for a transcript: [`download_url`] validates the vendor reference,
//! [`gateway::zoom`] fetches the raw artifact, [`caption`] parses it into segments.
//! Recording listings go through [`recording`], which annotates and filters what the
//! vendor returns. Everything here is request-scoped value data.

pub mod caption;
pub mod download_url;
pub mod error;
pub mod gateway;
pub mod recording;
pub mod transcript;

pub use caption::{Timecode, TranscriptSegment};
pub use download_url::{DownloadUrlValidator, ValidatedUrl};
pub use recording::{FileKind, Recording, RecordingFile};
