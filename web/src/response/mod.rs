//! Response bodies of the gateway endpoints.

use domain::{Recording, TranscriptSegment};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordingsResponse {
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptResponse {
    pub transcript: Vec<TranscriptSegment>,
}
