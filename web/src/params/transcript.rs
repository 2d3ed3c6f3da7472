use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct TranscriptParams {
    /// Vendor-issued transcript download URL; must be on the trusted vendor domain
    pub(crate) download_url: String,
}
