//! Validation of caller-supplied download URLs before the gateway fetches them.
//!
//! The gateway attaches the vendor bearer credential to transcript downloads, so a URL
//! that resolves anywhere other than the trusted vendor domain must never be fetched.

use std::fmt;
use std::net::IpAddr;

use log::*;
use url::{Host, Url};

use crate::error::{invalid_download_url, Error};

const ALLOWED_SCHEMES: &[&str] = &["https", "http"];

/// A download URL that passed validation against the trusted vendor domain.
///
/// Can only be constructed by [`DownloadUrlValidator::validate`].
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

// Download URLs carry signed query strings; keep them out of debug output.
impl fmt::Debug for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidatedUrl")
            .field(&format!(
                "{}://{}{}",
                self.0.scheme(),
                self.0.host_str().unwrap_or_default(),
                self.0.path()
            ))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DownloadUrlValidator {
    trusted_domain: String,
}

impl DownloadUrlValidator {
    /// `trusted_domain` is compared case-insensitively; surrounding dots are ignored.
    pub fn new(trusted_domain: impl Into<String>) -> Self {
        let trusted_domain = trusted_domain
            .into()
            .trim()
            .trim_matches('.')
            .to_ascii_lowercase();
        Self { trusted_domain }
    }

    /// Check `raw` and return it as a [`ValidatedUrl`].
    ///
    /// Accepts only absolute http(s) URLs without embedded credentials whose host is the
    /// trusted domain or a subdomain of it. Path and query are never consulted.
    pub fn validate(&self, raw: &str) -> Result<ValidatedUrl, Error> {
        let url = Url::parse(raw.trim()).map_err(|err| {
            warn!("Rejected download URL that failed to parse: {err}");
            invalid_download_url("Download URL is not a valid absolute URL")
        })?;

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            warn!("Rejected download URL with scheme {}", url.scheme());
            return Err(invalid_download_url("Download URL must use http or https"));
        }

        if !url.username().is_empty() || url.password().is_some() {
            warn!("Rejected download URL with embedded credentials");
            return Err(invalid_download_url(
                "Download URL must not contain credentials",
            ));
        }

        if !self.is_trusted_host(&url) {
            warn!(
                "Rejected download URL for untrusted host {}",
                url.host_str().unwrap_or("<none>")
            );
            return Err(invalid_download_url(
                "Download URL host is not the trusted vendor domain",
            ));
        }

        Ok(ValidatedUrl(url))
    }

    /// Whether `url` points at the trusted domain, used to re-check redirect targets.
    pub fn is_trusted_url(&self, url: &Url) -> bool {
        ALLOWED_SCHEMES.contains(&url.scheme())
            && url.username().is_empty()
            && url.password().is_none()
            && self.is_trusted_host(url)
    }

    fn is_trusted_host(&self, url: &Url) -> bool {
        if self.trusted_domain.is_empty() {
            return false;
        }

        match url.host() {
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                domain == self.trusted_domain
                    || domain
                        .strip_suffix(&self.trusted_domain)
                        .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
            }
            // IP literals only match a trusted domain configured as that exact address.
            Some(Host::Ipv4(addr)) => self.matches_ip(IpAddr::V4(addr)),
            Some(Host::Ipv6(addr)) => self.matches_ip(IpAddr::V6(addr)),
            None => false,
        }
    }

    fn matches_ip(&self, addr: IpAddr) -> bool {
        self.trusted_domain
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|trusted| trusted == addr)
    }
}
