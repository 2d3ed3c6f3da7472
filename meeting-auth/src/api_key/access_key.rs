//! Constant-time verification of the caller's access key.

use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::error::{api_key_error, ApiKeyErrorKind, Error};

type HmacSha256 = Hmac<Sha256>;

/// Subject recorded for every caller that presents the shared access key.
const ACCESS_SUBJECT: &str = "gateway_api_user";

/// Validated caller identity for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub subject: String,
}

/// Verifies the access key presented by inbound callers.
///
/// Both the configured secret and the candidate are reduced to HMAC-SHA256 digests under
/// a random per-process key, and the digests are compared with `Mac::verify_slice`, which
/// is constant time. Comparing fixed-length digests keeps the comparison time independent
/// of the candidate's length and content, so a missing header, an empty value and a wrong
/// key all take the same path and produce the same error.
pub struct AccessKeyVerifier {
    mac: HmacSha256,
    expected_digest: Vec<u8>,
}

impl AccessKeyVerifier {
    /// Create a verifier for the configured secret.
    ///
    /// An empty secret is refused so a misconfigured gateway cannot accept empty keys.
    pub fn new(secret: &SecretString) -> Result<Self, Error> {
        if secret.expose_secret().is_empty() {
            return Err(api_key_error(
                ApiKeyErrorKind::InvalidFormat,
                "Configured access key must not be empty",
            ));
        }

        let mut mac_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut mac_key);
        let mac = <HmacSha256 as Mac>::new_from_slice(&mac_key).map_err(|_| {
            api_key_error(ApiKeyErrorKind::InvalidFormat, "Invalid HMAC key")
        })?;

        let mut expected = mac.clone();
        expected.update(secret.expose_secret().as_bytes());
        let expected_digest = expected.finalize().into_bytes().to_vec();

        Ok(Self {
            mac,
            expected_digest,
        })
    }

    /// Authenticate the raw header value, if any.
    ///
    /// Every failure is the same `VerificationFailed` error.
    pub fn authenticate(&self, header_value: Option<&[u8]>) -> Result<AccessContext, Error> {
        let candidate = header_value.unwrap_or_default();

        let mut mac = self.mac.clone();
        mac.update(candidate);
        let matches = mac.verify_slice(&self.expected_digest).is_ok();

        if matches && !candidate.is_empty() {
            Ok(AccessContext {
                subject: ACCESS_SUBJECT.to_string(),
            })
        } else {
            Err(api_key_error(
                ApiKeyErrorKind::VerificationFailed,
                "Invalid or missing access key",
            ))
        }
    }
}

impl std::fmt::Debug for AccessKeyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeyVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn verifier() -> AccessKeyVerifier {
        AccessKeyVerifier::new(&SecretString::new("s3cret-key".to_string())).unwrap()
    }

    #[test]
    fn test_matching_key_authenticates() {
        let context = verifier().authenticate(Some(b"s3cret-key")).unwrap();
        assert_eq!(context.subject, ACCESS_SUBJECT);
    }

    #[test]
    fn test_wrong_missing_and_empty_keys_fail_identically() {
        let verifier = verifier();
        let candidates: [Option<&[u8]>; 5] = [
            None,
            Some(b""),
            Some(b"s3cret-ke"),
            Some(b"s3cret-key "),
            Some(b"S3CRET-KEY"),
        ];

        for candidate in candidates {
            let err = verifier.authenticate(candidate).unwrap_err();
            assert_eq!(
                err.error_kind,
                ErrorKind::ApiKey(ApiKeyErrorKind::VerificationFailed)
            );
            assert_eq!(err.to_string(), "API key error: VerificationFailed");
        }
    }

    #[test]
    fn test_empty_configured_secret_is_refused() {
        let result = AccessKeyVerifier::new(&SecretString::new(String::new()));
        assert_eq!(
            result.unwrap_err().error_kind,
            ErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat)
        );
    }

    #[test]
    fn test_two_verifiers_for_same_secret_use_independent_keys() {
        let a = verifier();
        let b = verifier();
        assert_ne!(a.expected_digest, b.expected_digest);
        assert!(a.authenticate(Some(b"s3cret-key")).is_ok());
        assert!(b.authenticate(Some(b"s3cret-key")).is_ok());
    }
}
