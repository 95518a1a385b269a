//! Svix webhook signature verification.
//!
//! The signed content is `"{svix-id}.{svix-timestamp}.{raw body}"`, keyed with
//! the shared webhook secret using HMAC-SHA256 and hex-encoded. The
//! `svix-signature` header carries one or more space-separated
//! `"<version>,<signature>"` entries; only `v1` entries are considered.
//!
//! Event age is not checked: a correctly signed event is accepted no matter
//! how old its timestamp is.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::webhook::event::WebhookEvent;

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

const SIGNATURE_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

/// The three delivery headers, borrowed from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookHeaders<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

impl<'a> WebhookHeaders<'a> {
    pub fn from_header_map(headers: &'a HeaderMap) -> Self {
        Self {
            id: header_str(headers, SVIX_ID_HEADER),
            timestamp: header_str(headers, SVIX_TIMESTAMP_HEADER),
            signature: header_str(headers, SVIX_SIGNATURE_HEADER),
        }
    }

    /// All three headers, or `MissingHeaders` if any is absent or empty.
    fn require(&self) -> Result<(&'a str, &'a str, &'a str), AppError> {
        let present = |value: Option<&'a str>| value.filter(|v| !v.is_empty());
        match (
            present(self.id),
            present(self.timestamp),
            present(self.signature),
        ) {
            (Some(id), Some(timestamp), Some(signature)) => Ok((id, timestamp, signature)),
            _ => Err(AppError::MissingHeaders),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// An authenticated event together with the delivery id and timestamp.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub event_id: String,
    pub timestamp: String,
    pub event: WebhookEvent,
}

/// Verifier for Svix-signed webhooks.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Authenticates `body` against the delivery headers and parses it.
    ///
    /// # Errors
    ///
    /// - `MissingHeaders` - id, timestamp or signature absent (checked first)
    /// - `InvalidSignature` - no `v1` entry matches the computed HMAC
    /// - `MalformedPayload` - authenticated body is not a JSON event object
    pub fn verify(
        &self,
        body: &[u8],
        headers: &WebhookHeaders<'_>,
    ) -> Result<VerifiedEvent, AppError> {
        let (id, timestamp, signature_header) = headers.require()?;

        let expected = self.compute_signature(id, timestamp, body)?;
        if !signature_matches(&expected, signature_header) {
            return Err(AppError::InvalidSignature);
        }

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedPayload(e.to_string()))?;

        Ok(VerifiedEvent {
            event_id: id.to_string(),
            timestamp: timestamp.to_string(),
            event,
        })
    }

    /// HMAC-SHA256 of `"{id}.{timestamp}.{body}"`. The body is fed as raw
    /// bytes, exactly as received.
    fn compute_signature(
        &self,
        id: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid webhook secret: {e}")))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// True if any recognized `v1,<hex>` entry equals `expected`.
fn signature_matches(expected: &[u8], header: &str) -> bool {
    header
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == SIGNATURE_VERSION)
        .filter_map(|(_, signature)| hex::decode(signature).ok())
        .any(|candidate| constant_time_compare(expected, &candidate))
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a `svix-signature` header value for test fixtures.
#[cfg(test)]
pub fn sign_for_test(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{id}.{timestamp}.").as_bytes());
    mac.update(body);
    format!("v1,{}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const ID: &str = "msg_2abc";
    const TS: &str = "1718900000";
    const BODY: &str = r#"{"type":"user.created","data":{"id":"user_1","first_name":"A","last_name":"B"}}"#;

    fn headers<'a>(id: &'a str, ts: &'a str, sig: &'a str) -> WebhookHeaders<'a> {
        WebhookHeaders {
            id: Some(id),
            timestamp: Some(ts),
            signature: Some(sig),
        }
    }

    fn flip(bytes: &[u8], index: usize) -> Vec<u8> {
        let mut out = bytes.to_vec();
        out[index] ^= 0x01;
        out
    }

    // ── Header presence ────────────────────────────────────────────────

    #[test]
    fn test_missing_any_header_is_missing_headers() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());
        let complete = headers(ID, TS, &sig);

        let cases = [
            WebhookHeaders { id: None, ..complete },
            WebhookHeaders { timestamp: None, ..complete },
            WebhookHeaders { signature: None, ..complete },
            WebhookHeaders::default(),
        ];

        for case in cases {
            let result = verifier.verify(BODY.as_bytes(), &case);
            assert!(matches!(result, Err(AppError::MissingHeaders)));
        }
    }

    #[test]
    fn test_empty_header_counts_as_missing() {
        let verifier = WebhookVerifier::new(SECRET);
        let result = verifier.verify(BODY.as_bytes(), &headers(ID, "", "v1,00"));
        assert!(matches!(result, Err(AppError::MissingHeaders)));
    }

    #[test]
    fn test_missing_headers_checked_before_signature() {
        // Garbage body and signature, but a missing id still wins.
        let verifier = WebhookVerifier::new(SECRET);
        let h = WebhookHeaders {
            id: None,
            timestamp: Some(TS),
            signature: Some("not-a-signature"),
        };
        assert!(matches!(
            verifier.verify(b"\xff\xfe", &h),
            Err(AppError::MissingHeaders)
        ));
    }

    #[test]
    fn test_headers_read_from_header_map() {
        let mut map = HeaderMap::new();
        map.insert(SVIX_ID_HEADER, ID.parse().unwrap());
        map.insert(SVIX_TIMESTAMP_HEADER, TS.parse().unwrap());
        map.insert(SVIX_SIGNATURE_HEADER, "v1,abcd".parse().unwrap());

        let h = WebhookHeaders::from_header_map(&map);

        assert_eq!(h.id, Some(ID));
        assert_eq!(h.timestamp, Some(TS));
        assert_eq!(h.signature, Some("v1,abcd"));
    }

    // ── Signature verification ─────────────────────────────────────────

    #[test]
    fn test_valid_signature_parses_event() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());

        let verified = verifier.verify(BODY.as_bytes(), &headers(ID, TS, &sig)).unwrap();

        assert_eq!(verified.event_id, ID);
        assert_eq!(verified.timestamp, TS);
        assert_eq!(verified.event.event_type.as_deref(), Some("user.created"));
        let data = verified.event.data.unwrap();
        assert_eq!(data.id.as_deref(), Some("user_1"));
    }

    #[test]
    fn test_signature_covers_raw_body_bytes() {
        // Whitespace that a re-serializer would drop is part of what was signed.
        let verifier = WebhookVerifier::new(SECRET);
        let body = b"{ \"data\" : { \"id\" : \"user_1\" } }\n";
        let sig = sign_for_test(SECRET, ID, TS, body);

        assert!(verifier.verify(body, &headers(ID, TS, &sig)).is_ok());
        assert!(matches!(
            verifier.verify(br#"{"data":{"id":"user_1"}}"#, &headers(ID, TS, &sig)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_flipping_any_body_byte_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());

        for i in 0..BODY.len() {
            let tampered = flip(BODY.as_bytes(), i);
            let result = verifier.verify(&tampered, &headers(ID, TS, &sig));
            assert!(
                matches!(result, Err(AppError::InvalidSignature)),
                "body byte {i} flipped but verification passed"
            );
        }
    }

    #[test]
    fn test_flipping_any_id_or_timestamp_byte_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());

        for i in 0..ID.len() {
            let id = String::from_utf8(flip(ID.as_bytes(), i)).unwrap();
            let result = verifier.verify(BODY.as_bytes(), &headers(&id, TS, &sig));
            assert!(matches!(result, Err(AppError::InvalidSignature)));
        }
        for i in 0..TS.len() {
            let ts = String::from_utf8(flip(TS.as_bytes(), i)).unwrap();
            let result = verifier.verify(BODY.as_bytes(), &headers(ID, &ts, &sig));
            assert!(matches!(result, Err(AppError::InvalidSignature)));
        }
    }

    #[test]
    fn test_flipping_any_signature_byte_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());

        for i in 0..sig.len() {
            let tampered = String::from_utf8(flip(sig.as_bytes(), i)).unwrap();
            let result = verifier.verify(BODY.as_bytes(), &headers(ID, TS, &tampered));
            assert!(
                matches!(result, Err(AppError::InvalidSignature)),
                "signature byte {i} flipped but verification passed"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let verifier = WebhookVerifier::new("whsec_other");
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());
        assert!(matches!(
            verifier.verify(BODY.as_bytes(), &headers(ID, TS, &sig)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_unrecognized_version_is_ignored() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());
        let v2 = sig.replacen("v1,", "v2,", 1);

        assert!(matches!(
            verifier.verify(BODY.as_bytes(), &headers(ID, TS, &v2)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_any_matching_entry_in_rotation_list_passes() {
        let verifier = WebhookVerifier::new(SECRET);
        let stale = sign_for_test("whsec_rotated_out", ID, TS, BODY.as_bytes());
        let current = sign_for_test(SECRET, ID, TS, BODY.as_bytes());
        let header = format!("{stale} v2,ignored {current}");

        assert!(verifier.verify(BODY.as_bytes(), &headers(ID, TS, &header)).is_ok());
    }

    #[test]
    fn test_header_without_version_segment_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let sig = sign_for_test(SECRET, ID, TS, BODY.as_bytes());
        let bare = sig.trim_start_matches("v1,");

        assert!(matches!(
            verifier.verify(BODY.as_bytes(), &headers(ID, TS, bare)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_authenticated_non_json_is_malformed() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = b"not json";
        let sig = sign_for_test(SECRET, ID, TS, body);

        assert!(matches!(
            verifier.verify(body, &headers(ID, TS, &sig)),
            Err(AppError::MalformedPayload(_))
        ));
    }

    // ── Constant-time comparison ───────────────────────────────────────

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
        assert!(constant_time_compare(&[], &[]));
    }
}
