//! Payload types shared between the native sensor and application code.
//!
//! Field names follow the shapes the native module hands back, so the JSON
//! form is `{"screenStatus": "SCREEN_MIRRORING"}` and so on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen security state reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenStatus {
    /// No presentation display attached, nothing recording.
    ScreenNormal,
    /// A presentation display (cast, mirror) is attached.
    ScreenMirroring,
    /// A new video showed up in external media storage.
    VideoRecordingDetected,
}

impl ScreenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenStatus::ScreenNormal => "SCREEN_NORMAL",
            ScreenStatus::ScreenMirroring => "SCREEN_MIRRORING",
            ScreenStatus::VideoRecordingDetected => "VIDEO_RECORDING_DETECTED",
        }
    }

    /// Parse a status name. Accepts the wire names and short aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCREEN_NORMAL" | "NORMAL" => Some(ScreenStatus::ScreenNormal),
            "SCREEN_MIRRORING" | "MIRRORING" => Some(ScreenStatus::ScreenMirroring),
            "VIDEO_RECORDING_DETECTED" | "RECORDING" => Some(ScreenStatus::VideoRecordingDetected),
            _ => None,
        }
    }

    /// Whether the screen content may be leaving the device.
    pub fn is_exposed(&self) -> bool {
        !matches!(self, ScreenStatus::ScreenNormal)
    }
}

impl fmt::Display for ScreenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `screenStatusChange` event and of `getCurrentStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub screen_status: ScreenStatus,
    /// When the sensor observed the state. Not part of the native payload.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl StatusEvent {
    /// A change event, stamped with the time it was observed.
    pub fn new(screen_status: ScreenStatus) -> Self {
        Self {
            screen_status,
            observed_at: Some(Utc::now()),
        }
    }

    /// A query answer. Carries only the native payload.
    pub fn snapshot(screen_status: ScreenStatus) -> Self {
        Self {
            screen_status,
            observed_at: None,
        }
    }
}

impl From<ScreenStatus> for StatusEvent {
    fn from(status: ScreenStatus) -> Self {
        StatusEvent::new(status)
    }
}

/// Digests of the app signing certificate, as colon-separated upper-case hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateFingerprint {
    pub sha1: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

impl CertificateFingerprint {
    /// Build a fingerprint from raw digest bytes.
    pub fn from_digests(sha1: &[u8], md5: &[u8], sha256: &[u8]) -> Self {
        Self {
            sha1: Some(format_digest(sha1)),
            md5: Some(format_digest(md5)),
            sha256: Some(format_digest(sha256)),
        }
    }
}

/// Aggregate hash over the app's signing certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValue {
    pub certificate_hash: i32,
}

impl CertificateValue {
    /// Wrapping product of per-signature hashes, starting from 1.
    pub fn from_signature_hashes<I>(hashes: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let certificate_hash = hashes.into_iter().fold(1i32, |acc, h| acc.wrapping_mul(h));
        Self { certificate_hash }
    }
}

/// `AB:0C:FF` style hex rendering.
pub fn format_digest(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let event = StatusEvent::snapshot(ScreenStatus::ScreenMirroring);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"screenStatus":"SCREEN_MIRRORING"}"#);

        let change = serde_json::to_value(StatusEvent::new(ScreenStatus::ScreenNormal)).unwrap();
        assert!(change.get("observedAt").is_some());

        let parsed: StatusEvent =
            serde_json::from_str(r#"{"screenStatus":"VIDEO_RECORDING_DETECTED"}"#).unwrap();
        assert_eq!(parsed.screen_status, ScreenStatus::VideoRecordingDetected);
    }

    #[test]
    fn test_status_parse_aliases() {
        assert_eq!(ScreenStatus::parse("normal"), Some(ScreenStatus::ScreenNormal));
        assert_eq!(
            ScreenStatus::parse("SCREEN_MIRRORING"),
            Some(ScreenStatus::ScreenMirroring)
        );
        assert_eq!(ScreenStatus::parse("bogus"), None);
        assert!(!ScreenStatus::ScreenNormal.is_exposed());
        assert!(ScreenStatus::VideoRecordingDetected.is_exposed());
    }

    #[test]
    fn test_digest_formatting() {
        assert_eq!(format_digest(&[0x0a, 0xff, 0x00]), "0A:FF:00");
        assert_eq!(format_digest(&[]), "");

        let fp = CertificateFingerprint::from_digests(&[1], &[2, 3], &[0xab]);
        assert_eq!(fp.md5.as_deref(), Some("02:03"));
        assert_eq!(fp.sha256.as_deref(), Some("AB"));
    }

    #[test]
    fn test_certificate_value_product() {
        assert_eq!(CertificateValue::from_signature_hashes([]).certificate_hash, 1);
        assert_eq!(
            CertificateValue::from_signature_hashes([3, -4]).certificate_hash,
            -12
        );
        let wrapped = CertificateValue::from_signature_hashes([i32::MAX, 2]);
        assert_eq!(wrapped.certificate_hash, i32::MAX.wrapping_mul(2));

        let json = serde_json::to_string(&CertificateValue { certificate_hash: 5 }).unwrap();
        assert_eq!(json, r#"{"certificateHash":5}"#);
    }
}
