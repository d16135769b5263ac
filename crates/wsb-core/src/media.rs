//! Media download with a bounded wait, normalized into a [`MediaPayload`].

use std::{future::Future, time::Duration};

use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine as _,
};

use crate::{
    config::BotSettings,
    transport::types::{MediaPayload, RawMedia},
};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Standard alphabet; padding and trailing bits are not enforced on decode.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Failures of the sticker media pipeline (download, decode, normalize).
///
/// The dispatcher matches on this exhaustively to pick the user-facing reply.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Timeout download media")]
    Timeout,

    #[error("Data media kosong")]
    EmptyMedia,

    #[error("Buffer gambar kosong")]
    EmptyBuffer,

    #[error("Data media tidak valid: {0}")]
    InvalidData(String),

    #[error("Ukuran gambar terlalu besar ({size_mib:.2}MB). Maksimal 8MB.")]
    Oversize { size_mib: f64 },

    #[error("Format gambar tidak didukung: {0}")]
    UnsupportedFormat(String),

    #[error("Gagal membuat sticker: {0}")]
    Encode(String),

    #[error("{0}")]
    Transport(String),
}

/// Whether the decoded-size ceiling applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeCheck {
    /// Freshly downloaded image for a new sticker.
    Enforce,
    /// Existing sticker being relabelled.
    Skip,
}

#[derive(Clone, Copy, Debug)]
pub struct MediaFetcher {
    timeout: Duration,
    max_size: usize,
}

impl MediaFetcher {
    pub fn new(timeout: Duration, max_size: usize) -> Self {
        Self { timeout, max_size }
    }

    pub fn from_settings(settings: &BotSettings) -> Self {
        Self::new(settings.download_timeout, settings.max_file_size)
    }

    /// Await `download` for at most the configured timeout and decode the result.
    ///
    /// Timing out drops the download future; whatever the transport does with
    /// the underlying request is up to it.
    pub async fn fetch<F>(&self, download: F, check: SizeCheck) -> Result<MediaPayload, MediaError>
    where
        F: Future<Output = crate::Result<Option<RawMedia>>>,
    {
        let raw = tokio::time::timeout(self.timeout, download)
            .await
            .map_err(|_| MediaError::Timeout)?
            .map_err(|e| MediaError::Transport(e.to_string()))?
            .ok_or(MediaError::EmptyMedia)?;

        self.decode(&raw, check)
    }

    fn decode(&self, raw: &RawMedia, check: SizeCheck) -> Result<MediaPayload, MediaError> {
        let encoded = raw.encoded().ok_or(MediaError::EmptyMedia)?;

        if check == SizeCheck::Enforce {
            let estimated = estimated_decoded_size(encoded.len());
            if estimated > self.max_size as f64 {
                return Err(MediaError::Oversize {
                    size_mib: estimated / BYTES_PER_MIB,
                });
            }
        }

        // Payloads may arrive line-wrapped.
        let compact: Vec<u8> = encoded
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let bytes = LENIENT_BASE64
            .decode(compact)
            .map_err(|e| MediaError::InvalidData(e.to_string()))?;
        if bytes.is_empty() {
            return Err(MediaError::EmptyBuffer);
        }

        Ok(MediaPayload {
            mimetype: raw
                .mimetype
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            bytes,
            filename: raw.filename.clone().unwrap_or_default(),
        })
    }
}

/// Decoded size implied by a base64 length (`len * 3 / 4`), not rounded.
pub fn estimated_decoded_size(encoded_len: usize) -> f64 {
    encoded_len as f64 * 3.0 / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn fetcher() -> MediaFetcher {
        MediaFetcher::from_settings(&BotSettings::default())
    }

    fn raw(data: Option<&str>, alt: Option<&str>) -> RawMedia {
        RawMedia {
            mimetype: Some("image/jpeg".to_string()),
            data: data.map(str::to_string),
            media_base64: alt.map(str::to_string),
            filename: None,
        }
    }

    #[tokio::test]
    async fn decodes_either_payload_field() {
        let f = fetcher();
        let a = f
            .fetch(async { Ok(Some(raw(Some("aGVsbG8="), None))) }, SizeCheck::Enforce)
            .await
            .unwrap();
        assert_eq!(a.bytes, b"hello");
        assert_eq!(a.mimetype, "image/jpeg");

        let b = f
            .fetch(async { Ok(Some(raw(None, Some("aGk=")))) }, SizeCheck::Skip)
            .await
            .unwrap();
        assert_eq!(b.bytes, b"hi");
    }

    #[tokio::test]
    async fn missing_media_and_missing_fields_are_empty_media() {
        let f = fetcher();
        let none = f.fetch(async { Ok(None) }, SizeCheck::Enforce).await;
        assert!(matches!(none, Err(MediaError::EmptyMedia)));

        let blank = f
            .fetch(async { Ok(Some(raw(Some(""), None))) }, SizeCheck::Enforce)
            .await;
        assert!(matches!(blank, Err(MediaError::EmptyMedia)));
    }

    #[tokio::test]
    async fn whitespace_payload_is_empty_buffer() {
        let res = fetcher()
            .fetch(async { Ok(Some(raw(Some("   "), None))) }, SizeCheck::Skip)
            .await;
        assert!(matches!(res, Err(MediaError::EmptyBuffer)));
    }

    #[tokio::test]
    async fn malformed_base64_is_invalid_data() {
        let res = fetcher()
            .fetch(async { Ok(Some(raw(Some("@@not base64@@"), None))) }, SizeCheck::Skip)
            .await;
        assert!(matches!(res, Err(MediaError::InvalidData(_))));
    }

    #[tokio::test]
    async fn oversize_is_rejected_before_decoding() {
        // 12 MiB of encoded '@' would fail base64 decoding; Oversize proves the
        // size check ran first.
        let encoded = "@".repeat(12 * 1024 * 1024);
        let res = fetcher()
            .fetch(async move { Ok(Some(raw(Some(&encoded), None))) }, SizeCheck::Enforce)
            .await;
        let err = res.unwrap_err();
        assert!(matches!(err, MediaError::Oversize { .. }));
        assert_eq!(
            err.to_string(),
            "Ukuran gambar terlalu besar (9.00MB). Maksimal 8MB."
        );
    }

    #[tokio::test]
    async fn fractional_estimate_over_the_limit_is_rejected() {
        // 11_184_811 * 3 / 4 = 8_388_608.25, a quarter byte over 8 MiB.
        let encoded = "A".repeat(11_184_811);
        let err = fetcher()
            .fetch(async move { Ok(Some(raw(Some(&encoded), None))) }, SizeCheck::Enforce)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Oversize { .. }), "{err:?}");
        assert!(err.to_string().contains("(8.00MB)"));

        // One character less estimates 8_388_607.5 bytes and is decoded.
        let encoded = "A".repeat(11_184_810);
        let ok = fetcher()
            .fetch(async move { Ok(Some(raw(Some(&encoded), None))) }, SizeCheck::Enforce)
            .await
            .unwrap();
        assert_eq!(ok.bytes.len(), 8_388_607);
    }

    #[tokio::test]
    async fn unpadded_and_wrapped_payloads_decode() {
        let f = fetcher();
        let unpadded = f
            .fetch(async { Ok(Some(raw(Some("aGVsbG8"), None))) }, SizeCheck::Enforce)
            .await
            .unwrap();
        assert_eq!(unpadded.bytes, b"hello");

        let wrapped = f
            .fetch(
                async { Ok(Some(raw(Some("aGVs\nbG8=\r\n"), None))) },
                SizeCheck::Enforce,
            )
            .await
            .unwrap();
        assert_eq!(wrapped.bytes, b"hello");
    }

    #[tokio::test]
    async fn size_check_skipped_on_rename_path() {
        let encoded = BASE64.encode(vec![1u8; 9 * 1024 * 1024]);
        let res = fetcher()
            .fetch(async move { Ok(Some(raw(Some(&encoded), None))) }, SizeCheck::Skip)
            .await
            .unwrap();
        assert_eq!(res.bytes.len(), 9 * 1024 * 1024);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_download_times_out() {
        let res = fetcher()
            .fetch(std::future::pending(), SizeCheck::Enforce)
            .await;
        assert!(matches!(res, Err(MediaError::Timeout)));
    }

    #[tokio::test]
    async fn transport_error_is_surfaced() {
        let res = fetcher()
            .fetch(
                async { Err(Error::Transport("bridge down".to_string())) },
                SizeCheck::Enforce,
            )
            .await;
        match res {
            Err(MediaError::Transport(msg)) => assert!(msg.contains("bridge down")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn size_estimate() {
        assert_eq!(estimated_decoded_size(8), 6.0);
        assert_eq!(estimated_decoded_size(0), 0.0);
        assert_eq!(estimated_decoded_size(11_184_811), 8_388_608.25);
    }
}
