//! Slack request signature verification (signing v0 scheme).
//!
//! The signature must be checked against the raw request bytes before the
//! JSON payload is trusted. Base string is `v0:{timestamp}:{body}`, signed
//! with HMAC-SHA256 under the app signing secret; the header carries
//! `v0=<hex digest>`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Requests older than this are treated as replays and rejected.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 60 * 5;

#[derive(Clone)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret }
    }

    /// Verify headers against the raw body, with `now` as unix seconds.
    ///
    /// Uses the mac's own constant-time comparison; any malformed input
    /// (bad hex, missing prefix, unparseable timestamp) fails closed.
    pub fn verify(&self, body: &[u8], timestamp: &str, signature: &str, now: i64) -> bool {
        let Ok(sent_at) = timestamp.trim().parse::<i64>() else {
            warn!(event_name = "slack.signature.bad_timestamp", "non-numeric request timestamp");
            return false;
        };
        if (now - sent_at).abs() > MAX_TIMESTAMP_SKEW_SECS {
            warn!(event_name = "slack.signature.stale_timestamp", "request timestamp outside replay window");
            return false;
        }

        let Some(signature_hex) = signature.strip_prefix("v0=") else {
            warn!(event_name = "slack.signature.bad_format", "signature header missing v0= prefix");
            return false;
        };
        let Ok(provided) = hex::decode(signature_hex) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.signing_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(format!("v0:{sent_at}:").as_bytes());
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    }
}
