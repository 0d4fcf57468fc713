pub mod codec;
pub mod firestore;
pub mod rtdb;

pub use firestore::FirestoreClient;
pub use rtdb::RealtimeClient;

use crate::errors::MillError;
use rand::Rng;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("millbook/", env!("CARGO_PKG_VERSION"));

const MAX_ATTEMPTS: u64 = 3;
const MAX_BACKOFF_MS: u64 = 2_000;
const JITTER_MAX_MS: u64 = 250;

/// Run a read, retrying while the failure is transient (network, 429, 5xx).
pub(crate) fn with_retry<T>(
    context: &str,
    mut call: impl FnMut() -> Result<T, MillError>,
) -> Result<T, MillError> {
    let mut attempt = 1;
    loop {
        match call() {
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                log::warn!("{context}: attempt {attempt} failed: {e}");

                let base = std::cmp::min(500 * attempt, MAX_BACKOFF_MS);
                let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
                std::thread::sleep(Duration::from_millis(base + jitter));
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Read the body and turn non-success statuses into errors.
/// 401/403 are permission failures; the body is kept for the message.
pub(crate) fn check_status(resp: Response, context: &str) -> Result<String, MillError> {
    let status = resp.status();
    let text = resp.text()?;

    match status {
        s if s.is_success() => Ok(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(MillError::PermissionDenied(format!("{context}: {text}")))
        }
        StatusCode::NOT_FOUND => Err(MillError::NotFound(context.to_string())),
        s => Err(MillError::Backend {
            status: s.as_u16(),
            body: text,
        }),
    }
}
