use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{Result, SafelizaSdkError};

/// Unpadded base64url, as WebAuthn payloads are exchanged.
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url with or without trailing padding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let decoded = if trimmed.ends_with('=') {
        URL_SAFE.decode(trimmed)
    } else {
        URL_SAFE_NO_PAD.decode(trimmed)
    };
    decoded.map_err(|e| SafelizaSdkError::InvalidResponse(format!("bad base64url: {}", e)))
}

/// Lock a mutex whose guarded data stays consistent even if a holder
/// panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_and_unpadded() {
        assert_eq!(base64url_decode("AQI").unwrap(), vec![1, 2]);
        assert_eq!(base64url_decode("AQI=").unwrap(), vec![1, 2]);
    }

    #[test]
    fn rejects_standard_alphabet() {
        assert!(base64url_decode("+/8").is_err());
    }

    #[test]
    fn encode_is_url_safe() {
        assert_eq!(base64url_encode(&[0xfb, 0xff]), "-_8");
    }
}
