//! Recovers the login table a panel embeds in its `fulldata.dat` telemetry.
//!
//! Past a firmware-dependent offset the device writes each stored login as a
//! base64 `user:pass` token, opened by a `0x0C` byte and closed by `0x03`.
//! Everything else in the stream is opaque binary, so every candidate token
//! is checked for size, encoding and separator before it is accepted.

use crate::constants::scan as scan_constants;
use crate::models::Credential;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Scans `payload` and returns every credential found, in payload order.
/// Never fails: malformed data yields an empty or partial list.
pub fn extract_credentials(payload: &[u8]) -> Vec<Credential> {
    let mut found = Vec::new();
    let mut in_data = false;
    let mut token: Vec<u8> = Vec::new();
    let mut rejections = 0usize;

    for (offset, &byte) in payload.iter().enumerate() {
        if offset > scan_constants::MAX_SCAN_OFFSET
            || rejections >= scan_constants::MAX_REJECTIONS
            || found.len() >= scan_constants::MAX_CREDENTIALS
        {
            break;
        }

        if !in_data {
            if byte == scan_constants::SENTINEL_BYTE
                && offset > scan_constants::DATA_START_MIN_OFFSET
            {
                in_data = true;
            }
            continue;
        }

        if byte != scan_constants::TERMINATOR_BYTE {
            token.push(byte);
            continue;
        }

        match decode_token(&token) {
            Some(credential) => {
                found.push(credential);
                rejections = 0;
            }
            None => rejections += 1,
        }
        token.clear();
    }

    found
}

fn decode_token(token: &[u8]) -> Option<Credential> {
    if token.len() < scan_constants::MIN_TOKEN_LEN || token.len() > scan_constants::MAX_TOKEN_LEN {
        return None;
    }
    if !token.is_ascii() {
        return None;
    }
    let decoded = TOKEN_ENGINE.decode(token).ok()?;
    let login = String::from_utf8_lossy(&decoded);
    if login == ":" {
        return None;
    }
    let (username, password) = login.split_once(':')?;
    Some(Credential::new(username, password))
}
