// Copyright 2022, The Tremor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use base64::alphabet::STANDARD as STANDARD_ALPHABET;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
pub use base64::Engine;

/**
 * Standard alphabet, encodes with padding. Shared keys are handed out padded
 * but are sometimes pasted without it, so decoding accepts both.
 */
pub const BASE64: GeneralPurpose = GeneralPurpose::new(
    &STANDARD_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Returns true if `s` is non empty, valid base64
#[must_use]
pub fn is_valid(s: &str) -> bool {
    !s.is_empty() && BASE64.decode(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_optional_on_decode() {
        assert_eq!(BASE64.decode("c25vdA==").ok(), Some(b"snot".to_vec()));
        assert_eq!(BASE64.decode("c25vdA").ok(), Some(b"snot".to_vec()));
        assert_eq!(BASE64.encode(b"snot"), "c25vdA==");
    }

    #[test]
    fn validity() {
        assert!(is_valid("c25vdA=="));
        assert!(!is_valid(""));
        assert!(!is_valid("not base64!"));
    }
}
