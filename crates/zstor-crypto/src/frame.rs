//! On-disk frame: a fixed 16-byte ASCII preamble followed by the ciphertext
//!
//! ```text
//! [0..8)   format/version tag, ASCII "10000000"
//! [8..16)  CRC32 (IEEE) of the ciphertext, 8 lowercase ASCII hex digits
//! [16..)   ciphertext
//! ```
//!
//! Older writers did not zero-pad the checksum and NUL-terminated it instead,
//! so the parser accepts any 1-8 hex digits followed by a NUL.

use zstor_core::{ZstorError, ZstorResult};

/// Format/version tag written at the start of every frame
pub const FORMAT_TAG: &[u8; 8] = b"10000000";

/// Length of the tag + checksum preamble
pub const PREAMBLE_LEN: usize = 16;

/// Encapsulate `ciphertext` in a frame.
pub fn build(ciphertext: &[u8]) -> Vec<u8> {
    let checksum = crc32fast::hash(ciphertext);

    let mut frame = Vec::with_capacity(PREAMBLE_LEN + ciphertext.len());
    frame.extend_from_slice(FORMAT_TAG);
    frame.extend_from_slice(format!("{checksum:08x}").as_bytes());
    frame.extend_from_slice(ciphertext);
    frame
}

/// A parsed view over frame bytes
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    checksum: u32,
    ciphertext: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Split a frame into its recorded checksum and ciphertext.
    pub fn parse(bytes: &'a [u8]) -> ZstorResult<Self> {
        if bytes.len() < PREAMBLE_LEN {
            return Err(ZstorError::CorruptData(format!(
                "frame too short: {} bytes (minimum {PREAMBLE_LEN})",
                bytes.len()
            )));
        }

        let (preamble, ciphertext) = bytes.split_at(PREAMBLE_LEN);
        let (tag, checksum_field) = preamble.split_at(FORMAT_TAG.len());

        if tag != FORMAT_TAG {
            return Err(ZstorError::CorruptData(format!(
                "unsupported frame tag {:?}",
                String::from_utf8_lossy(tag)
            )));
        }

        Ok(Self {
            checksum: parse_checksum(checksum_field)?,
            ciphertext,
        })
    }

    pub fn ciphertext(&self) -> &'a [u8] {
        self.ciphertext
    }

    /// Checksum recorded in the preamble
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Checksum of the ciphertext as it is now
    pub fn computed_checksum(&self) -> u32 {
        crc32fast::hash(self.ciphertext)
    }

    /// Fail with `CorruptData` if the ciphertext does not match its CRC32.
    pub fn verify_checksum(&self) -> ZstorResult<()> {
        let actual = self.computed_checksum();
        if actual != self.checksum {
            return Err(ZstorError::CorruptData(format!(
                "frame checksum mismatch: recorded {:08x}, computed {actual:08x}",
                self.checksum
            )));
        }
        Ok(())
    }
}

fn parse_checksum(field: &[u8]) -> ZstorResult<u32> {
    let digits = match field.iter().position(|&b| b == 0) {
        Some(nul) => &field[..nul],
        None => field,
    };

    std::str::from_utf8(digits)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit()))
        .and_then(|s| u32::from_str_radix(s, 16).ok())
        .ok_or_else(|| {
            ZstorError::CorruptData(format!(
                "malformed frame checksum {:?}",
                String::from_utf8_lossy(field)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_byte_exact() {
        let ct = b"ciphertext bytes";
        let frame = build(ct);

        assert_eq!(frame.len(), ct.len() + PREAMBLE_LEN);
        assert_eq!(&frame[..8], b"10000000");
        assert_eq!(
            &frame[8..16],
            format!("{:08x}", crc32fast::hash(ct)).as_bytes()
        );
        assert_eq!(&frame[16..], ct);
    }

    #[test]
    fn small_checksums_are_zero_padded() {
        // CRC32 of the empty input is 0
        let frame = build(b"");
        assert_eq!(&frame[..], b"1000000000000000");
        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.checksum(), 0);
        assert!(parsed.ciphertext().is_empty());
    }

    #[test]
    fn parse_roundtrip_and_verify() {
        let frame = build(b"payload");
        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.ciphertext(), b"payload");
        assert_eq!(parsed.checksum(), crc32fast::hash(b"payload"));
        parsed.verify_checksum().unwrap();
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let mut frame = build(b"payload");
        frame[PREAMBLE_LEN] ^= 0x01;
        let err = Frame::parse(&frame).unwrap().verify_checksum().unwrap_err();
        assert!(matches!(err, ZstorError::CorruptData(_)));
    }

    #[test]
    fn legacy_unpadded_checksum_is_accepted() {
        let mut frame = b"10000000".to_vec();
        frame.extend_from_slice(b"1a2b\0\x7f\x7f\x7f");
        frame.extend_from_slice(b"ct");

        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.checksum(), 0x1a2b);
        assert_eq!(parsed.ciphertext(), b"ct");
    }

    #[test]
    fn short_frame_is_corrupt() {
        assert!(matches!(
            Frame::parse(b"10000000").unwrap_err(),
            ZstorError::CorruptData(_)
        ));
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let mut frame = build(b"x");
        frame[0] = b'2';
        assert!(Frame::parse(&frame)
            .unwrap_err()
            .to_string()
            .contains("unsupported frame tag"));
    }

    #[test]
    fn non_hex_checksum_is_corrupt() {
        let mut frame = build(b"x");
        frame[8] = b'z';
        assert!(Frame::parse(&frame)
            .unwrap_err()
            .to_string()
            .contains("malformed frame checksum"));
    }
}
