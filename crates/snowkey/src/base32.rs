//! Base-32 digit tables and helpers backing the [`Key`] text codecs.
//!
//! The alphabet is Crockford-style: digits `0-9` plus 22 letters, with `I`,
//! `L`, `O` and `U` left out. Decoding is case-insensitive and folds the
//! excluded look-alikes onto the digit they resemble, so a hand-typed key
//! survives the usual transcription mistakes.
//!
//! [`Key`]: crate::Key

use crate::ParseKeyError;

pub(crate) const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const NO_VALUE: u8 = 255;
const BITS_PER_CHAR: u32 = 5;

/// Maximum number of base-32 digits in a 64-bit key: ceil(64 / 5).
pub(crate) const MAX_DIGITS: usize = 13;

/// The one separator byte accepted (and skipped) by the decoder.
pub(crate) const SEPARATOR: u8 = b'-';

/// If any of these bits are set, one more 5-bit shift would overflow.
const TOP_FIVE_BITS: u64 = 0xF800_0000_0000_0000;

/// Lookup table for base-32 decoding
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    // Main alphabet, allow lower-case
    while i < 32 {
        let c = ALPHABET[i as usize];
        lut[c as usize] = i;
        if c.is_ascii_uppercase() {
            lut[(c + 32) as usize] = i; // lowercase letter
        }
        i += 1;
    }
    // Fold the excluded look-alike letters onto their digit
    lut[b'O' as usize] = 0;
    lut[b'o' as usize] = 0;
    lut[b'I' as usize] = 1;
    lut[b'i' as usize] = 1;
    lut[b'L' as usize] = 1;
    lut[b'l' as usize] = 1;
    lut
};

/// Separator positions for [`Key::format`], indexed by group size.
///
/// Bit `k` set means a separator follows the `k + 1`-th digit, counted from
/// the most significant of the 13. Group sizes 0 and 13+ never reach this
/// table.
///
/// [`Key::format`]: crate::Key::format
pub(crate) const SEP_MASK: [u16; MAX_DIGITS] = [
    0b0000000000000, // 0  (unused sentinel)
    0b0111111111111, // 1  = "A-B-C-D-E-F-G-H-J-K-M-N-P"
    0b0010101010101, // 2  = "A-BC-DE-FG-HJ-KM-NP"
    0b0001001001001, // 3  = "A-BCD-EFG-HJK-MNP"
    0b0000100010001, // 4  = "A-BCDE-FGHJ-KMNP"
    0b0000010000100, // 5  = "ABC-DEFGH-JKMNP"
    0b0000001000001, // 6  = "A-BCDEFG-HJKMNP"
    0b0000000100000, // 7  = "ABCDEF-GHJKMNP"
    0b0000000010000, // 8  = "ABCDE-FGHJKMNP"
    0b0000000001000, // 9  = "ABCD-EFGHJKMNP"
    0b0000000000100, // 10 = "ABC-DEFGHJKMNP"
    0b0000000000010, // 11 = "AB-CDEFGHJKMNP"
    0b0000000000001, // 12 = "A-BCDEFGHJKMNP"
];

/// Encodes `value` into base-32 digits, least significant digit first.
///
/// Returns the digit buffer and the number of digits written; the zero value
/// writes no digits. Callers reverse (and optionally zero-pad) the buffer to
/// obtain the rendered form.
pub(crate) fn reverse_encode(value: u64) -> ([u8; MAX_DIGITS], usize) {
    let mut digits = [0_u8; MAX_DIGITS];
    let mut len = 0;
    let mut rest = value;
    while rest > 0 {
        digits[len] = ALPHABET[(rest & 0x1F) as usize];
        len += 1;
        rest >>= BITS_PER_CHAR;
    }
    (digits, len)
}

/// Decodes a base-32 string into the raw 64-bit value.
///
/// Interior `-` bytes are skipped; every other byte must map through
/// [`LOOKUP`]. The accumulator is checked for headroom before each shift,
/// which bounds the input length without a separate length check.
pub(crate) fn decode(s: &str) -> Result<u64, ParseKeyError> {
    let bytes = s.as_bytes();
    let mut acc = 0_u64;
    for (i, &b) in bytes.iter().enumerate() {
        if b == SEPARATOR {
            if i == 0 || i == bytes.len() - 1 {
                return Err(ParseKeyError::StraySeparator { index: i });
            }
            continue;
        }
        let val = LOOKUP[b as usize];
        if val == NO_VALUE {
            return Err(ParseKeyError::NonBase32 { byte: b, index: i });
        }
        if acc & TOP_FIVE_BITS != 0 {
            return Err(ParseKeyError::Overflow);
        }
        acc = (acc << BITS_PER_CHAR) | u64::from(val);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_lowercase_characters() {
        assert_eq!(decode("abcd123"), decode("ABCD123"));
        assert_eq!(decode("aBcD123"), decode("ABCD123"));
    }

    #[test]
    fn decode_folds_look_alike_letters() {
        let aliases = [("O", "0"), ("o", "0"), ("I", "1"), ("i", "1"), ("L", "1"), ("l", "1")];
        for (alias, canonical) in aliases {
            assert_eq!(
                decode(alias),
                decode(canonical),
                "{alias} should decode like {canonical}"
            );
        }
    }

    #[test]
    fn decode_rejects_excluded_u() {
        assert_eq!(
            decode("U"),
            Err(ParseKeyError::NonBase32 { byte: b'U', index: 0 })
        );
        assert_eq!(
            decode("u"),
            Err(ParseKeyError::NonBase32 { byte: b'u', index: 0 })
        );
    }

    #[test]
    fn decode_checks_headroom_before_each_shift() {
        // 13 digits with a leading digit above 'F' need a 65th bit
        assert_eq!(decode("G000000000000"), Err(ParseKeyError::Overflow));
        // 14 digits never fit
        assert_eq!(decode("10000000000000"), Err(ParseKeyError::Overflow));
    }

    #[test]
    fn reverse_encode_is_least_significant_first() {
        let (digits, len) = reverse_encode(3 * 32 * 32 + 2 * 32 + 1);
        assert_eq!(len, 3);
        assert_eq!(&digits[..len], b"123");
        let (_, len) = reverse_encode(0);
        assert_eq!(len, 0);
    }
}
