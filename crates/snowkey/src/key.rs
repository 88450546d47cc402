use crate::base32::{self, MAX_DIGITS};
use crate::time::KEY_EPOCH;
use crate::ParseKeyError;
use core::fmt;
use core::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of bits holding the millisecond timestamp offset.
pub const TIMESTAMP_BITS: u32 = 42;

/// Number of bits shared by the application discriminator and the sequence
/// counter.
pub const APP_SEQ_BITS: u32 = 22;

/// Maximum number of bits a [`Generator`] may reserve for the application
/// discriminator. At least two bits always remain for the sequence counter.
///
/// [`Generator`]: crate::Generator
pub const MAX_APP_BITS: u32 = 20;

/// Largest timestamp offset representable in [`TIMESTAMP_BITS`].
pub(crate) const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Mask selecting the discriminator + sequence bits of a key.
pub(crate) const APP_SEQ_MASK: u64 = (1 << APP_SEQ_BITS) - 1;

/// A 64-bit, time-ordered unique key.
///
/// Bits, from most to least significant:
///
/// - 42-bit millisecond timestamp, counted from [`KEY_EPOCH`]
///   (2024-06-01T00:00:00Z), which bounds the usable range to the year 2163.
/// - 22 bits split between an application-chosen discriminator (0–20 bits,
///   e.g. a table or node number) and a per-millisecond sequence counter
///   (the remaining 2–22 bits).
///
/// The split is fixed per [`Generator`]; the key itself does not record it,
/// so the width-dependent accessors live on the generator. Keys from one
/// generator sort by creation order, which makes them suitable as database
/// primary keys or URI elements.
///
/// The canonical text form ([`Display`]) is the shortest base-32 rendering;
/// [`Key::format`] produces the fixed-width grouped form and [`Key::parse`]
/// accepts both, case-insensitively, with look-alike letters folded onto
/// their digit.
///
/// # Example
///
/// ```
/// use snowkey::{Generator, Key};
///
/// let generator = Generator::new(0);
/// let key = generator.create(0);
/// assert!(key.is_valid());
///
/// let text = key.to_string();
/// assert_eq!(Key::parse(&text), Ok(key));
/// ```
///
/// [`Display`]: core::fmt::Display
/// [`KEY_EPOCH`]: crate::KEY_EPOCH
/// [`Generator`]: crate::Generator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u64);

impl Key {
    /// The all-zero key. Any key with value 0 is considered invalid, every
    /// other value valid.
    pub const INVALID: Key = Key(0);

    /// Converts a raw `u64` into a key.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Converts this key into its raw `u64` representation.
    pub const fn to_raw(&self) -> u64 {
        self.0
    }

    /// Returns true if the key is definitely an invalid key.
    pub const fn is_invalid(&self) -> bool {
        self.0 == Self::INVALID.0
    }

    /// Returns true if the key is definitely a valid key.
    pub const fn is_valid(&self) -> bool {
        !self.is_invalid()
    }

    /// Returns the key's timestamp as milliseconds since [`KEY_EPOCH`].
    ///
    /// [`KEY_EPOCH`]: crate::KEY_EPOCH
    pub const fn timestamp_millis(&self) -> u64 {
        self.0 >> APP_SEQ_BITS
    }

    /// Returns the point in time at which the key was generated.
    pub fn time(&self) -> SystemTime {
        UNIX_EPOCH + KEY_EPOCH + Duration::from_millis(self.timestamp_millis())
    }

    /// Parses the text form of a key.
    ///
    /// Accepts a superset of what [`Display`] and [`Key::format`] emit:
    /// decoding is case-insensitive, `O`/`o` decode as `0`, `I`/`i`/`L`/`l`
    /// decode as `1`, and interior `-` separators are skipped. The empty
    /// string decodes to [`Key::INVALID`].
    ///
    /// # Errors
    ///
    /// - [`ParseKeyError::NonBase32`] for a byte outside the accepted set.
    /// - [`ParseKeyError::Overflow`] if the input encodes more than 64 bits.
    /// - [`ParseKeyError::StraySeparator`] for a leading or trailing `-`.
    ///
    /// # Example
    ///
    /// ```
    /// use snowkey::Key;
    ///
    /// let key = Key::parse("0-0000-0000-0000").unwrap();
    /// assert!(key.is_invalid());
    ///
    /// // Look-alike letters fold onto their digit
    /// assert_eq!(Key::parse("1O"), Key::parse("10"));
    /// ```
    ///
    /// [`Display`]: core::fmt::Display
    pub fn parse(s: &str) -> Result<Self, ParseKeyError> {
        base32::decode(s).map(Self)
    }

    /// Parses the text form of a key, panicking if that is not possible.
    ///
    /// Use only where the input is statically known to be valid; everywhere
    /// else prefer [`Key::parse`].
    ///
    /// # Panics
    ///
    /// Panics if the input fails to decode.
    pub fn must_parse(s: &str) -> Self {
        match Self::parse(s) {
            Ok(key) => key,
            Err(err) => panic!("key {s:?} failed to parse: {err}"),
        }
    }

    /// Renders all 13 base-32 digits of the key, zero-padded, with `sep`
    /// inserted after groups of `group_size` digits counted from the most
    /// significant digit.
    ///
    /// A `group_size` of 0 is treated as 1. If `sep` is empty, or
    /// `group_size` leaves no digit ungrouped (13 or more), the result is
    /// the plain 13-digit string.
    ///
    /// If `sep` itself contains base-32 digit characters the result can no
    /// longer be split back apart; [`Key::parse`] only skips `-`.
    ///
    /// # Example
    ///
    /// ```
    /// use snowkey::Key;
    ///
    /// assert_eq!(Key::INVALID.format(4, "-"), "0-0000-0000-0000");
    /// assert_eq!(Key::INVALID.format(4, ""), "0000000000000");
    /// ```
    pub fn format(&self, group_size: usize, sep: &str) -> String {
        let group_size = group_size.max(1);
        let (mut digits, len) = base32::reverse_encode(self.0);
        for digit in digits.iter_mut().skip(len) {
            *digit = b'0';
        }

        let mut out = String::with_capacity(MAX_DIGITS + sep.len() * (MAX_DIGITS - 1));
        if sep.is_empty() || group_size >= MAX_DIGITS {
            out.extend(digits.iter().rev().map(|&d| d as char));
            return out;
        }

        let mut mask = base32::SEP_MASK[group_size];
        for &digit in digits.iter().rev() {
            out.push(digit as char);
            if mask & 1 == 1 {
                out.push_str(sep);
            }
            mask >>= 1;
        }
        out
    }
}

/// The canonical text form: the shortest base-32 rendering, at most 13
/// characters, with no leading zero digits. The zero key renders as `"0"`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0");
        }
        let (digits, len) = base32::reverse_encode(self.0);
        let mut out = [0_u8; MAX_DIGITS];
        for (i, slot) in out[..len].iter_mut().enumerate() {
            *slot = digits[len - 1 - i];
        }
        // SAFETY: the base-32 alphabet is ASCII, so the buffer is valid UTF-8.
        f.write_str(unsafe { core::str::from_utf8_unchecked(&out[..len]) })
    }
}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for Key {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Key> for u64 {
    fn from(key: Key) -> Self {
        key.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_roundtrip(key: Key) {
        let text = key.to_string();
        assert_eq!(Key::parse(&text), Ok(key), "roundtrip through {text:?}");
    }

    #[test]
    fn string_is_shortest_form() {
        let testcases = [
            (0, "0"),
            (1, "1"),
            (31, "Z"),
            (32, "10"),
            (0xFFFF_FFFF_FFFF_FFFF, "FZZZZZZZZZZZZ"),
        ];
        for (raw, expected) in testcases {
            let key = Key::from_raw(raw);
            assert_eq!(key.to_string(), expected);
            check_roundtrip(key);
        }
    }

    #[test]
    fn format_groups_from_most_significant_digit() {
        // Renders as "ABCDEFGHJKMNP", one of each letter digit
        const ALPHA: Key = Key(11_939_515_935_325_016_758);

        let testcases = [
            (Key::INVALID, 14, "-", "0000000000000"),
            (Key::INVALID, 13, "-", "0000000000000"),
            (Key::INVALID, 0, "-", "0-0-0-0-0-0-0-0-0-0-0-0-0"),
            (Key::INVALID, 2, "", "0000000000000"),
            (Key::from_raw(u64::MAX), 14, "-", "FZZZZZZZZZZZZ"),
            (ALPHA, 14, "-", "ABCDEFGHJKMNP"),
            (ALPHA, 1, "-", "A-B-C-D-E-F-G-H-J-K-M-N-P"),
            (ALPHA, 2, "-", "A-BC-DE-FG-HJ-KM-NP"),
            (ALPHA, 3, "-", "A-BCD-EFG-HJK-MNP"),
            (ALPHA, 4, "-", "A-BCDE-FGHJ-KMNP"),
            (ALPHA, 5, "-", "ABC-DEFGH-JKMNP"),
            (ALPHA, 6, "-", "A-BCDEFG-HJKMNP"),
            (ALPHA, 7, "-", "ABCDEF-GHJKMNP"),
            (ALPHA, 8, "-", "ABCDE-FGHJKMNP"),
            (ALPHA, 9, "-", "ABCD-EFGHJKMNP"),
            (ALPHA, 10, "-", "ABC-DEFGHJKMNP"),
            (ALPHA, 11, "-", "AB-CDEFGHJKMNP"),
            (ALPHA, 12, "-", "A-BCDEFGHJKMNP"),
            (ALPHA, 13, "-", "ABCDEFGHJKMNP"),
            (ALPHA, 4, "", "ABCDEFGHJKMNP"),
            (ALPHA, 4, "//", "A//BCDE//FGHJ//KMNP"),
        ];
        for (key, size, sep, expected) in testcases {
            assert_eq!(key.format(size, sep), expected, "format({size}, {sep:?})");
        }
    }

    #[test]
    fn format_roundtrips_after_separator_removal() {
        let key = Key::from_raw(507_945_423_712_181_285);
        for group_size in 0..16 {
            let formatted = key.format(group_size, "-");
            assert_eq!(Key::parse(&formatted.replace('-', "")), Ok(key));
        }
    }

    #[test]
    fn parse_accepts_known_values() {
        let testcases = [
            ("", 0),
            ("0000000000000", 0),
            ("00-000-000-00-000", 0),
            ("000-000-000-00-00", 0),
            ("0-00-0-0-0-0-0-0-0-0-0-0", 0),
            ("0000000000001", 1),
            ("0E34NNFRTCQ15", 507_945_423_712_181_285),
            ("0DXZBE2D7TB04", 502_128_752_335_858_692),
            ("FZZZZZZZZZZZZ", u64::MAX),
            ("F-zz-ZZZZZZZZ-zz", u64::MAX),
        ];
        for (input, expected) in testcases {
            let key = Key::parse(input).unwrap_or_else(|err| panic!("parse({input:?}): {err}"));
            assert_eq!(key.to_raw(), expected, "parse({input:?})");
            check_roundtrip(key);
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        let testcases = [
            ("-0000000000000", ParseKeyError::StraySeparator { index: 0 }),
            ("0000000000000-", ParseKeyError::StraySeparator { index: 13 }),
            ("0DXZBE2D7<>04", ParseKeyError::NonBase32 { byte: b'<', index: 9 }),
            ("1DXZBE2D7TB040", ParseKeyError::Overflow),
        ];
        for (input, expected) in testcases {
            assert_eq!(Key::parse(input), Err(expected), "parse({input:?})");
        }
    }

    #[test]
    fn parse_folds_typo_variants_to_the_same_key() {
        let canonical = Key::must_parse("1J0");
        for variant in ["1j0", "Ij0", "lJO", "IJO", "ij0"] {
            assert_eq!(Key::parse(variant), Ok(canonical), "variant {variant:?}");
        }
    }

    #[test]
    fn from_str_matches_parse() {
        let key: Key = "0E34NNFRTCQ15".parse().unwrap();
        assert_eq!(key.to_raw(), 507_945_423_712_181_285);
        assert!("0E34NNFRTCQ15X0".parse::<Key>().is_err());
    }

    #[test]
    fn must_parse_returns_the_key() {
        assert_eq!(Key::must_parse("0000000000000"), Key::INVALID);
    }

    #[test]
    #[should_panic(expected = "failed to parse")]
    fn must_parse_panics_on_malformed_input() {
        let _ = Key::must_parse("-1");
    }

    #[test]
    fn time_recovers_the_embedded_timestamp() {
        let offset = 123_456_789;
        let key = Key::from_raw(offset << APP_SEQ_BITS | 42);
        assert_eq!(key.timestamp_millis(), offset);
        assert_eq!(
            key.time(),
            UNIX_EPOCH + KEY_EPOCH + Duration::from_millis(offset)
        );
    }

    #[test]
    fn default_key_is_invalid() {
        let key = Key::default();
        assert!(key.is_invalid());
        assert!(!key.is_valid());
        assert_eq!(key, Key::INVALID);
        assert!(Key::from_raw(1).is_valid());
    }

    #[test]
    fn raw_conversions_are_lossless() {
        let key = Key::from(0xDEAD_BEEF_u64);
        assert_eq!(u64::from(key), 0xDEAD_BEEF);
        assert_eq!(key, Key::from_raw(key.to_raw()));
    }
}
