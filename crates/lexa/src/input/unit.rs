use std::fmt::Debug;
use std::hash::Hash;

/// A single code unit of some encoding.
///
/// The engine never decodes input on its own: character classes, literals and
/// tries compare code units by their numeric value. Decoding into text is only
/// needed when a callback turns lexemes into a `String`, which is what
/// [`CodeUnit::push_lossy`] is for.
pub trait CodeUnit: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Numeric value of the unit
    fn to_u32(self) -> u32;

    /// Unit with the given ASCII value
    fn from_ascii(byte: u8) -> Self;

    /// Append the decoded text of `units` to `out`, replacing invalid sequences.
    fn push_lossy(units: &[Self], out: &mut String);

    /// Encode a string into units of this type.
    fn encode(text: &str) -> Vec<Self>;

    /// Whether this unit is the ASCII character `c`
    #[inline]
    fn is_char(self, c: u8) -> bool {
        self.to_u32() == u32::from(c)
    }
}

impl CodeUnit for u8 {
    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        byte
    }

    fn push_lossy(units: &[Self], out: &mut String) {
        out.push_str(&String::from_utf8_lossy(units));
    }

    fn encode(text: &str) -> Vec<Self> {
        text.as_bytes().to_vec()
    }
}

impl CodeUnit for u16 {
    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        Self::from(byte)
    }

    fn push_lossy(units: &[Self], out: &mut String) {
        out.push_str(&String::from_utf16_lossy(units));
    }

    fn encode(text: &str) -> Vec<Self> {
        text.encode_utf16().collect()
    }
}

impl CodeUnit for u32 {
    #[inline]
    fn to_u32(self) -> u32 {
        self
    }

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        Self::from(byte)
    }

    fn push_lossy(units: &[Self], out: &mut String) {
        out.extend(
            units
                .iter()
                .map(|&u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER)),
        );
    }

    fn encode(text: &str) -> Vec<Self> {
        text.chars().map(Self::from).collect()
    }
}

impl CodeUnit for char {
    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline]
    fn from_ascii(byte: u8) -> Self {
        Self::from(byte)
    }

    fn push_lossy(units: &[Self], out: &mut String) {
        out.extend(units.iter());
    }

    fn encode(text: &str) -> Vec<Self> {
        text.chars().collect()
    }
}

/// Decode a span of units into an owned string
#[must_use]
pub fn units_to_string<U: CodeUnit>(units: &[U]) -> String {
    let mut out = String::with_capacity(units.len());
    U::push_lossy(units, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_round_trip_per_unit() {
        assert_eq!(units_to_string(&u8::encode("héllo")), "héllo");
        assert_eq!(units_to_string(&u16::encode("héllo")), "héllo");
        assert_eq!(units_to_string(&u32::encode("héllo")), "héllo");
        assert_eq!(units_to_string(&char::encode("héllo")), "héllo");
    }

    #[test]
    fn test_invalid_utf32_is_replaced() {
        assert_eq!(units_to_string(&[0x61_u32, 0xD800]), "a\u{FFFD}");
    }

    #[test]
    fn test_is_char() {
        assert!(b'x'.is_char(b'x'));
        assert!('x'.is_char(b'x'));
        assert!(!0x178_u16.is_char(b'x'));
    }
}
