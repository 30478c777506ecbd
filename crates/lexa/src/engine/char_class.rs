use super::{EngineError, Matcher};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::ops::{BitOr, Not};

const CONTROL: u16 = 1 << 0;
const BLANK: u16 = 1 << 1;
const NEWLINE: u16 = 1 << 2;
const OTHER_SPACE: u16 = 1 << 3;
const LOWER: u16 = 1 << 4;
const UPPER: u16 = 1 << 5;
const DIGIT: u16 = 1 << 6;
const HEX_LOWER: u16 = 1 << 7;
const HEX_UPPER: u16 = 1 << 8;
const PUNCT: u16 = 1 << 9;
const UNDERSCORE: u16 = 1 << 10;

const fn category(c: u8) -> u16 {
    match c {
        b'\t' => CONTROL | BLANK,
        b'\n' | b'\r' => CONTROL | NEWLINE,
        0x0B | 0x0C => CONTROL | OTHER_SPACE,
        0x00..=0x1F | 0x7F => CONTROL,
        b' ' => BLANK,
        b'0'..=b'9' => DIGIT,
        b'a'..=b'f' => LOWER | HEX_LOWER,
        b'g'..=b'z' => LOWER,
        b'A'..=b'F' => UPPER | HEX_UPPER,
        b'G'..=b'Z' => UPPER,
        b'_' => PUNCT | UNDERSCORE,
        _ => PUNCT,
    }
}

const fn build_table() -> [u16; 128] {
    let mut table = [0u16; 128];
    let mut c = 0;
    while c < 128 {
        table[c] = category(c as u8);
        c += 1;
    }
    table
}

static ASCII_TABLE: [u16; 128] = build_table();

/// Predefined ASCII character classes.
///
/// Each class is a mask over one 128-entry category table, so membership is a
/// single lookup. Units outside ASCII never belong to these classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsciiClass {
    Control,
    /// Space and tab
    Blank,
    /// `\n` and `\r`
    Newline,
    /// Form feed and vertical tab
    OtherSpace,
    /// Blank, newline and other space
    Space,
    Digit,
    Lower,
    Upper,
    Alpha,
    AlphaUnderscore,
    AlphaDigit,
    /// Letters, digits and `_`
    Word,
    HexDigit,
    HexLower,
    HexUpper,
    Punct,
    /// Visible characters
    Graph,
    /// Visible characters and space
    Print,
    /// Any ASCII unit
    Char,
}

impl AsciiClass {
    const fn mask(self) -> u16 {
        match self {
            Self::Control => CONTROL,
            Self::Blank => BLANK,
            Self::Newline => NEWLINE,
            Self::OtherSpace => OTHER_SPACE,
            Self::Space => BLANK | NEWLINE | OTHER_SPACE,
            Self::Digit => DIGIT,
            Self::Lower => LOWER,
            Self::Upper => UPPER,
            Self::Alpha => LOWER | UPPER,
            Self::AlphaUnderscore => LOWER | UPPER | UNDERSCORE,
            Self::AlphaDigit => LOWER | UPPER | DIGIT,
            Self::Word => LOWER | UPPER | DIGIT | UNDERSCORE,
            Self::HexDigit => DIGIT | HEX_LOWER | HEX_UPPER,
            Self::HexLower => DIGIT | HEX_LOWER,
            Self::HexUpper => DIGIT | HEX_UPPER,
            Self::Punct => PUNCT,
            Self::Graph => LOWER | UPPER | DIGIT | PUNCT,
            Self::Print | Self::Char => 0,
        }
    }

    /// Whether the unit value is in the class
    #[inline]
    #[must_use]
    pub fn contains(self, unit: u32) -> bool {
        if unit >= 128 {
            return false;
        }
        match self {
            Self::Char => true,
            Self::Print => unit == 0x20 || ASCII_TABLE[unit as usize] & Self::Graph.mask() != 0,
            _ => ASCII_TABLE[unit as usize] & self.mask() != 0,
        }
    }

    /// Name used in error messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Control => "ASCII.control",
            Self::Blank => "ASCII.blank",
            Self::Newline => "ASCII.newline",
            Self::OtherSpace => "ASCII.other-space",
            Self::Space => "ASCII.space",
            Self::Digit => "ASCII.digit",
            Self::Lower => "ASCII.lower",
            Self::Upper => "ASCII.upper",
            Self::Alpha => "ASCII.alpha",
            Self::AlphaUnderscore => "ASCII.alpha-underscore",
            Self::AlphaDigit => "ASCII.alpha-digit",
            Self::Word => "ASCII.word",
            Self::HexDigit => "ASCII.hex-digit",
            Self::HexLower => "ASCII.hex-digit.lower",
            Self::HexUpper => "ASCII.hex-digit.upper",
            Self::Punct => "ASCII.punct",
            Self::Graph => "ASCII.graph",
            Self::Print => "ASCII.print",
            Self::Char => "ASCII",
        }
    }
}

/// Predicate over single code units.
///
/// Classes compare numeric unit values. Combine them with `|` and negate
/// them with `!`; name the result with [`CharClass::named`] to control how
/// mismatches are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    Ascii(AsciiClass),
    /// Inclusive range of unit values
    Range { low: u32, high: u32 },
    /// Explicit units, sorted for binary search
    Set(SmallVec<[u32; 8]>),
    Union(Vec<CharClass>),
    Complement(Box<CharClass>),
    /// Any single unit
    Any,
    Named {
        name: CompactString,
        class: Box<CharClass>,
    },
}

impl CharClass {
    /// Class of the units in `low..=high`
    #[must_use]
    pub fn range(low: char, high: char) -> Self {
        Self::Range {
            low: u32::from(low),
            high: u32::from(high),
        }
    }

    /// Class of exactly the given characters
    #[must_use]
    pub fn chars(chars: &str) -> Self {
        let mut set: SmallVec<[u32; 8]> = chars.chars().map(u32::from).collect();
        set.sort_unstable();
        set.dedup();
        Self::Set(set)
    }

    /// Class of a single character
    #[must_use]
    pub fn char(c: char) -> Self {
        let mut set = SmallVec::new();
        set.push(u32::from(c));
        Self::Set(set)
    }

    /// Give the class a display name for error messages
    #[must_use]
    pub fn named(self, name: impl Into<CompactString>) -> Self {
        Self::Named {
            name: name.into(),
            class: Box::new(self),
        }
    }

    /// Whether the unit value is in the class
    #[must_use]
    pub fn contains(&self, unit: u32) -> bool {
        match self {
            Self::Ascii(class) => class.contains(unit),
            Self::Range { low, high } => (*low..=*high).contains(&unit),
            Self::Set(units) => units.binary_search(&unit).is_ok(),
            Self::Union(classes) => classes.iter().any(|class| class.contains(unit)),
            Self::Complement(class) => !class.contains(unit),
            Self::Any => true,
            Self::Named { class, .. } => class.contains(unit),
        }
    }

    /// Whether the code unit is in the class
    #[inline]
    #[must_use]
    pub fn matches_unit<U: CodeUnit>(&self, unit: U) -> bool {
        self.contains(unit.to_u32())
    }

    /// Name used in char-class mismatch errors
    #[must_use]
    pub fn name(&self) -> CompactString {
        match self {
            Self::Ascii(class) => class.name().into(),
            Self::Range { low, high } => {
                let show = |u: u32| char::from_u32(u).map_or_else(|| format!("\\u{{{u:X}}}"), String::from);
                compact_str::format_compact!("{}-{}", show(*low), show(*high))
            }
            Self::Set(_) => "char-set".into(),
            Self::Union(_) => "char-union".into(),
            Self::Complement(class) => compact_str::format_compact!("complement of {}", class.name()),
            Self::Any => "code-unit".into(),
            Self::Named { name, .. } => name.clone(),
        }
    }
}

impl From<AsciiClass> for CharClass {
    fn from(class: AsciiClass) -> Self {
        Self::Ascii(class)
    }
}

impl BitOr for CharClass {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        match self {
            Self::Union(mut classes) => {
                classes.push(rhs);
                Self::Union(classes)
            }
            lhs => Self::Union(vec![lhs, rhs]),
        }
    }
}

impl Not for CharClass {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Complement(class) => *class,
            class => Self::Complement(Box::new(class)),
        }
    }
}

impl<U: CodeUnit> Matcher<U> for CharClass {
    #[inline]
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        match reader.peek() {
            Some(unit) if self.matches_unit(unit) => {
                reader.bump();
                Ok(())
            }
            Some(_) => Err(EngineError::Mismatch),
            None => Err(EngineError::UnexpectedEof),
        }
    }

    fn recover(&self, reader: &mut Reader<'_, U>, _error: EngineError) -> bool {
        if reader.is_eof() {
            return false;
        }
        reader.bump();
        true
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::expected_char_class(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_table_categories() {
        assert!(AsciiClass::Digit.contains(u32::from(b'7')));
        assert!(!AsciiClass::Digit.contains(u32::from(b'a')));
        assert!(AsciiClass::HexDigit.contains(u32::from(b'F')));
        assert!(!AsciiClass::HexLower.contains(u32::from(b'F')));
        assert!(AsciiClass::Space.contains(u32::from(b'\n')));
        assert!(AsciiClass::Word.contains(u32::from(b'_')));
        assert!(!AsciiClass::Alpha.contains(u32::from(b'_')));
        assert!(AsciiClass::Print.contains(u32::from(b' ')));
        assert!(!AsciiClass::Graph.contains(u32::from(b' ')));
        assert!(!AsciiClass::Char.contains(0xE9));
    }

    #[test]
    fn test_union_and_complement() {
        let sign = CharClass::chars("+-");
        let class = CharClass::from(AsciiClass::Digit) | sign;
        assert!(class.contains(u32::from('+')));
        assert!(class.contains(u32::from('3')));
        assert!(!class.contains(u32::from('x')));

        let not_quote = !CharClass::char('"');
        assert!(not_quote.contains(u32::from('a')));
        assert!(!not_quote.contains(u32::from('"')));
        assert_eq!(!not_quote, CharClass::char('"'));
    }

    #[test]
    fn test_matcher_consumes_one_unit() {
        let class = CharClass::range('a', 'z');
        let mut reader = Reader::from_str("ab");
        assert_eq!(class.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 1);

        let mut reader = Reader::from_str("A");
        assert_eq!(class.matches(&mut reader), Err(EngineError::Mismatch));

        let mut reader = Reader::from_str("");
        assert_eq!(class.matches(&mut reader), Err(EngineError::UnexpectedEof));
    }

    #[test]
    fn test_error_uses_name() {
        let class = CharClass::from(AsciiClass::Digit).named("decimal digit");
        let kind = Matcher::<u8>::error_kind(&class, EngineError::Mismatch);
        assert_eq!(kind, ErrorKind::expected_char_class("decimal digit"));
        assert_eq!(CharClass::range('a', 'f').name(), "a-f");
    }
}
