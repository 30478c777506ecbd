use super::{CharClass, EngineError, Matcher};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader};

/// Numeric base of a digit run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radix {
    Binary,
    Octal,
    #[default]
    Decimal,
    /// Hex digits in either case
    Hex,
    HexLower,
    HexUpper,
}

impl Radix {
    #[must_use]
    pub const fn base(self) -> u32 {
        match self {
            Self::Binary => 2,
            Self::Octal => 8,
            Self::Decimal => 10,
            Self::Hex | Self::HexLower | Self::HexUpper => 16,
        }
    }

    /// Value of a digit unit in this radix
    #[inline]
    #[must_use]
    pub const fn digit_value(self, unit: u32) -> Option<u32> {
        let value = match unit {
            0x30..=0x39 => unit - 0x30,
            0x61..=0x66 if !matches!(self, Self::HexUpper) => unit - 0x61 + 10,
            0x41..=0x46 if !matches!(self, Self::HexLower) => unit - 0x41 + 10,
            _ => return None,
        };
        if value < self.base() { Some(value) } else { None }
    }

    /// Name used in error messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "digit.binary",
            Self::Octal => "digit.octal",
            Self::Decimal => "digit.decimal",
            Self::Hex => "digit.hex",
            Self::HexLower => "digit.hex-lower",
            Self::HexUpper => "digit.hex-upper",
        }
    }
}

/// One or more digits.
///
/// In trimmed mode a leading `0` must stand alone: `"0"` and `"0x"` match the
/// zero, `"007"` fails with [`EngineError::LeadingZero`] after the first unit.
/// With a separator class, every separator needs a digit directly before and
/// after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digits {
    radix: Radix,
    trimmed: bool,
    separator: Option<CharClass>,
}

impl Digits {
    #[must_use]
    pub const fn new(radix: Radix) -> Self {
        Self {
            radix,
            trimmed: false,
            separator: None,
        }
    }

    /// Forbid leading zeroes
    #[must_use]
    pub const fn trimmed(mut self) -> Self {
        self.trimmed = true;
        self
    }

    /// Allow digit separators such as `'` or `_`
    #[must_use]
    pub fn separator(mut self, separator: CharClass) -> Self {
        self.separator = Some(separator);
        self
    }

    #[must_use]
    pub const fn radix(&self) -> Radix {
        self.radix
    }

    fn is_digit<U: CodeUnit>(&self, unit: Option<U>) -> bool {
        unit.is_some_and(|u| self.radix.digit_value(u.to_u32()).is_some())
    }

    fn is_separator<U: CodeUnit>(&self, unit: Option<U>) -> bool {
        match (&self.separator, unit) {
            (Some(class), Some(u)) => class.matches_unit(u),
            _ => false,
        }
    }
}

impl<U: CodeUnit> Matcher<U> for Digits {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        let first = reader.peek();
        if !self.is_digit(first) {
            return Err(EngineError::ExpectedDigit);
        }
        reader.bump();

        if self.trimmed && first.is_some_and(|u| u.is_char(b'0')) {
            let next = reader.peek();
            if self.is_digit(next) || self.is_separator(next) {
                return Err(EngineError::LeadingZero);
            }
            return Ok(());
        }

        loop {
            let next = reader.peek();
            if self.is_separator(next) {
                reader.bump();
                if !self.is_digit(reader.peek()) {
                    return Err(EngineError::MissingSeparatorDigit);
                }
            } else if !self.is_digit(next) {
                return Ok(());
            }
            reader.bump();
        }
    }

    fn recover(&self, reader: &mut Reader<'_, U>, _error: EngineError) -> bool {
        let start = reader.position();
        while self.is_digit(reader.peek()) || self.is_separator(reader.peek()) {
            reader.bump();
        }
        reader.position() > start
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        match error {
            EngineError::LeadingZero => ErrorKind::ForbiddenLeadingZero,
            _ => ErrorKind::ExpectedDigit,
        }
    }
}

/// Exactly `count` digits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NDigits {
    radix: Radix,
    count: usize,
}

impl NDigits {
    #[must_use]
    pub const fn new(radix: Radix, count: usize) -> Self {
        Self { radix, count }
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn radix(&self) -> Radix {
        self.radix
    }
}

impl<U: CodeUnit> Matcher<U> for NDigits {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        for _ in 0..self.count {
            match reader.peek() {
                Some(unit) if self.radix.digit_value(unit.to_u32()).is_some() => reader.bump(),
                Some(_) => return Err(EngineError::ExpectedDigit),
                None => return Err(EngineError::UnexpectedEof),
            }
        }
        Ok(())
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::ExpectedDigit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(digits: &Digits, input: &str) -> (Result<(), EngineError>, usize) {
        let mut reader = Reader::from_str(input);
        let result = digits.matches(&mut reader);
        (result, reader.position())
    }

    #[test]
    fn test_digit_values() {
        assert_eq!(Radix::Hex.digit_value(u32::from(b'f')), Some(15));
        assert_eq!(Radix::HexUpper.digit_value(u32::from(b'f')), None);
        assert_eq!(Radix::Octal.digit_value(u32::from(b'8')), None);
        assert_eq!(Radix::Binary.digit_value(u32::from(b'1')), Some(1));
    }

    #[test]
    fn test_plain_digits() {
        let digits = Digits::new(Radix::Decimal);
        assert_eq!(run(&digits, "123x"), (Ok(()), 3));
        assert_eq!(run(&digits, "007"), (Ok(()), 3));
        assert_eq!(run(&digits, "x").0, Err(EngineError::ExpectedDigit));
    }

    #[test]
    fn test_trimmed_rejects_leading_zero() {
        let digits = Digits::new(Radix::Decimal).trimmed();
        assert_eq!(run(&digits, "007"), (Err(EngineError::LeadingZero), 1));
        assert_eq!(run(&digits, "0"), (Ok(()), 1));
        assert_eq!(run(&digits, "0.5"), (Ok(()), 1));
        assert_eq!(run(&digits, "105"), (Ok(()), 3));
    }

    #[test]
    fn test_separator_needs_digits_on_both_sides() {
        let digits = Digits::new(Radix::Decimal).separator(CharClass::char('_'));
        assert_eq!(run(&digits, "1_000"), (Ok(()), 5));
        assert_eq!(run(&digits, "1__0").0, Err(EngineError::MissingSeparatorDigit));
        assert_eq!(run(&digits, "1_").0, Err(EngineError::MissingSeparatorDigit));
        assert_eq!(run(&digits, "_1").0, Err(EngineError::ExpectedDigit));
    }

    #[test]
    fn test_recover_skips_run() {
        let digits = Digits::new(Radix::Decimal).trimmed();
        let mut reader = Reader::from_str("0042;");
        assert!(digits.recover(&mut reader, EngineError::LeadingZero));
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_n_digits() {
        let four = NDigits::new(Radix::Hex, 4);
        let mut reader = Reader::from_str("00e9z");
        assert_eq!(four.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 4);

        let mut reader = Reader::from_str("0z");
        assert_eq!(four.matches(&mut reader), Err(EngineError::ExpectedDigit));
    }
}
