use super::{Digits, EngineError, Matcher, NDigits, Radix, ValueParser};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use std::fmt::Debug;
use std::marker::PhantomData;

/// Integer types digit runs can be converted into
pub trait Integer: Copy + Debug + Send + Sync + 'static {
    const BITS: u32;
    /// Largest magnitude of a non-negative value
    const MAX_MAGNITUDE: u128;
    /// Largest magnitude of a negative value, zero for unsigned types
    const MIN_MAGNITUDE: u128;

    /// Value with the given magnitude and sign; the magnitude is in range.
    fn from_magnitude(magnitude: u128, negative: bool) -> Self;

    /// Widen to `i128` for storage in a dynamic value
    fn to_i128(self) -> i128;
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Integer for $ty {
            const BITS: u32 = <$ty>::BITS;
            const MAX_MAGNITUDE: u128 = <$ty>::MAX as u128;
            const MIN_MAGNITUDE: u128 = 0;

            #[inline]
            fn from_magnitude(magnitude: u128, _negative: bool) -> Self {
                magnitude as $ty
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Integer for $ty {
            const BITS: u32 = <$ty>::BITS;
            const MAX_MAGNITUDE: u128 = <$ty>::MAX as u128;
            const MIN_MAGNITUDE: u128 = <$ty>::MAX as u128 + 1;

            #[inline]
            fn from_magnitude(magnitude: u128, negative: bool) -> Self {
                if negative {
                    (magnitude as i128).wrapping_neg() as $ty
                } else {
                    magnitude as $ty
                }
            }

            #[inline]
            fn to_i128(self) -> i128 {
                self as i128
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8, i16, i32, i64, isize);

/// Convert a run of digits into an integer.
///
/// Units that are not digits of `radix` are skipped, so separated runs such
/// as `1_000` convert directly. Leading zeroes are accepted. Types narrower
/// than 64 bits accumulate in a `u64` and compare against the limit once per
/// digit; wider types use checked `u128` arithmetic.
///
/// # Errors
///
/// Returns [`EngineError::Overflow`] when the value exceeds the type's range.
pub fn parse_integer<T: Integer, U: CodeUnit>(units: &[U], radix: Radix, negative: bool) -> Result<T, EngineError> {
    let limit = if negative {
        T::MIN_MAGNITUDE
    } else {
        T::MAX_MAGNITUDE
    };
    let base = radix.base();
    let digits = units.iter().filter_map(|u| radix.digit_value(u.to_u32()));

    let magnitude = if T::BITS < 64 {
        // limit < 2^63, so acc * 16 + 15 cannot wrap a u64
        let limit = limit as u64;
        let mut acc = 0u64;
        for digit in digits {
            acc = acc * u64::from(base) + u64::from(digit);
            if acc > limit {
                return Err(EngineError::Overflow);
            }
        }
        u128::from(acc)
    } else {
        let mut acc = 0u128;
        for digit in digits {
            acc = acc
                .checked_mul(u128::from(base))
                .and_then(|acc| acc.checked_add(u128::from(digit)))
                .filter(|acc| *acc <= limit)
                .ok_or(EngineError::Overflow)?;
        }
        acc
    };

    Ok(T::from_magnitude(magnitude, negative))
}

/// Digit run converted to an integer of type `T`
#[derive(Debug, Clone)]
pub struct IntegerParser<T> {
    digits: Digits,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Integer> IntegerParser<T> {
    #[must_use]
    pub const fn new(digits: Digits) -> Self {
        Self {
            digits,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn digits(&self) -> &Digits {
        &self.digits
    }

    /// Convert an already matched span.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Overflow`] when the value does not fit.
    pub fn convert<U: CodeUnit>(&self, reader: &Reader<'_, U>, span: Span, negative: bool) -> Result<T, EngineError> {
        parse_integer(reader.slice(span), self.digits.radix(), negative)
    }
}

impl<T: Integer, U: CodeUnit> ValueParser<U> for IntegerParser<T> {
    type Output = T;

    fn parse(&self, reader: &mut Reader<'_, U>) -> Result<T, EngineError> {
        let begin = reader.position();
        self.digits.matches(reader)?;
        self.convert(reader, Span::new(begin, reader.position()), false)
    }
}

/// Fixed number of digits naming a Unicode scalar value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePointId {
    digits: NDigits,
}

impl CodePointId {
    /// `count` digits in `radix`, e.g. four hex digits for `\uXXXX`
    #[must_use]
    pub const fn new(radix: Radix, count: usize) -> Self {
        Self {
            digits: NDigits::new(radix, count),
        }
    }

    /// Map an engine failure to the reported error kind
    #[must_use]
    pub const fn error_kind(error: EngineError) -> ErrorKind {
        match error {
            EngineError::InvalidCodePoint | EngineError::Overflow => ErrorKind::InvalidCodePoint,
            _ => ErrorKind::ExpectedDigit,
        }
    }
}

impl<U: CodeUnit> ValueParser<U> for CodePointId {
    type Output = char;

    fn parse(&self, reader: &mut Reader<'_, U>) -> Result<char, EngineError> {
        let begin = reader.position();
        self.digits.matches(reader)?;
        let span = Span::new(begin, reader.position());
        let value: u32 = parse_integer(reader.slice(span), self.digits.radix(), false)
            .map_err(|_| EngineError::InvalidCodePoint)?;
        char::from_u32(value).ok_or(EngineError::InvalidCodePoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decimal<T: Integer>(text: &str) -> Result<T, EngineError> {
        parse_integer(text.as_bytes(), Radix::Decimal, false)
    }

    #[test]
    fn test_u8_boundaries() {
        assert_eq!(decimal::<u8>("255"), Ok(255));
        assert_eq!(decimal::<u8>("256"), Err(EngineError::Overflow));
        assert_eq!(decimal::<u8>("000000255"), Ok(255));
    }

    #[test]
    fn test_signed_limits() {
        assert_eq!(
            parse_integer::<i8, u8>(b"128", Radix::Decimal, true),
            Ok(i8::MIN)
        );
        assert_eq!(decimal::<i8>("128"), Err(EngineError::Overflow));
        assert_eq!(
            parse_integer::<i64, u8>(b"9223372036854775808", Radix::Decimal, true),
            Ok(i64::MIN)
        );
    }

    #[test]
    fn test_wide_types_overflow() {
        assert_eq!(decimal::<u64>("18446744073709551615"), Ok(u64::MAX));
        assert_eq!(
            decimal::<u64>("18446744073709551616"),
            Err(EngineError::Overflow)
        );
    }

    #[test]
    fn test_hex_and_separators() {
        assert_eq!(
            parse_integer::<u32, u8>(b"ff_ff", Radix::Hex, false),
            Ok(0xFFFF)
        );
    }

    #[test]
    fn test_integer_parser_consumes_digits() {
        let parser = IntegerParser::<u16>::new(Digits::new(Radix::Decimal));
        let mut reader = Reader::from_str("4096;");
        assert_eq!(parser.parse(&mut reader), Ok(4096));
        assert_eq!(reader.position(), 4);

        let mut reader = Reader::from_str("70000");
        assert_eq!(parser.parse(&mut reader), Err(EngineError::Overflow));
    }

    #[test]
    fn test_code_point_id() {
        let id = CodePointId::new(Radix::Hex, 4);
        let mut reader = Reader::from_str("00e9");
        assert_eq!(id.parse(&mut reader), Ok('é'));

        let mut reader = Reader::from_str("d800");
        assert_eq!(id.parse(&mut reader), Err(EngineError::InvalidCodePoint));

        let six = CodePointId::new(Radix::Hex, 6);
        let mut reader = Reader::from_str("110000");
        assert_eq!(six.parse(&mut reader), Err(EngineError::InvalidCodePoint));
    }

    proptest! {
        #[test]
        fn prop_u32_matches_std(value in any::<u32>()) {
            let text = value.to_string();
            prop_assert_eq!(decimal::<u32>(&text), Ok(value));
        }

        #[test]
        fn prop_u16_overflow_agrees_with_std(value in 0u64..200_000) {
            let text = value.to_string();
            let expected = u16::try_from(value).map_err(|_| EngineError::Overflow);
            prop_assert_eq!(decimal::<u16>(&text), expected);
        }
    }
}
