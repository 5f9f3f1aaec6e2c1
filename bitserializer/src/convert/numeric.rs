//! Numeric widening (spec §4.4): every [`crate::scope::Scalar`] converts
//! through this one neutral [`Number`] shape instead of each backend writing
//! a match arm per concrete primitive type, mirroring the conversion helper
//! the original library runs every fundamental value through before storing
//! or comparing it.

/// A primitive value widened to its natural category.
///
/// Backends store scalars as a `Number` internally and narrow back to a
/// concrete [`crate::scope::Scalar`] type on `Load`, where a narrowing that
/// doesn't fit returns `None` so the caller can apply
/// [`crate::options::Policy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

fn float_fits_exactly(value: f64) -> bool {
    value.fract() == 0.0 && value.is_finite()
}

macro_rules! impl_signed {
    ($($t:ty),* $(,)?) => {
        $(
            impl crate::scope::ScalarNumberConv for $t {
                fn to_number(self) -> Number {
                    Number::Int(self as i64)
                }

                fn try_from_number(number: Number) -> Option<Self> {
                    match number {
                        Number::Int(v) => <$t>::try_from(v).ok(),
                        Number::UInt(v) => <$t>::try_from(v).ok(),
                        Number::Float(v) if float_fits_exactly(v) => {
                            if v < 0.0 {
                                i64::try_from(v as i128).ok().and_then(|v| <$t>::try_from(v).ok())
                            } else {
                                u64::try_from(v as i128).ok().and_then(|v| <$t>::try_from(v).ok())
                            }
                        }
                        Number::Float(_) => None,
                        Number::Bool(b) => Some(if b { 1 } else { 0 }),
                    }
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty),* $(,)?) => {
        $(
            impl crate::scope::ScalarNumberConv for $t {
                fn to_number(self) -> Number {
                    Number::UInt(self as u64)
                }

                fn try_from_number(number: Number) -> Option<Self> {
                    match number {
                        Number::Int(v) => <$t>::try_from(v).ok(),
                        Number::UInt(v) => <$t>::try_from(v).ok(),
                        Number::Float(v) if float_fits_exactly(v) && v >= 0.0 => {
                            u64::try_from(v as i128).ok().and_then(|v| <$t>::try_from(v).ok())
                        }
                        Number::Float(_) => None,
                        Number::Bool(b) => Some(if b { 1 } else { 0 }),
                    }
                }
            }
        )*
    };
}

impl_signed!(i8, i16, i32, i64, i128);
impl_unsigned!(u8, u16, u32, u64, u128);

impl crate::scope::ScalarNumberConv for f32 {
    fn to_number(self) -> Number {
        Number::Float(self as f64)
    }

    fn try_from_number(number: Number) -> Option<Self> {
        Some(match number {
            Number::Int(v) => v as f32,
            Number::UInt(v) => v as f32,
            Number::Float(v) => v as f32,
            Number::Bool(b) => if b { 1.0 } else { 0.0 },
        })
    }
}

impl crate::scope::ScalarNumberConv for f64 {
    fn to_number(self) -> Number {
        Number::Float(self)
    }

    fn try_from_number(number: Number) -> Option<Self> {
        Some(match number {
            Number::Int(v) => v as f64,
            Number::UInt(v) => v as f64,
            Number::Float(v) => v,
            Number::Bool(b) => if b { 1.0 } else { 0.0 },
        })
    }
}

impl crate::scope::ScalarNumberConv for bool {
    fn to_number(self) -> Number {
        Number::Bool(self)
    }

    fn try_from_number(number: Number) -> Option<Self> {
        Some(match number {
            Number::Int(v) => v != 0,
            Number::UInt(v) => v != 0,
            Number::Float(v) => v != 0.0,
            Number::Bool(b) => b,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::scope::ScalarNumberConv;

    use super::Number;

    #[test]
    fn widens_to_matching_category() {
        assert_eq!(5i32.to_number(), Number::Int(5));
        assert_eq!(5u32.to_number(), Number::UInt(5));
        assert_eq!(1.5f64.to_number(), Number::Float(1.5));
        assert_eq!(true.to_number(), Number::Bool(true));
    }

    #[test]
    fn narrows_within_range() {
        assert_eq!(u8::try_from_number(Number::Int(200)), Some(200u8));
        assert_eq!(i8::try_from_number(Number::Int(-5)), Some(-5i8));
    }

    #[test]
    fn rejects_out_of_range_narrowing() {
        assert_eq!(u8::try_from_number(Number::Int(-1)), None);
        assert_eq!(i8::try_from_number(Number::Int(200)), None);
        assert_eq!(u8::try_from_number(Number::Int(300)), None);
    }

    #[test]
    fn rejects_fractional_float_to_int_narrowing() {
        assert_eq!(i32::try_from_number(Number::Float(1.5)), None);
        assert_eq!(i32::try_from_number(Number::Float(2.0)), Some(2));
    }

    #[test]
    fn bool_converts_both_ways() {
        assert_eq!(bool::try_from_number(Number::Int(0)), Some(false));
        assert_eq!(bool::try_from_number(Number::Int(7)), Some(true));
        assert_eq!(i32::try_from_number(Number::Bool(true)), Some(1));
    }
}
