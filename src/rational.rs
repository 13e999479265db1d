use num_bigint::BigUint;
use num_integer::Integer as _;
use num_traits::{One, Zero};
use std::fmt::{Display, Formatter};

/// An exact, arbitrary-precision rational number together with an explicit sign bit.
///
/// Zero is representable with either sign (`-0` sorts immediately below `+0`; see
/// the dispatcher's dedicated negative-zero encoding in `number.rs`), so the sign
/// isn't folded away the way a plain signed `BigInt`-backed ratio would fold it.
/// `numerator`/`denominator` are always kept in lowest terms with `denominator > 0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rational {
    negative: bool,
    numerator: BigUint,
    denominator: BigUint,
}

impl Rational {
    /// Builds a normalized rational. `denominator` must be non-zero; this is a
    /// crate-internal invariant enforced by every call site, not user input.
    pub fn new(negative: bool, numerator: BigUint, denominator: BigUint) -> Rational {
        let gcd = numerator.gcd(&denominator);
        let (numerator, denominator) = if gcd.is_zero() || gcd.is_one() {
            (numerator, denominator)
        } else {
            (&numerator / &gcd, &denominator / &gcd)
        };
        Rational {
            negative,
            numerator,
            denominator,
        }
    }

    /// A signed integer with no fractional part.
    pub fn integer(negative: bool, magnitude: BigUint) -> Rational {
        Rational {
            negative,
            numerator: magnitude,
            denominator: BigUint::one(),
        }
    }

    /// Positive zero.
    pub fn zero() -> Rational {
        Rational::integer(false, BigUint::zero())
    }

    /// Negative zero: distinct from `zero()` even though they are numerically equal.
    pub fn neg_zero() -> Rational {
        Rational::integer(true, BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn numerator(&self) -> &BigUint {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigUint {
        &self.denominator
    }

    /// Splits the magnitude into an integer part and a fractional remainder,
    /// both expressed over the original denominator: `self == (-1)^sign * (m + a/b)`.
    pub fn integer_and_fraction(&self) -> (BigUint, BigUint, BigUint) {
        let (m, a) = self.numerator.div_rem(&self.denominator);
        (m, a, self.denominator.clone())
    }

    /// Exact conversion from a finite `f64`, following the IEEE-754 bit layout
    /// (mantissa * 2^exponent, including the implicit leading bit and the
    /// subnormal case). Callers must have already ruled out NaN/infinite inputs.
    pub fn from_finite_f64(value: f64) -> Rational {
        debug_assert!(value.is_finite());
        let negative = value.is_sign_negative();
        let bits = value.to_bits();
        let raw_exponent = ((bits >> 52) & 0x7ff) as i64;
        let raw_mantissa = bits & 0x000f_ffff_ffff_ffff;
        let (mantissa, exponent) = if raw_exponent == 0 {
            // subnormal (and +-0.0, where mantissa is also 0)
            (raw_mantissa, -1074_i64)
        } else {
            (raw_mantissa | (1u64 << 52), raw_exponent - 1075)
        };
        if mantissa == 0 {
            return Rational::integer(negative, BigUint::zero());
        }
        let mantissa = BigUint::from(mantissa);
        if exponent >= 0 {
            Rational::new(negative, mantissa << (exponent as usize), BigUint::one())
        } else {
            let denominator = BigUint::one() << ((-exponent) as usize);
            Rational::new(negative, mantissa, denominator)
        }
    }
}

impl From<u64> for Rational {
    fn from(value: u64) -> Self {
        Rational::integer(false, BigUint::from(value))
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Rational::integer(value < 0, BigUint::from(value.unsigned_abs()))
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        if self.denominator.is_one() {
            Display::fmt(&self.numerator, f)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reduces_to_lowest_terms() {
        let r = Rational::new(false, BigUint::from(6u32), BigUint::from(8u32));
        assert_eq!(r.numerator(), &BigUint::from(3u32));
        assert_eq!(r.denominator(), &BigUint::from(4u32));
    }

    #[test]
    fn test_zero_and_neg_zero_are_distinct_values() {
        assert_ne!(Rational::zero(), Rational::neg_zero());
        assert!(Rational::zero().is_zero());
        assert!(Rational::neg_zero().is_zero());
        assert!(!Rational::zero().is_negative());
        assert!(Rational::neg_zero().is_negative());
    }

    #[test]
    fn test_from_finite_f64_exact() {
        let r = Rational::from_finite_f64(1.5);
        assert_eq!(r.numerator(), &BigUint::from(3u32));
        assert_eq!(r.denominator(), &BigUint::from(2u32));

        let r = Rational::from_finite_f64(2.0);
        assert_eq!(r.numerator(), &BigUint::from(2u32));
        assert_eq!(r.denominator(), &BigUint::from(1u32));

        let r = Rational::from_finite_f64(-0.0);
        assert!(r.is_zero());
        assert!(r.is_negative());
    }

    #[test]
    fn test_from_finite_f64_subnormal() {
        let smallest = f64::from_bits(1);
        let r = Rational::from_finite_f64(smallest);
        assert_eq!(r.denominator(), &(BigUint::one() << 1074u32));
        assert_eq!(r.numerator(), &BigUint::one());
    }

    #[test]
    fn test_integer_and_fraction() {
        let r = Rational::new(false, BigUint::from(7u32), BigUint::from(2u32));
        let (m, a, b) = r.integer_and_fraction();
        assert_eq!(m, BigUint::from(3u32));
        assert_eq!(a, BigUint::from(1u32));
        assert_eq!(b, BigUint::from(2u32));
    }

    #[test]
    fn test_from_integers() {
        assert_eq!(Rational::from(5u64).to_string(), "5");
        assert_eq!(Rational::from(-5i64).to_string(), "-5");
        assert_eq!(Rational::from(0i64).to_string(), "0");
    }
}
