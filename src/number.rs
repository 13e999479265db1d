//! The numeric codec: order-preserving encode/decode of a [`Rational`]
//! into the integer-magnitude header classes (tiny/small/medium/huge)
//! plus the continued-fraction fractional tail, as described in the
//! design's number-codec component. Ported term-for-term from
//! `lexicalbinary.py`'s `encode_positive`/`decode_number`/`log2`.

use crate::bits::{decode_bits, encode_bits, exp_golomb, read_exp_golomb, read_exp2_golomb};
use crate::error::{Error, Result};
use crate::rational::Rational;
use num_bigint::BigUint;
use num_integer::Integer as _;
use num_traits::{One, ToPrimitive, Zero};

fn write8(buffer: &mut Vec<u8>, value: u8, xor: u8) {
    buffer.push(value ^ xor);
}

fn read8(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset)
        .copied()
        .ok_or(Error::Truncated { offset })
}

/// Number of trailing zero bits of a non-zero `BigUint`, computed without
/// relying on Python's infinite-precision bitwise complement (see
/// `bits::trailing_zero_bits` for the same trick spelled out in full).
fn trailing_zero_bits(x: &BigUint) -> u64 {
    if x.is_zero() {
        return 0;
    }
    let width = x.bits();
    let full_mask = (BigUint::one() << (width as usize)) - BigUint::one();
    let complement = &full_mask ^ x;
    let below = x - BigUint::one();
    (&below & &complement).bits()
}

/// Encodes this value's absolute magnitude as a signed rational, writing
/// the tag byte (with the previous-sibling sign folded into its high
/// bit) followed by the integer header, the magnitude bytes, and an
/// optional fractional tail. Returns this value's own sign, which the
/// caller threads through as the next sibling's `prev_neg`.
pub fn encode_rational(buffer: &mut Vec<u8>, value: &Rational, prev_neg: bool) -> bool {
    let negative = value.is_negative();
    let xor: u8 = if negative { 0xFF } else { 0x00 };
    encode_positive(
        buffer,
        prev_neg,
        value.numerator().clone(),
        value.denominator().clone(),
        xor,
    );
    negative
}

fn encode_positive(buffer: &mut Vec<u8>, prev_neg: bool, a: BigUint, b: BigUint, xor: u8) {
    let c: u8 = if prev_neg { 0x80 } else { 0x00 };
    let a = if a < b {
        write8(buffer, c | 0x40, xor);
        a
    } else {
        let (m, a) = a.div_rem(&b);
        if m < BigUint::from(32u32) {
            let m = m.to_u8().unwrap();
            write8(buffer, c | (0x40 + m), xor);
        } else if m < BigUint::from(2048u32) {
            let m = m.to_u32().unwrap();
            write8(buffer, c | (0x60 + (m >> 8) as u8), xor);
            write8(buffer, (m & 0xFF) as u8, xor);
        } else if m.bits() <= 64 {
            let top_byte = (m.bits() - 1) >> 3;
            write8(buffer, c | (0x6F + top_byte as u8), xor);
            for i in (0..=top_byte).rev() {
                let byte = (&m >> (i as usize * 8)) & BigUint::from(0xFFu32);
                write8(buffer, byte.to_u8().unwrap(), xor);
            }
        } else {
            write8(buffer, c | 0x77, xor);
            // m is always >= 2^64 here, so `exp2_golomb`'s non-zero precondition holds.
            let code = crate::bits::exp2_golomb(&m);
            encode_bits(buffer, &code, 0x00, xor);
        }
        a
    };
    if !a.is_zero() {
        encode_fraction(buffer, a, b, xor);
    }
}

/// `s`, `a'`, `b'` such that `2^s * a / b` has been normalized into
/// `[1, 2)`: the continued-fraction initialization step.
fn log2(a: &BigUint, b: &BigUint) -> (i64, BigUint, BigUint) {
    let mut a = a.clone();
    let mut b = b.clone();
    let mut s = a.bits() as i64 - b.bits() as i64;
    if s > 0 {
        b <<= s as usize;
    }
    if s < 0 {
        a <<= (-s) as usize;
    }
    if a < b {
        a <<= 1;
        s -= 1;
    }
    let a_minus_b = &a - &b;
    (s, a_minus_b, b)
}

fn append_term(fraction: &mut BigUint, code: &BigUint, complement: bool) {
    let bits = code.bits().max(1);
    let contribution = if complement {
        let mask = (BigUint::one() << (bits as usize)) - BigUint::one();
        &mask ^ code
    } else {
        code.clone()
    };
    *fraction = (&*fraction << (bits as usize)) | contribution;
}

fn encode_fraction(buffer: &mut Vec<u8>, a: BigUint, b: BigUint, xor: u8) {
    let (n, mut a, mut b) = log2(&a, &b);
    debug_assert!(n < 0);
    let mut fraction = BigUint::one();
    // `n` and the first continued-fraction term share the same complement
    // state; alternation only begins from the second term onward, so the
    // flip happens at the bottom of the loop below, not right after `n`.
    let mut complement = true;
    let n_code = exp_golomb(&BigUint::from((-n) as u64));
    append_term(&mut fraction, &n_code, complement);
    if a.is_zero() {
        // Exact dyadic fraction (the `log2` residual is already zero): no
        // continued-fraction terms follow, and the terminal is always the
        // positive-context sentinel regardless of complement state.
        encode_bits(buffer, &fraction, 0x00, xor);
        return;
    }
    while !a.is_zero() {
        let (x, y) = b.div_rem(&a);
        let x_code = exp_golomb(&x);
        append_term(&mut fraction, &x_code, complement);
        b = a;
        a = y;
        complement = !complement;
    }
    let terminal: u8 = if complement { 0x00 } else { 0xFF };
    encode_bits(buffer, &fraction, terminal, xor);
}

/// Decodes a numeric value whose tag byte (`first`) has already been
/// read and masked to its low 7 bits by the dispatcher. Returns the
/// decoded rational and the offset just past its encoding.
pub fn decode_number(data: &[u8], offset: usize, first: u8) -> Result<(Rational, usize)> {
    let (negative, xor) = if first & 0x40 != 0 {
        (false, 0x00u8)
    } else {
        (true, 0xFFu8)
    };
    let first = (first ^ xor) & 0x7F;

    let (magnitude, mut end) = if first < 0x77 {
        let (mut value, value_end) = if first < 0x60 {
            (BigUint::from((first & 0x1F) as u32), offset + 1)
        } else if first < 0x70 {
            (BigUint::from((first & 0xF) as u32), offset + 2)
        } else {
            let bytes_to_read = (first as usize) - 0x6D;
            (BigUint::zero(), offset + bytes_to_read)
        };
        for i in (offset + 1)..value_end {
            let byte = read8(data, i)? ^ xor;
            value = (value << 8) | BigUint::from(byte);
        }
        (value, value_end)
    } else {
        let (code, bits_end) = decode_bits(data, offset + 1, xor)?;
        let bits = code.bits();
        let value = read_exp2_golomb(&code, bits)?;
        (value, bits_end)
    };

    // A value that ends exactly at the buffer's end has no fractional
    // continuation; treat a missing peek byte as if it equalled `xor`
    // itself, so it always unflips to 0 (no continuation) rather than
    // spuriously reading as "more bits follow".
    let peek = data.get(end).copied().unwrap_or(xor) ^ xor;
    let (numerator, denominator) = if peek & 0x80 != 0 {
        let (mut fraction, fraction_end) = decode_bits(data, end, xor)?;
        end = fraction_end;
        let mut left = fraction.bits() - 1;
        let mut mask = (BigUint::one() << (left as usize)) - BigUint::one();
        fraction &= &mask;
        fraction ^= &mask;

        let (exponent, new_left) = read_exp_golomb(&fraction, left);
        left = new_left;
        let exponent = exponent
            .to_i64()
            .ok_or(Error::MalformedEscape { offset: end })?;

        let mut terms: Vec<BigUint> = Vec::new();
        fraction &= (BigUint::one() << (left as usize)) - BigUint::one();
        while left > 0 {
            let (term, new_left) = read_exp_golomb(&fraction, left);
            left = new_left;
            if left > 0 {
                terms.push(term);
                mask = (BigUint::one() << (left as usize)) - BigUint::one();
                fraction &= &mask;
                fraction ^= &mask;
            }
        }

        let mut a = BigUint::zero();
        let mut b = BigUint::one();
        for term in terms.iter().rev() {
            let next_b = term * &b + &a;
            a = b;
            b = next_b;
        }
        a += &b;
        b <<= exponent as usize;
        let z = &a | &b;
        let shift = trailing_zero_bits(&z);
        a >>= shift as usize;
        b >>= shift as usize;

        (&magnitude * &b + &a, b)
    } else {
        (magnitude, BigUint::one())
    };

    let value = Rational::new(negative, numerator, denominator);
    Ok((value, end))
}
