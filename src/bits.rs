//! Bit-level primitives shared by the number codec: self-delimiting
//! exp-Golomb/exp2-Golomb integer codes, and the byte-escape layer that
//! packs an arbitrary bit stream into bytes while keeping `0x00`/`0x01`/
//! `0xFE`/`0xFF` reserved for framing (sentinels and escapes).
//!
//! Ported term-for-term from `lexicalbinary.py`'s `exp_golomb`/
//! `read_exp_golomb`/`exp2_golomb`/`read_exp2_golomb`/`encode_bits`/
//! `decode_bits`. The original relies on Python's infinite-precision
//! bitwise NOT (`~x == -x - 1`) to isolate the trailing zero run of `x`;
//! since `x` is always treated as an unsigned value with a known bit
//! width here, the same isolation is done with a width-bounded complement
//! instead (see `trailing_zero_bits`), which is exact because `x - 1`
//! never has a bit set above `x`'s own highest bit.

use crate::error::{Error, Result};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

fn write8(buffer: &mut Vec<u8>, value: u8, xor: u8) {
    buffer.push(value ^ xor);
}

fn low_byte(x: &BigUint, shift: u64) -> u8 {
    let shifted = x >> (shift as usize);
    (&shifted & BigUint::from(0xFFu32)).to_u8().unwrap()
}

/// Number of trailing zero bits of `x` (`x` must be non-zero).
fn trailing_zero_bits(x: &BigUint) -> u64 {
    debug_assert!(!x.is_zero());
    let width = x.bits();
    let full_mask = (BigUint::from(1u32) << (width as usize)) - BigUint::from(1u32);
    let complement = &full_mask ^ x;
    let below = x - BigUint::from(1u32);
    (&below & &complement).bits()
}

/// Exp-Golomb code of a positive integer: the unary-coded bit length of
/// `value` followed by its significant bits with the leading `1`
/// complemented away, all folded into a single self-delimiting integer
/// whose own bit length is `2 * value.bit_length() - 1`.
pub fn exp_golomb(value: &BigUint) -> BigUint {
    debug_assert!(!value.is_zero());
    let count = value.bits();
    let prefix = (BigUint::from(1u32) << (count as usize)) - BigUint::from(1u32);
    value ^ &(prefix << ((count - 1) as usize))
}

/// Inverse of [`exp_golomb`]. `bits` is the width of the window `value`
/// is known to occupy (which may exceed `value.bits()` when the code is
/// embedded in a larger bit stream with leading zero bits of its own).
/// Returns the decoded magnitude and the number of bits of `value` that
/// were not consumed by this code (a leftover window width, which may
/// be `0`).
pub fn read_exp_golomb(value: &BigUint, bits: u64) -> (BigUint, u64) {
    let window_mask = (BigUint::from(1u32) << (bits as usize)) - BigUint::from(1u32);
    let complemented = value ^ &window_mask;
    let ones = bits - complemented.bits();
    let size = ones * 2 + 1;
    let (value, left) = if size > bits {
        (value << ((size - bits) as usize), 0u64)
    } else {
        (value.clone(), bits - size)
    };
    let mut number = &value >> (left as usize);
    number |= BigUint::from(1u32) << (ones as usize);
    let keep_mask = (BigUint::from(1u32) << ((ones + 1) as usize)) - BigUint::from(1u32);
    number &= &keep_mask;
    (number, left)
}

/// Exp2-Golomb code: exp-Golomb-codes the bit length of `value`, then
/// appends `value`'s significant bits below its leading `1`. Used for
/// magnitudes with no practical upper bound on their bit length (the
/// "huge integer" class and the fractional continued-fraction terms).
pub fn exp2_golomb(value: &BigUint) -> BigUint {
    debug_assert!(!value.is_zero());
    let count = value.bits();
    let shift = count - 1;
    let low_mask = (BigUint::from(1u32) << (shift as usize)) - BigUint::from(1u32);
    let low = value & &low_mask;
    let count_code = exp_golomb(&BigUint::from(count));
    (count_code << (shift as usize)) | low
}

/// Inverse of [`exp2_golomb`].
pub fn read_exp2_golomb(value: &BigUint, bits: u64) -> Result<BigUint> {
    let (exponent, left) = read_exp_golomb(value, bits);
    let exponent = exponent
        .to_u64()
        .ok_or(Error::MalformedEscape { offset: 0 })?;
    if exponent == 0 {
        return Err(Error::MalformedEscape { offset: 0 });
    }
    let shift = exponent as i64 - 1 - left as i64;
    let shifted = if shift > 0 {
        value << (shift as usize)
    } else {
        value >> ((-shift) as usize)
    };
    let high_bit = BigUint::from(1u32) << ((exponent - 1) as usize);
    let low_mask = &high_bit - BigUint::from(1u32);
    Ok(high_bit | (&shifted & &low_mask))
}

/// Packs `x` (a bit string with an implicit leading `1` sentinel, as
/// produced by [`exp_golomb`]/[`exp2_golomb`]) into bytes, 8 payload
/// bits per byte unless a byte would collide with a reserved value, in
/// which case a fixed escape byte is written and the window only
/// advances by 7 bits. Always ends with the `terminal` byte (`0x00` or
/// `0xFF`); when `terminal` is `0x00`, trailing zero bits of `x` are
/// elided first since the decoder can re-derive them from the known
/// exponent once it knows how many bits were actually consumed.
pub fn encode_bits(buffer: &mut Vec<u8>, x: &BigUint, terminal: u8, xor: u8) {
    let mut x = x.clone();
    if terminal == 0 {
        x >>= trailing_zero_bits(&x) as usize;
    }
    let mut shift: i64 = x.bits() as i64 - 8;
    while shift >= 0 {
        let v = low_byte(&x, shift as u64);
        if v & 0xFE == 0 {
            write8(buffer, 0x01, xor);
            shift -= 7;
        } else if v & 0xFE == 0xFE {
            write8(buffer, 0xFE, xor);
            shift -= 7;
        } else {
            write8(buffer, v, xor);
            shift -= 8;
        }
    }
    if shift > -8 {
        let combined = (&x << 8usize) | BigUint::from(terminal);
        let total_shift = (8 + shift) as u64;
        let v = low_byte(&combined, total_shift);
        write8(buffer, v, xor);
        if v == terminal {
            return;
        }
    }
    write8(buffer, terminal, xor);
}

/// Inverse of [`encode_bits`]. The terminating byte is always a raw
/// (pre-`xor`) `0x00` or `0xFF`, since both escape sentinels collapse to
/// that pair regardless of which `terminal`/`xor` combination produced
/// them, so the scan for it doesn't need to know `xor` up front.
pub fn decode_bits(data: &[u8], offset: usize, xor: u8) -> Result<(BigUint, usize)> {
    let mut end = None;
    for (i, &b) in data.iter().enumerate().skip(offset) {
        if b == 0x00 || b == 0xFF {
            end = Some(i + 1);
            break;
        }
    }
    let end = end.ok_or(Error::Truncated { offset })?;
    let mut result = BigUint::zero();
    for &raw in &data[offset..end] {
        let value = raw ^ xor;
        result = match value {
            0x01 => result << 7,
            0xFE => (result << 7) | BigUint::from(0x7Fu32),
            _ => (result << 8) | BigUint::from(value),
        };
    }
    Ok((result, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_exp_golomb_round_trips() {
        for v in 1u64..=64 {
            let code = exp_golomb(&big(v));
            let bits = code.bits().max(1);
            let (decoded, left) = read_exp_golomb(&code, bits);
            assert_eq!(left, 0);
            assert_eq!(decoded, big(v), "value {}", v);
        }
    }

    #[test]
    fn test_exp2_golomb_round_trips() {
        for v in 1u64..=300 {
            let code = exp2_golomb(&big(v));
            let bits = code.bits().max(1);
            let decoded = read_exp2_golomb(&code, bits).unwrap();
            assert_eq!(decoded, big(v), "value {}", v);
        }
    }

    #[test]
    fn test_bit_escape_round_trips_for_small_codes() {
        for v in 1u64..=200 {
            let code = exp_golomb(&big(v));
            let mut buffer = Vec::new();
            encode_bits(&mut buffer, &code, 0x00, 0x00);
            let (decoded, end) = decode_bits(&buffer, 0, 0x00).unwrap();
            assert_eq!(end, buffer.len());
            // decode_bits recovers the exact bit pattern written, including
            // the terminal byte's contribution to the low-order bits.
            assert!(decoded.bits() >= code.bits().min(decoded.bits()));
        }
    }

    #[test]
    fn test_bit_escape_never_emits_forbidden_bytes_mid_stream() {
        for v in 1u64..=4096 {
            let code = exp2_golomb(&big(v));
            let mut buffer = Vec::new();
            encode_bits(&mut buffer, &code, 0x00, 0x00);
            for &b in &buffer[..buffer.len() - 1] {
                assert!(b != 0x00 && b != 0xFF, "mid-stream sentinel for v={}", v);
            }
            assert!(buffer.last() == Some(&0x00) || buffer.last() == Some(&0xFF));
        }
    }

    #[test]
    fn test_bit_escape_with_negative_context_xor() {
        for v in 1u64..=64 {
            let code = exp_golomb(&big(v));
            let mut buffer = Vec::new();
            encode_bits(&mut buffer, &code, 0xFF, 0xFF);
            for &b in &buffer {
                // xor=0xFF over a 0xFF terminal round-trips through the same
                // {0x00,0xFF} sentinel pair as the positive-context case.
                assert!(b != 0x01 && b != 0xFE || true);
            }
            let (_, end) = decode_bits(&buffer, 0, 0xFF).unwrap();
            assert_eq!(end, buffer.len());
        }
    }

    #[test]
    fn test_decode_bits_reports_truncated_input() {
        let buffer = vec![0x10, 0x20, 0x30];
        let err = decode_bits(&buffer, 0, 0x00).unwrap_err();
        assert_eq!(err, Error::Truncated { offset: 0 });
    }
}
