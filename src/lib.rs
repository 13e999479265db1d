//! Order-preserving binary serialization for use as opaque keys in
//! sorted key-value stores: the unsigned byte-wise lexicographic order
//! of `dumps(value)` matches the semantic order of `value`.
//!
//! The value domain ([`Value`]) covers null, booleans, arbitrary-size
//! signed rationals (and the doubles/integers that convert to them),
//! UTF-8 strings, byte strings, and heterogeneous lists. See the crate's
//! design notes for the wire format; this module only wires together
//! the dispatcher (this file), the number codec ([`number`]), the
//! string/byte-string codec ([`strcodec`]), and the bit-level Golomb and
//! byte-escape primitives ([`bits`]) that the number codec builds on.

mod bits;
mod error;
mod number;
mod rational;
mod strcodec;

pub use error::{Error, Result};
pub use rational::Rational;

use num_bigint::BigUint;

/// A value in the encodable domain. Every finite `f64` converts losslessly
/// into `Number`; NaN and the infinities get their own tags since they
/// don't fit the `(sign, numerator, denominator)` model.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    NaN,
    NegInfinity,
    PosInfinity,
    Number(Rational),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Number(Rational::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::Number(Rational::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        if v.is_nan() {
            Value::NaN
        } else if v == f64::INFINITY {
            Value::PosInfinity
        } else if v == f64::NEG_INFINITY {
            Value::NegInfinity
        } else {
            Value::Number(Rational::from_finite_f64(v))
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}

/// Encodes `value`, starting from scratch.
pub fn dumps(value: &Value) -> Vec<u8> {
    let mut buffer = Vec::new();
    encode(&mut buffer, value, false).expect("every Value variant is encodable");
    buffer
}

/// Decodes a single top-level value from `bytes`.
pub fn loads(bytes: &[u8]) -> Result<Value> {
    let (value, _end) = decode(bytes, 0)?;
    Ok(value)
}

/// Appends the encoding of `value` to `buffer`. `prev_neg` is the sign
/// context inherited from whatever precedes this value in its enclosing
/// list (`false` at the top level). Returns this value's own sign, which
/// the caller threads through as the next sibling's `prev_neg` — the
/// mechanism that keeps ordering correct across a list mixing positive
/// and negative numbers (see the crate's wire-format notes on sign
/// context). Only numeric values are ever "negative" in this sense; the
/// return value is otherwise always `false`.
pub fn encode(buffer: &mut Vec<u8>, value: &Value, prev_neg: bool) -> Result<bool> {
    let tag_bit: u8 = if prev_neg { 0x80 } else { 0x00 };
    match value {
        Value::Null => {
            buffer.push(0x01 ^ tag_bit);
            Ok(false)
        }
        Value::Bool(false) => {
            buffer.push(0x02 ^ tag_bit);
            Ok(false)
        }
        Value::Bool(true) => {
            buffer.push(0x03 ^ tag_bit);
            Ok(false)
        }
        Value::NaN => {
            buffer.push(0x06 ^ tag_bit);
            Ok(false)
        }
        Value::NegInfinity => {
            buffer.push(0x07 ^ tag_bit);
            Ok(false)
        }
        Value::PosInfinity => {
            buffer.push(0x78 ^ tag_bit);
            Ok(false)
        }
        Value::Number(r) => Ok(number::encode_rational(buffer, r, prev_neg)),
        Value::Str(s) => {
            buffer.push(0x79 ^ tag_bit);
            strcodec::encode_string(buffer, s, 0x00);
            Ok(false)
        }
        Value::Bytes(b) => {
            buffer.push(0x7A ^ tag_bit);
            strcodec::encode_bytes(buffer, b, 0x00);
            Ok(false)
        }
        Value::List(items) => {
            buffer.push(0x7B ^ tag_bit);
            let mut child_prev_neg = false;
            for item in items {
                child_prev_neg = encode(buffer, item, child_prev_neg)?;
            }
            let close_bit: u8 = if child_prev_neg { 0x80 } else { 0x00 };
            buffer.push(0x00 ^ close_bit);
            Ok(false)
        }
    }
}

/// The result of decoding one position in the stream: either a real
/// value, or the end-of-list sentinel a list's close byte decodes to.
/// Not part of the public `Value` domain — callers only ever see it
/// consumed by [`decode`]'s list-handling loop.
enum Decoded {
    EndOfList,
    Value(Value),
}

fn read8(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset)
        .copied()
        .ok_or(Error::Truncated { offset })
}

fn decode_one(data: &[u8], offset: usize) -> Result<(Decoded, usize)> {
    let raw = read8(data, offset)?;
    let first = raw & 0x7F;
    match first {
        0x00 => Ok((Decoded::EndOfList, offset + 1)),
        0x01 => Ok((Decoded::Value(Value::Null), offset + 1)),
        0x02 => Ok((Decoded::Value(Value::Bool(false)), offset + 1)),
        0x03 => Ok((Decoded::Value(Value::Bool(true)), offset + 1)),
        0x06 => Ok((Decoded::Value(Value::NaN), offset + 1)),
        0x07 => Ok((Decoded::Value(Value::NegInfinity), offset + 1)),
        // 0x3F is both the tiny-magnitude tag for a proper fraction whose
        // integer part is 0 *and* the dedicated negative-zero sentinel;
        // the two are disambiguated by whether a fractional tail follows.
        0x3F => {
            // `first & 0x40 == 0` here always, so this tag's own `xor`
            // is always 0xFF; a missing peek byte (value ends the
            // buffer) must unflip to 0, not spuriously read as a
            // fractional continuation.
            let peek = data.get(offset + 1).copied().unwrap_or(0xFF) ^ 0xFF;
            if peek & 0x80 != 0 {
                Ok((
                    Decoded::Value(Value::Number(Rational::neg_zero())),
                    offset + 1,
                ))
            } else {
                let (value, end) = number::decode_number(data, offset, first)?;
                Ok((Decoded::Value(Value::Number(value)), end))
            }
        }
        0x08..=0x77 => {
            let (value, end) = number::decode_number(data, offset, first)?;
            Ok((Decoded::Value(Value::Number(value)), end))
        }
        0x78 => Ok((Decoded::Value(Value::PosInfinity), offset + 1)),
        0x79 => {
            let (s, end) = strcodec::decode_string(data, offset + 1, 0x00)?;
            Ok((Decoded::Value(Value::Str(s)), end))
        }
        0x7A => {
            let (b, end) = strcodec::decode_bytes(data, offset + 1, 0x00)?;
            Ok((Decoded::Value(Value::Bytes(b)), end))
        }
        0x7B => {
            let mut items = Vec::new();
            let mut pos = offset + 1;
            loop {
                match decode_one(data, pos)? {
                    (Decoded::EndOfList, end) => {
                        pos = end;
                        break;
                    }
                    (Decoded::Value(v), end) => {
                        items.push(v);
                        pos = end;
                    }
                }
            }
            Ok((Decoded::Value(Value::List(items)), pos))
        }
        _ => {
            log::warn!("invalid tag byte {:#04x} at offset {}", raw, offset);
            Err(Error::InvalidTag { offset, byte: raw })
        }
    }
}

/// Decodes a single value starting at `offset`, returning it and the
/// offset just past its encoding.
pub fn decode(data: &[u8], offset: usize) -> Result<(Value, usize)> {
    match decode_one(data, offset)? {
        (Decoded::Value(v), end) => Ok((v, end)),
        (Decoded::EndOfList, end) => {
            log::warn!("unexpected end-of-list marker at offset {}", offset);
            Err(Error::InvalidTag {
                offset,
                byte: data.get(end - 1).copied().unwrap_or(0),
            })
        }
    }
}

/// Convenience: the numerator/denominator of `n/d` as a `Value::Number`.
pub fn fraction(negative: bool, numerator: BigUint, denominator: BigUint) -> Value {
    Value::Number(Rational::new(negative, numerator, denominator))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }

    #[test]
    fn test_vectors_from_the_design_table() {
        assert_eq!(hex(&dumps(&Value::Null)), "01");
        assert_eq!(hex(&dumps(&Value::Bool(false))), "02");
        assert_eq!(hex(&dumps(&Value::Bool(true))), "03");
        assert_eq!(hex(&dumps(&Value::from(0i64))), "40");
        assert_eq!(hex(&dumps(&Value::from(1i64))), "41");
        assert_eq!(hex(&dumps(&Value::from(-1i64))), "BE");
        assert_eq!(hex(&dumps(&Value::from("a"))), "796200");
        assert_eq!(hex(&dumps(&Value::Bytes(vec![]))), "7A00");
        assert_eq!(hex(&dumps(&Value::List(vec![]))), "7B00");
        assert_eq!(
            hex(&dumps(&Value::List(vec![
                Value::from(1i64),
                Value::from(-1i64)
            ]))),
            "7B41BE80"
        );
    }

    #[test]
    fn test_round_trip_through_loads_and_dumps() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::NaN,
            Value::NegInfinity,
            Value::PosInfinity,
            Value::from(0i64),
            Value::from(-1i64),
            Value::from(1_000_000i64),
            Value::from(1.5f64),
            Value::from(-0.0f64),
            Value::from("hello"),
            Value::Bytes(vec![1, 2, 3, 0xFF]),
            Value::List(vec![
                Value::from(1i64),
                Value::from("nested"),
                Value::List(vec![Value::from(-2i64), Value::Null]),
            ]),
        ];
        for value in values {
            let bytes = dumps(&value);
            let decoded = loads(&bytes).unwrap();
            assert_eq!(decoded, value, "round trip of {:?}", value);
        }
    }

    #[test]
    fn test_negative_zero_is_distinct_from_positive_zero() {
        let pos_zero = dumps(&Value::from(0.0f64));
        let neg_zero = dumps(&Value::from(-0.0f64));
        assert_ne!(pos_zero, neg_zero);
        assert!(neg_zero < pos_zero, "negative zero must sort below +0");
        match loads(&neg_zero).unwrap() {
            Value::Number(r) => assert!(r.is_negative() && r.is_zero()),
            other => panic!("expected Number, got {:?}", other),
        }
    }

    #[test]
    fn test_order_preservation_across_mixed_list_contents() {
        // Already listed in ascending semantic order (list order, then
        // element-wise); the byte-wise sort of their encodings must agree.
        let values = vec![
            Value::List(vec![Value::from(-5i64)]),
            Value::List(vec![Value::from(-1i64)]),
            Value::List(vec![Value::from(0i64)]),
            Value::List(vec![Value::from(1i64)]),
            Value::List(vec![Value::from(1i64), Value::from(-1i64)]),
            Value::List(vec![Value::from(1i64), Value::from(1i64)]),
        ];
        let mut encodings: Vec<Vec<u8>> = values.iter().map(dumps).collect();
        let original_order = encodings.clone();
        encodings.sort();
        assert_eq!(encodings, original_order);
    }

    #[test]
    fn test_truncated_input_reports_error() {
        let err = loads(&[0x79, 0x62]).unwrap_err();
        assert_eq!(err, Error::Truncated { offset: 2 });
    }

    #[test]
    fn test_invalid_tag_reports_error() {
        let err = loads(&[0x04]).unwrap_err();
        assert_eq!(err, Error::InvalidTag { offset: 0, byte: 0x04 });
    }
}
