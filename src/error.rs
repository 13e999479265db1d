use std::fmt::{Display, Formatter};

/// A lexical_binary result, normally returning a lexical_binary [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// An error from encoding or decoding a value.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The encoder was given a value outside of the supported domain.
    UnsupportedVariant,
    /// The decoder ran out of bytes before finding a sentinel or required byte.
    Truncated { offset: usize },
    /// The first byte of a value wasn't a recognized tag range.
    InvalidTag { offset: usize, byte: u8 },
    /// The bit-escape or byte-escape layer read a forbidden byte inside a payload.
    MalformedEscape { offset: usize },
    /// A decoded string payload, after undoing the +1 escape, isn't valid UTF-8.
    InvalidUtf8 { offset: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedVariant => f.write_str("value is not in the supported domain"),
            Error::Truncated { offset } => {
                f.write_fmt(format_args!("truncated input at offset {}", offset))
            }
            Error::InvalidTag { offset, byte } => f.write_fmt(format_args!(
                "invalid tag byte {:#04x} at offset {}",
                byte, offset
            )),
            Error::MalformedEscape { offset } => f.write_fmt(format_args!(
                "malformed escape sequence at offset {}",
                offset
            )),
            Error::InvalidUtf8 { offset } => f.write_fmt(format_args!(
                "invalid UTF-8 payload at offset {}",
                offset
            )),
        }
    }
}

impl std::error::Error for Error {}
