//! Bounds-checked read position over an immutable byte buffer.
//!
//! `Cursor` is a small `Copy` value.  Compound reads run on a scratch copy and
//! are committed back only when every step succeeded, so a failed read never
//! leaves the cursor part-way through a record.
use std::str;
use byteorder::{ByteOrder, LE};
use crate::error::{ParseError, ParseResult};

/// Largest integer accepted by `read_i32`.  This is a sanity bound against
/// garbage input, not a limit of the format.
pub const INT_SANITY_MAX: i32 = 1024 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Cursor<'a> {
        Cursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bytes_left(&self) -> usize {
        assert!(self.pos <= self.data.len(), "cursor advanced past its region");
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_left() == 0
    }

    /// Run `f` on a scratch copy of the cursor, committing its position only if
    /// `f` succeeds.
    pub fn transaction<T, F>(&mut self, f: F) -> ParseResult<T>
    where F: FnOnce(&mut Cursor<'a>) -> ParseResult<T> {
        let mut w = *self;
        let value = f(&mut w)?;
        *self = w;
        Ok(value)
    }

    /// Borrow the next `n` bytes of the underlying buffer.  No copy is made.
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let available = self.bytes_left();
        if n > available {
            return Err(ParseError::TruncatedData { needed: n, available });
        }
        let bytes = &self.data[self.pos .. self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_i32(&mut self) -> ParseResult<i32> {
        self.transaction(|w| {
            let i = LE::read_i32(w.read_bytes(4)?);
            if !check_int_sanity(i) {
                return Err(ParseError::MalformedValue { value: i.into(), context: "int32" });
            }
            Ok(i)
        })
    }

    pub fn read_f32(&mut self) -> ParseResult<f32> {
        self.transaction(|w| Ok(LE::read_f32(w.read_bytes(4)?)))
    }

    /// Read an int32 that is used as a byte or item count.  `-1` passes the
    /// sanity bound but is never a valid length.
    pub fn read_len(&mut self, context: &'static str) -> ParseResult<usize> {
        self.transaction(|w| {
            let len = w.read_i32()?;
            if len < 0 {
                return Err(ParseError::MalformedValue { value: len.into(), context });
            }
            Ok(len as usize)
        })
    }

    /// Read an `int32 length | bytes[length]` record.  All-or-nothing: if the
    /// payload is short, the length header isn't consumed either.
    pub fn read_len_prefixed(&mut self) -> ParseResult<&'a [u8]> {
        self.transaction(|w| {
            let len = w.read_len("string length")?;
            w.read_bytes(len)
        })
    }

    pub fn read_len_prefixed_str(&mut self) -> ParseResult<String> {
        self.transaction(|w| {
            let bytes = w.read_len_prefixed()?;
            bytes_to_string(bytes, "length-prefixed string")
        })
    }
}

pub fn check_int_sanity(i: i32) -> bool {
    i == -1 || (0 ..= INT_SANITY_MAX).contains(&i)
}

pub fn bytes_to_string(bytes: &[u8], context: &str) -> ParseResult<String> {
    str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| ParseError::InvalidUtf8 { context: context.to_owned() })
}
