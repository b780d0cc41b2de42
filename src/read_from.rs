//! Typed field decoding.
//!
//! A field region is a flat run of records with no count header: decoders read
//! records until the region is exhausted.  Fixed-size records are checked
//! against the region length up front, so a region that isn't a whole number of
//! records is rejected before anything is decoded.
use nalgebra::Matrix4;
use crate::cursor::Cursor;
use crate::error::{ParseError, ParseResult};

/// Size of the `int32` length header on length-prefixed records.
const LEN_PREFIX_SIZE: usize = 4;

pub trait ReadFrom<'a>: Sized {
    /// Encoded size of one record, or `None` for length-prefixed records.
    const FIXED_SIZE: Option<usize>;

    fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self>;
}

macro_rules! read_scalar {
    ($($ty:ty, $read_one:ident;)*) => {
        $(
            impl<'a> ReadFrom<'a> for $ty {
                const FIXED_SIZE: Option<usize> = Some(4);

                fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
                    c.$read_one()
                }
            }
        )*
    };
}

read_scalar! {
    i32, read_i32;
    f32, read_f32;
}

const fn add_sizes(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

macro_rules! read_tuple {
    ($($($A:ident)*;)*) => {
        $(
            impl<'a, $($A: ReadFrom<'a>,)*> ReadFrom<'a> for ($($A,)*) {
                const FIXED_SIZE: Option<usize> = {
                    let size = Some(0);
                    $( let size = add_sizes(size, $A::FIXED_SIZE); )*
                    size
                };

                #[allow(non_snake_case)]
                fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
                    $( let $A: $A = $A::read_from(c)?; )*
                    Ok(($($A,)*))
                }
            }
        )*
    };
}

read_tuple! {
    A B;
}

/// 16 floats, column-major: row `r`, column `c` is at flat index `4 * c + r`.
impl<'a> ReadFrom<'a> for Matrix4<f32> {
    const FIXED_SIZE: Option<usize> = Some(16 * 4);

    fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
        let mut m = [0.0; 16];
        for x in &mut m {
            *x = c.read_f32()?;
        }
        Ok(Matrix4::from_column_slice(&m))
    }
}

/// A raw length-prefixed sub-blob, borrowed from the backing buffer.
impl<'a> ReadFrom<'a> for &'a [u8] {
    const FIXED_SIZE: Option<usize> = None;

    fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
        c.read_len_prefixed()
    }
}

impl<'a> ReadFrom<'a> for String {
    const FIXED_SIZE: Option<usize> = None;

    fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
        c.read_len_prefixed_str()
    }
}


/// Decode every record in `region`.  `context` names the region in errors.
pub fn read_array<'a, T: ReadFrom<'a>>(region: &'a [u8], context: &str) -> ParseResult<Vec<T>> {
    let min_size = match T::FIXED_SIZE {
        Some(size) => {
            let left = region.len() % size;
            if left != 0 {
                return Err(ParseError::TrailingGarbage { left, context: context.to_owned() });
            }
            size
        },
        None => LEN_PREFIX_SIZE,
    };

    let mut c = Cursor::new(region);
    let mut v = Vec::with_capacity(T::FIXED_SIZE.map_or(0, |size| region.len() / size));
    while !c.is_empty() {
        let left = c.bytes_left();
        if left < min_size {
            return Err(ParseError::TrailingGarbage { left, context: context.to_owned() });
        }
        v.push(c.transaction(T::read_from)?);
    }
    Ok(v)
}

/// Decode a region holding length-prefixed sub-blobs, each of which is itself a
/// run of `T` records.
pub fn read_chunked<'a, T: ReadFrom<'a>>(
    region: &'a [u8],
    context: &str,
) -> ParseResult<Vec<Vec<T>>> {
    read_array::<&'a [u8]>(region, context)?
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| read_array(chunk, &format!("{} chunk {}", context, i)))
        .collect()
}

pub fn read_i32_array(region: &[u8], context: &str) -> ParseResult<Vec<i32>> {
    read_array(region, context)
}

pub fn read_f32_array(region: &[u8], context: &str) -> ParseResult<Vec<f32>> {
    read_array(region, context)
}

pub fn read_matrix_array(region: &[u8], context: &str) -> ParseResult<Vec<Matrix4<f32>>> {
    read_array(region, context)
}

pub fn read_string_array(region: &[u8], context: &str) -> ParseResult<Vec<String>> {
    read_array(region, context)
}

/// Interleaved `(int32 index, float32 weight)` pairs.
pub fn read_index_weight_array(region: &[u8], context: &str) -> ParseResult<Vec<(i32, f32)>> {
    read_array(region, context)
}
