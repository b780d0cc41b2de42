//! Splitting a file into named, length-framed sections.
//!
//! Each section is `int32 total | int32 name_len | int32 data_len | name | data`
//! with `total == 12 + name_len + data_len`.  Sections are concatenated with no
//! file header and no terminator.
use log::debug;
use crate::cursor::Cursor;
use crate::error::{ParseError, ParseResult};
use crate::read_from::ReadFrom;

pub const SECTION_HEADER_LEN: usize = 4 + 4 + 4;

/// A named region of the backing buffer.  Both `name` and `data` borrow;
/// nothing is copied.  Names are raw bytes and are matched exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct Section<'a> {
    pub name: &'a [u8],
    pub data: &'a [u8],
}

struct SectionHeader {
    total: i32,
    name_len: i32,
    data_len: i32,
}

impl<'a> ReadFrom<'a> for SectionHeader {
    const FIXED_SIZE: Option<usize> = Some(SECTION_HEADER_LEN);

    fn read_from(c: &mut Cursor<'a>) -> ParseResult<Self> {
        Ok(SectionHeader {
            total: c.read_i32()?,
            name_len: c.read_i32()?,
            data_len: c.read_i32()?,
        })
    }
}

impl SectionHeader {
    fn check(&self) -> ParseResult<(usize, usize)> {
        if self.name_len < 0 {
            return Err(ParseError::MalformedValue {
                value: self.name_len.into(),
                context: "section name length",
            });
        }
        if self.data_len < 0 {
            return Err(ParseError::MalformedValue {
                value: self.data_len.into(),
                context: "section data length",
            });
        }
        let expected = SECTION_HEADER_LEN as i64 + i64::from(self.name_len) + i64::from(self.data_len);
        if i64::from(self.total) != expected {
            return Err(ParseError::SectionFrameMismatch {
                total: self.total,
                name: self.name_len,
                data: self.data_len,
            });
        }
        Ok((self.name_len as usize, self.data_len as usize))
    }
}

/// Frame one section at the cursor.  The cursor only moves on success.
pub fn read_section<'a>(c: &mut Cursor<'a>) -> ParseResult<Section<'a>> {
    c.transaction(|w| {
        let header = SectionHeader::read_from(w)?;
        let (name_len, data_len) = header.check()?;
        let name = w.read_bytes(name_len)?;
        let data = w.read_bytes(data_len)?;
        Ok(Section { name, data })
    })
}

/// Frame sections until the cursor is exhausted.
pub fn read_all_sections<'a>(c: &mut Cursor<'a>) -> ParseResult<Vec<Section<'a>>> {
    let mut v = Vec::new();
    while !c.is_empty() {
        let left = c.bytes_left();
        if left < SECTION_HEADER_LEN {
            return Err(ParseError::TruncatedData { needed: SECTION_HEADER_LEN, available: left });
        }
        let offset = c.position();
        let s = read_section(c)?;
        debug!(
            "section {:?} at offset {}: {} bytes",
            String::from_utf8_lossy(s.name), offset, s.data.len(),
        );
        v.push(s);
    }
    Ok(v)
}

/// Look up a section by exact name.  Duplicates aren't merged; the first one
/// wins.
pub fn find_section<'s, 'a>(sections: &'s [Section<'a>], name: &str) -> Option<&'s Section<'a>> {
    sections.iter().find(|s| s.name == name.as_bytes())
}

pub fn require_section<'a>(sections: &[Section<'a>], name: &'static str) -> ParseResult<&'a [u8]> {
    find_section(sections, name)
        .map(|s| s.data)
        .ok_or(ParseError::RequiredSectionMissing(name))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn sect(out: &mut Vec<u8>, name: &[u8], data: &[u8]) {
        let total = (SECTION_HEADER_LEN + name.len() + data.len()) as i32;
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&(name.len() as i32).to_le_bytes());
        out.extend_from_slice(&(data.len() as i32).to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(data);
    }

    #[test]
    fn frames_all_sections_in_order() {
        let mut buf = Vec::new();
        sect(&mut buf, b"NODENAME", b"abcd");
        sect(&mut buf, b"HELLO", b"datadata");
        sect(&mut buf, b"EMPTY", b"");

        let mut c = Cursor::new(&buf);
        let sections = read_all_sections(&mut c).unwrap();
        assert!(c.is_empty());
        let names = sections.iter().map(|s| s.name).collect::<Vec<_>>();
        assert_eq!(names, vec![&b"NODENAME"[..], &b"HELLO"[..], &b"EMPTY"[..]]);
        assert_eq!(sections[1].data, b"datadata");
        assert!(sections[2].data.is_empty());
    }

    #[test]
    fn total_length_must_match() {
        let mut buf = Vec::new();
        for i in &[20_i32, 4, 4] {
            buf.extend_from_slice(&i.to_le_bytes());
        }
        buf.extend_from_slice(b"NAMEDATA");
        let mut c = Cursor::new(&buf);
        assert_eq!(
            read_section(&mut c),
            Err(ParseError::SectionFrameMismatch { total: 20, name: 4, data: 4 }),
        );
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn cut_mid_section_is_truncated() {
        let mut buf = Vec::new();
        sect(&mut buf, b"BONENAME", b"0123456789");
        buf.truncate(buf.len() - 3);
        let mut c = Cursor::new(&buf);
        assert!(matches!(read_all_sections(&mut c), Err(ParseError::TruncatedData { .. })));
    }

    #[test]
    fn cut_inside_header_is_truncated() {
        let mut buf = Vec::new();
        sect(&mut buf, b"A", b"x");
        buf.extend_from_slice(&[0, 0, 0, 0, 0]);
        let mut c = Cursor::new(&buf);
        assert_eq!(
            read_all_sections(&mut c),
            Err(ParseError::TruncatedData { needed: SECTION_HEADER_LEN, available: 5 }),
        );
    }

    #[test]
    fn names_are_matched_as_bytes() {
        let mut buf = Vec::new();
        sect(&mut buf, &[0xff, 0xfe], b"junk");
        sect(&mut buf, b"BONENAME", b"abcd");
        let sections = read_all_sections(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(sections[0].name, &[0xff_u8, 0xfe]);
        assert_eq!(require_section(&sections, "BONENAME").unwrap(), b"abcd");
    }

    #[test]
    fn negative_lengths_are_malformed() {
        let mut buf = Vec::new();
        for i in &[12_i32, -1, 1] {
            buf.extend_from_slice(&i.to_le_bytes());
        }
        let mut c = Cursor::new(&buf);
        assert!(matches!(read_section(&mut c), Err(ParseError::MalformedValue { value: -1, .. })));
    }

    #[test]
    fn lookup_returns_first_match() {
        let mut buf = Vec::new();
        sect(&mut buf, b"DUP", b"first");
        sect(&mut buf, b"DUP", b"second");
        let sections = read_all_sections(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(require_section(&sections, "DUP").unwrap(), b"first");
        assert_eq!(
            require_section(&sections, "MESHNAME"),
            Err(ParseError::RequiredSectionMissing("MESHNAME")),
        );
        assert!(find_section(&sections, "dup").is_none());
    }
}
