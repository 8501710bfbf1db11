//! OpenType parsing logic.

use core::{fmt, ops};

use self::cmap::CmapTable;
use crate::{
    errors::{ParseError, ParseErrorKind},
    CodePointSet,
};

mod cmap;

/// Tag of an OpenType table, such as `cmap`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(formatter, "{}", char::from(byte))?;
            } else {
                write!(formatter, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl TableTag {
    /// Character-to-glyph mapping table.
    pub const CMAP: Self = Self(*b"cmap");

    /// Returns raw bytes of this tag.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

/// Big-endian reader over font data that remembers its absolute offset for error reporting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    offset: usize,
    table: Option<TableTag>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    fn with_table(mut self, table: TableTag) -> Self {
        self.table = Some(table);
        self
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        self.bytes = &self.bytes[len..];
        self.offset += len;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        };
        self.bytes = tail;
        self.offset += N;
        Ok(*head)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Reads a `u16` and checks it; the error (if any) points to the start of the value.
    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Reads a `u32` and checks it; the error (if any) points to the start of the value.
    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Splits off the first `len` bytes into a separate cursor and advances this cursor past them.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.bytes.split_at(len);
        let head = Self { bytes: head, ..*self };
        self.bytes = tail;
        self.offset += len;
        Ok(head)
    }

    /// Narrows this cursor to the specified range (relative to the current position).
    pub(crate) fn range(&self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let Some(bytes) = self.bytes.get(range.clone()) else {
            return Err(self.err(ParseErrorKind::RangeOutOfBounds {
                range,
                len: self.bytes.len(),
            }));
        };
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }

    /// Returns a cursor starting at `offset` relative to the current position.
    pub(crate) fn at(&self, offset: usize) -> Result<Self, ParseError> {
        if offset > self.bytes.len() {
            return Err(self.err(ParseErrorKind::OffsetOutOfBounds(offset)));
        }
        let mut this = *self;
        this.bytes = &self.bytes[offset..];
        this.offset += offset;
        Ok(this)
    }
}

/// OpenType font (or a single font from a font collection) with parsed character mapping.
#[derive(Debug)]
pub struct Font<'a> {
    pub(crate) cmap: CmapTable<'a>,
}

impl<'a> Font<'a> {
    /// TrueType outlines.
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    /// CFF outlines.
    pub(crate) const OPENTYPE_VERSION: u32 = u32::from_be_bytes(*b"OTTO");
    /// Legacy Apple TrueType.
    pub(crate) const APPLE_VERSION: u32 = u32::from_be_bytes(*b"true");
    pub(crate) const COLLECTION_TAG: u32 = u32::from_be_bytes(*b"ttcf");

    const TABLE_RECORD_LEN: usize = 16;

    /// Parses a single font from the provided bytes. This is equivalent to
    /// [`Self::from_collection()`] with index 0, so the first font of a collection is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the font cannot be parsed, or if it doesn't have a `cmap` table
    /// with a Unicode subtable.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        Self::from_collection(bytes, 0)
    }

    /// Parses a font from the provided bytes, which may represent a font collection (`ttcf`).
    /// In the latter case, `index` selects the font in the collection; otherwise, `index` must be 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the font cannot be parsed, if `index` is out of bounds, or if the font
    /// doesn't have a `cmap` table with a Unicode subtable.
    pub fn from_collection(bytes: &'a [u8], index: u32) -> Result<Self, ParseError> {
        let file = Cursor::new(bytes);
        let mut cursor = file;
        let version = cursor.read_u32()?;
        let font = if version == Self::COLLECTION_TAG {
            Self::collection_font(file, cursor, index)?
        } else if index == 0 {
            file
        } else {
            return Err(file.err(ParseErrorKind::FontIndexOutOfBounds {
                index,
                font_count: 1,
            }));
        };
        Self::parse(file, font)
    }

    fn collection_font(
        file: Cursor<'a>,
        mut cursor: Cursor<'a>,
        index: u32,
    ) -> Result<Cursor<'a>, ParseError> {
        cursor.skip(4)?; // majorVersion, minorVersion
        let font_count = cursor.read_u32_checked(|font_count| {
            if index >= font_count {
                return Err(ParseErrorKind::FontIndexOutOfBounds { index, font_count });
            }
            Ok(font_count)
        })?;
        log::debug!("font collection contains {font_count} font(s); selecting font #{index}");

        cursor.skip(4 * index as usize)?;
        let offset = cursor.read_u32()? as usize;
        file.at(offset)
    }

    fn parse(file: Cursor<'a>, mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.read_u32_checked(|version| match version {
            Self::SFNT_VERSION | Self::OPENTYPE_VERSION | Self::APPLE_VERSION => Ok(()),
            _ => Err(ParseErrorKind::UnexpectedFontVersion(version)),
        })?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut records = cursor.split_at(usize::from(table_count) * Self::TABLE_RECORD_LEN)?;
        let mut cmap = None;
        for _ in 0..table_count {
            let (tag, table) = Self::parse_table_record(&mut records, file)?;
            log::trace!("found table {tag} with length {}", table.bytes.len());
            if tag == TableTag::CMAP && cmap.is_none() {
                cmap = Some(CmapTable::parse(table)?);
            }
        }

        let cmap = cmap.ok_or_else(|| ParseError::missing_table(TableTag::CMAP))?;
        Ok(Self { cmap })
    }

    fn parse_table_record(
        records: &mut Cursor<'a>,
        file: Cursor<'a>,
    ) -> Result<(TableTag, Cursor<'a>), ParseError> {
        let tag = TableTag(records.read_u32()?.to_be_bytes());
        records.skip(4)?; // checksum
        let offset = records.read_u32()? as usize;
        let len = records.read_u32()? as usize;
        let range = offset..offset.saturating_add(len);
        let table = file.range(range).map_err(|mut err| {
            err.table = Some(tag);
            err
        })?;
        Ok((tag, table.with_table(tag)))
    }

    /// Returns all code points mapped to a glyph by the Unicode subtables of the `cmap` table.
    /// Code points mapped to the missing glyph (glyph 0) are not included.
    ///
    /// # Errors
    ///
    /// Returns an error if a `cmap` subtable references glyph data out of its bounds.
    pub fn code_points(&self) -> Result<CodePointSet, ParseError> {
        let mut code_points = CodePointSet::default();
        self.cmap.collect_code_points(&mut code_points)?;
        log::debug!("font supports {} code point(s)", code_points.len());
        Ok(code_points)
    }
}
