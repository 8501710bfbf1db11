use core::{fmt, ops};

use crate::TableTag;

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version (the first 4 bytes of the font data).
    UnexpectedFontVersion(u32),
    /// Missing required font table (e.g., `cmap`).
    MissingTable,
    /// No subtable with a Unicode encoding in the `cmap` table.
    NoSupportedCmap,
    /// Offset inferred from the table data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Unexpected table version.
    UnexpectedTableVersion {
        /// Version read from the table data.
        version: u32,
    },
    /// Requested font index is out of bounds for the font collection.
    FontIndexOutOfBounds {
        /// Requested index.
        index: u32,
        /// Number of fonts in the file (1 for a file that is not a collection).
        font_count: u32,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion(val) => {
                write!(formatter, "unexpected font version (0x{val:08x})")
            }
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::NoSupportedCmap => {
                formatter.write_str("no subtable with a Unicode encoding in the `cmap` table")
            }
            Self::OffsetOutOfBounds(val) => {
                write!(
                    formatter,
                    "offset ({val}) inferred from the table data is out of bounds"
                )
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedTableVersion { version } => {
                write!(formatter, "unexpected table version ({version})")
            }
            Self::FontIndexOutOfBounds { index, font_count } => {
                write!(
                    formatter,
                    "font index {index} is out of bounds; the file contains {font_count} font(s)"
                )
            }
        }
    }
}

impl std::error::Error for ParseErrorKind {}

/// Errors that can occur when parsing an OpenType [`Font`](crate::Font).
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Error converting a sequence of code points into [`SortedCodePoints`](crate::SortedCodePoints).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsortedError {
    pub(crate) index: usize,
    pub(crate) previous: u32,
    pub(crate) current: u32,
}

impl fmt::Display for UnsortedError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            index,
            previous,
            current,
        } = self;
        let problem = if previous == current {
            "duplicate"
        } else {
            "out-of-order"
        };
        write!(
            formatter,
            "{problem} code point at index {index}: {current} follows {previous}"
        )
    }
}

impl std::error::Error for UnsortedError {}

impl UnsortedError {
    /// Gets the index of the offending code point.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the code point preceding the offending one.
    pub fn previous(&self) -> u32 {
        self.previous
    }

    /// Gets the offending code point, which is not greater than [`Self::previous()`].
    pub fn current(&self) -> u32 {
        self.current
    }
}
