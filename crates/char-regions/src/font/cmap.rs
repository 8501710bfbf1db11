//! `cmap` table processing.

use core::ops;

use super::Cursor;
use crate::{errors::ParseErrorKind, CodePointSet, ParseError};

/// Code points above this value are not valid Unicode scalar values and are ignored.
const MAX_CODE_POINT: u32 = char::MAX as u32;

/// Clamps an inclusive range of codes to valid Unicode code points.
fn clamp_codes(start: u32, end: u32) -> ops::RangeInclusive<u32> {
    start..=end.min(MAX_CODE_POINT)
}

fn glyph_ids<'a>(cursor: Cursor<'a>) -> impl Iterator<Item = u16> + 'a {
    let bytes = cursor.bytes;
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
}

/// Byte encoding (format 0) subtable of the `cmap` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ByteEncoding<'a> {
    glyph_id_array: &'a [u8],
}

impl<'a> ByteEncoding<'a> {
    const CHAR_COUNT: usize = 256;

    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format
        cursor.skip(4)?; // length, language
        let glyph_id_array = cursor.split_at(Self::CHAR_COUNT)?.bytes;
        Ok(Self { glyph_id_array })
    }

    fn collect_code_points(&self, code_points: &mut CodePointSet) {
        let mapped = (0_u32..)
            .zip(self.glyph_id_array)
            .filter_map(|(code, &glyph_id)| (glyph_id != 0).then_some(code));
        code_points.extend(mapped);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentWithDelta {
    pub(crate) start_code: u16,
    pub(crate) end_code: u16,
    pub(crate) id_delta: u16,
    pub(crate) id_range_offset: u16,
}

/// Segment mapping to delta values (format 4) subtable of the `cmap` table.
#[derive(Debug, Clone)]
pub(crate) struct SegmentDeltas<'a> {
    pub(crate) segments: Vec<SegmentWithDelta>,
    pub(crate) glyph_id_array: Cursor<'a>,
}

impl<'a> SegmentDeltas<'a> {
    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format

        // The length may overflow for large subtables, so the subtable is read
        // up to the end of the `cmap` table instead.
        cursor.skip(4)?; // length, language
        let segment_count = cursor.read_u16()? / 2;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let vec_len = 2 * usize::from(segment_count);
        let mut end_codes = cursor.split_at(vec_len)?;
        cursor.skip(2)?; // reserved padding
        let mut start_codes = cursor.split_at(vec_len)?;
        let mut id_deltas = cursor.split_at(vec_len)?;
        let mut id_range_offsets = cursor.split_at(vec_len)?;

        let segments = (0..segment_count).map(|_| {
            Ok(SegmentWithDelta {
                start_code: start_codes.read_u16()?,
                end_code: end_codes.read_u16()?,
                id_delta: id_deltas.read_u16()?,
                id_range_offset: id_range_offsets.read_u16()?,
            })
        });

        Ok(Self {
            segments: segments.collect::<Result<_, ParseError>>()?,
            glyph_id_array: cursor,
        })
    }

    fn glyph_id(
        &self,
        segment_idx: usize,
        segment: &SegmentWithDelta,
        code: u16,
    ) -> Result<u16, ParseError> {
        if segment.id_range_offset == 0 {
            return Ok(segment.id_delta.wrapping_add(code));
        }

        // Offset is counted from the start of `idRangeOffsets`
        let mut byte_offset = 2 * segment_idx;
        byte_offset += usize::from(segment.id_range_offset);
        byte_offset += 2 * usize::from(code - segment.start_code);

        let array_offset = 2 * self.segments.len();
        if byte_offset < array_offset {
            return Err(self
                .glyph_id_array
                .err(ParseErrorKind::OffsetOutOfBounds(byte_offset)));
        }
        // Shift the offset to count from the start of `glyphIdArray`
        byte_offset -= array_offset;
        let glyph_id = self.glyph_id_array.at(byte_offset)?.read_u16()?;
        Ok(if glyph_id == 0 {
            0
        } else {
            segment.id_delta.wrapping_add(glyph_id)
        })
    }

    /// Segments must be sorted by `end_code` and must not overlap. Codes already covered
    /// by a previous segment are skipped, so each code is looked up at most once.
    fn collect_code_points(&self, code_points: &mut CodePointSet) -> Result<(), ParseError> {
        let mut next_code = 0_u16;
        for (segment_idx, segment) in self.segments.iter().enumerate() {
            let start_code = segment.start_code.max(next_code);
            if start_code > segment.end_code {
                continue;
            }
            for code in start_code..=segment.end_code {
                if self.glyph_id(segment_idx, segment, code)? != 0 {
                    code_points.insert(code.into());
                }
            }
            match segment.end_code.checked_add(1) {
                Some(code) => next_code = code,
                None => break,
            }
        }
        Ok(())
    }
}

/// Trimmed table mapping (format 6) or trimmed array (format 10) subtable of the `cmap` table.
/// Both map a dense range of codes starting from `first_code`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrimmedArray<'a> {
    pub(crate) first_code: u32,
    pub(crate) glyph_id_array: Cursor<'a>,
}

impl<'a> TrimmedArray<'a> {
    fn parse_format6(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format
        cursor.skip(4)?; // length, language
        let first_code = cursor.read_u16()?.into();
        let entry_count = cursor.read_u16()?;
        let glyph_id_array = cursor.split_at(2 * usize::from(entry_count))?;
        Ok(Self {
            first_code,
            glyph_id_array,
        })
    }

    fn parse_format10(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format
        cursor.skip(2)?; // reserved
        cursor.skip(8)?; // length, language
        let first_code = cursor.read_u32()?;
        let entry_count = cursor.read_u32()? as usize;
        let glyph_id_array = cursor.split_at(entry_count.saturating_mul(2))?;
        Ok(Self {
            first_code,
            glyph_id_array,
        })
    }

    fn collect_code_points(&self, code_points: &mut CodePointSet) {
        let mapped = clamp_codes(self.first_code, u32::MAX)
            .zip(glyph_ids(self.glyph_id_array))
            .filter_map(|(code, glyph_id)| (glyph_id != 0).then_some(code));
        code_points.extend(mapped);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SequentialMapGroup {
    pub(crate) start_char_code: u32,
    pub(crate) end_char_code: u32,
    pub(crate) start_glyph_id: u32,
}

/// Segmented coverage (format 12) or many-to-one range mappings (format 13) subtable
/// of the `cmap` table. Both formats share the layout; they differ in how glyph IDs are assigned
/// within a group.
#[derive(Debug, Default, Clone)]
pub(crate) struct SegmentedCoverage {
    pub(crate) groups: Vec<SequentialMapGroup>,
}

impl SegmentedCoverage {
    const GROUP_LEN: usize = 12;

    fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        cursor.skip(2)?; // format

        cursor.skip(2)?; // reserved

        let remaining_len = cursor.read_u32_checked(|subtable_len| {
            Ok(subtable_len
                .checked_sub(8)
                .ok_or(ParseErrorKind::UnexpectedEof)? as usize)
        })?;
        cursor = cursor.range(0..remaining_len)?;

        cursor.skip(4)?; // language
        let num_groups = cursor.read_u32()? as usize;
        let mut groups_cursor = cursor.split_at(num_groups.saturating_mul(Self::GROUP_LEN))?;
        let groups = (0..num_groups).map(|_| {
            Ok(SequentialMapGroup {
                start_char_code: groups_cursor.read_u32()?,
                end_char_code: groups_cursor.read_u32()?,
                start_glyph_id: groups_cursor.read_u32()?,
            })
        });

        Ok(Self {
            groups: groups.collect::<Result<_, ParseError>>()?,
        })
    }

    /// Iterates over groups together with their codes not covered by previous groups.
    /// Groups must be sorted and must not overlap; codes of out-of-order groups are skipped.
    fn uncovered_codes(
        &self,
    ) -> impl Iterator<Item = (&SequentialMapGroup, ops::RangeInclusive<u32>)> + '_ {
        let mut next_code = 0_u32;
        self.groups.iter().filter_map(move |group| {
            let codes = clamp_codes(group.start_char_code.max(next_code), group.end_char_code);
            if codes.is_empty() {
                return None;
            }
            // Doesn't overflow since codes are clamped to `MAX_CODE_POINT`
            next_code = *codes.end() + 1;
            Some((group, codes))
        })
    }

    fn collect_code_points(&self, code_points: &mut CodePointSet) {
        for (group, codes) in self.uncovered_codes() {
            let mapped = codes.filter(|&code| {
                let glyph_id = group
                    .start_glyph_id
                    .wrapping_add(code - group.start_char_code);
                glyph_id != 0
            });
            code_points.extend(mapped);
        }
    }

    fn collect_many_to_one(&self, code_points: &mut CodePointSet) {
        for (group, codes) in self.uncovered_codes() {
            if group.start_glyph_id != 0 {
                code_points.extend(codes);
            }
        }
    }
}

/// Subtable of the `cmap` table in one of the supported formats.
#[derive(Debug, Clone)]
pub(crate) enum CmapSubtable<'a> {
    /// Format 0.
    Bytes(ByteEncoding<'a>),
    /// Format 4.
    Deltas(SegmentDeltas<'a>),
    /// Formats 6 and 10.
    Trimmed(TrimmedArray<'a>),
    /// Format 12.
    Coverage(SegmentedCoverage),
    /// Format 13.
    ManyToOne(SegmentedCoverage),
}

impl<'a> CmapSubtable<'a> {
    /// Parses a subtable with the `format` already read from its first 2 bytes.
    /// Returns `Ok(None)` if the format is not supported.
    fn parse(cursor: Cursor<'a>, format: u16) -> Result<Option<Self>, ParseError> {
        Ok(Some(match format {
            0 => Self::Bytes(ByteEncoding::parse(cursor)?),
            4 => Self::Deltas(SegmentDeltas::parse(cursor)?),
            6 => Self::Trimmed(TrimmedArray::parse_format6(cursor)?),
            10 => Self::Trimmed(TrimmedArray::parse_format10(cursor)?),
            12 => Self::Coverage(SegmentedCoverage::parse(cursor)?),
            13 => Self::ManyToOne(SegmentedCoverage::parse(cursor)?),
            _ => return Ok(None),
        }))
    }

    fn collect_code_points(&self, code_points: &mut CodePointSet) -> Result<(), ParseError> {
        match self {
            Self::Bytes(bytes) => bytes.collect_code_points(code_points),
            Self::Deltas(deltas) => deltas.collect_code_points(code_points)?,
            Self::Trimmed(trimmed) => trimmed.collect_code_points(code_points),
            Self::Coverage(coverage) => coverage.collect_code_points(code_points),
            Self::ManyToOne(coverage) => coverage.collect_many_to_one(code_points),
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CmapTable<'a> {
    pub(crate) subtables: Vec<CmapSubtable<'a>>,
}

impl<'a> CmapTable<'a> {
    pub(crate) const UNICODE_PLATFORM: u16 = 0;
    pub(crate) const WINDOWS_PLATFORM: u16 = 3;
    /// Unicode Variation Sequences; such subtables don't map chars by themselves.
    const UNICODE_VARIATION_ENCODING: u16 = 5;

    fn is_unicode_encoding(platform_id: u16, encoding_id: u16) -> bool {
        match platform_id {
            Self::UNICODE_PLATFORM => encoding_id != Self::UNICODE_VARIATION_ENCODING,
            // Symbol (0) fonts map to the Private Use Area
            Self::WINDOWS_PLATFORM => matches!(encoding_id, 0 | 1 | 10),
            _ => false,
        }
    }

    pub(super) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let table_cursor = cursor;
        cursor.read_u16_checked(|version| {
            if version != 0 {
                return Err(ParseErrorKind::UnexpectedTableVersion {
                    version: version.into(),
                });
            }
            Ok(())
        })?;

        let num_tables = cursor.read_u16()?;
        let mut parsed_offsets = Vec::with_capacity(num_tables.into());
        let mut subtables = vec![];
        for _ in 0..num_tables {
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let offset = cursor.read_u32()? as usize;
            if !Self::is_unicode_encoding(platform_id, encoding_id) {
                log::debug!("skipping non-Unicode cmap subtable ({platform_id}, {encoding_id})");
                continue;
            }
            if parsed_offsets.contains(&offset) {
                continue; // several encoding records may point to the same subtable
            }
            parsed_offsets.push(offset);

            let subtable_cursor = table_cursor.at(offset)?;
            let format = {
                let mut format_cursor = subtable_cursor;
                format_cursor.read_u16()?
            };
            if let Some(subtable) = CmapSubtable::parse(subtable_cursor, format)? {
                log::debug!(
                    "parsed cmap subtable ({platform_id}, {encoding_id}) with format {format}"
                );
                subtables.push(subtable);
            } else {
                log::warn!(
                    "skipping cmap subtable ({platform_id}, {encoding_id}) with unsupported format {format}"
                );
            }
        }

        if subtables.is_empty() {
            return Err(cursor.err(ParseErrorKind::NoSupportedCmap));
        }
        Ok(Self { subtables })
    }

    pub(super) fn collect_code_points(
        &self,
        code_points: &mut CodePointSet,
    ) -> Result<(), ParseError> {
        for subtable in &self.subtables {
            subtable.collect_code_points(code_points)?;
        }
        Ok(())
    }
}
