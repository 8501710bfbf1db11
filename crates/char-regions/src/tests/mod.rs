use std::{collections::BTreeSet, iter, ops};

use test_casing::test_casing;

use self::font_builder::{collection, Group, Subtable, TestFont};
use crate::{Font, ParseErrorKind, Report, TableTag};


const WINDOWS_BMP: (u16, u16) = (3, 1);
const WINDOWS_FULL: (u16, u16) = (3, 10);

/// Code points mapped by [`SubtableFormat::subtable()`]. Code point 100 is mapped
/// to the missing glyph and must not be reported.
fn expected_chars() -> BTreeSet<u32> {
    (65..=90).chain(97..=99).collect()
}

fn mapped_glyph(code: u32) -> u16 {
    match code {
        65..=90 => u16::try_from(code - 64).unwrap(),
        97..=99 => u16::try_from(code - 70).unwrap(),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy)]
enum SubtableFormat {
    Bytes,
    Deltas,
    DeltasWithArray,
    Trimmed,
    TrimmedArray,
    Coverage,
    ManyToOne,
}

impl SubtableFormat {
    const ALL: [Self; 7] = [
        Self::Bytes,
        Self::Deltas,
        Self::DeltasWithArray,
        Self::Trimmed,
        Self::TrimmedArray,
        Self::Coverage,
        Self::ManyToOne,
    ];

    fn groups() -> Vec<Group> {
        vec![
            Group {
                start: 65,
                end: 90,
                glyph_id: 1,
            },
            Group {
                start: 97,
                end: 99,
                glyph_id: 27,
            },
            Group {
                start: 100,
                end: 100,
                glyph_id: 0,
            },
        ]
    }

    fn subtable(self) -> Subtable {
        let codes = || (65_u16..=100).filter(|&code| !(91..97).contains(&code));
        let map = || codes().map(|code| (code, mapped_glyph(code.into())));
        match self {
            Self::Bytes => Subtable::Bytes(
                map()
                    .map(|(code, glyph)| (code.try_into().unwrap(), glyph.try_into().unwrap()))
                    .collect(),
            ),
            Self::Deltas => Subtable::Deltas(map().collect()),
            Self::DeltasWithArray => Subtable::DeltasWithArray(map().collect()),
            Self::Trimmed => Subtable::Trimmed {
                first_code: 65,
                glyph_ids: (65..=100).map(mapped_glyph).collect(),
            },
            Self::TrimmedArray => Subtable::TrimmedArray {
                first_code: 65,
                glyph_ids: (65..=100).map(mapped_glyph).collect(),
            },
            Self::Coverage => Subtable::Coverage(Self::groups()),
            // Glyph IDs differ from other formats, but mapped code points are the same.
            Self::ManyToOne => Subtable::ManyToOne(Self::groups()),
        }
    }
}

fn code_points(font_bytes: &[u8]) -> BTreeSet<u32> {
    let font = Font::new(font_bytes).unwrap();
    font.code_points().unwrap().iter().copied().collect()
}

fn range_set(ranges: &[ops::RangeInclusive<u32>]) -> BTreeSet<u32> {
    ranges.iter().cloned().flatten().collect()
}

/// Code points mapped to a non-missing glyph according to `ttf-parser`.
fn reference_code_points(cmap: &[u8]) -> BTreeSet<u32> {
    let table = ttf_parser::cmap::Table::parse(cmap).unwrap();
    let mut code_points = BTreeSet::new();
    for subtable in table.subtables {
        subtable.codepoints(|code| {
            if subtable.glyph_index(code).is_some_and(|glyph| glyph.0 != 0) {
                code_points.insert(code);
            }
        });
    }
    code_points
}

#[test_casing(7, SubtableFormat::ALL)]
fn reading_code_points_from_subtable(format: SubtableFormat) {
    let (platform_id, encoding_id) = WINDOWS_BMP;
    let font = TestFont::new()
        .with_table(*b"head", vec![0; 54])
        .with_subtable(platform_id, encoding_id, format.subtable())
        .to_bytes();
    assert_eq!(code_points(&font), expected_chars());
}

#[test_casing(7, SubtableFormat::ALL)]
fn code_points_match_reference_parser(format: SubtableFormat) {
    let (platform_id, encoding_id) = WINDOWS_FULL;
    let font = TestFont::new().with_subtable(platform_id, encoding_id, format.subtable());
    let reference = reference_code_points(&font.cmap_bytes());
    assert_eq!(reference, expected_chars());
    assert_eq!(code_points(&font.to_bytes()), reference);
}

#[test]
fn code_points_from_several_subtables_match_reference_parser() {
    let cyrillic = Subtable::Deltas((0x400..=0x45f).map(|ch| (ch, ch - 0x3ff)).collect());
    let font = TestFont::new()
        .with_subtable(0, 3, cyrillic)
        .with_subtable(
            WINDOWS_BMP.0,
            WINDOWS_BMP.1,
            Subtable::DeltasWithArray((32..=126).map(|ch| (ch, 126 - ch)).collect()),
        )
        .with_subtable(
            WINDOWS_FULL.0,
            WINDOWS_FULL.1,
            Subtable::TrimmedArray {
                first_code: 0x1f600,
                glyph_ids: (0..0x50).map(|i| i % 3).collect(),
            },
        );
    let reference = reference_code_points(&font.cmap_bytes());
    assert_eq!(code_points(&font.to_bytes()), reference);
    // '~' and every third emoji are mapped to glyph 0
    assert_eq!(reference.len(), 0x60 + 94 + 53);
}

/// Raw format 4 subtable with `count` segments each mapping `0..=0xfffe` to non-zero glyphs.
fn overlapping_segments(count: u16) -> Vec<u8> {
    let segment_count = count + 1;
    let mut words = vec![4, 16 + 8 * segment_count, 0, 2 * segment_count, 0, 0, 0];
    words.extend(iter::repeat_n(0xfffe, count.into()));
    words.extend([0xffff, 0]); // terminating segment end, reserved padding
    words.extend(iter::repeat_n(0, count.into()));
    words.push(0xffff);
    words.extend(iter::repeat_n(1, segment_count.into())); // idDelta
    words.extend(iter::repeat_n(0, segment_count.into())); // idRangeOffset
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

#[test]
fn overlapping_segments_are_read_once() {
    let subtable = Subtable::Raw(overlapping_segments(4_000));
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, subtable)
        .to_bytes();

    let font = Font::new(&font).unwrap();
    assert_eq!(font.cmap.subtables.len(), 1);
    let code_points = font.code_points().unwrap();
    assert_eq!(code_points.len(), 0xffff);
    assert!(!code_points.contains(0xffff));
}

#[test]
fn overlapping_groups_are_read_once() {
    let overlapping = Group {
        start: 0,
        end: 0xffff,
        glyph_id: 1,
    };
    let groups: Vec<_> = iter::once(Group {
        start: 0x20,
        end: 0x7e,
        glyph_id: 1,
    })
    .chain(iter::repeat_n(overlapping, 4_000))
    .collect();

    for subtable in [Subtable::Coverage(groups.clone()), Subtable::ManyToOne(groups)] {
        let font = TestFont::new()
            .with_subtable(WINDOWS_FULL.0, WINDOWS_FULL.1, subtable)
            .to_bytes();
        // Codes before an already read group are skipped.
        assert_eq!(code_points(&font), range_set(&[0x20..=0xffff]));
    }
}

#[test]
fn reading_code_points_from_many_to_one_subtable() {
    let subtable = Subtable::ManyToOne(vec![
        Group {
            start: 0x4e00,
            end: 0x4e0f,
            glyph_id: 5,
        },
        Group {
            start: 0x4e10,
            end: 0x4e1f,
            glyph_id: 0,
        },
    ]);
    let font = TestFont::new()
        .with_subtable(WINDOWS_FULL.0, WINDOWS_FULL.1, subtable)
        .to_bytes();
    assert_eq!(code_points(&font), range_set(&[0x4e00..=0x4e0f]));
}

#[test]
fn code_points_are_deduplicated_across_subtables() {
    let ascii = Subtable::Deltas((32..=126).map(|ch| (ch, ch - 29)).collect());
    let groups = vec![
        Group {
            start: 65,
            end: 70,
            glyph_id: 36,
        },
        Group {
            start: 0x1f600,
            end: 0x1f64f,
            glyph_id: 100,
        },
    ];
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, ascii)
        .with_subtable(WINDOWS_FULL.0, WINDOWS_FULL.1, Subtable::Coverage(groups))
        .to_bytes();

    let font = Font::new(&font).unwrap();
    let code_points = font.code_points().unwrap();
    assert_eq!(code_points.len(), 95 + 80);
    assert!(code_points.contains(u32::from('~')));
    assert!(code_points.contains(0x1f600));
    assert!(!code_points.contains(0x1f650));
}

#[test]
fn shared_subtable_is_parsed_once() {
    let subtable = SubtableFormat::Deltas.subtable();
    let font = TestFont::new()
        .with_subtable(0, 3, subtable)
        .with_shared_encoding(WINDOWS_BMP.0, WINDOWS_BMP.1)
        .to_bytes();

    let font = Font::new(&font).unwrap();
    assert_eq!(font.cmap.subtables.len(), 1);
    let code_points: BTreeSet<_> = font.code_points().unwrap().iter().copied().collect();
    assert_eq!(code_points, expected_chars());
}

#[test]
fn non_unicode_subtables_are_ignored() {
    let mac_roman = Subtable::Bytes((200..=210).map(|code| (code, 1)).collect());
    let variation_sequences = Subtable::Raw(vec![0, 14, 0, 0, 0, 10, 0, 0, 0, 0]);
    let font = TestFont::new()
        .with_subtable(1, 0, mac_roman)
        .with_subtable(0, 5, variation_sequences)
        .with_subtable(
            WINDOWS_BMP.0,
            WINDOWS_BMP.1,
            Subtable::Deltas(vec![(65, 1), (66, 2)]),
        )
        .to_bytes();
    assert_eq!(code_points(&font), range_set(&[65..=66]));
}

#[test]
fn symbol_subtable_is_read() {
    let symbols = Subtable::Deltas((0xf020..=0xf0ff).map(|code| (code, 3)).collect());
    let font = TestFont::new().with_subtable(3, 0, symbols).to_bytes();
    assert_eq!(code_points(&font), range_set(&[0xf020..=0xf0ff]));
}

#[test]
fn unsupported_subtable_formats_are_skipped() {
    let mixed_coverage = Subtable::Raw(vec![0, 8, 0, 0]);
    let font = TestFont::new()
        .with_subtable(0, 4, mixed_coverage)
        .with_subtable(WINDOWS_FULL.0, WINDOWS_FULL.1, SubtableFormat::Coverage.subtable())
        .to_bytes();
    let font = Font::new(&font).unwrap();
    assert_eq!(font.cmap.subtables.len(), 1);
    let code_points: BTreeSet<_> = font.code_points().unwrap().iter().copied().collect();
    assert_eq!(code_points, expected_chars());
}

#[test]
fn error_on_font_without_supported_subtables() {
    let font = TestFont::new()
        .with_subtable(1, 0, Subtable::Bytes(vec![(65, 1)]))
        .with_subtable(0, 4, Subtable::Raw(vec![0, 8, 0, 0]))
        .to_bytes();
    let err = Font::new(&font).unwrap_err();
    assert!(
        matches!(err.kind(), ParseErrorKind::NoSupportedCmap),
        "{err:?}"
    );
    assert_eq!(err.table(), Some(TableTag::CMAP));
}

#[test]
fn error_on_missing_cmap_table() {
    let font = TestFont::new().with_table(*b"head", vec![0; 54]).to_bytes();
    let err = Font::new(&font).unwrap_err();
    assert!(matches!(err.kind(), ParseErrorKind::MissingTable), "{err:?}");
    assert_eq!(err.table(), Some(TableTag::CMAP));
    assert_eq!(err.to_string(), "[cmap] missing required font table");
}

#[test]
fn error_on_unexpected_font_version() {
    let mut font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, SubtableFormat::Deltas.subtable())
        .to_bytes();
    font[..4].copy_from_slice(b"wOF2");

    let err = Font::new(&font).unwrap_err();
    assert!(
        matches!(err.kind(), ParseErrorKind::UnexpectedFontVersion(0x_774f_4632)),
        "{err:?}"
    );
    assert_eq!(err.offset(), 0);
    assert_eq!(err.table(), None);
}

#[test]
fn error_on_truncated_font() {
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, SubtableFormat::Deltas.subtable())
        .to_bytes();

    let err = Font::new(&font[..20]).unwrap_err();
    assert!(matches!(err.kind(), ParseErrorKind::UnexpectedEof), "{err:?}");

    // The table directory is complete, but the `cmap` table is truncated.
    let err = Font::new(&font[..40]).unwrap_err();
    assert!(
        matches!(err.kind(), ParseErrorKind::RangeOutOfBounds { len: 40, .. }),
        "{err:?}"
    );
    assert_eq!(err.table(), Some(TableTag::CMAP));
}

#[test]
fn error_on_glyph_id_array_offset_out_of_bounds() {
    let words: [u16; 16] = [
        4, 32, 0, // format, length, language
        4, 4, 1, 0, // segCountX2, searchRange, entrySelector, rangeShift
        66, 0xffff, // endCode
        0,    // reservedPad
        65, 0xffff, // startCode
        0, 1, // idDelta
        0x1000, 0, // idRangeOffset
    ];
    let raw = words.iter().flat_map(|word| word.to_be_bytes()).collect();
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, Subtable::Raw(raw))
        .to_bytes();

    let font = Font::new(&font).unwrap();
    let err = font.code_points().unwrap_err();
    assert!(
        matches!(err.kind(), ParseErrorKind::OffsetOutOfBounds(0x_0ffc)),
        "{err:?}"
    );
    assert_eq!(err.table(), Some(TableTag::CMAP));
}

#[test]
fn code_points_beyond_unicode_range_are_ignored() {
    let subtable = Subtable::Coverage(vec![
        Group {
            start: 0x10_fff0,
            end: u32::MAX,
            glyph_id: 1,
        },
        Group {
            start: 0x20_0000,
            end: 0x20_00ff,
            glyph_id: 100,
        },
    ]);
    let font = TestFont::new()
        .with_subtable(WINDOWS_FULL.0, WINDOWS_FULL.1, subtable)
        .to_bytes();
    assert_eq!(code_points(&font), range_set(&[0x10_fff0..=0x10_ffff]));
}

#[test]
fn reading_fonts_from_collection() {
    let latin = TestFont::new().with_subtable(
        WINDOWS_BMP.0,
        WINDOWS_BMP.1,
        SubtableFormat::Deltas.subtable(),
    );
    let cyrillic = TestFont::new()
        .with_table(*b"name", vec![1, 2, 3])
        .with_subtable(
            WINDOWS_BMP.0,
            WINDOWS_BMP.1,
            Subtable::Deltas((0x410..=0x44f).map(|code| (code, code - 0x400)).collect()),
        );
    let bytes = collection(&[latin, cyrillic]);

    let first = Font::new(&bytes).unwrap().code_points().unwrap();
    assert_eq!(first.iter().copied().collect::<BTreeSet<_>>(), expected_chars());
    let second = Font::from_collection(&bytes, 1).unwrap().code_points().unwrap();
    assert_eq!(
        second.iter().copied().collect::<BTreeSet<_>>(),
        range_set(&[0x410..=0x44f])
    );

    let err = Font::from_collection(&bytes, 2).unwrap_err();
    assert!(
        matches!(
            err.kind(),
            ParseErrorKind::FontIndexOutOfBounds {
                index: 2,
                font_count: 2
            }
        ),
        "{err:?}"
    );
}

#[test]
fn error_on_font_index_for_single_font() {
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, SubtableFormat::Deltas.subtable())
        .to_bytes();
    let err = Font::from_collection(&font, 1).unwrap_err();
    assert!(
        matches!(
            err.kind(),
            ParseErrorKind::FontIndexOutOfBounds {
                index: 1,
                font_count: 1
            }
        ),
        "{err:?}"
    );
}

#[test_casing(3, [(0_u32, 4_usize, 31_u64), (2, 3, 33), (6, 2, 39)])]
fn report_for_font(tolerance: u32, expected_regions: usize, expected_total: u64) {
    // Chars: 'A'..='Z', 'a'..='c', 'ё' (0x451), 'є' (0x454)
    let mut map: Vec<(u16, u16)> = expected_chars()
        .into_iter()
        .map(|code| (code.try_into().unwrap(), mapped_glyph(code)))
        .collect();
    map.extend([(0x451, 40), (0x454, 41)]);
    let font = TestFont::new()
        .with_subtable(WINDOWS_BMP.0, WINDOWS_BMP.1, Subtable::Deltas(map))
        .to_bytes();

    let code_points = Font::new(&font).unwrap().code_points().unwrap();
    let report = Report::new(&code_points, tolerance);
    assert_eq!(report.character_count(), 31);
    assert_eq!(report.regions().len(), expected_regions);
    assert_eq!(report.regions().total_covered(), expected_total);

    let report = report.to_string();
    assert!(report.starts_with("<CharacterRegions>\n"), "{report}");
    assert!(
        report.ends_with(&format!(
            "</CharacterRegions>\n\
             The font contains 31 characters\n\
             The spritefont will contain {expected_total} characters\n"
        )),
        "{report}"
    );
}
