//! `<CharacterRegions>` XML emission.

use core::fmt;

use crate::{CodePointSet, Region, RegionList};

/// `<CharacterRegions>` element of a sprite font description, with one `<CharacterRegion>`
/// per region. Code points are written as decimal numeric character references.
///
/// The element is produced via the [`Display`](fmt::Display) implementation; each line
/// (including the last one) is terminated with `\n`.
#[derive(Debug, Clone, Copy)]
pub struct CharacterRegions<'a>(pub &'a RegionList);

impl fmt::Display for CharacterRegions<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "<CharacterRegions>")?;
        for region in self.0 {
            write_region(formatter, region)?;
        }
        writeln!(formatter, "</CharacterRegions>")
    }
}

fn write_region(formatter: &mut fmt::Formatter<'_>, region: &Region) -> fmt::Result {
    writeln!(formatter, "  <CharacterRegion>")?;
    writeln!(formatter, "    <Start>&#{};</Start>", region.start())?;
    writeln!(formatter, "    <End>&#{};</End>", region.end())?;
    writeln!(formatter, "  </CharacterRegion>")
}

/// Report on the characters supported by a font: the [`CharacterRegions`] element followed
/// by the number of supported characters and the number of characters spanned by the regions.
#[derive(Debug, Clone)]
pub struct Report {
    character_count: usize,
    regions: RegionList,
}

impl Report {
    /// Compacts `code_points` into regions with the specified gap tolerance and creates a report.
    pub fn new(code_points: &CodePointSet, tolerance: u32) -> Self {
        Self {
            character_count: code_points.len(),
            regions: code_points.to_sorted().compact(tolerance),
        }
    }

    /// Returns the number of characters supported by the font.
    pub fn character_count(&self) -> usize {
        self.character_count
    }

    /// Returns the compacted regions.
    pub fn regions(&self) -> &RegionList {
        &self.regions
    }
}

impl fmt::Display for Report {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&CharacterRegions(&self.regions), formatter)?;
        writeln!(
            formatter,
            "The font contains {} characters",
            self.character_count
        )?;
        writeln!(
            formatter,
            "The spritefont will contain {} characters",
            self.regions.total_covered()
        )
    }
}
