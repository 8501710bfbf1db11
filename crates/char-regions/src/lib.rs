//! Contiguous character regions supported by a font, for sprite font pipelines.
//!
//! The crate reads the `cmap` table of an OpenType font (or a font from a collection), collects
//! all Unicode code points mapped to glyphs, and compacts them into ascending character regions.
//! Regions can be emitted as a `<CharacterRegions>` XML element of a `.spritefont` description.
//!
//! # Examples
//!
//! ```
//! use char_regions::{CharacterRegions, SortedCodePoints};
//!
//! let points = SortedCodePoints::try_from(vec![1, 2, 3, 7, 8, 10])?;
//! let regions = points.compact(0);
//! let spans: Vec<_> = regions.iter().map(|r| (r.start(), r.end())).collect();
//! assert_eq!(spans, [(1, 3), (7, 8), (10, 10)]);
//! assert_eq!(regions.total_covered(), 6);
//!
//! // With the tolerance of 1, regions separated by a single missing code point are merged.
//! let regions = points.compact(1);
//! assert_eq!(regions.len(), 2);
//! assert_eq!(regions.total_covered(), 7);
//!
//! let xml = CharacterRegions(&regions).to_string();
//! assert!(xml.starts_with("<CharacterRegions>\n  <CharacterRegion>\n    <Start>&#1;</Start>"));
//! # Ok::<_, char_regions::UnsortedError>(())
//! ```

mod errors;
mod font;
mod regions;
#[cfg(test)]
pub(crate) mod tests;
mod xml;

pub use crate::{
    errors::{ParseError, ParseErrorKind, UnsortedError},
    font::{Font, TableTag},
    regions::{CodePointSet, Region, RegionList, SortedCodePoints},
    xml::{CharacterRegions, Report},
};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
