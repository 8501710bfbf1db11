//! CLI printing the `<CharacterRegions>` element for all characters supported by a font.

use std::{
    fs,
    io::{self, Write as _},
    path::PathBuf,
};

use anyhow::Context as _;
use char_regions::{Font, Report};
use clap::Parser;
use env_logger::Env;

/// Prints a `<CharacterRegions>` XML element with regions covering all characters
/// supported by a font, for use in `.spritefont` files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the font file (TrueType, OpenType, or a font collection).
    font: PathBuf,
    /// Maximum number of consecutive unsupported characters between two supported ones
    /// for them to still be put in the same region.
    #[arg(short, long, default_value_t = 0)]
    tolerance: u32,
    /// Index of the font in a font collection file.
    #[arg(long, default_value_t = 0)]
    font_index: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let path = args.font.display();

    let bytes = fs::read(&args.font).with_context(|| format!("failed reading font `{path}`"))?;
    let font = Font::from_collection(&bytes, args.font_index)
        .with_context(|| format!("failed parsing font `{path}`"))?;
    let code_points = font
        .code_points()
        .with_context(|| format!("failed reading characters from font `{path}`"))?;
    if code_points.is_empty() {
        log::warn!("font `{path}` does not map any Unicode characters to glyphs");
    }

    let report = Report::new(&code_points, args.tolerance);
    let mut stdout = io::stdout().lock();
    write!(stdout, "{report}")?;
    stdout.flush()?;
    Ok(())
}
