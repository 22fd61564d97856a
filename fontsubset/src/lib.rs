//! Cut TrueType fonts down to the glyphs a piece of text needs and wrap the
//! result as WOFF.
//!
//! The pieces run in a fixed order: [`Font::load`], [`strip_hints`],
//! [`resolve`], [`subset`], [`woff::encode`]. [`subset_to_woff`] does all of
//! them.

pub mod cmap;
pub mod error;
pub mod font;
mod glyf;
pub mod hinting;
pub mod subset;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
pub mod woff;

use log::debug;

pub use cmap::{resolve, CodePoints, GlyphSet};
pub use error::Error;
pub use font::Font;
pub use hinting::strip_hints;
pub use subset::subset;

/// The WOFF bytes of `font_data` reduced to the glyphs used by `text`.
pub fn subset_to_woff(font_data: &[u8], text: &str) -> Result<Vec<u8>, Error> {
    let font = Font::load(font_data)?;
    let font = strip_hints(&font)?;
    let code_points = CodePoints::from_text(text);
    let glyphs = resolve(&font, &code_points)?;
    debug!(
        "{} code points resolved to {} glyphs",
        code_points.len(),
        glyphs.len()
    );
    let subset = subset(&font, &glyphs)?;
    woff::encode(&subset)
}
