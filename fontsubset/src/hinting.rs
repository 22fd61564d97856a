//! Removes TrueType hinting.
//!
//! Hinting only helps rasterizers at small sizes and is a large share of a
//! small subset, so it goes before subsetting.

use log::debug;
use write_fonts::{
    from_obj::ToOwnedTable,
    read::TableProvider,
    tables::maxp::Maxp,
    types::Tag,
};

use crate::{
    error::Error,
    font::{Font, CVT, DSIG, FPGM, GLYF, HDMX, LTSH, MAXP, PREP, VDMX},
    glyf::{strip_instructions, write_glyf_loca, Glyphs},
};

/// Tables that only exist to support hinting, or are invalidated by its removal.
const HINTING_TABLES: [Tag; 7] = [FPGM, PREP, CVT, HDMX, LTSH, VDMX, DSIG];

/// A copy of the font with instructions and hinting tables removed.
pub fn strip_hints(font: &Font) -> Result<Font, Error> {
    let mut stripped = font.clone();
    for tag in HINTING_TABLES {
        if stripped.remove(tag).is_some() {
            debug!("Dropped '{tag}'");
        }
    }

    if font.contains(GLYF) {
        let glyphs = Glyphs::new(font)?;
        let plain = (0..glyphs.num_glyphs())
            .map(|gid| strip_instructions(gid, glyphs.owned(gid)?))
            .collect::<Result<Vec<_>, _>>()?;
        write_glyf_loca(&mut stripped, &plain, font.head()?.to_owned_table())?;
        debug!(
            "Stripped glyf from {} to {} bytes",
            font.table(GLYF).map(<[u8]>::len).unwrap_or_default(),
            stripped.table(GLYF).map(<[u8]>::len).unwrap_or_default()
        );
    }

    // maxp 0.5 (CFF) has no hinting fields
    if font.contains(MAXP) {
        let mut maxp: Maxp = font.maxp()?.to_owned_table();
        if maxp.max_zones.is_some() {
            maxp.max_zones = Some(1);
            maxp.max_twilight_points = Some(0);
            maxp.max_storage = Some(0);
            maxp.max_function_defs = Some(0);
            maxp.max_instruction_defs = Some(0);
            maxp.max_stack_elements = Some(0);
            maxp.max_size_of_instructions = Some(0);
            stripped.insert_table(&maxp)?;
        }
    }

    Ok(stripped)
}
