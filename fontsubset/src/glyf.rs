//! Reading and writing [glyf](https://learn.microsoft.com/en-us/typography/opentype/spec/glyf)
//! and [loca](https://learn.microsoft.com/en-us/typography/opentype/spec/loca).
//!
//! Glyphs are read through loca, converted to owned glyphs for editing and
//! compiled back with [`GlyfLocaBuilder`].

use write_fonts::{
    from_obj::FromTableRef,
    read::{
        tables::{glyf as read_glyf, loca::Loca},
        TableProvider,
    },
    tables::{
        glyf::{Component, CompositeGlyph, GlyfLocaBuilder, Glyph},
        head::Head,
        loca::LocaFormat,
    },
    types::{GlyphId, GlyphId16},
};

use crate::{
    error::{Error, TableProblem},
    font::{Font, GLYF},
};

/// The glyf table of a font, indexed through loca.
pub(crate) struct Glyphs<'a> {
    glyf: read_glyf::Glyf<'a>,
    loca: Loca<'a>,
    num_glyphs: u16,
}

impl<'a> Glyphs<'a> {
    pub(crate) fn new(font: &'a Font) -> Result<Glyphs<'a>, Error> {
        Ok(Glyphs {
            glyf: font.glyf()?,
            loca: font.loca(None)?,
            num_glyphs: font.num_glyphs()?,
        })
    }

    pub(crate) fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// The outline of a glyph; `None` if it has none.
    pub(crate) fn get(&self, gid: u16) -> Result<Option<read_glyf::Glyph<'a>>, Error> {
        let unreadable = || Error::malformed(GLYF, TableProblem::UnreadableGlyph { glyph: gid });
        if gid >= self.num_glyphs {
            return Err(unreadable());
        }
        self.loca
            .get_glyf(GlyphId::from(gid), &self.glyf)
            .map_err(|_| unreadable())
    }

    /// An owned copy of a glyph, ready to be edited and written.
    pub(crate) fn owned(&self, gid: u16) -> Result<Glyph, Error> {
        Ok(self
            .get(gid)?
            .map(|glyph| Glyph::from_table_ref(&glyph))
            .unwrap_or(Glyph::Empty))
    }

    /// The glyphs a composite glyph is built from; empty for anything else.
    pub(crate) fn component_ids(&self, gid: u16) -> Result<Vec<u16>, Error> {
        Ok(match self.get(gid)? {
            Some(read_glyf::Glyph::Composite(composite)) => composite
                .components()
                .map(|component| component.glyph.to_u16())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// Rebuild a composite with each component glyph id passed through `glyph_id`.
///
/// The rebuilt glyph carries no instructions.
fn rebuild_composite(
    gid: u16,
    composite: &CompositeGlyph,
    mut glyph_id: impl FnMut(u16) -> Result<u16, Error>,
) -> Result<CompositeGlyph, Error> {
    // try_from_iter keeps the first box it's given
    let bbox = composite.bbox;
    let components = composite
        .components()
        .iter()
        .map(|component| {
            let glyph = GlyphId16::new(glyph_id(component.glyph.to_u16())?);
            Ok((
                Component {
                    glyph,
                    ..component.clone()
                },
                bbox,
            ))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    CompositeGlyph::try_from_iter(components)
        .map_err(|_| Error::malformed(GLYF, TableProblem::UnreadableGlyph { glyph: gid }))
}

/// The glyph without TrueType instructions.
pub(crate) fn strip_instructions(gid: u16, glyph: Glyph) -> Result<Glyph, Error> {
    Ok(match glyph {
        Glyph::Simple(mut simple) => {
            simple.instructions.clear();
            Glyph::Simple(simple)
        }
        Glyph::Composite(composite) => Glyph::Composite(rebuild_composite(gid, &composite, Ok)?),
        Glyph::Empty => Glyph::Empty,
    })
}

/// The glyph with component references renumbered through `glyph_id`.
pub(crate) fn remap_components(
    gid: u16,
    glyph: Glyph,
    glyph_id: impl FnMut(u16) -> Result<u16, Error>,
) -> Result<Glyph, Error> {
    match glyph {
        Glyph::Composite(composite) => Ok(Glyph::Composite(rebuild_composite(
            gid, &composite, glyph_id,
        )?)),
        other => Ok(other),
    }
}

/// Compile glyf and loca into `font`, along with `head` updated for the
/// loca format the glyphs needed.
pub(crate) fn write_glyf_loca(
    font: &mut Font,
    glyphs: &[Glyph],
    mut head: Head,
) -> Result<LocaFormat, Error> {
    let mut builder = GlyfLocaBuilder::new();
    for glyph in glyphs {
        builder.add_glyph(glyph).map_err(|e| Error::dump(GLYF, e))?;
    }
    let (glyf, loca, format) = builder.build();
    head.index_to_loc_format = format as i16;
    font.insert_table(&glyf)?;
    font.insert_table(&loca)?;
    font.insert_table(&head)?;
    Ok(format)
}
