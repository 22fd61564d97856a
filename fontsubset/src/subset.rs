//! Reduce a font to a set of glyphs.
//!
//! Glyphs are renumbered densely in their original order, so .notdef stays
//! glyph 0. Every table that refers to glyph ids is rebuilt; tables that might
//! and that we don't understand (layout, kerning, vertical metrics) are dropped.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use write_fonts::{
    from_obj::ToOwnedTable,
    read::TableProvider,
    tables::{
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        maxp::Maxp,
        os2::Os2,
        post::Post,
    },
    types::{GlyphId, Tag, Version16Dot16},
};

use crate::{
    cmap::{build_cmap, GlyphSet},
    error::{BuildProblem, Error, TableProblem},
    font::{Font, CVT, FPGM, GASP, GLYF, HMTX, MAXP, NAME, OS2, PREP},
    glyf::{remap_components, write_glyf_loca, Glyphs},
};

/// Tables copied through unchanged; none of them reference glyph ids.
///
/// OS/2 is replaced by an updated copy when it can be read.
const PASSTHROUGH_TABLES: [Tag; 6] = [OS2, NAME, GASP, CVT, FPGM, PREP];

/// Old glyph id to new glyph id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMap {
    old_to_new: BTreeMap<u16, u16>,
}

impl GlyphMap {
    fn new(retained: &BTreeSet<u16>) -> Result<GlyphMap, Error> {
        let too_many = || Error::build(MAXP, BuildProblem::TooManyGlyphs(retained.len()));
        // numGlyphs is a u16 too
        u16::try_from(retained.len()).map_err(|_| too_many())?;
        let old_to_new = retained
            .iter()
            .enumerate()
            .map(|(new, old)| u16::try_from(new).map(|new| (*old, new)).map_err(|_| too_many()))
            .collect::<Result<_, _>>()?;
        Ok(GlyphMap { old_to_new })
    }

    pub fn get(&self, old: u16) -> Option<u16> {
        self.old_to_new.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.old_to_new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old_to_new.is_empty()
    }

    /// Old glyph ids in new glyph id order.
    pub fn old_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.old_to_new.keys().copied()
    }
}

/// The requested glyphs plus every glyph they use as a component, transitively.
pub(crate) fn closure(glyphs: &Glyphs, requested: &BTreeSet<u16>) -> Result<BTreeSet<u16>, Error> {
    let num_glyphs = glyphs.num_glyphs();
    let mut retained = BTreeSet::new();
    let mut pending: Vec<u16> = requested.iter().copied().collect();
    pending.push(0);

    while let Some(gid) = pending.pop() {
        if gid >= num_glyphs {
            return Err(Error::build(GLYF, BuildProblem::GlyphOutOfRange(gid)));
        }
        // a glyph already seen, also ends component cycles
        if !retained.insert(gid) {
            continue;
        }
        for component in glyphs.component_ids(gid)? {
            if component >= num_glyphs {
                return Err(Error::malformed(
                    GLYF,
                    TableProblem::DanglingComponent {
                        glyph: gid,
                        component,
                    },
                ));
            }
            if !retained.contains(&component) {
                trace!("Glyph {gid} pulls in component {component}");
                pending.push(component);
            }
        }
    }
    Ok(retained)
}

/// hmtx for the retained glyphs plus the matching hhea.
///
/// A trailing run of equal advances is written as side bearings only.
fn hmtx_hhea(font: &Font, glyph_map: &GlyphMap) -> Result<(Hmtx, Hhea), Error> {
    let hmtx = font.hmtx()?;
    let metrics = glyph_map
        .old_ids()
        .map(|old| {
            let gid = GlyphId::from(old);
            hmtx.advance(gid)
                .zip(hmtx.side_bearing(gid))
                .ok_or(Error::malformed(HMTX, TableProblem::MissingMetrics { glyph: old }))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let final_advance = metrics.last().map(|m| m.0).unwrap_or_default();
    let run = metrics
        .iter()
        .rev()
        .take_while(|m| m.0 == final_advance)
        .count();
    // the first glyph of the run keeps its advance
    let num_long = (metrics.len() + 1 - run).min(metrics.len());

    let (long, short) = metrics.split_at(num_long);
    let h_metrics = long
        .iter()
        .map(|(advance, lsb)| LongMetric::new(*advance, *lsb))
        .collect();
    let left_side_bearings = short.iter().map(|(_, lsb)| *lsb).collect();

    let mut hhea: Hhea = font.hhea()?.to_owned_table();
    hhea.number_of_h_metrics = num_long as u16;
    Ok((Hmtx::new(h_metrics, left_side_bearings), hhea))
}

/// post version 3: the metrics header without glyph names.
fn post(font: &Font) -> Option<Post> {
    let mut post: Post = match font.post() {
        Ok(post) => post.to_owned_table(),
        Err(e) => {
            trace!("No usable post, left out: {e}");
            return None;
        }
    };
    post.version = Version16Dot16::VERSION_3_0;
    post.num_glyphs = None;
    post.glyph_name_index = None;
    post.string_data = None;
    Some(post)
}

/// OS/2 with the first/last character index of the retained code points.
fn os2(font: &Font, glyph_set: &GlyphSet) -> Option<Os2> {
    let mut os2: Os2 = font.os2().ok()?.to_owned_table();
    let mappings = glyph_set.mappings();
    if let (Some(first), Some(last)) = (mappings.keys().next(), mappings.keys().next_back()) {
        os2.us_first_char_index = (*first).min(0xFFFF) as u16;
        os2.us_last_char_index = (*last).min(0xFFFF) as u16;
    }
    Some(os2)
}

/// Build a font with only the glyphs of `glyph_set`, and their components.
pub fn subset(font: &Font, glyph_set: &GlyphSet) -> Result<Font, Error> {
    let glyphs = Glyphs::new(font)?;
    let retained = closure(&glyphs, glyph_set.glyphs())?;
    let glyph_map = GlyphMap::new(&retained)?;
    debug!(
        "Subsetting {} requested glyphs, {} after closure, of {}",
        glyph_set.len(),
        glyph_map.len(),
        glyphs.num_glyphs()
    );

    let mut subset = Font::default();
    for tag in PASSTHROUGH_TABLES {
        if let Some(data) = font.table(tag) {
            subset.insert(tag, data.to_vec());
        }
    }

    let renumbered = glyph_map
        .old_ids()
        .map(|old| {
            // closure guarantees every component is retained
            remap_components(old, glyphs.owned(old)?, |component| {
                glyph_map
                    .get(component)
                    .ok_or(Error::build(GLYF, BuildProblem::GlyphOutOfRange(component)))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    write_glyf_loca(&mut subset, &renumbered, font.head()?.to_owned_table())?;

    let (hmtx, hhea) = hmtx_hhea(font, &glyph_map)?;
    subset.insert_table(&hmtx)?;
    subset.insert_table(&hhea)?;

    let mut maxp: Maxp = font.maxp()?.to_owned_table();
    maxp.num_glyphs = glyph_map.len() as u16;
    subset.insert_table(&maxp)?;

    let mappings = glyph_set
        .mappings()
        .iter()
        .filter_map(|(cp, old)| glyph_map.get(*old).map(|new| (*cp, new)))
        .collect();
    subset.insert_table(&build_cmap(&mappings)?)?;

    if let Some(post) = post(font) {
        subset.insert_table(&post)?;
    }
    if let Some(os2) = os2(font, glyph_set) {
        subset.insert_table(&os2)?;
    }

    subset.update_checksum_adjustment()?;
    Ok(subset)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use more_asserts::assert_lt;
    use pretty_assertions::assert_eq;
    use skrifa::{FontRef, MetadataProvider};
    use write_fonts::tables::{glyf::Glyph, head::Head};

    use crate::{
        cmap::{resolve, CodePoints, GlyphSet},
        error::{BuildProblem, Error, TableProblem},
        font::{Font, CMAP, GLYF, NAME},
        hinting::strip_hints,
        test_util::{self, TestFont, GSUB},
    };

    use super::*;

    fn subset_text(text: &str) -> Font {
        let font = TestFont::default().font();
        let glyphs = resolve(&font, &CodePoints::from_text(text)).unwrap();
        subset(&font, &glyphs).unwrap()
    }

    fn glyph_set(glyphs: &[u16]) -> GlyphSet {
        let mut set = GlyphSet::default();
        for gid in glyphs {
            set.insert_glyph(*gid);
        }
        set
    }

    /// Swap in a new glyf/loca/maxp for a handful of glyphs.
    fn replace_glyphs(font: &mut Font, glyphs: Vec<Glyph>) {
        let head: Head = (&*font).head().unwrap().to_owned_table();
        let mut maxp: Maxp = (&*font).maxp().unwrap().to_owned_table();
        maxp.num_glyphs = glyphs.len() as u16;
        write_glyf_loca(font, &glyphs, head).unwrap();
        font.insert_table(&maxp).unwrap();
    }

    #[test]
    fn closure_pulls_in_nested_components() {
        let font = TestFont::default().font();
        let glyphs = Glyphs::new(&font).unwrap();
        let retained = closure(&glyphs, &BTreeSet::from([test_util::ARING_ACUTE])).unwrap();
        assert_eq!(
            retained.into_iter().collect::<Vec<_>>(),
            vec![
                test_util::NOTDEF,
                test_util::A,
                test_util::ACUTE,
                test_util::AACUTE,
                test_util::ARING_ACUTE,
                test_util::RING
            ]
        );
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let mut font = TestFont::default().font();
        // glyph 1 <-> glyph 2
        replace_glyphs(
            &mut font,
            vec![
                test_util::simple_glyph(&[(0, 0), (1, 1)], &[]).into(),
                test_util::composite_glyph(&[(2, 0, 0, None)], &[]).into(),
                test_util::composite_glyph(&[(1, 0, 0, None)], &[]).into(),
            ],
        );
        let glyphs = Glyphs::new(&font).unwrap();
        let retained = closure(&glyphs, &BTreeSet::from([1])).unwrap();
        assert_eq!(retained, BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn dangling_component_is_format_error() {
        let mut font = TestFont::default().font();
        replace_glyphs(
            &mut font,
            vec![
                test_util::simple_glyph(&[(0, 0), (1, 1)], &[]).into(),
                test_util::composite_glyph(&[(40, 0, 0, None)], &[]).into(),
            ],
        );
        let err = subset(&font, &glyph_set(&[1])).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedTable {
                problem: TableProblem::DanglingComponent {
                    glyph: 1,
                    component: 40
                },
                ..
            }
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn requested_glyph_out_of_range_is_build_error() {
        let font = TestFont::default().font();
        assert!(matches!(
            subset(&font, &glyph_set(&[99])),
            Err(Error::SubsetBuild {
                problem: BuildProblem::GlyphOutOfRange(99),
                ..
            })
        ));
    }

    #[test]
    fn composite_references_resolve_after_renumbering() {
        let subset = subset_text("Ǻ");
        let glyphs = Glyphs::new(&subset).unwrap();
        assert_eq!(glyphs.num_glyphs(), 6);

        // old ids 0,1,3,4,7,8 become 0..6; Ǻ (7) is now 4
        assert_eq!(glyphs.component_ids(4).unwrap(), vec![3, 5]);
        assert_eq!(glyphs.component_ids(3).unwrap(), vec![1, 2]);

        // every component points at a real, non-empty glyph
        for gid in 0..glyphs.num_glyphs() {
            for component in glyphs.component_ids(gid).unwrap() {
                assert_lt!(component, glyphs.num_glyphs());
                assert!(glyphs.get(component).unwrap().is_some());
            }
        }
    }

    #[test]
    fn renumbered_composite_keeps_placement() {
        let font = TestFont::default().font();
        let subset = subset_text("Ǻ");
        let (Glyph::Composite(before), Glyph::Composite(after)) = (
            Glyphs::new(&font).unwrap().owned(test_util::ARING_ACUTE).unwrap(),
            Glyphs::new(&subset).unwrap().owned(4).unwrap(),
        ) else {
            panic!("Ǻ should stay a composite");
        };
        assert_eq!(after.bbox, before.bbox);
        let placement = |glyph: &write_fonts::tables::glyf::CompositeGlyph| {
            glyph
                .components()
                .iter()
                .map(|c| (c.anchor, c.transform))
                .collect::<Vec<_>>()
        };
        assert_eq!(placement(&after), placement(&before));
    }

    #[test]
    fn cmap_covers_only_requested_code_points() {
        let subset = subset_text("BÁ");
        let data = subset.to_sfnt();
        let font = FontRef::new(&data).unwrap();
        let charmap = font.charmap();
        // old 0,1,2,3,4 are all retained (Á needs A and acute)
        assert_eq!(charmap.map('B').map(|g| g.to_u32()), Some(2));
        assert_eq!(charmap.map('Á').map(|g| g.to_u32()), Some(4));
        // A is retained as a component but was not requested
        assert_eq!(charmap.map('A'), None);
        assert_eq!(charmap.map('中'), None);
        assert_eq!(subset.num_glyphs().unwrap(), 5);
    }

    #[test]
    fn unmapped_code_points_are_simply_absent() {
        let subset = subset_text("AZ");
        let data = subset.to_sfnt();
        let font = FontRef::new(&data).unwrap();
        assert_eq!(font.charmap().map('A').map(|g| g.to_u32()), Some(1));
        assert_eq!(font.charmap().map('Z'), None);
        assert_eq!(subset.num_glyphs().unwrap(), 2);
    }

    #[test]
    fn maxp_keeps_everything_but_glyph_count() {
        let font = TestFont::default().font();
        let subset = subset_text("A");
        let mut expected: Maxp = (&font).maxp().unwrap().to_owned_table();
        expected.num_glyphs = 2;
        let actual: Maxp = (&subset).maxp().unwrap().to_owned_table();
        assert_eq!(actual, expected);
    }

    #[test]
    fn metrics_follow_glyphs() {
        // old ids 0, 2, 6, 9: 9 is past numberOfHMetrics in the source
        let font = TestFont::default().font();
        let subset = subset(&font, &glyph_set(&[test_util::B, test_util::HAN, test_util::GRIN])).unwrap();
        let subset = &subset;
        // advances 500, 600, 1000, 700: no trailing run to fold
        assert_eq!(subset.hhea().unwrap().number_of_h_metrics(), 4);
        let hmtx = subset.hmtx().unwrap();
        assert_eq!(
            hmtx.h_metrics().iter().map(|m| m.advance()).collect::<Vec<_>>(),
            vec![500, 600, 1000, 700]
        );
        assert_eq!(
            hmtx.h_metrics().iter().map(|m| m.side_bearing()).collect::<Vec<_>>(),
            vec![
                test_util::lsb(0),
                test_util::lsb(test_util::B),
                test_util::lsb(test_util::HAN),
                test_util::lsb(test_util::GRIN)
            ]
        );
        assert!(hmtx.left_side_bearings().is_empty());
    }

    #[test]
    fn trailing_equal_advances_fold_into_side_bearings() {
        // old ids 0, 6, 8, 9: advances 500, 1000, 700, 700
        let font = TestFont::default().font();
        let subset = subset(&font, &glyph_set(&[test_util::HAN, test_util::RING, test_util::GRIN])).unwrap();
        let subset = &subset;
        assert_eq!(subset.hhea().unwrap().number_of_h_metrics(), 3);
        assert_eq!(subset.table(HMTX).unwrap().len(), 3 * 4 + 2);

        let hmtx = subset.hmtx().unwrap();
        assert_eq!(hmtx.advance(GlyphId::new(3)), Some(700));
        assert_eq!(
            hmtx.side_bearing(GlyphId::new(3)),
            Some(test_util::lsb(test_util::GRIN))
        );
    }

    #[test]
    fn missing_metrics_is_format_error() {
        let mut font = TestFont::default().font();
        let mut hhea: Hhea = (&font).hhea().unwrap().to_owned_table();
        hhea.number_of_h_metrics = 0;
        font.insert_table(&hhea).unwrap();
        font.insert_table(&Hmtx::new(Vec::new(), vec![0; 10])).unwrap();
        let err = subset(&font, &glyph_set(&[test_util::A])).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedTable {
                problem: TableProblem::MissingMetrics { glyph: 0 },
                ..
            }
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn drops_layout_and_rewrites_post() {
        let subset = subset_text("A");
        assert!(!subset.contains(GSUB));
        assert!(subset.contains(NAME));
        let post = (&subset).post().unwrap();
        assert_eq!(post.version(), Version16Dot16::VERSION_3_0);
        assert_eq!(post.offset_data().len(), 32);
    }

    #[test]
    fn os2_char_range_tracks_retained_code_points() {
        let subset = subset_text("B中");
        let os2 = (&subset).os2().unwrap();
        assert_eq!(os2.us_first_char_index(), 0x42);
        assert_eq!(os2.us_last_char_index(), 0x4E2D);
    }

    #[test]
    fn hint_stripped_subset_is_smaller() {
        let font = TestFont::default().font();
        let stripped = strip_hints(&font).unwrap();
        let glyphs = resolve(&stripped, &CodePoints::from_text("AÁ")).unwrap();
        let hinted = subset(&font, &glyphs).unwrap();
        let plain = subset(&stripped, &glyphs).unwrap();
        assert_lt!(
            plain.table(GLYF).unwrap().len(),
            hinted.table(GLYF).unwrap().len()
        );
        assert!(!plain.contains(crate::font::FPGM));
    }

    #[test]
    fn subset_is_deterministic() {
        assert_eq!(subset_text("BA中"), subset_text("中AB"));
        assert_eq!(subset_text("BA").to_sfnt(), subset_text("BA").to_sfnt());
    }

    #[test]
    fn output_cmap_is_readable_again() {
        let subset = subset_text("AB");
        let glyphs = resolve(&subset, &CodePoints::from_text("AB")).unwrap();
        assert_eq!(glyphs.glyphs(), &BTreeSet::from([0, 1, 2]));
        assert!(subset.contains(CMAP));
    }
}
