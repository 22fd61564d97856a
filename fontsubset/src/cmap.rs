//! Code point to glyph resolution through the
//! [cmap](https://learn.microsoft.com/en-us/typography/opentype/spec/cmap) table,
//! and the reduced cmap written into a subset.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};
use write_fonts::{
    read::{
        tables::cmap::{CmapSubtable, PlatformId},
        TableProvider,
    },
    tables::cmap::Cmap,
    types::GlyphId,
};

use crate::{error::Error, font::Font};

const WINDOWS_BMP: (PlatformId, u16) = (PlatformId::Windows, 1);
const WINDOWS_UCS4: (PlatformId, u16) = (PlatformId::Windows, 10);
const UNICODE_BMP: (PlatformId, u16) = (PlatformId::Unicode, 3);
const UNICODE_FULL: (PlatformId, u16) = (PlatformId::Unicode, 4);
const MAC_ROMAN: (PlatformId, u16) = (PlatformId::Macintosh, 0);

/// Encoding records we understand, most preferred first.
const PREFERRED_ENCODINGS: [(PlatformId, u16); 5] =
    [WINDOWS_BMP, UNICODE_BMP, WINDOWS_UCS4, UNICODE_FULL, MAC_ROMAN];

/// The distinct code points of some text, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodePoints(BTreeSet<u32>);

impl CodePoints {
    pub fn from_text(text: &str) -> CodePoints {
        CodePoints(text.chars().map(u32::from).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, code_point: u32) -> bool {
        self.0.contains(&code_point)
    }
}

impl FromIterator<u32> for CodePoints {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        CodePoints(iter.into_iter().collect())
    }
}

/// The glyphs a subset must contain, and the code points that asked for them.
///
/// Glyph 0 (.notdef) is always a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphSet {
    glyphs: BTreeSet<u16>,
    mappings: BTreeMap<u32, u16>,
}

impl Default for GlyphSet {
    fn default() -> Self {
        GlyphSet {
            glyphs: BTreeSet::from([0]),
            mappings: BTreeMap::new(),
        }
    }
}

impl GlyphSet {
    /// Record that `code_point` renders with `gid`.
    pub fn insert(&mut self, code_point: u32, gid: u16) {
        self.glyphs.insert(gid);
        self.mappings.insert(code_point, gid);
    }

    /// Include a glyph without a code point.
    pub fn insert_glyph(&mut self, gid: u16) {
        self.glyphs.insert(gid);
    }

    pub fn glyphs(&self) -> &BTreeSet<u16> {
        &self.glyphs
    }

    pub fn mappings(&self) -> &BTreeMap<u32, u16> {
        &self.mappings
    }

    pub fn contains(&self, gid: u16) -> bool {
        self.glyphs.contains(&gid)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// True if nothing but .notdef is present.
    pub fn only_notdef(&self) -> bool {
        self.glyphs.len() <= 1
    }
}

/// A single cmap subtable chosen from a font's encoding records.
pub struct CharMap<'a> {
    subtable: CmapSubtable<'a>,
    ascii_only: bool,
}

impl<'a> CharMap<'a> {
    /// Select the most preferred supported subtable of the font's cmap.
    pub fn new(font: &'a Font) -> Result<CharMap<'a>, Error> {
        let cmap = font.cmap()?;
        let mut candidates = Vec::new();
        for record in cmap.encoding_records() {
            let encoding = (record.platform_id(), record.encoding_id());
            match record.subtable(cmap.offset_data()) {
                Ok(subtable) => {
                    trace!("cmap record {encoding:?} format {}", subtable.format());
                    candidates.push((encoding, subtable));
                }
                Err(e) => warn!("cmap record {encoding:?} is unreadable, skipped: {e}"),
            }
        }

        PREFERRED_ENCODINGS
            .iter()
            .find_map(|wanted| {
                candidates
                    .iter()
                    .find(|(encoding, subtable)| encoding == wanted && is_supported(subtable))
            })
            .map(|(encoding, subtable)| {
                debug!("Using cmap {encoding:?} format {}", subtable.format());
                CharMap {
                    subtable: subtable.clone(),
                    ascii_only: encoding.0 == PlatformId::Macintosh,
                }
            })
            .ok_or(Error::NoUsableCmap)
    }

    pub fn format(&self) -> u16 {
        self.subtable.format()
    }

    /// The glyph for a code point; `None` if unmapped or mapped to .notdef.
    pub fn map(&self, code_point: u32) -> Option<u16> {
        if self.ascii_only && code_point > 0x7F {
            return None;
        }
        let gid = match &self.subtable {
            CmapSubtable::Format0(subtable) if code_point <= 0xFF => {
                subtable.map_codepoint(code_point)
            }
            CmapSubtable::Format4(subtable) => subtable.map_codepoint(code_point),
            CmapSubtable::Format6(subtable) => subtable.map_codepoint(code_point),
            CmapSubtable::Format12(subtable) => subtable.map_codepoint(code_point),
            _ => None,
        }?;
        // format 12 can point past the 16-bit glyph id space
        u16::try_from(gid.to_u32()).ok().filter(|gid| *gid != 0)
    }
}

fn is_supported(subtable: &CmapSubtable) -> bool {
    matches!(
        subtable,
        CmapSubtable::Format0(_)
            | CmapSubtable::Format4(_)
            | CmapSubtable::Format6(_)
            | CmapSubtable::Format12(_)
    )
}

/// Map code points to the glyphs that render them.
///
/// Unmapped code points are dropped. Fails with [`Error::NoGlyphsFound`]
/// if nothing but .notdef remains.
pub fn resolve(font: &Font, code_points: &CodePoints) -> Result<GlyphSet, Error> {
    let num_glyphs = font.num_glyphs()?;
    let cmap = CharMap::new(font)?;
    let mut glyphs = GlyphSet::default();
    for code_point in code_points.iter() {
        match cmap.map(code_point) {
            Some(gid) if gid < num_glyphs => glyphs.insert(code_point, gid),
            Some(gid) => trace!("U+{code_point:04X} maps to out of range glyph {gid}, dropped"),
            None => trace!("U+{code_point:04X} is not mapped, dropped"),
        }
    }
    if glyphs.only_notdef() {
        return Err(Error::NoGlyphsFound);
    }
    debug!(
        "{} of {} code points resolved to {} glyphs",
        glyphs.mappings().len(),
        code_points.len(),
        glyphs.len()
    );
    Ok(glyphs)
}

/// A cmap for exactly these mappings.
///
/// BMP code points get format 4 subtables under (0,3) and (3,1);
/// supplementary plane code points add format 12 under (0,4) and (3,10).
pub(crate) fn build_cmap(mappings: &BTreeMap<u32, u16>) -> Result<Cmap, Error> {
    let mappings = mappings.iter().filter_map(|(cp, gid)| {
        let ch = char::from_u32(*cp);
        if ch.is_none() {
            warn!("U+{cp:04X} is not a character, left out of cmap");
        }
        ch.map(|ch| (ch, GlyphId::from(*gid)))
    });
    Ok(Cmap::from_mappings(mappings)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use write_fonts::tables::cmap::{CmapSubtable as WriteSubtable, EncodingRecord};

    use crate::{
        error::Error,
        font::{Font, CMAP},
        test_util::{self, CmapKind, TestFont},
    };

    use super::*;

    fn font_with_cmap(cmap: &Cmap) -> Font {
        let mut font = TestFont::default().font();
        font.insert_table(cmap).unwrap();
        font
    }

    #[test]
    fn code_points_are_distinct_and_sorted() {
        let code_points = CodePoints::from_text("BABA 中");
        assert_eq!(
            code_points.iter().collect::<Vec<_>>(),
            vec![0x20, 0x41, 0x42, 0x4E2D]
        );
        assert!(CodePoints::from_text("").is_empty());
    }

    #[test]
    fn glyph_set_starts_with_notdef() {
        let mut glyphs = GlyphSet::default();
        assert!(glyphs.only_notdef());
        assert_eq!(glyphs.len(), 1);
        glyphs.insert('A' as u32, test_util::A);
        assert!(!glyphs.only_notdef());
        assert_eq!(glyphs.len(), 2);
    }

    #[rstest]
    #[case::windows_bmp(CmapKind::WindowsBmp, 4)]
    #[case::ucs4(CmapKind::Ucs4Only, 12)]
    #[case::mac_roman(CmapKind::MacRoman, 0)]
    fn selects_supported_subtable(#[case] kind: CmapKind, #[case] format: u16) {
        let font = TestFont::with_cmap(kind).font();
        assert_eq!(CharMap::new(&font).unwrap().format(), format);
    }

    #[test]
    fn prefers_bmp_over_ucs4() {
        let mut mappings = test_util::bmp_mappings();
        mappings.insert(0x1F600, test_util::GRIN);
        // records for (0,3), (0,4), (3,1) and (3,10)
        let font = font_with_cmap(&build_cmap(&mappings).unwrap());
        let cmap = CharMap::new(&font).unwrap();
        assert_eq!(cmap.format(), 4);
        assert_eq!(cmap.map(0x1F600), None);
    }

    #[test]
    fn no_subtables_is_no_usable_cmap() {
        let font = TestFont::with_cmap(CmapKind::Empty).font();
        assert!(matches!(CharMap::new(&font), Err(Error::NoUsableCmap)));
    }

    #[test]
    fn missing_cmap_is_format_error() {
        let mut font = TestFont::default().font();
        font.remove(CMAP);
        let err = resolve(&font, &CodePoints::from_text("A")).unwrap_err();
        assert!(matches!(err, Error::MissingTable(CMAP)));
        assert!(err.is_format_error());
    }

    #[test]
    fn resolves_mapped_code_points() {
        let font = TestFont::default().font();
        let glyphs = resolve(&font, &CodePoints::from_text("AB中")).unwrap();
        assert_eq!(
            glyphs.glyphs().iter().copied().collect::<Vec<_>>(),
            vec![test_util::NOTDEF, test_util::A, test_util::B, test_util::HAN]
        );
        assert_eq!(glyphs.mappings().get(&('中' as u32)), Some(&test_util::HAN));
    }

    #[test]
    fn drops_unmapped_code_points() {
        let font = TestFont::default().font();
        let glyphs = resolve(&font, &CodePoints::from_text("AZ")).unwrap();
        assert_eq!(glyphs.mappings().len(), 1);
        assert!(glyphs.contains(test_util::A));
        assert!(!glyphs.mappings().contains_key(&('Z' as u32)));
    }

    #[test]
    fn latin_against_han_only_font_finds_nothing() {
        let font = TestFont::with_cmap(CmapKind::HanOnly).font();
        let err = resolve(&font, &CodePoints::from_text("Hello")).unwrap_err();
        assert!(matches!(err, Error::NoGlyphsFound));
        assert!(!err.is_format_error());
    }

    #[test]
    fn empty_text_finds_nothing() {
        let font = TestFont::default().font();
        assert!(matches!(
            resolve(&font, &CodePoints::default()),
            Err(Error::NoGlyphsFound)
        ));
    }

    #[test]
    fn mac_roman_only_maps_ascii() {
        let font = TestFont::with_cmap(CmapKind::MacRoman).font();
        let glyphs = resolve(&font, &CodePoints::from_text("AÁ")).unwrap();
        assert_eq!(glyphs.mappings().len(), 1);
        assert!(glyphs.contains(test_util::A));
        assert!(!glyphs.contains(test_util::AACUTE));
    }

    #[test]
    fn ucs4_maps_supplementary_plane() {
        let font = TestFont::with_cmap(CmapKind::Ucs4Only).font();
        let glyphs = resolve(&font, &CodePoints::from_text("A😀")).unwrap();
        assert!(glyphs.contains(test_util::GRIN));
    }

    #[test]
    fn format6_maps_its_range() {
        let subtable = WriteSubtable::format_6(10 + 2 * 3, 0, 0x41, 3, vec![1, 2, 0]);
        let cmap = Cmap::new(vec![EncodingRecord::new(PlatformId::Windows, 1, subtable)]);
        let font = font_with_cmap(&cmap);
        let charmap = CharMap::new(&font).unwrap();
        assert_eq!(charmap.format(), 6);
        assert_eq!(charmap.map(0x41), Some(1));
        assert_eq!(charmap.map(0x42), Some(2));
        // mapped to .notdef
        assert_eq!(charmap.map(0x43), None);
        assert_eq!(charmap.map(0x44), None);
        assert_eq!(charmap.map(0x40), None);
    }

    #[test]
    fn out_of_range_glyphs_are_dropped() {
        let cmap = build_cmap(&BTreeMap::from([(0x41, 1), (0x42, 500)])).unwrap();
        let font = font_with_cmap(&cmap);
        let glyphs = resolve(&font, &CodePoints::from_text("AB")).unwrap();
        assert_eq!(glyphs.mappings().len(), 1);
    }

    #[test]
    fn built_cmap_round_trips_through_lookup() {
        // a delta run, a broken run and a stray code point
        let mut mappings = BTreeMap::new();
        for (i, cp) in (0x41..0x45).enumerate() {
            mappings.insert(cp, 10 + i as u16);
        }
        for (i, cp) in (0x100..0x110).enumerate() {
            mappings.insert(cp, if i % 2 == 0 { 50 + i as u16 } else { 7 });
        }
        mappings.insert(0x4E2D, 3);
        let font = font_with_cmap(&build_cmap(&mappings).unwrap());
        let cmap = CharMap::new(&font).unwrap();
        for (cp, gid) in mappings.iter() {
            assert_eq!(cmap.map(*cp), Some(*gid), "U+{cp:04X}");
        }
        assert_eq!(cmap.map(0x45), None);
        assert_eq!(cmap.map(0xFFFF), None);
    }

    fn encodings(font: &Font) -> Vec<(PlatformId, u16, u16)> {
        let cmap = font.cmap().unwrap();
        cmap.encoding_records()
            .iter()
            .map(|record| {
                let format = record.subtable(cmap.offset_data()).unwrap().format();
                (record.platform_id(), record.encoding_id(), format)
            })
            .collect()
    }

    #[test]
    fn bmp_mappings_get_format4_only() {
        let font = font_with_cmap(&build_cmap(&test_util::bmp_mappings()).unwrap());
        assert_eq!(
            encodings(&font),
            vec![(PlatformId::Unicode, 3, 4), (PlatformId::Windows, 1, 4)]
        );
    }

    #[test]
    fn supplementary_mappings_add_format12() {
        let mappings = BTreeMap::from([(0x41, 1), (0x1F600, 2), (0x1F601, 3)]);
        let font = font_with_cmap(&build_cmap(&mappings).unwrap());
        assert_eq!(
            encodings(&font),
            vec![
                (PlatformId::Unicode, 3, 4),
                (PlatformId::Unicode, 4, 12),
                (PlatformId::Windows, 1, 4),
                (PlatformId::Windows, 10, 12)
            ]
        );
    }

    #[test]
    fn surrogates_are_left_out() {
        let cmap = build_cmap(&BTreeMap::from([(0x41, 1), (0xD800, 2)])).unwrap();
        let font = font_with_cmap(&cmap);
        let charmap = CharMap::new(&font).unwrap();
        assert_eq!(charmap.map(0x41), Some(1));
        assert_eq!(charmap.map(0xD800), None);
    }
}
