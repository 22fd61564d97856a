//! Synthetic fonts for tests.
//!
//! The glyph set is small but covers the cases subsetting cares about:
//! hinted simple glyphs, an empty glyph, a composite, a composite of a
//! composite, components that are not mapped, and a supplementary plane
//! code point.

use std::collections::BTreeMap;

use write_fonts::{
    read::{tables::glyf::CurvePoint, FontData, FontRead},
    tables::{
        cmap::{Cmap, CmapSubtable, EncodingRecord, PlatformId, SequentialMapGroup},
        glyf::{Contour, CompositeGlyph, Glyph, SimpleGlyph},
        head::Head,
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        maxp::Maxp,
        os2::Os2,
        post::Post,
    },
    types::{Tag, Version16Dot16},
};

use crate::{
    cmap::build_cmap,
    font::{Font, CVT, FPGM, GASP, NAME, PREP},
    glyf::write_glyf_loca,
};

pub const NOTDEF: u16 = 0;
pub const A: u16 = 1;
pub const B: u16 = 2;
pub const ACUTE: u16 = 3;
pub const AACUTE: u16 = 4;
pub const SPACE: u16 = 5;
pub const HAN: u16 = 6;
pub const ARING_ACUTE: u16 = 7;
pub const RING: u16 = 8;
pub const GRIN: u16 = 9;

pub const NUM_GLYPHS: u16 = 10;
pub const NUM_H_METRICS: u16 = 8;
pub const ADVANCES: [u16; 10] = [500, 600, 600, 0, 600, 250, 1000, 700, 700, 700];

pub const GSUB: Tag = Tag::new(b"GSUB");

pub const FPGM_BYTES: &[u8] = &[0xB0, 0x00, 0x2C, 0x2D];
pub const PREP_BYTES: &[u8] = &[0xB0, 0x01];
pub const NOTDEF_INSTRUCTIONS: &[u8] = &[0xB0, 0x00];
pub const A_INSTRUCTIONS: &[u8] = &[0xB0, 0x01, 0x2B];
pub const AACUTE_INSTRUCTIONS: &[u8] = &[0xB0, 0x05];

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Which character map the synthetic font carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CmapKind {
    /// Format 4 under (0,3) and (3,1) for every BMP glyph.
    #[default]
    WindowsBmp,
    /// Format 12 under (3,10) only, including U+1F600.
    Ucs4Only,
    /// Format 0 under (1,0) only, ASCII glyphs.
    MacRoman,
    /// Format 4 covering only 中.
    HanOnly,
    /// A cmap table with no subtables.
    Empty,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestFont {
    pub cmap: CmapKind,
}

impl TestFont {
    pub fn with_cmap(cmap: CmapKind) -> TestFont {
        TestFont { cmap }
    }

    pub fn font(&self) -> Font {
        let mut font = Font::default();
        write_glyf_loca(&mut font, &glyphs(), head()).unwrap();
        font.insert_table(&hhea()).unwrap();
        font.insert_table(&maxp()).unwrap();
        font.insert_table(&hmtx()).unwrap();
        font.insert_table(&self.cmap()).unwrap();
        font.insert_table(&post()).unwrap();
        font.insert_table(&os2()).unwrap();
        font.insert(NAME, vec![0, 0, 0, 0, 0, 6]);
        font.insert(GASP, vec![0, 0, 0, 0]);
        font.insert(FPGM, FPGM_BYTES.to_vec());
        font.insert(PREP, PREP_BYTES.to_vec());
        font.insert(CVT, vec![0, 10, 0, 20]);
        font.insert(GSUB, vec![0; 10]);
        font
    }

    /// The font as a TrueType file.
    pub fn build(&self) -> Vec<u8> {
        self.font().to_sfnt()
    }

    fn cmap(&self) -> Cmap {
        match self.cmap {
            CmapKind::WindowsBmp => build_cmap(&bmp_mappings()).unwrap(),
            CmapKind::HanOnly => build_cmap(&BTreeMap::from([('中' as u32, HAN)])).unwrap(),
            CmapKind::Ucs4Only => {
                let mut mappings = bmp_mappings();
                mappings.insert(0x1F600, GRIN);
                let groups = mappings
                    .iter()
                    .map(|(cp, gid)| SequentialMapGroup::new(*cp, *cp, *gid as u32))
                    .collect();
                Cmap::new(vec![EncodingRecord::new(
                    PlatformId::Windows,
                    10,
                    CmapSubtable::format_12(0, groups),
                )])
            }
            CmapKind::MacRoman => {
                let mut glyph_ids = vec![0u8; 256];
                glyph_ids[b' ' as usize] = SPACE as u8;
                glyph_ids[b'A' as usize] = A as u8;
                glyph_ids[b'B' as usize] = B as u8;
                // 0xE7 is Á in Mac Roman, never consulted for non-ASCII code points
                glyph_ids[0xE7] = AACUTE as u8;
                Cmap::new(vec![EncodingRecord::new(
                    PlatformId::Macintosh,
                    0,
                    CmapSubtable::format_0(0, glyph_ids),
                )])
            }
            CmapKind::Empty => Cmap::new(Vec::new()),
        }
    }
}

pub fn bmp_mappings() -> BTreeMap<u32, u16> {
    BTreeMap::from([
        (' ' as u32, SPACE),
        ('A' as u32, A),
        ('B' as u32, B),
        ('Á' as u32, AACUTE),
        ('Ǻ' as u32, ARING_ACUTE),
        ('中' as u32, HAN),
    ])
}

/// A single contour of on-curve points.
pub fn simple_glyph(points: &[(i16, i16)], instructions: &[u8]) -> SimpleGlyph {
    let contour = Contour::from(
        points
            .iter()
            .map(|&(x, y)| CurvePoint::on_curve(x, y))
            .collect::<Vec<_>>(),
    );
    let mut glyph = SimpleGlyph {
        contours: vec![contour],
        instructions: instructions.to_vec(),
        ..Default::default()
    };
    glyph.recompute_bounding_box();
    glyph
}

/// Components are (glyph, dx, dy, scale); scale is F2Dot14 bits.
///
/// Assembled from bytes since composite instructions can only be read, not set.
pub fn composite_glyph(
    components: &[(u16, i16, i16, Option<u16>)],
    instructions: &[u8],
) -> CompositeGlyph {
    let mut raw = Vec::new();
    raw.extend((-1i16).to_be_bytes());
    for v in [0i16, 0, 600, 800] {
        raw.extend(v.to_be_bytes());
    }
    for (i, &(gid, dx, dy, scale)) in components.iter().enumerate() {
        let last = i == components.len() - 1;
        let mut flags = ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES;
        if !last {
            flags |= MORE_COMPONENTS;
        }
        if last && !instructions.is_empty() {
            flags |= WE_HAVE_INSTRUCTIONS;
        }
        if scale.is_some() {
            flags |= WE_HAVE_A_SCALE;
        }
        raw.extend(flags.to_be_bytes());
        raw.extend(gid.to_be_bytes());
        raw.extend(dx.to_be_bytes());
        raw.extend(dy.to_be_bytes());
        if let Some(scale) = scale {
            raw.extend(scale.to_be_bytes());
        }
    }
    if !instructions.is_empty() {
        raw.extend((instructions.len() as u16).to_be_bytes());
        raw.extend_from_slice(instructions);
    }
    CompositeGlyph::read(FontData::new(&raw)).unwrap()
}

pub fn glyphs() -> Vec<Glyph> {
    vec![
        simple_glyph(&[(50, 0), (50, 700), (450, 700), (450, 0)], NOTDEF_INSTRUCTIONS).into(),
        simple_glyph(&[(0, 0), (300, 700), (600, 0)], A_INSTRUCTIONS).into(),
        simple_glyph(&[(50, 0), (50, 700), (550, 700), (550, 0)], &[]).into(),
        simple_glyph(&[(100, 600), (200, 750), (250, 700)], &[]).into(),
        composite_glyph(&[(A, 0, 0, None), (ACUTE, 150, 0, None)], AACUTE_INSTRUCTIONS).into(),
        Glyph::Empty,
        simple_glyph(&[(100, -50), (100, 800), (900, 800), (900, -50)], &[]).into(),
        composite_glyph(&[(AACUTE, 0, 0, None), (RING, 200, 100, Some(0x4000))], &[]).into(),
        simple_glyph(&[(0, 0), (50, 50), (100, 0)], &[]).into(),
        simple_glyph(&[(0, 0), (500, 1000), (1000, 0)], &[]).into(),
    ]
}

fn head() -> Head {
    Head {
        flags: 0x000B,
        units_per_em: 1000,
        y_min: -50,
        x_max: 1000,
        y_max: 1000,
        lowest_rec_ppem: 8,
        ..Default::default()
    }
}

fn hhea() -> Hhea {
    Hhea {
        ascender: 800.into(),
        descender: (-200).into(),
        advance_width_max: 1000.into(),
        number_of_h_metrics: NUM_H_METRICS,
        ..Default::default()
    }
}

fn maxp() -> Maxp {
    Maxp {
        num_glyphs: NUM_GLYPHS,
        max_points: Some(4),
        max_contours: Some(1),
        max_composite_points: Some(7),
        max_composite_contours: Some(3),
        max_zones: Some(2),
        max_twilight_points: Some(4),
        max_storage: Some(8),
        max_function_defs: Some(2),
        max_instruction_defs: Some(1),
        max_stack_elements: Some(16),
        max_size_of_instructions: Some(3),
        max_component_elements: Some(2),
        max_component_depth: Some(2),
    }
}

pub fn lsb(gid: u16) -> i16 {
    gid as i16 * 10
}

fn hmtx() -> Hmtx {
    let h_metrics = (0..NUM_H_METRICS)
        .map(|gid| LongMetric::new(ADVANCES[gid as usize], lsb(gid)))
        .collect();
    let left_side_bearings = (NUM_H_METRICS..NUM_GLYPHS).map(lsb).collect();
    Hmtx::new(h_metrics, left_side_bearings)
}

fn post() -> Post {
    Post {
        version: Version16Dot16::VERSION_3_0,
        ..Default::default()
    }
}

fn os2() -> Os2 {
    Os2 {
        us_first_char_index: 0x20,
        us_last_char_index: 0x4E2D,
        ..Default::default()
    }
}
