//! An owned table directory.
//!
//! Every transform in this crate takes a [`Font`] by reference and hands back a
//! new one; the source bytes of a table are never edited in place. Typed reads
//! go through [`TableProvider`], typed writes through [`Font::insert_table`].

use std::collections::BTreeMap;

use log::trace;
use write_fonts::{
    dump_table,
    read::{FileRef, FontData, FontRef, TableProvider, TopLevelTable},
    types::Tag,
    validate::Validate,
    FontBuilder, FontWrite,
};

use crate::error::{Error, TableProblem};

pub const CFF: Tag = Tag::new(b"CFF ");
pub const CMAP: Tag = Tag::new(b"cmap");
pub const CVT: Tag = Tag::new(b"cvt ");
pub const DSIG: Tag = Tag::new(b"DSIG");
pub const FPGM: Tag = Tag::new(b"fpgm");
pub const GASP: Tag = Tag::new(b"gasp");
pub const GLYF: Tag = Tag::new(b"glyf");
pub const HDMX: Tag = Tag::new(b"hdmx");
pub const HEAD: Tag = Tag::new(b"head");
pub const HHEA: Tag = Tag::new(b"hhea");
pub const HMTX: Tag = Tag::new(b"hmtx");
pub const LOCA: Tag = Tag::new(b"loca");
pub const LTSH: Tag = Tag::new(b"LTSH");
pub const MAXP: Tag = Tag::new(b"maxp");
pub const NAME: Tag = Tag::new(b"name");
pub const OS2: Tag = Tag::new(b"OS/2");
pub const POST: Tag = Tag::new(b"post");
pub const PREP: Tag = Tag::new(b"prep");
pub const VDMX: Tag = Tag::new(b"VDMX");

const TRUETYPE_FLAVOR: u32 = 0x0001_0000;
const CFF_FLAVOR: u32 = 0x4F54_544F; // 'OTTO'

/// A font as a map of tag to table bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Font {
    tables: BTreeMap<Tag, Vec<u8>>,
}

impl<'a> TableProvider<'a> for &'a Font {
    fn data_for_tag(&self, tag: Tag) -> Option<FontData<'a>> {
        let font: &'a Font = self;
        font.tables.get(&tag).map(|data| FontData::new(data))
    }
}

impl Font {
    pub fn new(tables: BTreeMap<Tag, Vec<u8>>) -> Font {
        Font { tables }
    }

    /// Load a TrueType/OpenType font, or the first face of a collection.
    pub fn load(data: &[u8]) -> Result<Font, Error> {
        let font = match FileRef::new(data)? {
            FileRef::Font(font) => font,
            FileRef::Collection(collection) => collection.get(0)?,
        };
        let tables = font
            .table_directory
            .table_records()
            .iter()
            .map(|record| {
                let tag = record.tag();
                let data = font.table_data(tag).ok_or(Error::malformed(
                    tag,
                    TableProblem::Truncated {
                        offset: record.offset() as usize,
                    },
                ))?;
                Ok((tag, data.as_bytes().to_vec()))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()?;
        trace!("Loaded {} tables", tables.len());
        Ok(Font { tables })
    }

    pub fn table(&self, tag: Tag) -> Option<&[u8]> {
        self.tables.get(&tag).map(Vec::as_slice)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tables.contains_key(&tag)
    }

    pub fn insert(&mut self, tag: Tag, data: Vec<u8>) {
        self.tables.insert(tag, data);
    }

    /// Compile a table and store it under its own tag.
    pub fn insert_table<T>(&mut self, table: &T) -> Result<(), Error>
    where
        T: FontWrite + Validate + TopLevelTable,
    {
        let data = dump_table(table).map_err(|e| Error::dump(T::TAG, e))?;
        trace!("Wrote '{}', {} bytes", T::TAG, data.len());
        self.insert(T::TAG, data);
        Ok(())
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Vec<u8>> {
        self.tables.remove(&tag)
    }

    /// Tables in tag order.
    pub fn tables(&self) -> impl Iterator<Item = (Tag, &[u8])> + '_ {
        self.tables.iter().map(|(tag, data)| (*tag, data.as_slice()))
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn num_glyphs(&self) -> Result<u16, Error> {
        Ok(self.maxp()?.num_glyphs())
    }

    /// The sfnt version tag: TrueType outlines unless there's a CFF table.
    pub fn flavor(&self) -> u32 {
        if self.contains(CFF) {
            CFF_FLAVOR
        } else {
            TRUETYPE_FLAVOR
        }
    }

    /// Size of the font when laid out as an sfnt with 4-byte aligned tables.
    pub fn sfnt_size(&self) -> usize {
        12 + 16 * self.tables.len()
            + self
                .tables
                .values()
                .map(|data| padded_len(data.len()))
                .sum::<usize>()
    }

    /// Recompute `head.checksumAdjustment` for the current table set.
    ///
    /// The value is the one [`Font::to_sfnt`] writes, so the stored head and
    /// the serialized head agree.
    pub(crate) fn update_checksum_adjustment(&mut self) -> Result<(), Error> {
        let sfnt = self.to_sfnt();
        let head = FontRef::new(&sfnt)?.head()?.offset_data().as_bytes().to_vec();
        self.insert(HEAD, head);
        Ok(())
    }

    /// Serialize as a plain TrueType/OpenType file.
    pub fn to_sfnt(&self) -> Vec<u8> {
        let mut builder = FontBuilder::default();
        for (tag, data) in self.tables.iter() {
            builder.add_raw(*tag, data.as_slice());
        }
        builder.build()
    }
}

pub(crate) fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}
