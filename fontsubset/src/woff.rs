//! WOFF 1.0 containers.
//!
//! See <https://www.w3.org/TR/WOFF/>. We never write the optional metadata or
//! private data blocks, and ignore them when reading.

use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use log::{debug, trace};
use write_fonts::{
    dump_table,
    read::{tables::compute_checksum, FontData},
    types::Tag,
    validate::{Validate, ValidationCtx},
    FontWrite, TableWriter,
};

use crate::{
    error::{BuildProblem, Error, TableProblem},
    font::{padded_len, Font, HEAD},
};

const SIGNATURE: u32 = 0x774F_4646; // 'wOFF'
/// Stands in for a table tag when the container itself is bad.
const WOFF: Tag = Tag::new(b"wOFF");
const HEADER_LEN: usize = 44;
const TABLE_ENTRY_LEN: usize = 20;
const MAJOR_VERSION: u16 = 1;
const MINOR_VERSION: u16 = 0;
/// head.checksumAdjustment
const CHECKSUM_ADJUSTMENT: std::ops::Range<usize> = 8..12;

fn compression_level() -> Compression {
    Compression::new(6)
}

/// The checksum an sfnt directory records for a table.
///
/// head is summed with checksumAdjustment taken as zero.
pub(crate) fn table_checksum(tag: Tag, table: &[u8]) -> u32 {
    if tag == HEAD && table.len() >= CHECKSUM_ADJUSTMENT.end {
        let mut head = table.to_vec();
        head[CHECKSUM_ADJUSTMENT].fill(0);
        compute_checksum(&head)
    } else {
        compute_checksum(table)
    }
}

struct TableEntry {
    tag: Tag,
    offset: u32,
    orig_len: u32,
    orig_checksum: u32,
    /// zlib stream, or the raw table if that was no larger
    data: Vec<u8>,
}

impl TableEntry {
    fn new(tag: Tag, table: &[u8]) -> Result<TableEntry, Error> {
        let mut encoder = ZlibEncoder::new(Vec::new(), compression_level());
        encoder.write_all(table).map_err(Error::Compression)?;
        let compressed = encoder.finish().map_err(Error::Compression)?;
        trace!("'{tag}' {} => {} bytes", table.len(), compressed.len());
        let data = if compressed.len() < table.len() {
            compressed
        } else {
            table.to_vec()
        };
        Ok(TableEntry {
            tag,
            offset: 0,
            orig_len: to_u32(tag, table.len())?,
            orig_checksum: table_checksum(tag, table),
            data,
        })
    }
}

/// A whole WOFF file, header, directory and table data, with offsets resolved.
struct WoffFile {
    flavor: u32,
    length: u32,
    total_sfnt_size: u32,
    entries: Vec<TableEntry>,
}

impl FontWrite for WoffFile {
    fn write_into(&self, writer: &mut TableWriter) {
        SIGNATURE.write_into(writer);
        self.flavor.write_into(writer);
        self.length.write_into(writer);
        (self.entries.len() as u16).write_into(writer);
        0u16.write_into(writer); // reserved
        self.total_sfnt_size.write_into(writer);
        MAJOR_VERSION.write_into(writer);
        MINOR_VERSION.write_into(writer);
        // metadata offset, length, original length; private offset, length
        [0u32; 5].write_into(writer);

        for entry in self.entries.iter() {
            entry.tag.write_into(writer);
            entry.offset.write_into(writer);
            (entry.data.len() as u32).write_into(writer);
            entry.orig_len.write_into(writer);
            entry.orig_checksum.write_into(writer);
        }
        for entry in self.entries.iter() {
            writer.write_slice(&entry.data);
            let padding = padded_len(entry.data.len()) - entry.data.len();
            writer.write_slice(&[0u8; 3][..padding]);
        }
    }
}

impl Validate for WoffFile {
    fn validate_impl(&self, ctx: &mut ValidationCtx) {
        ctx.in_table("WOFF", |ctx| {
            ctx.in_field("numTables", |ctx| {
                if self.entries.len() > u16::MAX as usize {
                    ctx.report("too many tables");
                }
            });
        })
    }
}

fn to_u32(tag: Tag, len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::build(tag, BuildProblem::TableTooLarge(len)))
}

/// Wrap a font in a WOFF container.
///
/// Tables are laid out in tag order; the output depends only on the tables.
pub fn encode(font: &Font) -> Result<Vec<u8>, Error> {
    let mut entries = font
        .tables()
        .map(|(tag, data)| TableEntry::new(tag, data))
        .collect::<Result<Vec<_>, _>>()?;
    if entries.len() > u16::MAX as usize {
        return Err(Error::build(WOFF, BuildProblem::TableTooLarge(entries.len())));
    }

    let mut offset = HEADER_LEN + TABLE_ENTRY_LEN * entries.len();
    for entry in entries.iter_mut() {
        entry.offset = to_u32(entry.tag, offset)?;
        offset += padded_len(entry.data.len());
    }
    let woff = WoffFile {
        flavor: font.flavor(),
        length: to_u32(WOFF, offset)?,
        total_sfnt_size: to_u32(WOFF, font.sfnt_size())?,
        entries,
    };
    let data = dump_table(&woff).map_err(|e| Error::dump(WOFF, e))?;
    debug!(
        "Encoded {} tables, {} bytes as sfnt, {} as WOFF",
        woff.entries.len(),
        woff.total_sfnt_size,
        data.len()
    );
    Ok(data)
}

/// Unpack the tables of a WOFF file.
pub fn decode(data: &[u8]) -> Result<Font, Error> {
    let data = FontData::new(data);
    let truncated = |offset| Error::malformed(WOFF, TableProblem::Truncated { offset });
    let read_u32 = |offset| data.read_at::<u32>(offset).map_err(|_| truncated(offset));

    let signature = read_u32(0)?;
    if signature != SIGNATURE {
        return Err(Error::malformed(WOFF, TableProblem::BadSignature(signature)));
    }
    if data.len() < HEADER_LEN {
        return Err(Error::malformed(
            WOFF,
            TableProblem::TooShort {
                len: data.len(),
                expected: HEADER_LEN,
            },
        ));
    }
    let num_tables = data.read_at::<u16>(12).map_err(|_| truncated(12))? as usize;

    let mut font = Font::default();
    for i in 0..num_tables {
        let record = HEADER_LEN + TABLE_ENTRY_LEN * i;
        let tag = data.read_at::<Tag>(record).map_err(|_| truncated(record))?;
        let offset = read_u32(record + 4)? as usize;
        let comp_len = read_u32(record + 8)? as usize;
        let orig_len = read_u32(record + 12)? as usize;
        let stored = data
            .slice(offset..offset.saturating_add(comp_len))
            .ok_or(truncated(offset))?
            .as_bytes();

        let bad_stream = || {
            Error::malformed(
                tag,
                TableProblem::BadCompression {
                    original: orig_len,
                    compressed: comp_len,
                },
            )
        };
        let table = if comp_len < orig_len {
            let mut table = Vec::with_capacity(orig_len);
            ZlibDecoder::new(stored)
                .take(orig_len as u64 + 1)
                .read_to_end(&mut table)
                .map_err(|_| bad_stream())?;
            if table.len() != orig_len {
                return Err(bad_stream());
            }
            table
        } else if comp_len == orig_len {
            stored.to_vec()
        } else {
            return Err(bad_stream());
        };
        font.insert(tag, table);
    }
    Ok(font)
}
