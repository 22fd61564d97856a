use std::{fmt::Display, io};

use thiserror::Error;
use write_fonts::{read::ReadError, tables::cmap::CmapConflict, types::Tag};

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read font data: '{0}'")]
    FontRead(#[source] ReadError),
    #[error("missing table '{0}'")]
    MissingTable(Tag),
    #[error("'{tag}' {problem}")]
    MalformedTable { tag: Tag, problem: TableProblem },
    #[error("no usable character map")]
    NoUsableCmap,
    #[error("none of the requested code points map to a glyph")]
    NoGlyphsFound,
    #[error("unable to build '{tag}': {problem}")]
    SubsetBuild { tag: Tag, problem: BuildProblem },
    #[error("generating bytes for '{tag}' failed: {source}")]
    DumpTable {
        tag: Tag,
        #[source]
        source: write_fonts::error::Error,
    },
    #[error("conflicting cmap entries: {0}")]
    CmapConflict(#[from] CmapConflict),
    #[error("compression failed")]
    Compression(#[source] io::Error),
}

impl From<ReadError> for Error {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::TableIsMissing(tag) => Error::MissingTable(tag),
            other => Error::FontRead(other),
        }
    }
}

impl Error {
    /// True if the source font itself is unusable, as opposed to the request.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::FontRead(..)
                | Error::MissingTable(..)
                | Error::MalformedTable { .. }
                | Error::NoUsableCmap
        )
    }

    pub(crate) fn malformed(tag: Tag, problem: TableProblem) -> Error {
        Error::MalformedTable { tag, problem }
    }

    pub(crate) fn build(tag: Tag, problem: BuildProblem) -> Error {
        Error::SubsetBuild { tag, problem }
    }

    pub(crate) fn dump(tag: Tag, source: write_fonts::error::Error) -> Error {
        Error::DumpTable { tag, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableProblem {
    Truncated { offset: usize },
    UnreadableGlyph { glyph: u16 },
    DanglingComponent { glyph: u16, component: u16 },
    MissingMetrics { glyph: u16 },
    TooShort { len: usize, expected: usize },
    BadSignature(u32),
    BadCompression { original: usize, compressed: usize },
}

impl Display for TableProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableProblem::Truncated { offset } => write!(f, "is truncated at offset {offset}"),
            TableProblem::UnreadableGlyph { glyph } => {
                write!(f, "has no readable data for glyph {glyph}")
            }
            TableProblem::DanglingComponent { glyph, component } => {
                write!(f, "glyph {glyph} references missing component {component}")
            }
            TableProblem::MissingMetrics { glyph } => {
                write!(f, "has no metrics for glyph {glyph}")
            }
            TableProblem::TooShort { len, expected } => {
                write!(f, "is {len} bytes, expected at least {expected}")
            }
            TableProblem::BadSignature(signature) => {
                write!(f, "has unrecognized signature 0x{signature:08x}")
            }
            TableProblem::BadCompression {
                original,
                compressed,
            } => write!(
                f,
                "does not inflate from {compressed} to {original} bytes"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildProblem {
    TooManyGlyphs(usize),
    TableTooLarge(usize),
    GlyphOutOfRange(u16),
}

impl Display for BuildProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildProblem::TooManyGlyphs(n) => write!(f, "{n} glyphs exceed the 16-bit glyph id space"),
            BuildProblem::TableTooLarge(n) => write!(f, "{n} bytes exceed the offset range"),
            BuildProblem::GlyphOutOfRange(gid) => write!(f, "glyph {gid} is not in the font"),
        }
    }
}
