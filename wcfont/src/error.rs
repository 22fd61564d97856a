use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no font for family '{family}' at '{path}'")]
    FontNotFound { family: String, path: PathBuf },
    #[error("font for '{family}' is unusable: {source}")]
    FontFormat {
        family: String,
        #[source]
        source: fontsubset::Error,
    },
    #[error("'{family}' has no glyphs for the requested text")]
    NoGlyphsFound { family: String },
    #[error("unable to build a subset of '{family}': {source}")]
    SubsetBuild {
        family: String,
        #[source]
        source: fontsubset::Error,
    },
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{0}' exists but is not a directory")]
    ExpectedDirectory(PathBuf),
    #[error("bad config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// What went wrong, without the details, for mapping onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FontNotFound,
    FontFormat,
    NoGlyphsFound,
    SubsetBuild,
    Io,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FontNotFound { .. } => ErrorKind::FontNotFound,
            Error::FontFormat { .. } => ErrorKind::FontFormat,
            Error::NoGlyphsFound { .. } => ErrorKind::NoGlyphsFound,
            Error::SubsetBuild { .. } => ErrorKind::SubsetBuild,
            Error::FileIo { .. } => ErrorKind::Io,
            Error::ExpectedDirectory(..) | Error::Config { .. } => ErrorKind::Config,
        }
    }

    /// Sort a pipeline failure into the kind callers care about.
    pub(crate) fn from_pipeline(family: &str, source: fontsubset::Error) -> Error {
        let family = family.to_string();
        match source {
            fontsubset::Error::NoGlyphsFound => Error::NoGlyphsFound { family },
            source if source.is_format_error() => Error::FontFormat { family, source },
            source => Error::SubsetBuild { family, source },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Error {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }
}
