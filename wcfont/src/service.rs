//! Get-or-create for subset artifacts.
//!
//! An artifact is written once per key and never changes afterwards, so a
//! request that finds the file is done without locking. Otherwise the key lock
//! makes sure only one request runs the pipeline; everyone else waiting on the
//! same key finds the file when they get the lock.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, info, warn};
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::{
    config::{read_if_exists, require_dir},
    key::CacheKey,
    locks::LockTable,
    Config, Error,
};

/// Turns font bytes and text into artifact bytes.
pub trait Pipeline: Send + Sync {
    fn run(&self, font_data: &[u8], text: &str) -> Result<Vec<u8>, fontsubset::Error>;
}

/// Strip hints, subset, encode as WOFF.
#[derive(Debug, Default, Clone, Copy)]
pub struct WoffPipeline;

impl Pipeline for WoffPipeline {
    fn run(&self, font_data: &[u8], text: &str) -> Result<Vec<u8>, fontsubset::Error> {
        fontsubset::subset_to_woff(font_data, text)
    }
}

/// Counters since the service was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Requests answered by an existing artifact
    pub hits: usize,
    /// Pipeline invocations
    pub runs: usize,
    /// Requests that produced no artifact
    pub failures: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicUsize,
    runs: AtomicUsize,
    failures: AtomicUsize,
}

pub struct FontService<P = WoffPipeline> {
    config: Config,
    pipeline: P,
    locks: LockTable,
    counters: Counters,
}

impl FontService<WoffPipeline> {
    /// A service with the standard pipeline; creates the output directory.
    pub fn new(config: Config) -> Result<FontService<WoffPipeline>, Error> {
        FontService::with_pipeline(config, WoffPipeline)
    }
}

impl<P: Pipeline> FontService<P> {
    pub fn with_pipeline(config: Config, pipeline: P) -> Result<FontService<P>, Error> {
        require_dir(&config.output_dir)?;
        Ok(FontService {
            config,
            pipeline,
            locks: LockTable::default(),
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> Stats {
        Stats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            runs: self.counters.runs.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Where the artifact with this file name lives.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.config.output_dir.join(file_name)
    }

    /// The file name of the subset of `family` for `text`, creating it if needed.
    pub fn get_or_create(&self, family: &str, text: &str) -> Result<String, Error> {
        self.check_family(family)?;
        let key = CacheKey::new(family, text);
        let file_name = key.file_name();
        let path = self.artifact_path(&file_name);

        if path.is_file() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!("{family} {key} already exists");
            return Ok(file_name);
        }

        let _guard = self.locks.lock(key);
        // someone else may have finished while we waited
        if path.is_file() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!("{family} {key} created while waiting");
            return Ok(file_name);
        }

        if let Err(e) = self.create(family, text, &path) {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!("{family} {key} failed: {e}");
            return Err(e);
        }
        info!("Created {path:?} for {family}");
        Ok(file_name)
    }

    /// [`FontService::get_or_create`] for many requests at once, results in request order.
    pub fn get_or_create_all(&self, requests: &[(String, String)]) -> Vec<Result<String, Error>> {
        requests
            .par_iter()
            .map(|(family, text)| self.get_or_create(family, text))
            .collect()
    }

    /// Family names become file names so anything that could escape the
    /// input directory is treated as not found.
    fn check_family(&self, family: &str) -> Result<(), Error> {
        let unsafe_name = family.is_empty()
            || family == "."
            || family == ".."
            || family.contains(['/', '\\', '\0']);
        if unsafe_name {
            return Err(Error::FontNotFound {
                family: family.to_string(),
                path: self.config.input_dir.clone(),
            });
        }
        Ok(())
    }

    /// Run the pipeline and publish the result. Caller holds the key lock.
    fn create(&self, family: &str, text: &str, path: &Path) -> Result<(), Error> {
        let font_file = self.config.font_file(family);
        let font_data = read_if_exists(&font_file)?.ok_or_else(|| Error::FontNotFound {
            family: family.to_string(),
            path: font_file.clone(),
        })?;

        self.counters.runs.fetch_add(1, Ordering::Relaxed);
        let woff = self
            .pipeline
            .run(&font_data, text)
            .map_err(|e| Error::from_pipeline(family, e))?;
        debug!(
            "{family}: {} byte font, {} byte subset",
            font_data.len(),
            woff.len()
        );
        write_atomically(&self.config.output_dir, path, &woff)
    }
}

/// Write through a temp file in the same directory so readers only ever see
/// a complete file.
fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> Result<(), Error> {
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    temp.write_all(data)
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
