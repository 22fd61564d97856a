//! Where fonts come from and where subsets go.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Read from the working directory when no config file is named.
pub const DEFAULT_CONFIG_FILE: &str = "wcfont.yml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Holds `<family>.ttf`
    pub input_dir: PathBuf,
    /// Receives `<key>.woff`
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("fonts/input"),
            output_dir: PathBuf::from("fonts/output"),
        }
    }
}

impl Config {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Config {
        Config {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Parse a YAML config; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Config, Error> {
        let yml = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Config = serde_yaml::from_str(&yml).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded {config:?} from {path:?}");
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Config, Error> {
        match path {
            Some(path) => Config::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Config::load(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Replace whichever directories were given on the command line.
    pub fn with_overrides(mut self, input_dir: Option<PathBuf>, output_dir: Option<PathBuf>) -> Config {
        if let Some(input_dir) = input_dir {
            self.input_dir = input_dir;
        }
        if let Some(output_dir) = output_dir {
            self.output_dir = output_dir;
        }
        self
    }

    /// The source font for a family.
    pub fn font_file(&self, family: &str) -> PathBuf {
        self.input_dir.join(format!("{family}.ttf"))
    }
}

/// Create `dir` and its parents unless it already exists.
pub(crate) fn require_dir(dir: &Path) -> Result<PathBuf, Error> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::ExpectedDirectory(dir.to_path_buf()));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    debug!("require_dir {:?}", dir);
    Ok(dir.to_path_buf())
}

/// Treat NotFound as None.
pub(crate) fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, Error> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}
