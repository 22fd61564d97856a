//! Serve web fonts cut down to the text of a page.
//!
//! A request names a font family and the text to render. The answer is the
//! file name of a WOFF subset in the output directory, created the first time
//! the (family, text) pair is seen.

pub mod config;
pub mod css;
mod error;
pub mod key;
mod locks;
pub mod service;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use key::CacheKey;
pub use service::{FontService, Pipeline, Stats, WoffPipeline};
