//! Configuration parsing and option resolution.
//!
//! A site configuration is a JSON object with the roots (`src`, `dist`), the
//! environment (`env`) and one key per stage. Stage values are resolved onto
//! per-kind defaults by the pure [`resolve`] function.

mod resolve;
mod site;

pub use resolve::{resolve, resolve_value};
pub use site::{ConstructionPolicy, SiteConfig, StageValue, DEFAULT_DIST, DEFAULT_SRC};
