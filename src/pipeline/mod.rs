// src/pipeline/mod.rs

//! Asset pipelines.
//!
//! - [`asset_set`] compiles the `[asset.<name>]` table.
//! - [`resolve`] turns ordered (possibly negated) patterns into files.
//! - [`transform`] holds the transform descriptors and their executor,
//!   backed by [`command`] for external tools and [`minify`] for the
//!   builtin minifier.
//! - [`runner`] ties it together for one asset set run.

pub mod asset_set;
pub mod command;
pub mod minify;
pub mod resolve;
pub mod runner;
pub mod transform;

pub use asset_set::{AssetSet, compile_asset_sets};
pub use resolve::{SourceFile, SourcePattern, resolve_sources};
pub use runner::{PipelineReport, PipelineRunner};
pub use transform::{AssetFile, TransformStep};
