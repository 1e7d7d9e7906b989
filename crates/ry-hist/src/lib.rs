//! # ry-hist
//!
//! Histogram primitives for raw-yield extraction.
//!
//! - [`Histogram`]: 1-D histogram with variable edges and sum of squared weights.
//! - [`SparseHistogram`]: N-D histogram storing only filled bins, with
//!   ROOT-style per-axis range selection ([`Selection`]) and projection.
//! - [`HistFile`]: a JSON histogram container with explicit open/create/update
//!   handles.
//!
//! ## Example
//!
//! ```no_run
//! use ry_hist::HistFile;
//!
//! let f = HistFile::open("AnalysisResults.json").unwrap();
//! for key in f.list_keys() {
//!     println!("{} ({})", key.name, key.class_name);
//! }
//! let sparse = f.get_sparse("hData").unwrap();
//! println!("axes: {}, filled bins: {}", sparse.n_dims(), sparse.n_filled_bins());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod file;
pub mod histogram;
pub mod sparse;

pub use axis::{Axis, AxisRange};
pub use file::{HistFile, HistObject, KeyInfo};
pub use histogram::Histogram;
pub use sparse::{Selection, SparseHistogram};
