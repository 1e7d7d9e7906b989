//! # ry-core
//!
//! Shared building blocks for the raw-yield workspace: the error type used by
//! every library crate, the fit result record and the [`LogDensityModel`]
//! trait that the fitting library minimises.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::LogDensityModel;
pub use types::{Estimate, FitResult};
