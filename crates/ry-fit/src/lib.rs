//! # ry-fit
//!
//! Binned maximum-likelihood fits of invariant-mass spectra.
//!
//! A [`MassFitter`] takes a mass [`ry_hist::Histogram`], a fit window and a
//! pair of named shapes ([`SignalFunc`], [`BackgroundFunc`]). Fitting
//! minimises an extended binned Poisson likelihood with L-BFGS and derives
//! uncertainties from the numerical Hessian. The resulting [`MassFit`]
//! answers yield, shape-parameter and bin-counting queries.
//!
//! ```no_run
//! use ry_fit::{BackgroundFunc, FitSetup, MassFitter, SignalFunc};
//! # fn demo(h: &ry_hist::Histogram) -> ry_core::Result<()> {
//! let setup = FitSetup::new("demo", SignalFunc::Gaussian, BackgroundFunc::ChebPol(2), (1.72, 2.02));
//! let mut fitter = MassFitter::new(h, setup)?;
//! fitter.set_signal_initpar("mean", 1.87, Some((1.78, 1.96)))?;
//! let fit = fitter.fit()?;
//! if fit.converged() {
//!     println!("yield = {:?}", fit.raw_yield());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data;
pub mod fitter;
pub mod mle;
pub mod model;
pub mod optimizer;
pub mod pdf;

pub use data::BinnedMassData;
pub use fitter::{FitCurves, FitSetup, MassFit, MassFitter};
pub use mle::MaximumLikelihoodEstimator;
pub use model::{MassModel, Parameter};
pub use optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizationResult, OptimizerConfig};
pub use pdf::{BackgroundFunc, MassShape, SignalFunc};
