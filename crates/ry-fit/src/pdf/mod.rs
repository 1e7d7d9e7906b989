//! Mass-spectrum shapes.
//!
//! Shapes are evaluated unnormalised; the model normalises them numerically
//! over the fit window, so a shape only has to be non-negative there.

use std::fmt;
use std::str::FromStr;

use ry_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::model::Parameter;

mod chebyshev;
mod crystal_ball;
mod exponential;
mod gaussian;

pub use chebyshev::ChebyshevShape;
pub use crystal_ball::DoubleCrystalBallShape;
pub use exponential::{ExponentialShape, PowerExponentialShape};
pub use gaussian::GaussianShape;

/// Highest supported Chebyshev order.
pub const MAX_CHEBYSHEV_ORDER: usize = 6;

/// A one-dimensional, non-negative, unnormalised shape.
pub trait MassShape: Send + Sync + fmt::Debug {
    /// Default parameters (names, starting values, bounds) in evaluation order.
    fn parameters(&self) -> Vec<Parameter>;

    /// Shape value at `x`.
    fn density(&self, x: f64, params: &[f64]) -> f64;
}

/// Signal model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalFunc {
    /// Gaussian peak (mean, sigma).
    Gaussian,
    /// Gaussian core with power-law tails on both sides.
    DoubleCb,
}

/// Names of the double Crystal Ball tail parameters.
pub const TAIL_PARAMETERS: [&str; 4] = ["alphal", "nl", "alphar", "nr"];

impl SignalFunc {
    /// Instantiate the shape with default parameters centred in `window`.
    pub fn build(&self, window: (f64, f64)) -> Box<dyn MassShape> {
        match self {
            Self::Gaussian => Box::new(GaussianShape::new(window)),
            Self::DoubleCb => Box::new(DoubleCrystalBallShape::new(window)),
        }
    }

    /// Whether the shape carries the four tail parameters.
    pub fn has_tails(&self) -> bool {
        matches!(self, Self::DoubleCb)
    }
}

impl FromStr for SignalFunc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gaussian" => Ok(Self::Gaussian),
            "doublecb" => Ok(Self::DoubleCb),
            other => Err(Error::Validation(format!(
                "unknown signal function '{other}' (expected gaussian or doublecb)"
            ))),
        }
    }
}

impl fmt::Display for SignalFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gaussian => "gaussian",
            Self::DoubleCb => "doublecb",
        })
    }
}

/// Background model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundFunc {
    /// `exp(lam * x)`.
    Expo,
    /// Chebyshev polynomial of the given order.
    ChebPol(usize),
    /// `dm^power * exp(lam * dm)` above a kinematic threshold.
    ExpoPow,
    /// `dm^power * exp(c1 dm + c2 dm^2 + c3 dm^3)` above a kinematic threshold.
    ExpoPowExt,
}

impl BackgroundFunc {
    /// Instantiate the shape on `window`, using `threshold` for the
    /// threshold-type shapes.
    pub fn build(&self, window: (f64, f64), threshold: f64) -> Box<dyn MassShape> {
        match *self {
            Self::Expo => Box::new(ExponentialShape::new(window)),
            Self::ChebPol(order) => Box::new(ChebyshevShape::new(order, window)),
            Self::ExpoPow => Box::new(PowerExponentialShape::new(threshold, false)),
            Self::ExpoPowExt => Box::new(PowerExponentialShape::new(threshold, true)),
        }
    }
}

impl FromStr for BackgroundFunc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "expo" => Ok(Self::Expo),
            "expopow" => Ok(Self::ExpoPow),
            "expopowext" => Ok(Self::ExpoPowExt),
            other => {
                let order = other
                    .strip_prefix("chebpol")
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "unknown background function '{other}' \
                             (expected expo, expopow, expopowext or chebpolN)"
                        ))
                    })?;
                if order > MAX_CHEBYSHEV_ORDER {
                    return Err(Error::Validation(format!(
                        "chebpol order {order} exceeds maximum {MAX_CHEBYSHEV_ORDER}"
                    )));
                }
                Ok(Self::ChebPol(order))
            }
        }
    }
}

impl fmt::Display for BackgroundFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expo => f.write_str("expo"),
            Self::ChebPol(n) => write!(f, "chebpol{n}"),
            Self::ExpoPow => f.write_str("expopow"),
            Self::ExpoPowExt => f.write_str("expopowext"),
        }
    }
}
