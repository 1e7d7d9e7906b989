/// Major tick: position in data units and its printed label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

/// Linear axis with major/minor ticks and data→pixel mapping.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub ticks: Vec<Tick>,
    pub minor: Vec<f64>,
}

const MINOR_PER_MAJOR: usize = 5;

impl Axis {
    /// Limits rounded outwards to the tick step. Used for count axes.
    pub fn padded(lo: f64, hi: f64, n_ticks: usize) -> Self {
        let step = tick_step(lo, hi, n_ticks);
        let (min, max) = if step.is_nan() {
            (lo - 1.0, hi + 1.0)
        } else {
            ((lo / step).floor() * step, (hi / step).ceil() * step)
        };
        Self::build(min, max, if step.is_nan() { 1.0 } else { step })
    }

    /// Limits kept as given, ticks at step multiples inside them.
    ///
    /// Mass windows are drawn edge to edge.
    pub fn exact(lo: f64, hi: f64, n_ticks: usize) -> Self {
        let step = tick_step(lo, hi, n_ticks);
        if step.is_nan() {
            return Self::padded(lo, hi, n_ticks);
        }
        Self::build(lo, hi, step)
    }

    fn build(min: f64, max: f64, step: f64) -> Self {
        let first = (min / step - 1e-6).ceil();
        let last = (max / step + 1e-6).floor();
        let ticks = (first as i64..=last as i64)
            .map(|k| k as f64 * step)
            .map(|value| Tick { value, label: tick_label(value, step) })
            .collect();

        let fine = step / MINOR_PER_MAJOR as f64;
        let minor = ((min / fine - 1e-6).ceil() as i64..=(max / fine + 1e-6).floor() as i64)
            .filter(|k| k.rem_euclid(MINOR_PER_MAJOR as i64) != 0)
            .map(|k| k as f64 * fine)
            .collect();

        Self { min, max, label: String::new(), ticks, minor }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Pixel coordinate of `value` when `min..max` spans `px_lo..px_hi`.
    pub fn to_px(&self, value: f64, px_lo: f64, px_hi: f64) -> f64 {
        px_lo + (value - self.min) / (self.max - self.min) * (px_hi - px_lo)
    }
}

/// 1, 2 or 5 times a power of ten, giving about `n_ticks` ticks over
/// `lo..hi`. NaN for a degenerate range.
fn tick_step(lo: f64, hi: f64, n_ticks: usize) -> f64 {
    let span = hi - lo;
    if !(span.abs() > 1e-15) {
        return f64::NAN;
    }
    round_step(span / (n_ticks.max(2) - 1) as f64)
}

fn round_step(rough: f64) -> f64 {
    let decade = 10f64.powf(rough.abs().log10().floor());
    let mantissa = rough / decade;
    let nice = [(1.5, 1.0), (3.5, 2.0), (7.5, 5.0)]
        .iter()
        .find(|(limit, _)| mantissa <= *limit)
        .map_or(10.0, |&(_, n)| n);
    nice * decade
}

/// Label with as many decimals as the step needs.
fn tick_label(value: f64, step: f64) -> String {
    if step >= 1.0 {
        // no "-0"
        let v = if value.abs() < 0.01 * step { 0.0 } else { value };
        return format!("{}", v.round() as i64);
    }
    let decimals = (-step.log10() - 1e-9).ceil() as usize;
    format!("{value:.decimals$}")
}
