pub mod axes_draw;
pub mod mass_fit;
pub mod residuals;
