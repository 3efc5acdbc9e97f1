//! Plotting.
//!
//! - terminal ASCII previews (`ascii`)
//! - SVG publication figures (`figures`)
//! - explicit figure styling (`style`)

pub mod ascii;
pub mod figures;
pub mod style;

pub use ascii::*;
pub use figures::render_all;
pub use style::FigureStyle;
