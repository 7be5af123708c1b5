//! Small helpers shared by the calculators, model wrappers and HTTP layer
//!
//! - Rounding: fixed-decimal rounding used for reported figures
//! - Labels: display labels derived from catalog keys

pub mod labels;
pub mod rounding;

pub use labels::display_label;
pub use rounding::round_to;
