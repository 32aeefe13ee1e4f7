// Pricing: pure functions over prices, discount windows and novelty windows.
// Nothing in here performs I/O.

pub mod policy;
pub mod price_calculator;

pub use policy::*;
pub use price_calculator::*;
