pub mod baseline;
pub mod defs;

pub use baseline::BaselineEstimator;
pub use defs::*;
