pub mod evaluate;
pub mod svd;

pub use evaluate::{evaluate, EvalParams, EvalReport};
pub use svd::{SvdModel, SvdParams, TrainError};
