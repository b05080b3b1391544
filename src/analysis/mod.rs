pub mod cfg;
pub mod frequency;
pub mod normalize;
pub mod scorer;
pub mod similarity;

pub use scorer::{Preset, Score, Scorer};
