//! Fix sampling and averaging

pub mod sampler;

pub use sampler::PositionSampler;
