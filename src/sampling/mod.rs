pub mod grid;
pub mod sampler;
