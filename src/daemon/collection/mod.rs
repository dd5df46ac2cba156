//! Samplers turning OS state into events. Both run as independent loops and hand their output
//! to a sink.

pub mod input_sampler;
pub mod window_sampler;
