#![no_std]

extern crate alloc;

mod config;
mod filler;
mod pacer;

pub use config::FillerConfig;
pub use filler::{generate_filler, sample_len};
pub use pacer::Pacer;
