//! Parallel wrapping of whole blocks
//!
//! An arena is only read while wrapping, so many statements can be copied
//! out of it at once on a rayon pool.

mod executor;

pub use executor::{wrap_block, wrap_block_with, BlockWrap, ParallelConfig};
