//! the test_utils folder here will share utils or test components between unit
//! tests
mod common;
mod keys;

pub use common::*;
pub use keys::*;
