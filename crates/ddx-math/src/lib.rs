//! DDX math utilities.

pub mod prob;

pub use prob::*;
