//! Core data primitives (Vector, Matrix).
//!
//! These types provide the foundation for the pipeline's feature handling.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
