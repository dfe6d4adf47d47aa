//! Partial sums of Gourdon's prime counting algorithm.

mod a;
mod b;

pub use a::a;
pub use b::b;
