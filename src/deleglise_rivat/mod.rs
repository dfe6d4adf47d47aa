//! Partial sums of the Deleglise-Rivat prime counting algorithm.

mod s2_trivial;

pub use s2_trivial::s2_trivial;
