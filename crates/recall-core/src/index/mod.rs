//! Brute-force vector similarity index.
//!
//! `VectorIndex` owns a collection of `VectorRecord`s and answers
//! k-nearest-neighbor queries with an exhaustive O(n·d) scan. An approximate
//! index could replace it behind the same `query` contract.

pub mod metric;
pub mod store;

pub use store::VectorIndex;
