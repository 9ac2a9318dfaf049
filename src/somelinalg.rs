//! some linear algebra functions used throughout the code
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

/// norms, dot products and dense matrix-vector products with
/// double precision accumulators
pub mod dense_ops;

/// dense LUP factorization, triangular solve and explicit inverse
/// for the small square systems of the fit solver
pub mod lup_dense;
