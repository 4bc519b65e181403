//! # Core CPU Primitives
//!
//! - `csr`: interrupt-related CSR bits and accessors

pub mod csr;
