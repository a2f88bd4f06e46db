//! Reading and writing posterior draws.

#[cfg(feature = "csv")]
pub mod csv;
