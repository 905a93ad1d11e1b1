//! Module: backend
//! Responsibility: network search backends.

mod elastic;
pub mod parse;

pub use elastic::ElasticBackend;
