// libs/prescription-cell/src/services/mod.rs
pub mod create;
pub mod queries;
pub mod trends;
