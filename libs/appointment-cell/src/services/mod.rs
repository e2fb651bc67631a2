pub mod booking;
pub mod lifecycle;
pub mod queries;
pub mod sweep;
