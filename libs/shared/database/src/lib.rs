pub mod gateway;

pub use gateway::{DbError, GatewayClient};
