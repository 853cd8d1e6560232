//! Domain models for cached orders.

mod order;

pub use order::{Order, OrderStatus, OrderType};
