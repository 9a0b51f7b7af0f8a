//! HTTP request handlers, one module per resource.

pub mod carts;
pub mod categories;
pub mod products;
pub mod users;
pub mod wishlists;
