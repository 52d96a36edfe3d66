pub mod admin;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod users;
