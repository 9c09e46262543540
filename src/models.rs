pub mod admin;
pub mod auth;
pub mod custom_field;
pub mod customer;
pub mod promotion;
pub mod store;
