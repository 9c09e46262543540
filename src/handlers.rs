pub mod admins;
pub mod auth;
pub mod custom_fields;
pub mod customers;
pub mod promotions;
pub mod stores;
pub mod transfer;
