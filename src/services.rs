pub mod admin_service;
pub mod auth;
pub mod custom_field_service;
pub mod customer_service;
pub mod promotion_service;
pub mod store_service;
pub mod transfer_service;
