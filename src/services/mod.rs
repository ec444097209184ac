pub mod booking_service;
pub mod catalog_service;
pub mod customer_service;
