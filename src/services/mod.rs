pub mod auth_service;
pub mod availability_service;
pub mod booking_service;
pub mod inventory_service;
