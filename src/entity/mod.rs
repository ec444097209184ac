pub mod audit_logs;
pub mod bookings;
pub mod customers;
pub mod services;

pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use customers::Entity as Customers;
pub use services::Entity as Services;
