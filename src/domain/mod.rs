pub mod booking_number;
pub mod interval;
pub mod pricing;
pub mod role;
pub mod status;

pub use interval::DateRange;
pub use pricing::RateTable;
pub use role::Role;
pub use status::{BookingStatus, ListingState, PaymentStatus};
