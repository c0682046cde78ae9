pub mod booking;
pub mod insights;
