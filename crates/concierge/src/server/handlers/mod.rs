pub mod analytics;
pub mod ask;
pub mod logs;
pub mod status;
