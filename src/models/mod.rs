pub mod analytics;
pub mod blog;
pub mod payload;
pub mod qr_record;
pub mod style;
pub mod user;
