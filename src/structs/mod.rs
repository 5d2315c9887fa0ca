pub mod auth;
pub mod blog_request;
pub mod qr_request;
pub mod redirect;
pub mod upload;
