//! Client side of a QR code manager: style model, payloads, styled
//! rendering and export, create/edit flows, views, session handling and a
//! typed client for the backend, plus the actix-web server around them.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
pub mod structs;
pub mod utils;
pub mod views;
