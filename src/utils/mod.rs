pub mod color;
pub mod encode;
pub mod hash;
pub mod jwt;
