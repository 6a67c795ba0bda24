pub mod base;
pub mod draw;
