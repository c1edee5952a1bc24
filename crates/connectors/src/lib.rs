pub mod api;
pub mod error;
pub mod http;
pub mod memory;
