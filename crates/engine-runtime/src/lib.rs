pub mod actor;
pub mod checksum;
pub mod driver;
pub mod error;
pub mod setup;
