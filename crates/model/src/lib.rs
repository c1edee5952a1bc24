pub mod checksum;
pub mod documents;
pub mod inventory;
