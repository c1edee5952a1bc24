pub mod cluster;
pub mod database;
pub mod transport;

pub use cluster::HttpCluster;
pub use transport::{Auth, normalize_endpoint};
