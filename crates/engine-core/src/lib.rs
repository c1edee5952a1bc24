pub mod creator;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod progress;
pub mod random;
pub mod reader;
pub mod source;
pub mod stats;
pub mod workload;
pub mod writer;
