pub mod analyzers;
pub mod error;
pub mod fetch;
pub mod output;
pub mod records;
pub mod server;
pub mod store;
