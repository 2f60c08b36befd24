pub mod agency;
pub mod coerce;
pub mod config;
pub mod error;
pub mod feeds;
pub mod logging;
pub mod ownership;
pub mod pipeline;
pub mod publish;
pub mod sld_mapping;
pub mod store;
