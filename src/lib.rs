pub mod aggregate;
pub mod anomaly;
pub mod columns;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod output;
pub mod payload;
pub mod scheduler;
pub mod series;
pub mod table;
pub mod timestamp;
