pub mod space;
pub mod neighbors;
pub mod algorithm;
pub mod label;
pub mod store;
pub mod tracker;
pub mod config;
pub mod error;
pub mod streamer;
