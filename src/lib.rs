//! Aligns a panel of clock-auction bid records into per-bidder demand
//! vectors: one quantity, price and rivals'-quantity vector per round,
//! indexed by the markets the bidder ever bid in.

pub mod config;
pub mod data;
pub mod demand;
pub mod monitoring;
pub mod output;
