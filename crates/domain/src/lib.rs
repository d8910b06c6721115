//! Domain layer for PowerGuard.
//!
//! This crate contains:
//! - Wire models (device snapshots, actionables, insights, responses)
//! - The optimizer catalog shared by every pipeline stage
//! - The analysis pipeline and its collaborator traits

pub mod catalog;
pub mod models;
pub mod services;

#[cfg(test)]
mod test_fixtures;
