//! Deterministic placement of cuboid cargo into a single rectangular container.
//!
//! The engine lives in [`packer`] (two strategies over the [`geometry`] kernel)
//! and is driven through [`session`], which converts units at the boundary and
//! computes loading statistics. [`api`] exposes it over HTTP.

pub mod api;
pub mod config;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod presets;
pub mod remote;
pub mod session;
pub mod types;
pub mod units;
