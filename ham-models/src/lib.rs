//! Ready-made household and projection blocks for heterogeneous-agent
//! models.
//!
//! Every block here implements one of the `ham-core` strategy traits and
//! is registered for dispatch from model specification files: linking
//! this crate makes `type = "crra"`, `type = "cobb_douglas"` and
//! `type = "fixed_prices"` available to the loader.

pub mod models;

pub use models::{
    aiyagari_spec, CobbDouglasProjection, CrraHousehold, FixedPricesProjection, AIYAGARI_TOML,
};
