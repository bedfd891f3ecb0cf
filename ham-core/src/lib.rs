pub mod config;
pub mod decision_rule;
pub mod distribution;
pub mod equilibrium;
pub mod grid;
pub mod household;
pub mod interpolate;
pub mod markov;
pub mod perturbation;
pub mod time_iteration;

mod example_models;

pub mod errors;
