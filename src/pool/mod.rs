pub mod engine;
pub mod registry;
pub mod simulator;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;
