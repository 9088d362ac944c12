pub mod factory;
pub mod metadata;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod streams;
pub mod types;

#[cfg(test)]
mod tests;

pub use factory::*;
pub use metadata::*;
pub use registry::*;
pub use runner::*;
pub use scheduler::*;
pub use streams::*;
pub use types::*;
