pub mod comparison;
pub mod config;
pub mod errors;
pub mod solution;

pub use comparison::*;
pub use config::*;
pub use errors::*;
pub use solution::*;
