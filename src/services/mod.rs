//! Codespaces API service implementations.

mod codespaces;
mod repositories;
mod search;

pub use codespaces::*;
pub use repositories::*;
pub use search::*;
