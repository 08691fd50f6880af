// crates/core/src/lib.rs
pub mod error;
pub mod store;
pub mod types;

pub use error::*;
pub use store::*;
pub use types::*;
