mod vnd;

pub mod op;
mod secret;

pub use secret::Secret;
pub use vnd::{Vnd, VndConversionError};
