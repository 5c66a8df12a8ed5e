#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod parser;

pub use error::ContentError;
pub use model::Context;
