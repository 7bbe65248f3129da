// Application layer: validation and error translation over the account store.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
