pub mod detection;
pub mod error;
pub mod resolver;
pub mod validation;
