pub mod error;
pub mod success;
