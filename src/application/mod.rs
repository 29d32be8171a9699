//! Application services layer.

pub mod error;
pub mod publish;
pub mod repos;
