pub mod error;
pub mod interrupt;
