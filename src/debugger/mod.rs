pub mod core;
pub mod error;
pub mod index;
pub mod options;
pub mod symbols;
pub mod symmap;
