pub mod chan;
pub mod db;
pub mod error;
pub mod fabric;
pub mod grid;

pub use error::{ArchError, Result};
