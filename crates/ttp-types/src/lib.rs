pub mod cell;
pub mod errors;
pub mod outcome;

pub use cell::*;
pub use errors::*;
pub use outcome::*;
