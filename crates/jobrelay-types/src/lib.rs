pub mod error;
pub mod job;
pub mod result;

pub use error::*;
pub use job::*;
pub use result::*;
