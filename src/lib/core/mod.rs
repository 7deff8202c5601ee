pub mod error;
pub mod repository;
pub mod todo;

pub use error::*;
pub use repository::*;
pub use todo::*;
