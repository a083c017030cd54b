pub mod ballot_keys;
pub mod error;
pub mod models;
pub mod tally;
pub mod validation;
pub mod user_info;

pub use error::{ErrorKind, ErrorResponse};
pub use models::*;
pub use validation::*;
pub use user_info::*;
pub use tally::count_votes;
