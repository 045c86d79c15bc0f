pub mod types;
pub mod validation;
pub mod pricing;
pub mod quoter;

pub use quoter::{Quoter, QuoterBuilder};
pub use types::*;
