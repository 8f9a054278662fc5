pub mod signed;
pub mod signing;
pub mod token;
pub mod types;
