pub mod dom;
pub mod driver;
pub mod error;
pub mod playwright;
pub mod session;
