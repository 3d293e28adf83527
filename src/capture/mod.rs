pub mod driver;
pub mod ticker;
