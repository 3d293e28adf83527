pub mod profile;
pub mod recorder;
pub mod stream;
