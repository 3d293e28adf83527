pub mod compositor;
pub mod config;
pub mod layout;
pub mod raster;
