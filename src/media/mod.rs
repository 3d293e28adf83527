pub mod playback;
pub mod probe;
pub mod source;
