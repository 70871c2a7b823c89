mod media_capture;
mod media_error;
mod media_stream;
mod synthetic_source;

pub use media_capture::*;
pub use media_error::*;
pub use media_stream::*;
pub use synthetic_source::*;
