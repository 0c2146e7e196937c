mod bucket;
mod point;
mod reading;
mod sample;

pub use bucket::*;
pub use point::*;
pub use reading::*;
pub use sample::*;
