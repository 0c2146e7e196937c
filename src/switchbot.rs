mod device;
mod device_type;
mod meter_reading;

pub use device::*;
pub use device_type::*;
pub use meter_reading::*;
