use macaddr::MacAddr6;

use crate::switchbot::DeviceType;

/// A SwitchBot meter known to the deployment, listed in the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: MacAddr6,

    pub r#type: DeviceType,

    pub name: String,

    pub sort_order: u8,
}
