//! Radio, device and antenna presets for common mesh hardware.

/// LoRa channel settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioPreset {
    pub id: &'static str,
    pub name: &'static str,
    /// Center frequency in MHz.
    pub frequency_mhz: f64,
    /// Bandwidth in kHz.
    pub bandwidth_khz: f64,
    pub spreading_factor: u8,
    /// Coding rate denominator (4/x).
    pub coding_rate: u8,
    /// Default TX power in dBm.
    pub tx_power_dbm: f64,
}

/// Radio hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub id: &'static str,
    pub name: &'static str,
    /// Highest TX power the device supports (dBm).
    pub max_tx_power_dbm: f64,
    /// Connector and cabling loss (dB).
    pub cable_loss_db: f64,
}

/// Antenna hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaProfile {
    pub id: &'static str,
    pub name: &'static str,
    /// Gain in dBi.
    pub gain_dbi: f64,
    pub directional: bool,
}

pub const MESHCORE_PNW: RadioPreset = RadioPreset {
    id: "MESHCORE_PNW",
    name: "MeshCore PNW (Fast)",
    frequency_mhz: 910.525,
    bandwidth_khz: 62.5,
    spreading_factor: 7,
    coding_rate: 5,
    tx_power_dbm: 22.0,
};

pub const MESHCORE_US: RadioPreset = RadioPreset {
    id: "MESHCORE_US",
    name: "MeshCore US (Standard)",
    frequency_mhz: 915.0,
    bandwidth_khz: 250.0,
    spreading_factor: 11,
    coding_rate: 5,
    tx_power_dbm: 22.0,
};

pub const CUSTOM_RADIO: RadioPreset = RadioPreset {
    id: "CUSTOM",
    name: "Custom User Settings",
    frequency_mhz: 915.0,
    bandwidth_khz: 125.0,
    spreading_factor: 9,
    coding_rate: 5,
    tx_power_dbm: 20.0,
};

pub const HELTEC_V3: DeviceProfile = DeviceProfile {
    id: "HELTEC_V3",
    name: "Heltec V3",
    max_tx_power_dbm: 22.0,
    cable_loss_db: 1.5,
};

pub const HELTEC_V4: DeviceProfile = DeviceProfile {
    id: "HELTEC_V4",
    name: "Heltec V4 (High Power)",
    max_tx_power_dbm: 28.0,
    cable_loss_db: 1.5,
};

pub const SEEED_XIAO: DeviceProfile = DeviceProfile {
    id: "SEEED_XIAO",
    name: "Seeed Studio Xiao (SX1262)",
    max_tx_power_dbm: 22.0,
    cable_loss_db: 2.0,
};

pub const T_DECK: DeviceProfile = DeviceProfile {
    id: "T_DECK",
    name: "Lilygo T-Deck",
    max_tx_power_dbm: 22.0,
    cable_loss_db: 2.0,
};

pub const RAK_4631: DeviceProfile = DeviceProfile {
    id: "RAK_4631",
    name: "RAK WisBlock 4631",
    max_tx_power_dbm: 22.0,
    cable_loss_db: 0.5,
};

pub const STATION_G2: DeviceProfile = DeviceProfile {
    id: "STATION_G2",
    name: "Station G2",
    max_tx_power_dbm: 37.0,
    cable_loss_db: 0.5,
};

pub const CUSTOM_DEVICE: DeviceProfile = DeviceProfile {
    id: "CUSTOM",
    name: "Custom Device",
    max_tx_power_dbm: 37.0,
    cable_loss_db: 0.0,
};

pub const STUBBY: AntennaProfile = AntennaProfile {
    id: "STUBBY",
    name: "Stock / Stubby",
    gain_dbi: 2.15,
    directional: false,
};

pub const DIPOLE: AntennaProfile = AntennaProfile {
    id: "DIPOLE",
    name: "Standard Dipole",
    gain_dbi: 3.0,
    directional: false,
};

pub const OMNI_MEDIUM: AntennaProfile = AntennaProfile {
    id: "OMNI_MEDIUM",
    name: "Fiberglass Omni (Medium)",
    gain_dbi: 5.8,
    directional: false,
};

pub const OMNI_HIGH: AntennaProfile = AntennaProfile {
    id: "OMNI_HIGH",
    name: "Fiberglass Omni (High)",
    gain_dbi: 8.0,
    directional: false,
};

pub const YAGI: AntennaProfile = AntennaProfile {
    id: "YAGI",
    name: "Yagi (Directional)",
    gain_dbi: 11.0,
    directional: true,
};

pub const CUSTOM_ANTENNA: AntennaProfile = AntennaProfile {
    id: "CUSTOM",
    name: "Custom Antenna",
    gain_dbi: 0.0,
    directional: false,
};

pub const RADIO_PRESETS: &[RadioPreset] = &[MESHCORE_PNW, MESHCORE_US, CUSTOM_RADIO];

pub const DEVICE_PROFILES: &[DeviceProfile] = &[
    HELTEC_V3,
    HELTEC_V4,
    SEEED_XIAO,
    T_DECK,
    RAK_4631,
    STATION_G2,
    CUSTOM_DEVICE,
];

pub const ANTENNA_PROFILES: &[AntennaProfile] =
    &[STUBBY, DIPOLE, OMNI_MEDIUM, OMNI_HIGH, YAGI, CUSTOM_ANTENNA];

/// Look up a radio preset by id, ignoring case.
pub fn radio_preset(id: &str) -> Option<&'static RadioPreset> {
    RADIO_PRESETS.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// Look up a device by id, ignoring case.
pub fn device_profile(id: &str) -> Option<&'static DeviceProfile> {
    DEVICE_PROFILES.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// Look up an antenna by id, ignoring case.
pub fn antenna_profile(id: &str) -> Option<&'static AntennaProfile> {
    ANTENNA_PROFILES.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}
