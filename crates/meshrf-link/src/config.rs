//! Per-link radio configuration.

use crate::presets::{AntennaProfile, DeviceProfile, RadioPreset, MESHCORE_PNW, STUBBY};

/// Configuration for one transmitter → receiver link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Frequency in MHz.
    pub frequency_mhz: f64,
    /// Transmitter antenna height above ground (meters).
    pub tx_antenna_height_m: f64,
    /// Receiver antenna height above ground (meters).
    pub rx_antenna_height_m: f64,
    /// TX power in dBm.
    pub tx_power_dbm: f64,
    /// Transmitter antenna gain (dBi).
    pub tx_antenna_gain_dbi: f64,
    /// Transmitter connector/cable loss (dB).
    pub tx_cable_loss_db: f64,
    /// Receiver antenna gain (dBi).
    pub rx_antenna_gain_dbi: f64,
    /// Receiver connector/cable loss (dB).
    pub rx_cable_loss_db: f64,
    /// LoRa spreading factor (7-12).
    pub spreading_factor: u8,
    /// LoRa bandwidth in kHz.
    pub bandwidth_khz: f64,
    /// Explicit receiver sensitivity in dBm; derived from SF and bandwidth when unset.
    pub rx_sensitivity_dbm: Option<f64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: MESHCORE_PNW.frequency_mhz,
            tx_antenna_height_m: 2.0,
            rx_antenna_height_m: 2.0,
            tx_power_dbm: MESHCORE_PNW.tx_power_dbm,
            tx_antenna_gain_dbi: STUBBY.gain_dbi,
            tx_cable_loss_db: 0.0,
            rx_antenna_gain_dbi: STUBBY.gain_dbi,
            rx_cable_loss_db: 0.0,
            spreading_factor: MESHCORE_PNW.spreading_factor,
            bandwidth_khz: MESHCORE_PNW.bandwidth_khz,
            rx_sensitivity_dbm: None,
        }
    }
}

impl LinkConfig {
    /// Apply a radio preset's frequency, modulation and power.
    pub fn with_radio(mut self, radio: &RadioPreset) -> Self {
        self.frequency_mhz = radio.frequency_mhz;
        self.bandwidth_khz = radio.bandwidth_khz;
        self.spreading_factor = radio.spreading_factor;
        self.tx_power_dbm = radio.tx_power_dbm;
        self
    }

    /// Apply the transmitting device and antenna.
    ///
    /// TX power is capped at what the device can emit.
    pub fn with_transmitter(mut self, device: &DeviceProfile, antenna: &AntennaProfile) -> Self {
        self.tx_power_dbm = self.tx_power_dbm.min(device.max_tx_power_dbm);
        self.tx_cable_loss_db = device.cable_loss_db;
        self.tx_antenna_gain_dbi = antenna.gain_dbi;
        self
    }

    /// Apply the receiving device and antenna.
    pub fn with_receiver(mut self, device: &DeviceProfile, antenna: &AntennaProfile) -> Self {
        self.rx_cable_loss_db = device.cable_loss_db;
        self.rx_antenna_gain_dbi = antenna.gain_dbi;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{HELTEC_V3, MESHCORE_US, RAK_4631, YAGI};

    #[test]
    fn test_default_matches_pnw_preset() {
        let config = LinkConfig::default();
        assert_eq!(config.frequency_mhz, 910.525);
        assert_eq!(config.bandwidth_khz, 62.5);
        assert_eq!(config.spreading_factor, 7);
        assert_eq!(config.tx_power_dbm, 22.0);
    }

    #[test]
    fn test_presets_compose() {
        let config = LinkConfig::default()
            .with_radio(&MESHCORE_US)
            .with_transmitter(&HELTEC_V3, &YAGI)
            .with_receiver(&RAK_4631, &STUBBY);
        assert_eq!(config.frequency_mhz, 915.0);
        assert_eq!(config.spreading_factor, 11);
        assert_eq!(config.tx_antenna_gain_dbi, 11.0);
        assert_eq!(config.tx_cable_loss_db, 1.5);
        assert_eq!(config.rx_cable_loss_db, 0.5);
    }
}
