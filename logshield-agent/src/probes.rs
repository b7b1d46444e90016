//! Linux device probes
//!
//! Thin sysfs adapters behind the core `DeviceProbe` trait. These read
//! whatever the kernel exposes; a missing file means the reading is
//! unavailable on this device, not an error.

use std::fs;
use std::path::{Path, PathBuf};

use logshield_core::monitor::DeviceProbe;
use logshield_core::{BatteryReading, ForegroundApp, NetworkReading, Result};

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";
const NET_DIR: &str = "/sys/class/net";

/// Sysfs-backed probe for Linux hosts.
pub struct SysfsProbe {
    power_supply_dir: PathBuf,
    net_dir: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self {
            power_supply_dir: PathBuf::from(POWER_SUPPLY_DIR),
            net_dir: PathBuf::from(NET_DIR),
        }
    }
}

impl SysfsProbe {
    /// Probe rooted at alternate sysfs paths (for tests).
    #[cfg(test)]
    fn with_roots(power_supply_dir: PathBuf, net_dir: PathBuf) -> Self {
        Self {
            power_supply_dir,
            net_dir,
        }
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Map an interface name to the reporting label the collector rules expect.
fn interface_label(name: &str) -> &'static str {
    if name.starts_with("wl") {
        "WiFi"
    } else if name.starts_with("en") || name.starts_with("eth") {
        "Ethernet"
    } else if name.starts_with("ww") || name.starts_with("rmnet") {
        "Mobile Data"
    } else if name.starts_with("tun") || name.starts_with("wg") {
        "VPN"
    } else {
        "Unknown"
    }
}

impl DeviceProbe for SysfsProbe {
    fn battery(&self) -> Result<Option<BatteryReading>> {
        let entries = match fs::read_dir(&self.power_supply_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            let Some(capacity) =
                read_trimmed(&dir.join("capacity")).and_then(|v| v.parse::<i32>().ok())
            else {
                continue;
            };
            let charging = read_trimmed(&dir.join("status"))
                .map(|s| s == "Charging" || s == "Full")
                .unwrap_or(false);
            return Ok(Some(BatteryReading {
                percent: capacity.clamp(0, 100),
                charging,
            }));
        }

        Ok(None)
    }

    fn network(&self) -> Result<Option<NetworkReading>> {
        let entries = match fs::read_dir(&self.net_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        // First interface that is up wins; loopback is skipped
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "lo" {
                continue;
            }
            if read_trimmed(&entry.path().join("operstate")).as_deref() == Some("up") {
                return Ok(Some(NetworkReading {
                    network_type: interface_label(&name).to_string(),
                    connected: true,
                }));
            }
        }

        Ok(Some(NetworkReading {
            network_type: "Unknown".to_string(),
            connected: false,
        }))
    }

    fn foreground_app(&self) -> Result<Option<ForegroundApp>> {
        // No usage-stats source on a plain Linux host
        Ok(None)
    }
}
