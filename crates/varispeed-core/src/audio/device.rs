//! Output device enumeration across every cpal host

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Sample rates probed when listing device capabilities
const PROBE_RATES: [u32; 4] = [44100, 48000, 88200, 96000];

/// Display name of a host ("ALSA", "JACK", "CoreAudio", ...)
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| host_name(*id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

/// An output device as listed for `--list-devices`
#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub id: DeviceId,
    /// Default output of its host
    pub is_default: bool,
    /// Probed rates the device accepts
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// List output devices from all available hosts, defaults first
pub fn get_output_devices() -> AudioResult<Vec<OutputDevice>> {
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("Skipping host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_label = host_name(host_id);
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let Ok(outputs) = host.output_devices() else {
            continue;
        };

        for device in outputs {
            let Ok(name) = device.name() else { continue };
            let Ok(configs) = device.supported_output_configs() else {
                continue;
            };

            let mut sample_rates = Vec::new();
            let mut max_channels = 0;
            for config in configs {
                max_channels = max_channels.max(config.channels());
                for rate in PROBE_RATES {
                    if (config.min_sample_rate().0..=config.max_sample_rate().0).contains(&rate)
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            if max_channels == 0 {
                continue;
            }
            sample_rates.sort_unstable();

            devices.push(OutputDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                id: DeviceId::with_host(&name, &host_label),
                sample_rates,
                max_channels,
            });
        }
    }

    if devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.id.host.cmp(&b.id.host))
            .then_with(|| a.id.name.cmp(&b.id.name))
    });

    log::info!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Find a device by id, searching every host when the id names none
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<cpal::Device> {
    let hosts: Vec<Host> = match id.host.as_deref().and_then(host_by_name) {
        Some(host) => vec![host],
        None => cpal::available_hosts()
            .into_iter()
            .filter_map(|host_id| cpal::host_from_id(host_id).ok())
            .collect(),
    };

    hosts
        .iter()
        .filter_map(|host| host.output_devices().ok())
        .flatten()
        .find(|device| device.name().ok().as_deref() == Some(id.name.as_str()))
        .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()))
}

/// Default output device of the default host
pub fn default_output_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoDefaultDevice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_names() {
        assert_eq!(host_name(HostId::Alsa), "ALSA");
    }

    #[test]
    fn test_unknown_device_not_found() {
        let id = DeviceId::with_host("no-such-device-anywhere", "NoSuchHost");
        assert!(matches!(find_device_by_id(&id), Err(AudioError::DeviceNotFound(_))));
    }
}
