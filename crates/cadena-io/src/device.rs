//! Device discovery and how a device side lines up with a chain.
//!
//! A chain sees the hardware only through its external channels: capture
//! adapters' aux inputs and playback adapters' aux outputs. [`scan`]
//! reports every capture and playback endpoint with its channel count, and
//! [`ChannelFit`] says what the [`PeriodBridge`](crate::PeriodBridge) will
//! do with a given device width against a chain's external width.

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use crate::{Error, Result};

/// Which way audio flows through a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Device to chain (the chain's external inputs).
    Capture,
    /// Chain to device (the chain's external outputs).
    Playback,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Playback => "playback",
        }
    }
}

/// One side of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Device name as the host reports it.
    pub name: String,
    /// Channels in the device's default configuration.
    pub channels: u16,
    /// Default sample rate in Hz.
    pub sample_rate: u32,
    /// True for the host's default device on this side.
    pub is_default: bool,
}

/// Every endpoint the default host offers, by side.
#[derive(Debug, Clone, Default)]
pub struct DeviceReport {
    /// Capture endpoints, in host order (the order indices refer to).
    pub capture: Vec<Endpoint>,
    /// Playback endpoints, in host order.
    pub playback: Vec<Endpoint>,
}

impl DeviceReport {
    /// Endpoints of one side.
    pub fn side(&self, side: Side) -> &[Endpoint] {
        match side {
            Side::Capture => &self.capture,
            Side::Playback => &self.playback,
        }
    }

    /// Endpoint picked by `selector` (see [`select`]), or the default one.
    pub fn pick(&self, side: Side, selector: Option<&str>) -> Result<&Endpoint> {
        let endpoints = self.side(side);
        let index = match selector {
            Some(sel) => {
                let names: Vec<&str> = endpoints.iter().map(|e| e.name.as_str()).collect();
                select(&names, sel, side)?
            }
            None => endpoints
                .iter()
                .position(|e| e.is_default)
                .ok_or(Error::NoDevice)?,
        };
        endpoints.get(index).ok_or(Error::NoDevice)
    }
}

/// What the bridge does when `source` channels feed `dest` channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFit {
    /// Nothing on the receiving side.
    Idle,
    /// Channel `k` to channel `k`, all used.
    Exact,
    /// One source channel copied to every destination.
    Broadcast,
    /// This many source channels have no destination.
    Unused(usize),
    /// This many destination channels get silence.
    Silent(usize),
}

impl ChannelFit {
    /// Applies the bridge's mapping rules to a pair of widths.
    pub fn of(source: usize, dest: usize) -> Self {
        match (source, dest) {
            (_, 0) => Self::Idle,
            (s, d) if s == d => Self::Exact,
            (1, _) => Self::Broadcast,
            (s, d) if s > d => Self::Unused(s - d),
            (s, d) => Self::Silent(d - s),
        }
    }

    /// Fit of a device side against a chain with the given external
    /// input and output counts.
    pub fn for_chain(side: Side, device_channels: usize, inputs: usize, outputs: usize) -> Self {
        match side {
            Side::Capture => Self::of(device_channels, inputs),
            Side::Playback => Self::of(outputs, device_channels),
        }
    }
}

impl fmt::Display for ChannelFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("unused by the chain"),
            Self::Exact => f.write_str("exact"),
            Self::Broadcast => f.write_str("mono, copied to every channel"),
            Self::Unused(n) => write!(f, "{n} channel(s) dropped"),
            Self::Silent(n) => write!(f, "{n} channel(s) silent"),
        }
    }
}

/// Resolves `selector` against endpoint names: an index, an exact name, or
/// a case-insensitive fragment matching exactly one name.
pub fn select(names: &[&str], selector: &str, side: Side) -> Result<usize> {
    let kind = side.label();
    if let Ok(index) = selector.parse::<usize>() {
        return (index < names.len()).then_some(index).ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{kind} index {index}, {} available",
                names.len()
            ))
        });
    }
    if let Some(index) = names.iter().position(|&n| n == selector) {
        return Ok(index);
    }

    let needle = selector.to_lowercase();
    let hits: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect();
    match hits.as_slice() {
        [index] => Ok(*index),
        [] => Err(Error::DeviceNotFound(format!(
            "no {kind} device matches '{selector}'"
        ))),
        _ => {
            let listed: Vec<&str> = hits.iter().map(|&i| names[i]).collect();
            Err(Error::DeviceNotFound(format!(
                "'{selector}' matches several {kind} devices: {}",
                listed.join(", ")
            )))
        }
    }
}

fn name_of(device: &Device) -> Option<String> {
    device.description().ok().map(|d| d.name().to_string())
}

fn devices(host: &Host, side: Side) -> Result<Vec<Device>> {
    let found = match side {
        Side::Capture => host.input_devices().map(|d| d.collect()),
        Side::Playback => host.output_devices().map(|d| d.collect()),
    };
    found.map_err(|e| Error::Stream(e.to_string()))
}

fn endpoint(device: &Device, side: Side, default: Option<&str>) -> Option<Endpoint> {
    let name = name_of(device)?;
    let config = match side {
        Side::Capture => device.default_input_config(),
        Side::Playback => device.default_output_config(),
    }
    .ok()?;
    Some(Endpoint {
        is_default: default == Some(name.as_str()),
        name,
        channels: config.channels(),
        sample_rate: config.sample_rate(),
    })
}

/// Lists every capture and playback endpoint of the default host.
///
/// Devices without a usable default configuration on a side are left out
/// of that side; a side the host cannot enumerate comes back empty.
pub fn scan() -> DeviceReport {
    let host = cpal::default_host();
    let mut report = DeviceReport::default();
    for side in [Side::Capture, Side::Playback] {
        let default = match side {
            Side::Capture => host.default_input_device(),
            Side::Playback => host.default_output_device(),
        }
        .and_then(|d| name_of(&d));
        let mut endpoints: Vec<Endpoint> = match devices(&host, side) {
            Ok(found) => found
                .iter()
                .filter_map(|d| endpoint(d, side, default.as_deref()))
                .collect(),
            Err(e) => {
                tracing::warn!(side = side.label(), %e, "cannot enumerate audio devices");
                Vec::new()
            }
        };
        // Hosts may list the default device's name more than once.
        let first = endpoints.iter().position(|e| e.is_default);
        for (i, e) in endpoints.iter_mut().enumerate() {
            e.is_default = Some(i) == first;
        }
        match side {
            Side::Capture => report.capture = endpoints,
            Side::Playback => report.playback = endpoints,
        }
    }
    tracing::debug!(
        host = host.id().name(),
        capture = report.capture.len(),
        playback = report.playback.len(),
        "scanned audio devices"
    );
    report
}

/// Opens the device `selector` names on `side`, or the host default.
pub(crate) fn open(host: &Host, side: Side, selector: Option<&str>) -> Result<Device> {
    let Some(selector) = selector else {
        return match side {
            Side::Capture => host.default_input_device(),
            Side::Playback => host.default_output_device(),
        }
        .ok_or(Error::NoDevice);
    };
    // Same filtering as `scan`, so indices agree with what was listed.
    let mut candidates = devices(host, side)?;
    candidates.retain(|d| endpoint(d, side, None).is_some());
    let names: Vec<String> = candidates
        .iter()
        .map(|d| name_of(d).unwrap_or_default())
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let index = select(&refs, selector, side)?;
    Ok(candidates.swap_remove(index))
}

/// Name of an opened device, for logging.
pub(crate) fn describe(device: &Device) -> String {
    name_of(device).unwrap_or_else(|| "unnamed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 3] = ["Built-in Microphone", "USB Audio CODEC", "USB Audio Interface"];

    #[test]
    fn test_select_by_index_and_exact_name() {
        assert_eq!(select(&NAMES, "2", Side::Capture).unwrap(), 2);
        assert_eq!(select(&NAMES, "USB Audio CODEC", Side::Capture).unwrap(), 1);
        let err = select(&NAMES, "3", Side::Playback).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(ref m) if m.contains("3 available")));
    }

    #[test]
    fn test_select_fragment_must_be_unique() {
        assert_eq!(select(&NAMES, "micro", Side::Capture).unwrap(), 0);
        let err = select(&NAMES, "usb", Side::Capture).unwrap_err();
        assert!(
            matches!(err, Error::DeviceNotFound(ref m) if m.contains("USB Audio CODEC, USB Audio Interface"))
        );
        assert!(matches!(
            select(&NAMES, "hdmi", Side::Playback),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_fit_follows_bridge_rules() {
        assert_eq!(ChannelFit::of(2, 2), ChannelFit::Exact);
        assert_eq!(ChannelFit::of(1, 4), ChannelFit::Broadcast);
        assert_eq!(ChannelFit::of(8, 2), ChannelFit::Unused(6));
        assert_eq!(ChannelFit::of(2, 6), ChannelFit::Silent(4));
        assert_eq!(ChannelFit::of(0, 2), ChannelFit::Silent(2));
        assert_eq!(ChannelFit::of(2, 0), ChannelFit::Idle);
    }

    #[test]
    fn test_fit_for_chain_sides() {
        // A stereo interface against a mono-in, stereo-out chain.
        assert_eq!(
            ChannelFit::for_chain(Side::Capture, 2, 1, 2),
            ChannelFit::Unused(1)
        );
        assert_eq!(
            ChannelFit::for_chain(Side::Playback, 2, 1, 2),
            ChannelFit::Exact
        );
        // A generator chain takes nothing from capture.
        assert_eq!(ChannelFit::for_chain(Side::Capture, 2, 0, 2), ChannelFit::Idle);
        assert_eq!(ChannelFit::Silent(3).to_string(), "3 channel(s) silent");
    }

    #[test]
    fn test_pick_default_and_selected() {
        let endpoint = |name: &str, is_default| Endpoint {
            name: name.to_string(),
            channels: 2,
            sample_rate: 48000,
            is_default,
        };
        let report = DeviceReport {
            capture: vec![endpoint("Mic", false), endpoint("Line In", true)],
            playback: Vec::new(),
        };
        assert_eq!(report.pick(Side::Capture, None).unwrap().name, "Line In");
        assert_eq!(report.pick(Side::Capture, Some("mic")).unwrap().name, "Mic");
        assert!(matches!(report.pick(Side::Playback, None), Err(Error::NoDevice)));
    }

    #[test]
    fn test_scan_marks_at_most_one_default_per_side() {
        // Device availability depends on the system.
        let report = scan();
        for side in [Side::Capture, Side::Playback] {
            assert!(report.side(side).iter().filter(|e| e.is_default).count() <= 1);
        }
    }
}
