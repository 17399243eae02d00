//! OpenCL platform enumeration and device selection.
//!
//! Selection walks platforms in enumeration order and takes the first
//! device of the requested class. A platform that errors during device
//! acquisition is treated the same as a platform with no matching
//! device: selection moves on to the next one. First-match keeps
//! startup latency low; nothing here ranks platforms by capability.

use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
    CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
};
use opencl3::platform::get_platforms;
use opencl3::types::cl_device_type;

use crate::{ClxorError, ClxorResult};

/// Which class of compute device to request from each platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// The platform's default device, whatever its type.
    #[default]
    Default,
    /// GPU devices only.
    Gpu,
    /// CPU devices only.
    Cpu,
    /// Dedicated accelerators only.
    Accelerator,
}

impl DeviceClass {
    fn to_cl(self) -> cl_device_type {
        match self {
            DeviceClass::Default => CL_DEVICE_TYPE_DEFAULT,
            DeviceClass::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceClass::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceClass::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
        }
    }
}

/// Return the number of OpenCL platforms on this host.
///
/// Returns 0 if the OpenCL runtime is absent (never errors).
pub fn platform_count() -> usize {
    get_platforms().map(|p| p.len()).unwrap_or(0)
}

/// Collect one candidate device per platform, in platform enumeration
/// order.
///
/// Fails with `NoPlatform` when zero platforms are enumerable and with
/// `NoDevice` when no platform yields a device of the requested class.
/// Per-platform acquisition errors are not fatal; that platform simply
/// contributes no candidate.
pub fn candidate_devices(class: DeviceClass) -> ClxorResult<Vec<Device>> {
    let platforms = get_platforms().map_err(|_| ClxorError::NoPlatform)?;
    if platforms.is_empty() {
        return Err(ClxorError::NoPlatform);
    }

    let mut candidates = Vec::new();
    for platform in &platforms {
        match platform.get_devices(class.to_cl()) {
            Ok(ids) if !ids.is_empty() => candidates.push(Device::new(ids[0])),
            // "errored" and "has none" are the same thing here
            _ => {}
        }
    }

    if candidates.is_empty() {
        return Err(ClxorError::NoDevice);
    }
    Ok(candidates)
}

/// Secure one compute device of the requested class.
///
/// First platform that yields a device wins.
pub fn select_device(class: DeviceClass) -> ClxorResult<Device> {
    let mut candidates = candidate_devices(class)?;
    Ok(candidates.remove(0))
}

/// Information about a discovered OpenCL device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name (e.g. "NVIDIA GeForce RTX 3080").
    pub name: String,
    /// Device vendor string.
    pub vendor: String,
    /// Whether this is a GPU device (vs CPU or accelerator).
    pub is_gpu: bool,
    /// Parallel compute units on the device.
    pub compute_units: u32,
    /// Maximum work-group size supported by the device.
    pub max_work_group_size: usize,
    /// Global memory size in bytes.
    pub global_mem_size: u64,
}

/// Probe all available OpenCL devices without creating an engine.
///
/// Returns an empty vec if no OpenCL runtime is installed or no
/// devices are found (never errors).
pub fn probe_devices() -> Vec<DeviceInfo> {
    let platforms = match get_platforms() {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::new();
    for platform in &platforms {
        let ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();
        for id in ids {
            let dev = Device::new(id);
            let dev_type: cl_device_type = dev.dev_type().unwrap_or(0);
            out.push(DeviceInfo {
                name: dev.name().unwrap_or_default().trim().to_string(),
                vendor: dev.vendor().unwrap_or_default().trim().to_string(),
                is_gpu: (dev_type & CL_DEVICE_TYPE_GPU) != 0,
                compute_units: dev.max_compute_units().unwrap_or(0),
                max_work_group_size: dev.max_work_group_size().unwrap_or(1),
                global_mem_size: dev.global_mem_size().unwrap_or(0),
            });
        }
    }
    out
}

/// Build a one-line capability summary for a device.
///
/// Purely informational: callers log the result (or the error) and
/// carry on, so a failing query can never change which device a run
/// uses.
pub fn describe_device(device: &Device) -> ClxorResult<String> {
    let name = device
        .name()
        .map_err(|e| ClxorError::Query(format!("device name: {e}")))?;
    let vendor = device
        .vendor()
        .map_err(|e| ClxorError::Query(format!("device vendor: {e}")))?;
    let dev_type: cl_device_type = device
        .dev_type()
        .map_err(|e| ClxorError::Query(format!("device type: {e}")))?;
    let compute_units = device
        .max_compute_units()
        .map_err(|e| ClxorError::Query(format!("compute units: {e}")))?;
    let max_wg = device
        .max_work_group_size()
        .map_err(|e| ClxorError::Query(format!("work-group size: {e}")))?;
    let global_mem = device
        .global_mem_size()
        .map_err(|e| ClxorError::Query(format!("global memory: {e}")))?;

    let kind = if dev_type & CL_DEVICE_TYPE_GPU != 0 {
        "GPU"
    } else if dev_type & CL_DEVICE_TYPE_CPU != 0 {
        "CPU"
    } else if dev_type & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        "accelerator"
    } else {
        "unknown"
    };

    Ok(format!(
        "{} ({}, {kind}, {compute_units} CUs, max work-group {max_wg}, {} MiB global)",
        name.trim(),
        vendor.trim(),
        global_mem / (1024 * 1024),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_default() {
        assert_eq!(DeviceClass::default(), DeviceClass::Default);
    }

    #[test]
    fn test_device_class_to_cl_distinct() {
        let classes = [
            DeviceClass::Default,
            DeviceClass::Gpu,
            DeviceClass::Cpu,
            DeviceClass::Accelerator,
        ];
        for (i, a) in classes.iter().enumerate() {
            for b in &classes[i + 1..] {
                assert_ne!(a.to_cl(), b.to_cl());
            }
        }
    }

    #[test]
    fn test_platform_count_does_not_panic() {
        // Must work (returning 0) even without an OpenCL runtime
        let _ = platform_count();
    }

    #[test]
    fn test_probe_devices_does_not_panic() {
        let devices = probe_devices();
        // Count depends on the environment; only the call itself is
        // under test here.
        let _ = devices;
    }

    #[test]
    fn test_selection_error_without_candidates() {
        // On hosts with no OpenCL runtime or no matching device, the
        // selector must report a defined error rather than panic. On
        // hosts with a device this simply exercises the happy path.
        match select_device(DeviceClass::Default) {
            Ok(_) | Err(ClxorError::NoPlatform) | Err(ClxorError::NoDevice) => {}
            Err(other) => panic!("unexpected selection error: {other:?}"),
        }
    }
}
