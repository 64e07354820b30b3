/*!
Discovery orchestrator: asks the driver for device addresses, builds a
[`Device`](../device/struct.Device.html) for each and probes their capabilities,
reporting progress to an optional callback.
*/

use scsi::{Address, Driver, Error};
use Device;

/// Scan progress notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
	/// Scanning the system bus for devices.
	DevScan,
	/// Obtaining the capabilities of the individual devices.
	DevCap,
}

/// Callback interface for watching and filtering a device scan.
pub trait ScanCallback {
	/// Called when the scanning status changes.
	fn event_status(&mut self, event: ScanEvent);

	/// Called for every discovered device. Returning `false` drops the device
	/// from the result.
	fn event_device(&mut self, addr: &Address) -> bool;
}

/// Owns the set of discovered devices.
#[derive(Debug)]
pub struct DeviceManager<'a> {
	driver: &'a dyn Driver,
	devices: Vec<Device<'a>>,
}

#[cfg(target_os = "linux")]
impl DeviceManager<'static> {
	/// Builds a manager on the process-wide driver.
	pub fn new() -> DeviceManager<'static> {
		DeviceManager::with_driver(::scsi::driver())
	}
}

impl<'a> DeviceManager<'a> {
	/// Builds a manager that talks through the given driver.
	pub fn with_driver(driver: &'a dyn Driver) -> DeviceManager<'a> {
		DeviceManager {
			driver: driver,
			devices: vec![],
		}
	}

	/**
	Scans the system for devices and probes the capabilities of each one.

	Previously known devices are dropped first. The optional callback is told
	when each phase starts and may veto individual devices. A failing
	transport scan is fatal; a per-device probe failure is logged and the scan
	carries on.
	*/
	pub fn scan(&mut self, mut callback: Option<&mut dyn ScanCallback>) -> Result<(), Error> {
		self.devices.clear();

		if let Some(ref mut cb) = callback {
			cb.event_status(ScanEvent::DevScan);
		}

		let addresses = self.driver.scan()?;

		for addr in addresses {
			let dev = Device::with_driver(addr, self.driver);

			let keep = match callback {
				Some(ref mut cb) => cb.event_device(dev.address()),
				None => true,
			};

			if keep {
				self.devices.push(dev);
			}
		}

		if let Some(ref mut cb) = callback {
			cb.event_status(ScanEvent::DevCap);
		}

		for dev in self.devices.iter_mut() {
			if let Err(err) = dev.refresh() {
				warn!("unable to refresh device capabilities for {}: {}", dev.name(), err);
			}
		}

		Ok(())
	}

	/// All devices found by the last [`scan`](#method.scan).
	pub fn devices(&self) -> &[Device<'a>] {
		&self.devices
	}
}
