/*!
The SCSI transport contract.

A [`Driver`](trait.Driver.html) delivers Command Descriptor Blocks to a device
identified by an [`Address`](struct.Address.html) and reports status and sense
data back. The library ships an `SG_IO`-based implementation on Linux; everything
above this module is transport-agnostic, which is also what makes the capability
probe testable against a scripted mock.
*/

#[cfg(target_os = "linux")]
pub mod linux;

use std::fmt;
use std::io;

use Direction;

/// Length of the sense buffer returned by [`Driver::transport_with_sense`](trait.Driver.html#tymethod.transport_with_sense).
pub const SENSE_LEN: usize = 24;

/// Longest CDB a driver accepts.
pub const MAX_CDB_LEN: usize = 16;

/// Default per-command timeout, in seconds.
pub const DEFAULT_TIMEOUT: u32 = 60;

// SCSI status codes, see SAM-2
pub const STAT_GOOD: u8 = 0x00;
pub const STAT_CHECK_CONDITION: u8 = 0x02;
pub const STAT_CONDITION_MET: u8 = 0x04;
pub const STAT_BUSY: u8 = 0x08;
pub const STAT_INTERMEDIATE: u8 = 0x10;
pub const STAT_INTERMEDIATE_COND_MET: u8 = 0x14;
pub const STAT_RESERVATION_CONFLICT: u8 = 0x18;
pub const STAT_COMMAND_TERMINATED: u8 = 0x22;
pub const STAT_QUEUE_FULL: u8 = 0x28;

quick_error! {
	#[derive(Debug)]
	pub enum Error {
		InvalidArgument(what: &'static str) {
			display("invalid argument: {}", what)
		}
		InvalidAddress {
			display("address holds neither a device identifier nor a valid (bus, target, lun) triple")
		}
		Io(err: io::Error) {
			from()
			display("I/O error: {}", err)
			cause(err)
		}
		CheckCondition(key: u8, asc: u8, ascq: u8) {
			display("SCSI check condition (key 0x{:x}, asc 0x{:02x}, ascq 0x{:02x})", key, asc, ascq)
		}
		Parse(what: &'static str) {
			display("malformed response: {}", what)
		}
	}
}

/**
Location of a device on the host.

An address carries two sets of data: an opaque OS device identifier and a
(bus, target, lun) triple. Only one of the two is guaranteed to be valid; which
one depends on the driver implementation. Addresses do not change once built.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct Address {
	pub device: String,
	pub bus: i32,
	pub target: i32,
	pub lun: i32,
}

impl Default for Address {
	fn default() -> Address {
		Address {
			device: String::new(),
			bus: -1,
			target: -1,
			lun: -1,
		}
	}
}

impl Address {
	/// Builds an address from an OS device identifier (e.g. `/dev/sr0`).
	pub fn from_device(device: &str) -> Address {
		Address { device: device.to_string(), ..Default::default() }
	}

	/// Builds an address from a (bus, target, lun) triple.
	pub fn from_btl(bus: i32, target: i32, lun: i32) -> Address {
		Address {
			device: String::new(),
			bus: bus,
			target: target,
			lun: lun,
		}
	}

	/// An address is valid if at least one of its two forms is usable.
	pub fn is_valid(&self) -> bool {
		!self.device.is_empty() || (self.bus >= 0 && self.target >= 0 && self.lun >= 0)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "({}, {}, {}, {})", self.bus, self.target, self.lun, self.device)
	}
}

/**
The transport every device talks through.

Implementations own whatever OS handles they need (keyed by the per-device
identifier) and are shared by reference between all devices, so every method
takes `&self`; mutable state lives behind interior mutability. Commands block
for up to the configured timeout; there is no cancellation.
*/
pub trait Driver: fmt::Debug {
	/// Sets the per-command timeout in seconds. Negative values restore
	/// [`DEFAULT_TIMEOUT`](constant.DEFAULT_TIMEOUT.html).
	fn timeout(&self, seconds: i64);

	/// Enables or disables log output for failing commands. Returns the
	/// previous state so that callers can restore it.
	fn silence(&self, enable: bool) -> bool;

	/// Enumerates candidate optical devices on the system.
	fn scan(&self) -> Result<Vec<Address>, Error>;

	/// Executes a CDB against the device at `addr`, transferring `data` in the
	/// given direction. `Ok(())` means the device reported status GOOD; a
	/// non-GOOD status comes back as [`Error::CheckCondition`](enum.Error.html).
	fn transport(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<(), Error>;

	/// Like [`transport`](#tymethod.transport), but hands the raw target status
	/// byte and the sense data to the caller instead of folding them into the
	/// result. `Err` here only means the command could not be delivered at all.
	fn transport_with_sense(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<([u8; SENSE_LEN], u8), Error>;
}

/**
Scope guard that silences a driver for as long as it lives.

The previous silence state is restored on drop, whichever way the scope is left.
Bind it to a local (`let _silencer = …`) or it is dropped immediately.
*/
#[derive(Debug)]
pub struct Silencer<'a> {
	driver: &'a dyn Driver,
	was: bool,
}

impl<'a> Silencer<'a> {
	pub fn new(driver: &'a dyn Driver) -> Silencer<'a> {
		let was = driver.silence(true);
		Silencer { driver: driver, was: was }
	}
}

impl<'a> Drop for Silencer<'a> {
	fn drop(&mut self) {
		self.driver.silence(self.was);
	}
}

#[cfg(target_os = "linux")]
lazy_static! {
	static ref DRIVER: linux::SgDriver = linux::SgDriver::new();
}

/**
Returns the process-wide driver instance.

The driver is picked once per process for the host OS and shared by reference by
every [`Device`](../device/struct.Device.html) and
[`DeviceManager`](../manager/struct.DeviceManager.html) built through the
default constructors.
*/
#[cfg(target_os = "linux")]
pub fn driver() -> &'static dyn Driver {
	&*DRIVER
}
