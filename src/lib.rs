/*!
This crate discovers optical disc (CD/DVD/BD/HD-DVD) drives attached to the host,
talks to them using the SCSI Multimedia Command set (MMC), and exposes each drive's
capabilities, supported write modes, current media profile and speed tables.

## Example

```no_run
use odd::DeviceManager;
use odd::mmc::{Feature, WriteMode};

let mut manager = DeviceManager::new();
manager.scan(None).unwrap();

for dev in manager.devices() {
	println!("{}", dev.name());
	println!("  writes CD-R: {}", dev.support(Feature::WriteCdR));
	println!("  supports SAO: {}", dev.support_write_mode(WriteMode::Sao));
}
```

For hand-crafted command exchanges, see [`Device`](device/struct.Device.html) and
the [`scsi::Driver`](scsi/trait.Driver.html) transport contract.
*/

#![warn(missing_debug_implementations)]

#[cfg(feature = "serializable")]
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
#[cfg(target_os = "linux")]
#[macro_use]
extern crate lazy_static;

extern crate byteorder;
#[cfg(target_os = "linux")]
extern crate libc;

/// Data transfer direction of a SCSI command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction { None, From, To }

pub mod scsi;
pub mod mmc;

pub mod device;
pub use device::Device;

pub mod manager;
pub use manager::{DeviceManager, ScanCallback, ScanEvent};

pub mod utils;
