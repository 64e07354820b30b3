//! `SG_IO`-based [`Driver`](../trait.Driver.html) implementation.

use libc::{c_int, c_uint, c_uchar, c_ushort, c_void};

use libc::ioctl;
use std::ptr;

#[cfg(not(any(target_env = "musl")))]
use libc::c_ulong;

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use Direction;
use scsi::{Address, Driver, Error};
use scsi::{DEFAULT_TIMEOUT, MAX_CDB_LEN, SENSE_LEN, STAT_GOOD};
use utils;

// see scsi/sg.h

#[cfg(not(any(target_env = "musl")))]
const SG_IO: c_ulong = 0x2285;

#[cfg(any(target_env = "musl"))]
const SG_IO: c_int = 0x2285;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

#[repr(C)]
#[derive(Debug)]
struct sg_io_hdr {
	interface_id:	c_int,	// [i] 'S' for SCSI generic (required)
	dxfer_direction:	c_int,	// [i] data transfer direction
	cmd_len:	c_uchar,	// [i] SCSI command length ( <= 16 bytes)
	mx_sb_len:	c_uchar,	// [i] max length to write to sbp
	iovec_count:	c_ushort,	// [i] 0 implies no scatter gather
	dxfer_len:	c_uint,	// [i] byte count of data transfer
	dxferp:	*mut c_void,	// [i], [*io] points to data transfer memory or scatter gather list
	cmdp:	*const c_uchar,	// [i], [*i] points to command to perform
	sbp:	*mut c_uchar,	// [i], [*o] points to sense_buffer memory
	timeout:	c_uint,	// [i] MAX_UINT->no timeout (unit: millisec)
	flags:	c_uint,	// [i] 0 -> default, see SG_FLAG...
	pack_id:	c_int,	// [i->o] unused internally (normally)
	usr_ptr:	*mut c_void,	// [i->o] unused internally
	status:	c_uchar,	// [o] scsi status
	masked_status:	c_uchar,	// [o] shifted, masked scsi status
	msg_status:	c_uchar,	// [o] messaging level data (optional)
	sb_len_wr:	c_uchar,	// [o] byte count actually written to sbp
	host_status:	c_ushort,	// [o] errors from host adapter
	driver_status:	c_ushort,	// [o] errors from software driver
	resid:	c_int,	// [o] dxfer_len - actual_transferred
	duration:	c_uint,	// [o] time taken by cmd (unit: millisec)
	info:	c_uint,	// [o] auxiliary information
}

/**
Driver that talks to devices through the Linux SCSI generic interface.

Device handles are opened lazily on first use and cached per device path. The
handle cache, the timeout and the silence flag are all behind interior
mutability so that a single instance can serve the whole process.
*/
#[derive(Debug)]
pub struct SgDriver {
	timeout: AtomicU32,	// seconds
	silent: AtomicBool,
	handles: Mutex<HashMap<String, File>>,
}

impl SgDriver {
	pub fn new() -> SgDriver {
		SgDriver {
			timeout: AtomicU32::new(DEFAULT_TIMEOUT),
			silent: AtomicBool::new(false),
			handles: Mutex::new(HashMap::new()),
		}
	}

	fn silent(&self) -> bool {
		self.silent.load(Ordering::Relaxed)
	}

	fn exec(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<([u8; SENSE_LEN], u8), Error>
	{
		if cdb.is_empty() || cdb.len() > MAX_CDB_LEN {
			return Err(Error::InvalidArgument("CDB length"));
		}

		if addr.device.is_empty() {
			if !self.silent() {
				warn!("invalid address {}", addr);
			}
			return Err(Error::InvalidAddress);
		}

		let mut handles = self.handles.lock().unwrap();

		if !handles.contains_key(&addr.device) {
			// O_NONBLOCK so that an empty tray does not stall the open
			let file = OpenOptions::new()
				.read(true)
				.write(true)
				.custom_flags(::libc::O_NONBLOCK)
				.open(&addr.device);

			let file = match file {
				Ok(file) => file,
				Err(err) => {
					if !self.silent() {
						warn!("unable to open device {}: {}", addr, err);
					}
					return Err(err.into());
				},
			};

			handles.insert(addr.device.clone(), file);
		}

		let file = &handles[&addr.device];

		let mut sense = [0u8; SENSE_LEN];

		let mut hdr = sg_io_hdr {
			interface_id:	'S' as c_int,

			dxfer_direction: match dir {
				Direction::None => SG_DXFER_NONE,
				Direction::From => SG_DXFER_FROM_DEV,
				Direction::To => SG_DXFER_TO_DEV,
			},
			dxferp:	if data.is_empty() { ptr::null_mut() } else { data.as_mut_ptr() as *mut c_void },
			dxfer_len:	data.len() as c_uint,
			resid:	0,

			sbp:	sense.as_mut_ptr(),
			mx_sb_len:	SENSE_LEN as c_uchar,
			sb_len_wr:	0,

			cmdp:	cdb.as_ptr(),
			cmd_len:	cdb.len() as c_uchar,

			status:	0,
			host_status:	0,
			driver_status:	0,

			timeout:	self.timeout.load(Ordering::Relaxed).saturating_mul(1000),
			duration:	0,

			iovec_count:	0,
			flags:	0,
			pack_id:	0,
			usr_ptr:	ptr::null_mut(),
			masked_status:	0,
			msg_status:	0,
			info:	0,
		};

		unsafe {
			if ioctl(file.as_raw_fd(), SG_IO, &mut hdr) == -1 {
				let err = io::Error::last_os_error();
				if !self.silent() {
					warn!("SG_IO ioctl failed on {}: {}", addr, err);
				}
				return Err(err.into());
			}
		}

		Ok((sense, hdr.status))
	}
}

impl Driver for SgDriver {
	fn timeout(&self, seconds: i64) {
		let seconds = if seconds < 0 { DEFAULT_TIMEOUT } else { seconds as u32 };
		self.timeout.store(seconds, Ordering::Relaxed);
	}

	fn silence(&self, enable: bool) -> bool {
		self.silent.swap(enable, Ordering::Relaxed)
	}

	fn scan(&self) -> Result<Vec<Address>, Error> {
		let mut addresses = vec![];

		// sr is the kernel's block driver for ROM devices of any optical kind
		for entry in fs::read_dir("/sys/block")? {
			let entry = entry?;

			let name = match entry.file_name().into_string() {
				Ok(name) => name,
				Err(_) => continue,
			};

			if !name.starts_with("sr") { continue }

			addresses.push(Address::from_device(&format!("/dev/{}", name)));
		}

		addresses.sort_by(|a, b| a.device.cmp(&b.device));

		Ok(addresses)
	}

	fn transport(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<(), Error>
	{
		let (sense, status) = self.exec(addr, cdb, data, dir)?;

		if status != STAT_GOOD {
			let (key, asc, ascq) = (sense[2] & 0x0f, sense[12], sense[13]);

			if !self.silent() {
				warn!("scsi command failed (0x{:02x})", status);
				warn!("> cdb: {}", utils::dump_bytes(cdb));
				warn!("> sense key: 0x{:x}, asc: 0x{:02x}, ascq: 0x{:02x}", key, asc, ascq);
			}

			return Err(Error::CheckCondition(key, asc, ascq));
		}

		Ok(())
	}

	fn transport_with_sense(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<([u8; SENSE_LEN], u8), Error>
	{
		self.exec(addr, cdb, data, dir)
	}
}
