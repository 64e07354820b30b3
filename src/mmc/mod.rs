/*!
MMC command layer: opcodes, CDB construction, feature codes and the enums that
describe what a drive can do.

Payload parsers for the data these commands return live in
[`mmc::data`](data/index.html).
*/

pub mod data;

use byteorder::{ByteOrder, BigEndian};

use scsi::Error;

/// MMC command opcodes.
///
/// Only INQUIRY, GET CONFIGURATION and MODE SENSE/SELECT (10) are exercised by
/// the capability probe; the rest are listed for callers building their own
/// exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	TestUnitReady = 0x00,
	RequestSense = 0x03,
	FormatUnit = 0x04,
	Inquiry = 0x12,
	StartStopUnit = 0x1b,
	PreventAllowMediumRemoval = 0x1e,
	ReadFormatCapacities = 0x23,
	ReadCapacity = 0x25,
	ReadTocPmaAtip = 0x43,
	GetConfiguration = 0x46,
	GetEventStatusNotification = 0x4a,
	ReadDiscInformation = 0x51,
	ReadTrackInformation = 0x52,
	ModeSelect10 = 0x55,
	ModeSense10 = 0x5a,
	CloseTrackSession = 0x5b,
	Blank = 0xa1,
	GetPerformance = 0xac,
	ReadDiscStructure = 0xad,
	SetCdSpeed = 0xbb,
	ReadCd = 0xbe,
}

// GET CONFIGURATION feature codes (MMC-5, table 86)
pub const FEATURE_MULTIREAD: u16 = 0x001d;
pub const FEATURE_CD_READ: u16 = 0x001e;
pub const FEATURE_DVDPLUSRW: u16 = 0x002a;
pub const FEATURE_DVDPLUSR: u16 = 0x002b;
pub const FEATURE_DVDPLUSRW_DL: u16 = 0x003a;
pub const FEATURE_DVDPLUSR_DL: u16 = 0x003b;
pub const FEATURE_BD_READ: u16 = 0x0040;
pub const FEATURE_BD_WRITE: u16 = 0x0041;
pub const FEATURE_HDDVD_READ: u16 = 0x0050;
pub const FEATURE_HDDVD_WRITE: u16 = 0x0051;

/// Media profiles as reported by GET CONFIGURATION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum Profile {
	None = 0x0000,
	NonRemovable = 0x0001,
	Removable = 0x0002,
	MOpticErasable = 0x0003,
	OpticWriteOnce = 0x0004,
	AsMo = 0x0005,
	CdRom = 0x0008,
	CdR = 0x0009,
	CdRw = 0x000a,
	DvdRom = 0x0010,
	DvdMinusRSeq = 0x0011,
	DvdRam = 0x0012,
	DvdMinusRwRestOv = 0x0013,
	DvdMinusRwSeq = 0x0014,
	DvdMinusRDlSeq = 0x0015,
	DvdMinusRDlJump = 0x0016,
	DvdPlusRw = 0x001a,
	DvdPlusR = 0x001b,
	DvdPlusRwDl = 0x002a,
	DvdPlusRDl = 0x002b,
	BdRom = 0x0040,
	BdRSrm = 0x0041,
	BdRRrm = 0x0042,
	BdRe = 0x0043,
	HdDvdRom = 0x0050,
	HdDvdR = 0x0051,
	HdDvdRam = 0x0052,
	NonStandard = 0xffff,
}

impl Profile {
	/// Unlisted profile codes collapse into `NonStandard`.
	pub fn from_u16(value: u16) -> Profile {
		match value {
			0x0000 => Profile::None,
			0x0001 => Profile::NonRemovable,
			0x0002 => Profile::Removable,
			0x0003 => Profile::MOpticErasable,
			0x0004 => Profile::OpticWriteOnce,
			0x0005 => Profile::AsMo,
			0x0008 => Profile::CdRom,
			0x0009 => Profile::CdR,
			0x000a => Profile::CdRw,
			0x0010 => Profile::DvdRom,
			0x0011 => Profile::DvdMinusRSeq,
			0x0012 => Profile::DvdRam,
			0x0013 => Profile::DvdMinusRwRestOv,
			0x0014 => Profile::DvdMinusRwSeq,
			0x0015 => Profile::DvdMinusRDlSeq,
			0x0016 => Profile::DvdMinusRDlJump,
			0x001a => Profile::DvdPlusRw,
			0x001b => Profile::DvdPlusR,
			0x002a => Profile::DvdPlusRwDl,
			0x002b => Profile::DvdPlusRDl,
			0x0040 => Profile::BdRom,
			0x0041 => Profile::BdRSrm,
			0x0042 => Profile::BdRRrm,
			0x0043 => Profile::BdRe,
			0x0050 => Profile::HdDvdRom,
			0x0051 => Profile::HdDvdR,
			0x0052 => Profile::HdDvdRam,
			_ => Profile::NonStandard,
		}
	}
}

/// Capability bits a drive can advertise.
///
/// The first block mirrors mode page 0x2A one flag at a time; the DVD+, BD and
/// HD-DVD bits come from GET CONFIGURATION feature descriptors; the last three
/// are vendor specific. Each variant's position is its bit in the device's
/// feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum Feature {
	// media read capabilities
	ReadCdR,
	ReadCdRw,
	Method2,
	ReadDvdRom,
	ReadDvdR,
	ReadDvdRam,
	ReadDvdPlusRw,
	ReadDvdPlusR,
	ReadDvdPlusRwDl,
	ReadDvdPlusRDl,
	ReadBd,
	ReadHdDvd,

	// media write capabilities
	WriteCdR,
	WriteCdRw,
	WriteDvdR,
	WriteDvdRam,
	WriteDvdPlusRw,
	WriteDvdPlusR,
	WriteDvdPlusRwDl,
	WriteDvdPlusRDl,
	WriteBd,
	WriteHdDvd,

	// other capabilities
	MultiRead,
	CdRead,
	TestWrite,
	AudioPlay,
	Composite,
	DigitalPort1,
	DigitalPort2,
	Mode2Form1,
	Mode2Form2,
	MultiSession,
	Bup,
	CddaSupported,
	CddaAccurate,
	RwSupported,
	RwDeintCorr,
	C2Pointers,
	Isrc,
	Upc,
	ReadBarCode,
	Lock,
	LockState,
	PreventJumper,
	Eject,
	SepChanVol,
	SepChanMute,
	ChangeDiscPrsnt,
	Sss,
	ChangeSides,
	RwLeadIn,
	Bckf,
	Rck,
	Lsbf,

	// vendor specific
	AudioMaster,
	ForceSpeed,
	Varirec,
}

/// Ways of laying down tracks and sessions on recordable media.
///
/// Each variant's position is its bit in the device's write mode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum WriteMode {
	Packet,
	Tao,
	Sao,
	Raw16,
	Raw96P,
	Raw96R,
	LayerJump,
}

/// Scalar device properties filled in by the capability probe.
///
/// Speeds are in sectors per second (2352-byte sectors), the buffer size in KB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum Property {
	NumVolLvls,
	BufferSize,
	CopyMgmtRev,
	LoadMechanism,
	RotCtrl,
	DaBlockLen,
	MaxReadSpd,
	CurReadSpd,
	MaxWriteSpd,
	CurWriteSpd,
}

/// Number of defined properties.
pub const PROPERTY_COUNT: usize = 10;

/// Mechanism the drive loads media with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum LoadMechanism {
	Caddy,
	Tray,
	Popup,
	ChangerIndividual,
	ChangerMagazine,
	Reserved(u8),
}

impl LoadMechanism {
	pub fn from_bits(bits: u8) -> LoadMechanism {
		match bits & 0x07 {
			0x00 => LoadMechanism::Caddy,
			0x01 => LoadMechanism::Tray,
			0x02 => LoadMechanism::Popup,
			0x04 => LoadMechanism::ChangerIndividual,
			0x05 => LoadMechanism::ChangerMagazine,
			other => LoadMechanism::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			LoadMechanism::Caddy => 0x00,
			LoadMechanism::Tray => 0x01,
			LoadMechanism::Popup => 0x02,
			LoadMechanism::ChangerIndividual => 0x04,
			LoadMechanism::ChangerMagazine => 0x05,
			LoadMechanism::Reserved(bits) => bits,
		}
	}
}

/// Disc rotation control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum RotCtrl {
	Clv,
	Cav,
	Reserved(u8),
}

impl RotCtrl {
	pub fn from_bits(bits: u8) -> RotCtrl {
		match bits & 0x03 {
			0x00 => RotCtrl::Clv,
			0x01 => RotCtrl::Cav,
			other => RotCtrl::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			RotCtrl::Clv => 0x00,
			RotCtrl::Cav => 0x01,
			RotCtrl::Reserved(bits) => bits,
		}
	}
}

/// Block length of digital audio data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum AudioBlockLen {
	Len32,
	Len16,
	Len24,
	Len24I2s,
}

impl AudioBlockLen {
	pub fn from_bits(bits: u8) -> AudioBlockLen {
		match bits & 0x03 {
			0x00 => AudioBlockLen::Len32,
			0x01 => AudioBlockLen::Len16,
			0x02 => AudioBlockLen::Len24,
			_ => AudioBlockLen::Len24I2s,
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			AudioBlockLen::Len32 => 0x00,
			AudioBlockLen::Len16 => 0x01,
			AudioBlockLen::Len24 => 0x02,
			AudioBlockLen::Len24I2s => 0x03,
		}
	}
}

/// A zero-filled 16-byte CDB and the number of significant bytes in it.
#[derive(Debug, Clone)]
pub struct Cdb {
	bytes: [u8; 16],
	len: usize,
}

impl Cdb {
	fn new(len: usize) -> Cdb {
		Cdb { bytes: [0; 16], len: len }
	}

	/// INQUIRY (6) with the standard 36-byte allocation (SPC-2, table 46).
	pub fn inquiry() -> Cdb {
		let mut cdb = Cdb::new(6);
		cdb.bytes[0] = Command::Inquiry as u8;
		cdb.bytes[4] = 0x24;
		cdb
	}

	/// GET CONFIGURATION (10).
	pub fn get_configuration(alloc_len: u16) -> Cdb {
		let mut cdb = Cdb::new(10);
		cdb.bytes[0] = Command::GetConfiguration as u8;
		BigEndian::write_u16(&mut cdb.bytes[7..9], alloc_len);
		cdb
	}

	/// MODE SENSE (10) with block descriptors disabled (MMC-2, 5.5.10).
	/// Page codes above 0x3f do not fit the CDB field and are rejected.
	pub fn mode_sense(page_code: u8, alloc_len: u16) -> Result<Cdb, Error> {
		if page_code > 0x3f {
			return Err(Error::InvalidArgument("page code"));
		}

		let mut cdb = Cdb::new(10);
		cdb.bytes[0] = Command::ModeSense10 as u8;
		cdb.bytes[1] = 0x08;	// disable block descriptors
		cdb.bytes[2] = page_code & 0x3f;
		BigEndian::write_u16(&mut cdb.bytes[7..9], alloc_len);
		Ok(cdb)
	}

	/// MODE SELECT (10) (SPC-3, table 94).
	pub fn mode_select(save_page: bool, page_format: bool, param_len: u16) -> Cdb {
		let mut cdb = Cdb::new(10);
		cdb.bytes[0] = Command::ModeSelect10 as u8;
		cdb.bytes[1] = (if save_page { 0x01 } else { 0x00 }) | (if page_format { 0x10 } else { 0x00 });
		BigEndian::write_u16(&mut cdb.bytes[7..9], param_len);
		cdb
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.bytes[..self.len]
	}

	pub fn len(&self) -> usize {
		self.len
	}
}

impl AsRef<[u8]> for Cdb {
	fn as_ref(&self) -> &[u8] {
		self.as_slice()
	}
}

/// KB/s a drive shifts at 1× CD speed; mode page 0x2A never reports less.
pub const KB_PER_1X: u16 = 176;

/// Converts KB/s as reported in mode page 0x2A into sectors per second
/// (2352-byte sectors).
pub fn sectors_from_kb(kb_per_sec: u32) -> u32 {
	kb_per_sec * 1000 / 2352
}

/**
Expands a maximum speed in sectors per second into the descending ladder of
speed steps a drive typically offers: the ×-factor is halved until it reaches
zero.

```
use odd::mmc::speed_ladder;

assert_eq!(speed_ladder(3000), [3000, 1500, 750, 375, 150, 75]);
```
*/
pub fn speed_ladder(max_sec_speed: u32) -> Vec<u32> {
	let mut speeds = vec![];

	let mut factor = (max_sec_speed as f64 / 75.0 + 0.5) as u32;
	while factor > 0 {
		speeds.push(factor * 75);
		factor >>= 1;
	}

	speeds
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inquiry_cdb() {
		let cdb = Cdb::inquiry();
		assert_eq!(cdb.as_slice(), &[0x12, 0, 0, 0, 0x24, 0]);
	}

	#[test]
	fn get_configuration_cdb() {
		let cdb = Cdb::get_configuration(0x8000);
		assert_eq!(cdb.as_slice(), &[0x46, 0, 0, 0, 0, 0, 0, 0x80, 0x00, 0]);
	}

	#[test]
	fn mode_sense_cdb() {
		let cdb = Cdb::mode_sense(0x2a, 192).unwrap();
		assert_eq!(cdb.as_slice(), &[0x5a, 0x08, 0x2a, 0, 0, 0, 0, 0x00, 0xc0, 0]);

		assert!(Cdb::mode_sense(0x40, 192).is_err());
	}

	#[test]
	fn mode_select_cdb() {
		let cdb = Cdb::mode_select(false, true, 60);
		assert_eq!(cdb.as_slice(), &[0x55, 0x10, 0, 0, 0, 0, 0, 0x00, 0x3c, 0]);

		let cdb = Cdb::mode_select(true, false, 60);
		assert_eq!(cdb.as_slice()[1], 0x01);
	}

	#[test]
	fn speed_conversion() {
		// 48× CD: 7056 KB/s
		assert_eq!(sectors_from_kb(7056), 3000);
		assert_eq!(sectors_from_kb(3528), 1500);
		assert_eq!(sectors_from_kb(0), 0);
	}

	#[test]
	fn ladder_is_monotonic_and_terminates() {
		for max in &[75u32, 1234, 3000, 8000] {
			let speeds = speed_ladder(*max);
			assert!(!speeds.is_empty());
			assert_eq!(*speeds.last().unwrap(), 75);
			for pair in speeds.windows(2) {
				assert!(pair[0] >= pair[1]);
			}
		}

		assert!(speed_ladder(0).is_empty());
	}

	#[test]
	fn profile_round_trip() {
		assert_eq!(Profile::from_u16(0x001b), Profile::DvdPlusR);
		assert_eq!(Profile::from_u16(0x0008) as u16, 0x0008);
		assert_eq!(Profile::from_u16(0x1234), Profile::NonStandard);
	}
}
