/*!
A [`Device`](struct.Device.html) is one optical drive: its address, the identity
read off it at construction time, and the capability state the probe in
[`refresh`](struct.Device.html#method.refresh) fills in.
*/

use std::cmp;

use byteorder::{ByteOrder, BigEndian};

use Direction;
use scsi::{Address, Driver, Error, Silencer};
use mmc::{self, Cdb, Feature, Profile, Property, WriteMode, PROPERTY_COUNT};
use mmc::data::{configuration, inquiry, mode_page_05, mode_page_2a};
use mmc::data::mode_page_05::{DataBlock, ModePage05, WriteType};
use mmc::data::mode_page_05::{TRACK_MODE_DATA, TRACK_MODE_INCREMENTAL};

/// Scratch buffer size for inquiry data and mode pages.
const CMD_BUF_LEN: usize = 192;

/// Buffer size for the feature descriptor list; generously above anything a
/// real drive returns.
const FEATURE_BUF_LEN: usize = 32 * 1024;

/**
One optical drive.

Identity fields are read once via INQUIRY when the device is built and never
change. Everything else (features, write modes, properties, speed tables) is
empty until [`refresh`](#method.refresh) runs and is fully replaced on each
subsequent run.
*/
#[derive(Debug)]
pub struct Device<'a> {
	driver: &'a dyn Driver,
	addr: Address,

	vendor: String,
	identifier: String,
	revision: String,
	name: String,

	features: u64,
	write_modes: u16,
	properties: [u32; PROPERTY_COUNT],

	read_speeds: Vec<u32>,
	write_speeds: Vec<u32>,
}

#[cfg(target_os = "linux")]
impl Device<'static> {
	/// Builds a device on the process-wide driver.
	pub fn new(addr: Address) -> Device<'static> {
		Device::with_driver(addr, ::scsi::driver())
	}
}

impl<'a> Device<'a> {
	/**
	Builds a device that talks through the given driver.

	INQUIRY runs immediately to obtain the vendor and product identifiers. If
	it fails the identity strings stay empty and the device is still usable;
	the capability probe will simply find no vendor-specific features.
	*/
	pub fn with_driver(addr: Address, driver: &'a dyn Driver) -> Device<'a> {
		let mut dev = Device {
			driver: driver,
			addr: addr,

			vendor: String::new(),
			identifier: String::new(),
			revision: String::new(),
			name: String::new(),

			features: 0,
			write_modes: 0,
			properties: [0; PROPERTY_COUNT],

			read_speeds: vec![],
			write_speeds: vec![],
		};

		let mut buffer = [0u8; CMD_BUF_LEN];
		match dev.inquiry(&mut buffer) {
			Ok(()) => {
				if let Some(inq) = inquiry::parse(&buffer) {
					dev.vendor = inq.vendor;
					dev.identifier = inq.product;
					dev.revision = inq.revision;
				}
			},
			Err(err) => {
				warn!("unable to obtain device inquiry data from {}: {}", dev.addr, err);
			},
		}

		dev.name = format!("{} {} {}", dev.vendor, dev.identifier, dev.revision);

		dev
	}

	pub fn address(&self) -> &Address {
		&self.addr
	}

	pub fn driver(&self) -> &'a dyn Driver {
		self.driver
	}

	pub fn vendor(&self) -> &str {
		&self.vendor
	}

	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	pub fn revision(&self) -> &str {
		&self.revision
	}

	/// The full device name, "vendor identifier revision".
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Sets the per-command timeout on the underlying driver.
	pub fn timeout(&self, seconds: i64) {
		self.driver.timeout(seconds)
	}

	/// Suppresses or restores driver log output; returns the previous state.
	pub fn silence(&self, enable: bool) -> bool {
		self.driver.silence(enable)
	}

	/// Read speeds of the drive in sectors per second, fastest first.
	pub fn read_speeds(&self) -> &[u32] {
		&self.read_speeds
	}

	/// Write speeds of the drive in sectors per second, fastest first. Empty
	/// for non-recorders.
	pub fn write_speeds(&self) -> &[u32] {
		&self.write_speeds
	}

	pub fn property(&self, prop: Property) -> u32 {
		self.properties[prop as usize]
	}

	pub fn support(&self, feature: Feature) -> bool {
		self.features & (1u64 << feature as u64) != 0
	}

	pub fn support_write_mode(&self, mode: WriteMode) -> bool {
		self.write_modes & (1u16 << mode as u16) != 0
	}

	/// Whether the device can record at all.
	pub fn recorder(&self) -> bool {
		self.support(Feature::WriteCdR) ||
		self.support(Feature::WriteCdRw) ||
		self.support(Feature::WriteDvdR) ||
		self.support(Feature::WriteDvdRam)
	}

	fn set_feature(&mut self, feature: Feature) {
		self.features |= 1u64 << feature as u64;
	}

	fn set_write_mode(&mut self, mode: WriteMode) {
		self.write_modes |= 1u16 << mode as u16;
	}

	fn is_yamaha(&self) -> bool {
		self.vendor.starts_with("YAMAHA")
	}

	fn is_plextor(&self) -> bool {
		self.vendor.starts_with("PLEXTOR")
	}

	/**
	Probes the device capabilities, fully replacing all capability state.

	Runs in phases: mode page 0x2A yields the feature bits, the properties and
	the speed tables; for recorders, mode page 0x05 is mutated and offered back
	via MODE SELECT once per candidate write mode, then once more for the
	vendor-specific features; finally GET CONFIGURATION yields the DVD+/BD/
	HD-DVD feature bits. Only the mode page exchanges themselves are fatal:
	rejected write-mode candidates are expected, and a failed feature
	descriptor request merely leaves those bits unset.

	On a fatal error all capability state is left cleared.
	*/
	pub fn refresh(&mut self) -> Result<(), Error> {
		// failing MODE SELECT probes are expected below, so keep the driver
		// quiet; the previous state comes back on every way out of here
		let _silencer = Silencer::new(self.driver);

		self.features = 0;
		self.write_modes = 0;
		self.properties = [0; PROPERTY_COUNT];
		self.read_speeds.clear();
		self.write_speeds.clear();

		let mut buffer = [0u8; CMD_BUF_LEN];

		// drive capabilities
		if let Err(err) = self.mode_sense(0x2a, &mut buffer) {
			warn!("requesting mode sense for page 0x2a failed: {}", err);
			return Err(err);
		}

		let page_2a = match mode_page_2a::parse(&buffer) {
			Some(page) => page,
			None => {
				warn!("parsing of mode page 0x2a failed");
				return Err(Error::Parse("mode page 0x2a"));
			},
		};

		self.apply_page_2a(&page_2a);

		// guess the usual halving ladder down from the maximum read speed
		self.read_speeds = mmc::speed_ladder(self.property(Property::MaxReadSpd));

		if self.recorder() {
			// prefer the write speeds advertised for the inserted medium and
			// fall back to a guessed ladder when the tray is empty
			self.write_speeds = page_2a.write_spds.iter()
				.map(|&kb| mmc::sectors_from_kb(kb as u32))
				.collect();

			if self.write_speeds.is_empty() {
				self.write_speeds = mmc::speed_ladder(self.property(Property::MaxWriteSpd));
			}
		}

		if self.recorder() {
			self.probe_write_modes(&mut buffer)?;
		}

		if self.recorder() {
			self.probe_vendor_features(&mut buffer)?;
		}

		// feature descriptors; failure only costs the corresponding bits
		let mut feature_buffer = vec![0u8; FEATURE_BUF_LEN];
		match self.get_configuration(&mut feature_buffer) {
			Ok(()) => {
				let descriptors = configuration::descriptors(&feature_buffer);
				self.apply_feature_descriptors(&descriptors);
			},
			Err(err) => {
				warn!("requesting configuration with buffer size {} failed: {}",
					FEATURE_BUF_LEN, err);
			},
		}

		Ok(())
	}

	/// Mode page 0x2A maps onto the feature set one flag at a time, and fills
	/// in all scalar properties.
	fn apply_page_2a(&mut self, page: &mode_page_2a::ModePage2A) {
		let flags = [
			(page.read_cd_r, Feature::ReadCdR),
			(page.read_cd_rw, Feature::ReadCdRw),
			(page.method_2, Feature::Method2),
			(page.read_dvd_rom, Feature::ReadDvdRom),
			(page.read_dvd_r, Feature::ReadDvdR),
			(page.read_dvd_ram, Feature::ReadDvdRam),
			(page.write_cd_r, Feature::WriteCdR),
			(page.write_cd_rw, Feature::WriteCdRw),
			(page.test_write, Feature::TestWrite),
			(page.write_dvd_r, Feature::WriteDvdR),
			(page.write_dvd_ram, Feature::WriteDvdRam),
			(page.audio_play, Feature::AudioPlay),
			(page.composite, Feature::Composite),
			(page.digital_port_1, Feature::DigitalPort1),
			(page.digital_port_2, Feature::DigitalPort2),
			(page.mode_2_form_1, Feature::Mode2Form1),
			(page.mode_2_form_2, Feature::Mode2Form2),
			(page.multi_session, Feature::MultiSession),
			(page.buf, Feature::Bup),
			(page.cdda_supported, Feature::CddaSupported),
			(page.cdda_accurate, Feature::CddaAccurate),
			(page.rw_supported, Feature::RwSupported),
			(page.rw_deint_corr, Feature::RwDeintCorr),
			(page.c2_pointers, Feature::C2Pointers),
			(page.isrc, Feature::Isrc),
			(page.upc, Feature::Upc),
			(page.read_bar_code, Feature::ReadBarCode),
			(page.lock, Feature::Lock),
			(page.lock_state, Feature::LockState),
			(page.prevent_jumper, Feature::PreventJumper),
			(page.eject, Feature::Eject),
			(page.sep_chan_vol, Feature::SepChanVol),
			(page.sep_chan_mute, Feature::SepChanMute),
			(page.change_disc_prsnt, Feature::ChangeDiscPrsnt),
			(page.sss, Feature::Sss),
			(page.change_sides, Feature::ChangeSides),
			(page.rw_lead_in, Feature::RwLeadIn),
			(page.bckf, Feature::Bckf),
			(page.rck, Feature::Rck),
			(page.lsbf, Feature::Lsbf),
		];

		for &(set, feature) in flags.iter() {
			if set {
				self.set_feature(feature);
			}
		}

		self.properties[Property::NumVolLvls as usize] = page.num_vol_lvls as u32;
		self.properties[Property::BufferSize as usize] = page.buf_size as u32;
		self.properties[Property::CopyMgmtRev as usize] = page.copy_man_rev as u32;
		self.properties[Property::LoadMechanism as usize] = page.load_mechanism.bits() as u32;
		self.properties[Property::RotCtrl as usize] = page.rot_ctrl.bits() as u32;
		self.properties[Property::DaBlockLen as usize] = page.da_block_len.bits() as u32;
		self.properties[Property::MaxReadSpd as usize] = mmc::sectors_from_kb(page.max_read_spd as u32);
		self.properties[Property::CurReadSpd as usize] = mmc::sectors_from_kb(page.cur_read_spd as u32);
		self.properties[Property::MaxWriteSpd as usize] = mmc::sectors_from_kb(page.max_write_spd as u32);
		self.properties[Property::CurWriteSpd as usize] = mmc::sectors_from_kb(page.cur_write_spd as u32);
	}

	/// Offers each candidate write type to the drive via MODE SELECT; whatever
	/// the drive accepts, it supports.
	fn probe_write_modes(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
		if let Err(err) = self.mode_sense(0x05, buffer) {
			warn!("requesting mode sense for page 0x05 failed: {}", err);
			return Err(err);
		}

		let mut page = match mode_page_05::parse(buffer) {
			Some(page) => page,
			None => {
				warn!("parsing of mode page 0x05 failed");
				return Err(Error::Parse("mode page 0x05"));
			},
		};

		let select_len = select_len(buffer);

		// packet writing, with variable packets
		page.write_type = WriteType::Packet;
		page.track_mode = TRACK_MODE_DATA | TRACK_MODE_INCREMENTAL;
		page.data_block_type = DataBlock::Mode1_2048;
		page.fp = false;
		page.packed_size = 0;

		if self.try_page(&page, buffer, select_len) {
			self.set_write_mode(WriteMode::Packet);
		}

		// track at once
		page.write_type = WriteType::Tao;
		page.track_mode = TRACK_MODE_DATA;
		page.data_block_type = DataBlock::Mode1_2048;

		if self.try_page(&page, buffer, select_len) {
			self.set_write_mode(WriteMode::Tao);
		}

		// session at once
		page.write_type = WriteType::Sao;
		page.track_mode = TRACK_MODE_DATA;
		page.data_block_type = DataBlock::Mode1_2048;

		if self.try_page(&page, buffer, select_len) {
			self.set_write_mode(WriteMode::Sao);
		}

		// raw writing; the write type must be accepted at all before the
		// sub-channel variants are told apart
		page.write_type = WriteType::Raw;
		page.track_mode = TRACK_MODE_DATA;
		page.data_block_type = DataBlock::Raw2352Pq;

		if self.try_page(&page, buffer, select_len) {
			page.data_block_type = DataBlock::Raw2352PwPack;
			if self.try_page(&page, buffer, select_len) {
				self.set_write_mode(WriteMode::Raw16);
			}

			page.data_block_type = DataBlock::Raw2352Pw;
			if self.try_page(&page, buffer, select_len) {
				self.set_write_mode(WriteMode::Raw96P);
			}

			page.data_block_type = DataBlock::Raw2352Pq;
			if self.try_page(&page, buffer, select_len) {
				self.set_write_mode(WriteMode::Raw96R);
			}
		}

		// layer jump
		page.write_type = WriteType::LayerJump;
		page.track_mode = TRACK_MODE_DATA;
		page.data_block_type = DataBlock::Raw2352Pw;

		if self.try_page(&page, buffer, select_len) {
			self.set_write_mode(WriteMode::LayerJump);
		}

		Ok(())
	}

	/// Yamaha Audio Master and Plextor VariRec ride on mode page 0x05 as well.
	fn probe_vendor_features(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
		if let Err(err) = self.mode_sense(0x05, buffer) {
			warn!("requesting mode sense for page 0x05 failed: {}", err);
			return Err(err);
		}

		let mut page = match mode_page_05::parse(buffer) {
			Some(page) => page,
			None => {
				warn!("parsing of mode page 0x05 failed");
				return Err(Error::Parse("mode page 0x05"));
			},
		};

		let select_len = select_len(buffer);

		if self.is_yamaha() || self.is_plextor() {
			// put the page back into a known state first
			page.reset_tao();
			if !self.try_page(&page, buffer, select_len) {
				page.reset_tao();
				if !self.try_page(&page, buffer, select_len) {
					warn!("unable to reset page 0x05");
				}
			}

			page.buf_e = false;
			page.write_type = WriteType::AudioMaster;
			page.track_mode = 0;
			page.data_block_type = DataBlock::Raw2352;

			if self.try_page(&page, buffer, select_len) {
				self.set_feature(Feature::AudioMaster);
			}
		}

		if self.is_yamaha() && page.page_len >= 26 {
			self.set_feature(Feature::ForceSpeed);
		}

		if self.is_plextor() {
			// TODO probe this instead; not all Plextor drives support VariRec
			self.set_feature(Feature::Varirec);
		}

		Ok(())
	}

	/// Re-encodes `page` over the page bytes in `buffer` (which still starts
	/// with the header of the last MODE SENSE) and offers it to the device
	/// without saving. Acceptance is the answer, so failure is no error.
	fn try_page(&self, page: &ModePage05, buffer: &mut [u8], select_len: usize) -> bool {
		if page.read(&mut buffer[8..8 + mode_page_05::PAGE_LEN]).is_err() {
			return false;
		}

		self.mode_select(&mut buffer[..select_len], false, true).is_ok()
	}

	/// The DVD+, BD and HD-DVD capabilities only show up as GET CONFIGURATION
	/// features. The DVD+ write bits additionally require the DVD write flag
	/// from mode page 0x2A, so this runs strictly after the capabilities phase.
	fn apply_feature_descriptors(&mut self, descriptors: &[configuration::FeatureDescriptor]) {
		for desc in descriptors {
			match desc.code {
				mmc::FEATURE_DVDPLUSRW => {
					self.set_feature(Feature::ReadDvdPlusRw);
					if self.support(Feature::WriteDvdR) {
						self.set_feature(Feature::WriteDvdPlusRw);
					}
				},

				mmc::FEATURE_DVDPLUSR => {
					self.set_feature(Feature::ReadDvdPlusR);
					if self.support(Feature::WriteDvdR) {
						self.set_feature(Feature::WriteDvdPlusR);
					}
				},

				mmc::FEATURE_DVDPLUSRW_DL => {
					self.set_feature(Feature::ReadDvdPlusRwDl);
					if self.support(Feature::WriteDvdR) {
						self.set_feature(Feature::WriteDvdPlusRwDl);
					}
				},

				mmc::FEATURE_DVDPLUSR_DL => {
					self.set_feature(Feature::ReadDvdPlusRDl);
					if self.support(Feature::WriteDvdR) {
						self.set_feature(Feature::WriteDvdPlusRDl);
					}
				},

				mmc::FEATURE_BD_READ => self.set_feature(Feature::ReadBd),
				mmc::FEATURE_BD_WRITE => self.set_feature(Feature::WriteBd),
				mmc::FEATURE_HDDVD_READ => self.set_feature(Feature::ReadHdDvd),
				mmc::FEATURE_HDDVD_WRITE => self.set_feature(Feature::WriteHdDvd),
				mmc::FEATURE_MULTIREAD => self.set_feature(Feature::MultiRead),
				mmc::FEATURE_CD_READ => self.set_feature(Feature::CdRead),

				_ => (),
			}
		}
	}

	/**
	Returns the profile of the currently mounted medium.

	This is read freshly from the device on every call;
	[`Profile::None`](../mmc/enum.Profile.html) stands in for any failure.
	*/
	pub fn profile(&self) -> Profile {
		let mut buffer = [0u8; 8];

		if let Err(err) = self.get_configuration(&mut buffer) {
			warn!("requesting device configuration failed: {}", err);
			return Profile::None;
		}

		match configuration::parse(&buffer) {
			Some(config) => config.cur_profile,
			None => {
				warn!("parsing of configuration data failed");
				Profile::None
			},
		}
	}

	/*
	 * Strongly MMC related functions.
	 */

	/// Executes INQUIRY, asking for the standard 36 bytes of device data.
	pub fn inquiry(&self, buffer: &mut [u8]) -> Result<(), Error> {
		zero(buffer);

		self.driver.transport(&self.addr, Cdb::inquiry().as_slice(), buffer, Direction::From)
	}

	/// Executes GET CONFIGURATION with an allocation length of the whole
	/// buffer.
	pub fn get_configuration(&self, buffer: &mut [u8]) -> Result<(), Error> {
		let alloc_len = buffer_len(buffer)?;

		zero(buffer);

		self.driver.transport(&self.addr, Cdb::get_configuration(alloc_len).as_slice(),
			buffer, Direction::From)
	}

	/// Executes MODE SENSE (10) for the given page and verifies that the
	/// answer actually carries that page.
	pub fn mode_sense(&self, page_code: u8, buffer: &mut [u8]) -> Result<(), Error> {
		let alloc_len = buffer_len(buffer)?;
		let cdb = Cdb::mode_sense(page_code, alloc_len)?;

		zero(buffer);

		self.driver.transport(&self.addr, cdb.as_slice(), buffer, Direction::From)?;

		if buffer.len() < 9 || buffer[8] & 0x3f != page_code {
			return Err(Error::Parse("mode sense returned an unexpected page"));
		}

		Ok(())
	}

	/**
	Executes MODE SELECT (10) over `buffer`, which must hold a mode parameter
	header followed by page data.

	With `save_page` unset the device executes the command without saving it;
	devices that cannot separate the two may fail such a request. `page_format`
	marks the data as conforming to the page format. The reserved header bytes
	are cleared before the transfer (SPC-4, table 291).
	*/
	pub fn mode_select(&self, buffer: &mut [u8], save_page: bool, page_format: bool)
		-> Result<(), Error>
	{
		if buffer.len() < 8 {
			return Err(Error::InvalidArgument("mode select parameter list too short"));
		}

		let buffer_len = buffer_len(buffer)?;

		// reserved according to SPC-4, table 291
		buffer[0] = 0;
		buffer[1] = 0;
		buffer[4] = 0;
		buffer[5] = 0;

		self.driver.transport(&self.addr,
			Cdb::mode_select(save_page, page_format, buffer_len).as_slice(),
			buffer, Direction::To)
	}
}

/// The MODE SELECT transfer length for the page just read into `buffer`: the
/// mode data length plus its own two bytes. Computed once per MODE SENSE, since
/// the first select clears the reserved header bytes it derives from.
fn select_len(buffer: &[u8]) -> usize {
	cmp::min(BigEndian::read_u16(&buffer[0..2]) as usize + 2, buffer.len())
}

fn zero(buffer: &mut [u8]) {
	for byte in buffer.iter_mut() {
		*byte = 0;
	}
}

fn buffer_len(buffer: &[u8]) -> Result<u16, Error> {
	if buffer.len() > 0xffff {
		return Err(Error::InvalidArgument("buffer too large for a 16-bit allocation length"));
	}

	Ok(buffer.len() as u16)
}
