//! Drives the capability probe and the discovery orchestrator against a
//! scripted transport.

extern crate odd;

use std::cell::{Cell, RefCell};

use odd::Direction;
use odd::{Device, DeviceManager, ScanCallback, ScanEvent};
use odd::mmc::{Feature, Profile, Property, WriteMode};
use odd::scsi::{Address, Driver, Error, SENSE_LEN, STAT_CHECK_CONDITION, STAT_GOOD};

// write type bit patterns, as they appear on the wire
const WT_PACKET: u8 = 0;
const WT_TAO: u8 = 1;
const WT_SAO: u8 = 2;
const WT_RAW: u8 = 3;
const WT_LAYER_JUMP: u8 = 4;
const WT_AUDIO_MASTER: u8 = 8;

/// A drive that answers from canned data: a 48×/24× MMC-3 model whose write
/// capabilities, accepted write types, GET CONFIGURATION features and profile
/// are set per test.
#[derive(Debug, Default)]
struct MockDrive {
	vendor: &'static str,
	write_cd: bool,
	write_dvd: bool,
	accepted_write_types: Vec<u8>,
	feature_codes: Vec<u16>,
	profile: u16,
	addresses: Vec<Address>,

	fail_inquiry: bool,
	fail_page_2a: Cell<bool>,
	fail_configuration: Cell<bool>,

	silent: Cell<bool>,
	// (write type, data block type, was silenced) per MODE SELECT seen
	selects: RefCell<Vec<(u8, u8, bool)>>,
}

impl MockDrive {
	fn fill_inquiry(&self, data: &mut [u8]) {
		data[0] = 0x05;
		data[1] = 0x80;
		data[2] = 0x06;
		data[3] = 0x02;
		data[4] = 0x1f;

		let vendor = format!("{:<8}", self.vendor);
		data[8..16].copy_from_slice(&vendor.as_bytes()[..8]);
		data[16..32].copy_from_slice(b"DVDRW TEST-1000 ");
		data[32..36].copy_from_slice(b"1.00");
	}

	fn fill_page_2a(&self, data: &mut [u8]) {
		data[0..2].copy_from_slice(&[0x00, 0x20]);

		let page = &mut data[8..];
		page[0] = 0x2a;
		page[1] = 30;
		page[2] = 0x3f;
		page[3] = (if self.write_cd { 0x03 } else { 0x00 }) | (if self.write_dvd { 0x10 } else { 0x00 });
		page[4] = 0x01;
		page[6] = 0x29;
		page[8..10].copy_from_slice(&[0x1b, 0x90]);	// 7056 KB/s = 48×
		page[10..12].copy_from_slice(&[0x01, 0x00]);
		page[12..14].copy_from_slice(&[0x08, 0x00]);
		page[14..16].copy_from_slice(&[0x0d, 0xc8]);	// 3528 KB/s = 24×
		page[18..20].copy_from_slice(&[0x0d, 0xc8]);
		page[20..22].copy_from_slice(&[0x0d, 0xc8]);
		page[27] = 0x01;
		page[28..30].copy_from_slice(&[0x0d, 0xc8]);
		page[30..32].copy_from_slice(&[0x00, 0x01]);	// one advertised write speed
		page[34..36].copy_from_slice(&[0x0d, 0xc8]);
	}

	fn fill_page_05(&self, data: &mut [u8]) {
		data[0..2].copy_from_slice(&[0x00, 58]);

		let page = &mut data[8..];
		page[0] = 0x05;
		page[1] = 52;
	}

	fn fill_configuration(&self, data: &mut [u8]) {
		data[6..8].copy_from_slice(&[(self.profile >> 8) as u8, self.profile as u8]);

		if data.len() == 8 {
			data[3] = 4;
			return;
		}

		data[3] = 4 + 4 * self.feature_codes.len() as u8;

		let mut pos = 8;
		for code in &self.feature_codes {
			data[pos..pos + 2].copy_from_slice(&[(code >> 8) as u8, *code as u8]);
			data[pos + 2] = 0x03;	// current, persistent
			pos += 4;
		}
	}

	fn selects(&self) -> Vec<(u8, u8, bool)> {
		self.selects.borrow().clone()
	}
}

impl Driver for MockDrive {
	fn timeout(&self, _seconds: i64) {}

	fn silence(&self, enable: bool) -> bool {
		self.silent.replace(enable)
	}

	fn scan(&self) -> Result<Vec<Address>, Error> {
		Ok(self.addresses.clone())
	}

	fn transport(&self, _addr: &Address, cdb: &[u8], data: &mut [u8], _dir: Direction)
		-> Result<(), Error>
	{
		match cdb[0] {
			0x12 => {
				if self.fail_inquiry {
					return Err(Error::CheckCondition(0x02, 0x04, 0x00));
				}
				self.fill_inquiry(data);
				Ok(())
			},

			0x5a => match cdb[2] & 0x3f {
				0x2a => {
					if self.fail_page_2a.get() {
						return Err(Error::CheckCondition(0x05, 0x24, 0x00));
					}
					self.fill_page_2a(data);
					Ok(())
				},
				0x05 => {
					self.fill_page_05(data);
					Ok(())
				},
				_ => Err(Error::CheckCondition(0x05, 0x24, 0x00)),
			},

			0x55 => {
				let write_type = data[10] & 0x0f;
				let data_block = data[12] & 0x0f;
				self.selects.borrow_mut().push((write_type, data_block, self.silent.get()));

				if self.accepted_write_types.contains(&write_type) {
					Ok(())
				} else {
					Err(Error::CheckCondition(0x05, 0x26, 0x00))
				}
			},

			0x46 => {
				if self.fail_configuration.get() {
					return Err(Error::CheckCondition(0x05, 0x24, 0x00));
				}
				self.fill_configuration(data);
				Ok(())
			},

			_ => Err(Error::CheckCondition(0x05, 0x20, 0x00)),
		}
	}

	fn transport_with_sense(&self, addr: &Address, cdb: &[u8], data: &mut [u8], dir: Direction)
		-> Result<([u8; SENSE_LEN], u8), Error>
	{
		match self.transport(addr, cdb, data, dir) {
			Ok(()) => Ok(([0u8; SENSE_LEN], STAT_GOOD)),
			Err(Error::CheckCondition(key, asc, ascq)) => {
				let mut sense = [0u8; SENSE_LEN];
				sense[2] = key;
				sense[12] = asc;
				sense[13] = ascq;
				Ok((sense, STAT_CHECK_CONDITION))
			},
			Err(err) => Err(err),
		}
	}
}

fn plextor_recorder() -> MockDrive {
	MockDrive {
		vendor: "PLEXTOR",
		write_cd: true,
		write_dvd: true,
		accepted_write_types: vec![WT_TAO, WT_SAO],
		feature_codes: vec![0x002b, 0x0040],
		profile: 0x001b,
		..Default::default()
	}
}

#[test]
fn identity_from_inquiry() {
	let drive = plextor_recorder();
	let dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	assert_eq!(dev.vendor(), "PLEXTOR");
	assert_eq!(dev.identifier(), "DVDRW TEST-1000");
	assert_eq!(dev.revision(), "1.00");
	assert_eq!(dev.name(), "PLEXTOR DVDRW TEST-1000 1.00");
}

#[test]
fn identity_survives_failed_inquiry() {
	let drive = MockDrive {
		fail_inquiry: true,
		..plextor_recorder()
	};

	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	assert_eq!(dev.vendor(), "");
	assert_eq!(dev.identifier(), "");

	// the device stays usable; only the vendor probes are lost
	dev.refresh().unwrap();
	assert!(dev.support(Feature::WriteCdR));
	assert!(!dev.support(Feature::Varirec));
}

#[test]
fn probe_of_a_recorder() {
	let drive = plextor_recorder();
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();

	// straight from mode page 0x2a
	assert!(dev.support(Feature::ReadCdR));
	assert!(dev.support(Feature::ReadDvdRom));
	assert!(dev.support(Feature::WriteCdR));
	assert!(dev.support(Feature::WriteCdRw));
	assert!(dev.support(Feature::WriteDvdR));
	assert!(dev.support(Feature::AudioPlay));
	assert!(dev.support(Feature::Lock));
	assert!(dev.support(Feature::Eject));
	assert!(!dev.support(Feature::WriteDvdRam));
	assert!(dev.recorder());

	// from the feature descriptor walk; the DVD+R write bit needs the DVD
	// write flag of phase one
	assert!(dev.support(Feature::ReadDvdPlusR));
	assert!(dev.support(Feature::WriteDvdPlusR));
	assert!(dev.support(Feature::ReadBd));
	assert!(!dev.support(Feature::WriteBd));
	assert!(!dev.support(Feature::ReadHdDvd));

	// vendor probes: VariRec is assumed for Plextor, Audio Master was refused
	assert!(dev.support(Feature::Varirec));
	assert!(!dev.support(Feature::AudioMaster));
	assert!(!dev.support(Feature::ForceSpeed));

	// the drive accepted TAO and SAO only
	assert!(dev.support_write_mode(WriteMode::Tao));
	assert!(dev.support_write_mode(WriteMode::Sao));
	assert!(!dev.support_write_mode(WriteMode::Packet));
	assert!(!dev.support_write_mode(WriteMode::Raw16));
	assert!(!dev.support_write_mode(WriteMode::Raw96P));
	assert!(!dev.support_write_mode(WriteMode::Raw96R));
	assert!(!dev.support_write_mode(WriteMode::LayerJump));

	// KB/s × 1000 / 2352
	assert_eq!(dev.property(Property::MaxReadSpd), 3000);
	assert_eq!(dev.property(Property::CurReadSpd), 1500);
	assert_eq!(dev.property(Property::MaxWriteSpd), 1500);
	assert_eq!(dev.property(Property::BufferSize), 2048);
	assert_eq!(dev.property(Property::NumVolLvls), 256);

	assert_eq!(dev.read_speeds(), &[3000, 1500, 750, 375, 150, 75]);
	// the advertised medium speed wins over the guessed ladder
	assert_eq!(dev.write_speeds(), &[1500]);

	assert_eq!(dev.profile(), Profile::DvdPlusR);
}

#[test]
fn raw_sub_variants_gated_on_raw_guard() {
	let drive = plextor_recorder();
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();

	let selects = drive.selects();

	// the raw write type was offered once as a guard
	assert!(selects.iter().any(|&(wt, db, _)| wt == WT_RAW && db == 1));
	// and after its refusal no sub-channel variant was probed
	assert!(!selects.iter().any(|&(wt, db, _)| wt == WT_RAW && (db == 2 || db == 3)));

	// every candidate of the fixed probe order was offered exactly once
	let offered = |wt| selects.iter().filter(|&&(t, _, _)| t == wt).count();
	assert_eq!(offered(WT_PACKET), 1);
	assert_eq!(offered(WT_SAO), 1);
	assert_eq!(offered(WT_LAYER_JUMP), 1);
	// TAO also serves as the vendor probe reset
	assert_eq!(offered(WT_TAO), 2);
	assert_eq!(offered(WT_AUDIO_MASTER), 1);
}

#[test]
fn raw_variants_probed_when_guard_passes() {
	let drive = MockDrive {
		accepted_write_types: vec![WT_TAO, WT_SAO, WT_RAW],
		..plextor_recorder()
	};
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();

	assert!(dev.support_write_mode(WriteMode::Raw16));
	assert!(dev.support_write_mode(WriteMode::Raw96P));
	assert!(dev.support_write_mode(WriteMode::Raw96R));

	// guard with PQ, then the three block type variants
	let raws = drive.selects().iter()
		.filter(|&&(wt, _, _)| wt == WT_RAW)
		.map(|&(_, db, _)| db)
		.collect::<Vec<_>>();
	assert_eq!(raws, [1, 2, 3, 1]);
}

#[test]
fn non_recorder_gets_no_write_state() {
	let drive = MockDrive {
		vendor: "PLEXTOR",
		write_cd: false,
		write_dvd: false,
		accepted_write_types: vec![WT_PACKET, WT_TAO, WT_SAO, WT_RAW, WT_LAYER_JUMP],
		feature_codes: vec![0x002b],
		..Default::default()
	};
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();

	assert!(!dev.recorder());

	// no write mode was probed, let alone set
	assert!(drive.selects().is_empty());
	assert!(!dev.support_write_mode(WriteMode::Tao));
	assert!(dev.write_speeds().is_empty());

	// read-side state is still there
	assert!(dev.support(Feature::ReadCdR));
	assert_eq!(dev.read_speeds(), &[3000, 1500, 750, 375, 150, 75]);

	// and without the DVD write flag, DVD+ stays read-only
	assert!(dev.support(Feature::ReadDvdPlusR));
	assert!(!dev.support(Feature::WriteDvdPlusR));
}

#[test]
fn yamaha_vendor_features() {
	let drive = MockDrive {
		vendor: "YAMAHA",
		accepted_write_types: vec![WT_TAO, WT_SAO, WT_AUDIO_MASTER],
		..plextor_recorder()
	};
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();

	assert!(dev.support(Feature::AudioMaster));
	assert!(dev.support(Feature::ForceSpeed));
	assert!(!dev.support(Feature::Varirec));

	// the audio master attempt rides on raw 2352-byte blocks
	assert!(drive.selects().iter().any(|&(wt, db, _)| wt == WT_AUDIO_MASTER && db == 0));
}

#[test]
fn probe_is_silent_and_restores_silence_state() {
	let drive = plextor_recorder();
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	assert!(!drive.silent.get());
	dev.refresh().unwrap();

	// every expected-to-fail select ran silenced, and the previous state is back
	assert!(drive.selects().iter().all(|&(_, _, silent)| silent));
	assert!(!drive.silent.get());

	// a pre-silenced driver stays silenced
	drive.silence(true);
	dev.refresh().unwrap();
	assert!(drive.silent.get());
}

#[test]
fn fatal_capability_failure_clears_state() {
	let drive = plextor_recorder();
	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	dev.refresh().unwrap();
	assert!(dev.recorder());

	drive.fail_page_2a.set(true);
	assert!(dev.refresh().is_err());

	// nothing stale survives a fatal probe
	assert!(!dev.recorder());
	assert!(!dev.support(Feature::ReadCdR));
	assert!(!dev.support_write_mode(WriteMode::Tao));
	assert_eq!(dev.property(Property::MaxReadSpd), 0);
	assert!(dev.read_speeds().is_empty());
	assert!(dev.write_speeds().is_empty());

	// silence still restored on the error path
	assert!(!drive.silent.get());
}

#[test]
fn configuration_failures_are_not_fatal() {
	let drive = plextor_recorder();
	drive.fail_configuration.set(true);

	let mut dev = Device::with_driver(Address::from_device("/dev/sr0"), &drive);

	// the probe still succeeds, only the feature descriptor bits are lost
	dev.refresh().unwrap();
	assert!(dev.support(Feature::WriteCdR));
	assert!(!dev.support(Feature::ReadDvdPlusR));
	assert!(!dev.support(Feature::ReadBd));

	// and the profile query collapses to none
	assert_eq!(dev.profile(), Profile::None);
}

struct RecordingCallback {
	events: Vec<ScanEvent>,
	veto: &'static str,
}

impl ScanCallback for RecordingCallback {
	fn event_status(&mut self, event: ScanEvent) {
		self.events.push(event);
	}

	fn event_device(&mut self, addr: &Address) -> bool {
		addr.device != self.veto
	}
}

#[test]
fn scan_builds_probed_devices_and_honors_veto() {
	let drive = MockDrive {
		addresses: vec![
			Address::from_device("/dev/sr0"),
			Address::from_device("/dev/sr1"),
		],
		..plextor_recorder()
	};

	let mut manager = DeviceManager::with_driver(&drive);
	let mut callback = RecordingCallback { events: vec![], veto: "/dev/sr1" };

	manager.scan(Some(&mut callback)).unwrap();

	assert_eq!(callback.events, [ScanEvent::DevScan, ScanEvent::DevCap]);

	assert_eq!(manager.devices().len(), 1);

	let dev = &manager.devices()[0];
	assert_eq!(dev.address().device, "/dev/sr0");

	// scan refreshes the surviving devices
	assert!(dev.recorder());
	assert!(dev.support_write_mode(WriteMode::Tao));
}
