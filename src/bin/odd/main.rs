extern crate odd;

#[macro_use]
extern crate clap;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

#[macro_use]
extern crate serde_json;

extern crate log;
extern crate env_logger;
use log::LevelFilter;
use env_logger::Builder as LogBuilder;

use std::process::exit;

use odd::{Device, DeviceManager, ScanCallback, ScanEvent};
use odd::mmc::{Feature, Profile, Property, WriteMode};
use odd::scsi::Address;
use odd::utils;

static FEATURES: &'static [(Feature, &'static str)] = &[
	(Feature::ReadCdR, "read CD-R"),
	(Feature::ReadCdRw, "read CD-RW"),
	(Feature::ReadDvdRom, "read DVD-ROM"),
	(Feature::ReadDvdR, "read DVD-R"),
	(Feature::ReadDvdRam, "read DVD-RAM"),
	(Feature::ReadDvdPlusRw, "read DVD+RW"),
	(Feature::ReadDvdPlusR, "read DVD+R"),
	(Feature::ReadDvdPlusRwDl, "read DVD+RW DL"),
	(Feature::ReadDvdPlusRDl, "read DVD+R DL"),
	(Feature::ReadBd, "read BD"),
	(Feature::ReadHdDvd, "read HD DVD"),
	(Feature::WriteCdR, "write CD-R"),
	(Feature::WriteCdRw, "write CD-RW"),
	(Feature::WriteDvdR, "write DVD-R"),
	(Feature::WriteDvdRam, "write DVD-RAM"),
	(Feature::WriteDvdPlusRw, "write DVD+RW"),
	(Feature::WriteDvdPlusR, "write DVD+R"),
	(Feature::WriteDvdPlusRwDl, "write DVD+RW DL"),
	(Feature::WriteDvdPlusRDl, "write DVD+R DL"),
	(Feature::WriteBd, "write BD"),
	(Feature::WriteHdDvd, "write HD DVD"),
	(Feature::MultiRead, "MultiRead"),
	(Feature::TestWrite, "test write"),
	(Feature::AudioPlay, "audio play"),
	(Feature::Mode2Form1, "mode 2 form 1"),
	(Feature::Mode2Form2, "mode 2 form 2"),
	(Feature::MultiSession, "multi-session"),
	(Feature::Bup, "buffer underrun protection"),
	(Feature::CddaSupported, "CD-DA read"),
	(Feature::CddaAccurate, "accurate CD-DA streaming"),
	(Feature::C2Pointers, "C2 error pointers"),
	(Feature::Isrc, "ISRC read"),
	(Feature::Upc, "UPC read"),
	(Feature::ReadBarCode, "bar code read"),
	(Feature::Lock, "tray lock"),
	(Feature::Eject, "eject"),
	(Feature::SepChanVol, "separate channel volume"),
	(Feature::SepChanMute, "separate channel mute"),
	(Feature::AudioMaster, "Audio Master"),
	(Feature::ForceSpeed, "Force Speed"),
	(Feature::Varirec, "VariRec"),
];

static WRITE_MODES: &'static [(WriteMode, &'static str)] = &[
	(WriteMode::Packet, "packet"),
	(WriteMode::Tao, "TAO"),
	(WriteMode::Sao, "SAO"),
	(WriteMode::Raw16, "RAW (16-byte subchannel)"),
	(WriteMode::Raw96P, "RAW (96-byte packed subchannel)"),
	(WriteMode::Raw96R, "RAW (96-byte raw subchannel)"),
	(WriteMode::LayerJump, "layer jump"),
];

struct Progress;

impl ScanCallback for Progress {
	fn event_status(&mut self, event: ScanEvent) {
		match event {
			ScanEvent::DevScan => eprintln!("scanning for devices..."),
			ScanEvent::DevCap => eprintln!("probing device capabilities..."),
		}
	}

	fn event_device(&mut self, addr: &Address) -> bool {
		eprintln!("found {}", addr);
		true
	}
}

fn device_json(dev: &Device, profile: Profile) -> serde_json::Value {
	json!({
		"address": dev.address().device,
		"vendor": dev.vendor(),
		"identifier": dev.identifier(),
		"revision": dev.revision(),
		"profile": format!("{:?}", profile),
		"recorder": dev.recorder(),
		"buffer_size_kb": dev.property(Property::BufferSize),
		"features": FEATURES.iter()
			.filter(|&&(feature, _)| dev.support(feature))
			.map(|&(_, label)| label)
			.collect::<Vec<_>>(),
		"write_modes": WRITE_MODES.iter()
			.filter(|&&(mode, _)| dev.support_write_mode(mode))
			.map(|&(_, label)| label)
			.collect::<Vec<_>>(),
		"read_speeds": dev.read_speeds(),
		"write_speeds": dev.write_speeds(),
	})
}

fn print_device(dev: &Device) {
	let profile = dev.profile();

	println!("{}", dev.name());
	println!("  address:     {}", dev.address());
	println!("  profile:     {:?}", profile);
	println!("  recorder:    {}", if dev.recorder() { "yes" } else { "no" });
	println!("  buffer size: {} KB", dev.property(Property::BufferSize));

	println!("  features:");
	for &(feature, label) in FEATURES {
		if dev.support(feature) {
			println!("    {}", label);
		}
	}

	if dev.recorder() {
		println!("  write modes:");
		for &(mode, label) in WRITE_MODES {
			if dev.support_write_mode(mode) {
				println!("    {}", label);
			}
		}
	}

	let speeds = |speeds: &[u32]| speeds.iter()
		.map(|&spd| utils::display_speed(spd, profile))
		.collect::<Vec<_>>()
		.join(", ");

	println!("  read speeds:  {}", speeds(dev.read_speeds()));
	if dev.recorder() {
		println!("  write speeds: {}", speeds(dev.write_speeds()));
	}
}

fn list(args: &ArgMatches) {
	let mut manager = DeviceManager::new();

	let mut progress = Progress;
	let callback: Option<&mut dyn ScanCallback> = if args.is_present("json") {
		None
	} else {
		Some(&mut progress)
	};

	if let Err(err) = manager.scan(callback) {
		eprintln!("error: unable to scan for devices: {}", err);
		exit(1);
	}

	if args.is_present("json") {
		let devices = manager.devices().iter()
			.map(|dev| device_json(dev, dev.profile()))
			.collect::<Vec<_>>();

		println!("{}", serde_json::to_string_pretty(&devices).unwrap());
	} else {
		for dev in manager.devices() {
			println!("{}\t{}", dev.address().device, dev.name());
		}
	}
}

fn info(args: &ArgMatches) {
	let addr = Address::from_device(args.value_of("device").unwrap());

	let mut dev = Device::new(addr);

	if let Err(err) = dev.refresh() {
		eprintln!("error: unable to probe device capabilities: {}", err);
		exit(1);
	}

	if args.is_present("json") {
		println!("{}", serde_json::to_string_pretty(&device_json(&dev, dev.profile())).unwrap());
	} else {
		print_device(&dev);
	}
}

fn main() {
	let args = App::new("odd")
		.about("Optical disc drive capability probe")
		.version(crate_version!())
		.setting(AppSettings::SubcommandRequiredElseHelp)
		.arg(Arg::with_name("verbose")
			.short("v")
			.multiple(true)
			.help("Verbose output; repeat for more verbosity")
		)
		.subcommand(SubCommand::with_name("list")
			.about("Lists optical drives attached to this system")
			.arg(Arg::with_name("json")
				.long("json")
				.help("Export data in JSON format")
			)
		)
		.subcommand(SubCommand::with_name("info")
			.about("Shows the capabilities of one drive")
			.arg(Arg::with_name("device")
				.help("Device path (e.g. /dev/sr0)")
				.required(true)
				.index(1)
			)
			.arg(Arg::with_name("json")
				.long("json")
				.help("Export data in JSON format")
			)
		)
		.get_matches();

	let level = match args.occurrences_of("verbose") {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		_ => LevelFilter::Debug,
	};
	LogBuilder::new().filter(None, level).init();

	match args.subcommand() {
		("list", Some(args)) => list(args),
		("info", Some(args)) => info(args),
		_ => unreachable!(),
	}
}
