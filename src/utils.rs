use mmc::Profile;

/// Formats a byte string the way command dumps appear in the log: `0x5a,0x08,…`
pub fn dump_bytes(data: &[u8]) -> String {
	// 5× len for "0x00," per byte
	let mut dump = String::with_capacity(5 * data.len());

	for (i, byte) in data.iter().enumerate() {
		if i > 0 {
			dump.push(',');
		}
		dump.push_str(&format!("0x{:02x}", byte));
	}

	dump
}

/**
Converts a speed in sectors per second into the familiar ×-factor for the given
medium kind: 1× is 75 sectors/s for CD media, 675 for DVD media and 2231 for BD
and HD-DVD media.
*/
pub fn human_speed(sec_speed: u32, profile: Profile) -> f32 {
	match profile {
		Profile::DvdRom |
		Profile::DvdMinusRSeq |
		Profile::DvdRam |
		Profile::DvdMinusRwRestOv |
		Profile::DvdMinusRwSeq |
		Profile::DvdMinusRDlSeq |
		Profile::DvdMinusRDlJump |
		Profile::DvdPlusRw |
		Profile::DvdPlusR |
		Profile::DvdPlusRwDl |
		Profile::DvdPlusRDl => sec_speed as f32 / 675.0,

		Profile::BdRom |
		Profile::BdRSrm |
		Profile::BdRRrm |
		Profile::BdRe |
		Profile::HdDvdRom |
		Profile::HdDvdR |
		Profile::HdDvdRam => sec_speed as f32 / 2231.0,

		_ => (sec_speed as f64 / 75.0 + 0.5).floor() as f32,
	}
}

/// [`human_speed`](fn.human_speed.html) rendered as a string: whole numbers for
/// CD media ("48x"), one decimal for everything else ("2.4x").
pub fn display_speed(sec_speed: u32, profile: Profile) -> String {
	let speed = human_speed(sec_speed, profile);

	match profile {
		Profile::CdRom | Profile::CdR | Profile::CdRw => format!("{}x", speed as u32),
		_ => format!("{:.1}x", speed),
	}
}
