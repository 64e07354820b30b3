//! Mode page 0x2A, the CD/DVD capabilities and mechanical status page
//! (MMC-3, table 361).

use byteorder::{ByteOrder, BigEndian};

use mmc::{AudioBlockLen, LoadMechanism, RotCtrl, KB_PER_1X};

/// The capabilities page, decoded. All speeds are KB/s as reported by the
/// drive; the probe converts them to sectors per second.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct ModePage2A {
	pub page_code: u8,
	pub ps: bool,
	pub page_len: u8,

	pub read_cd_r: bool,
	pub read_cd_rw: bool,
	pub method_2: bool,
	pub read_dvd_rom: bool,
	pub read_dvd_r: bool,
	pub read_dvd_ram: bool,

	pub write_cd_r: bool,
	pub write_cd_rw: bool,
	pub test_write: bool,
	pub write_dvd_r: bool,
	pub write_dvd_ram: bool,

	pub audio_play: bool,
	pub composite: bool,
	pub digital_port_1: bool,
	pub digital_port_2: bool,
	pub mode_2_form_1: bool,
	pub mode_2_form_2: bool,
	pub multi_session: bool,
	pub buf: bool,

	pub cdda_supported: bool,
	pub cdda_accurate: bool,
	pub rw_supported: bool,
	pub rw_deint_corr: bool,
	pub c2_pointers: bool,
	pub isrc: bool,
	pub upc: bool,
	pub read_bar_code: bool,

	pub lock: bool,
	pub lock_state: bool,
	pub prevent_jumper: bool,
	pub eject: bool,
	pub load_mechanism: LoadMechanism,

	pub sep_chan_vol: bool,
	pub sep_chan_mute: bool,
	pub change_disc_prsnt: bool,
	pub sss: bool,
	pub change_sides: bool,
	pub rw_lead_in: bool,

	pub max_read_spd: u16,
	pub num_vol_lvls: u16,
	pub buf_size: u16,
	pub cur_read_spd: u16,

	pub bckf: bool,
	pub rck: bool,
	pub lsbf: bool,
	pub da_block_len: AudioBlockLen,

	pub max_write_spd: u16,
	pub cur_write_spd: u16,
	pub copy_man_rev: u16,
	pub rot_ctrl: RotCtrl,

	pub write_spds: Vec<u16>,
}

/**
Parses the capabilities page out of `buffer`, which must start with the 8-byte
mode parameter header.

Returns `None` on a short or mismatching page, and on read speeds between zero
and 1× exclusive, which no real drive reports.

The fields past byte 21 appeared over successive revisions of the standard and
are gated on the advertised page length: the copy management revision requires
MMC-2 (page length ≥ 24), the rotation control, the current write speed at
offset 28 and the write speed descriptor table require MMC-3 (≥ 28). On older
drives they fall back to zero values.
*/
pub fn parse(buffer: &[u8]) -> Option<ModePage2A> {
	// unconditional fields reach into page byte 21
	if buffer.len() < 8 + 22 {
		return None;
	}

	// validate the page length against the mode data length in the header
	let page_len = BigEndian::read_u16(&buffer[0..2]).checked_sub(6)?;
	if page_len < 16 {
		return None;
	}

	let page = &buffer[8..];

	if page[0] & 0x3f != 0x2a {
		return None;
	}

	// speeds below 1× cannot be real
	let max_read_spd = BigEndian::read_u16(&page[8..10]);
	if max_read_spd > 0 && max_read_spd < KB_PER_1X {
		return None;
	}

	let cur_read_spd = BigEndian::read_u16(&page[14..16]);
	if cur_read_spd > 0 && cur_read_spd < KB_PER_1X {
		return None;
	}

	let mut page_2a = ModePage2A {
		page_code: page[0] & 0x3f,
		ps: page[0] & 0x80 > 0,
		page_len: page[1],

		read_cd_r: page[2] & 0x01 > 0,
		read_cd_rw: page[2] & 0x02 > 0,
		method_2: page[2] & 0x04 > 0,
		read_dvd_rom: page[2] & 0x08 > 0,
		read_dvd_r: page[2] & 0x10 > 0,
		read_dvd_ram: page[2] & 0x20 > 0,

		write_cd_r: page[3] & 0x01 > 0,
		write_cd_rw: page[3] & 0x02 > 0,
		test_write: page[3] & 0x04 > 0,
		write_dvd_r: page[3] & 0x10 > 0,
		write_dvd_ram: page[3] & 0x20 > 0,

		audio_play: page[4] & 0x01 > 0,
		composite: page[4] & 0x02 > 0,
		digital_port_1: page[4] & 0x04 > 0,
		digital_port_2: page[4] & 0x08 > 0,
		mode_2_form_1: page[4] & 0x10 > 0,
		mode_2_form_2: page[4] & 0x20 > 0,
		multi_session: page[4] & 0x40 > 0,
		buf: page[4] & 0x80 > 0,

		cdda_supported: page[5] & 0x01 > 0,
		cdda_accurate: page[5] & 0x02 > 0,
		rw_supported: page[5] & 0x04 > 0,
		rw_deint_corr: page[5] & 0x08 > 0,
		c2_pointers: page[5] & 0x10 > 0,
		isrc: page[5] & 0x20 > 0,
		upc: page[5] & 0x40 > 0,
		read_bar_code: page[5] & 0x80 > 0,

		lock: page[6] & 0x01 > 0,
		lock_state: page[6] & 0x02 > 0,
		prevent_jumper: page[6] & 0x04 > 0,
		eject: page[6] & 0x08 > 0,
		load_mechanism: LoadMechanism::from_bits((page[6] >> 5) & 0x07),

		sep_chan_vol: page[7] & 0x01 > 0,
		sep_chan_mute: page[7] & 0x02 > 0,
		change_disc_prsnt: page[7] & 0x04 > 0,
		sss: page[7] & 0x08 > 0,
		change_sides: page[7] & 0x10 > 0,
		rw_lead_in: page[7] & 0x20 > 0,

		max_read_spd: max_read_spd,
		num_vol_lvls: BigEndian::read_u16(&page[10..12]),
		buf_size: BigEndian::read_u16(&page[12..14]),
		cur_read_spd: cur_read_spd,

		bckf: page[17] & 0x02 > 0,
		rck: page[17] & 0x04 > 0,
		lsbf: page[17] & 0x08 > 0,
		da_block_len: AudioBlockLen::from_bits((page[17] >> 4) & 0x03),

		max_write_spd: BigEndian::read_u16(&page[18..20]),
		cur_write_spd: BigEndian::read_u16(&page[20..22]),
		copy_man_rev: 0,
		rot_ctrl: RotCtrl::Clv,

		write_spds: vec![],
	};

	// only available on MMC-2 and newer devices
	if page_len >= 24 && page.len() >= 24 {
		page_2a.copy_man_rev = BigEndian::read_u16(&page[22..24]);
	}

	// only available on MMC-3 and newer devices
	if page_2a.page_len >= 28 && page.len() >= 32 {
		page_2a.rot_ctrl = RotCtrl::from_bits(page[27] & 0x03);

		// MMC-3 moved the current write speed here
		page_2a.cur_write_spd = BigEndian::read_u16(&page[28..30]);

		let num_write_spds = BigEndian::read_u16(&page[30..32]) as usize;
		for i in 0..num_write_spds {
			// each descriptor is two flag bytes followed by the speed
			let off = 32 + 2 + (i << 2);
			if off + 2 > page.len() {
				break;
			}
			page_2a.write_spds.push(BigEndian::read_u16(&page[off..off + 2]));
		}
	}

	Some(page_2a)
}

#[cfg(test)]
mod tests {
	use super::parse;
	use mmc::RotCtrl;

	// a 48×/24× CD + DVD recorder answering at MMC-3 level
	fn mmc3_recorder() -> Vec<u8> {
		let mut buffer = vec![0u8; 192];

		buffer[0..2].copy_from_slice(&[0x00, 0x20]);

		{
			let page = &mut buffer[8..];
			page[0] = 0x2a;
			page[1] = 30;
			page[2] = 0x3f;	// reads everything up to DVD-RAM
			page[3] = 0x37;	// writes CD-R/RW and DVD-R/RAM, test write
			page[4] = 0x01;	// audio play
			page[6] = 0x29;	// lock, eject, tray
			page[8..10].copy_from_slice(&[0x1b, 0x90]);	// 7056 KB/s
			page[10..12].copy_from_slice(&[0x01, 0x00]);
			page[12..14].copy_from_slice(&[0x08, 0x00]);
			page[14..16].copy_from_slice(&[0x0d, 0xc8]);	// 3528 KB/s
			page[18..20].copy_from_slice(&[0x0d, 0xc8]);
			page[20..22].copy_from_slice(&[0x0d, 0xc8]);
			page[22..24].copy_from_slice(&[0x00, 0x01]);
			page[27] = 0x01;	// CAV
			page[28..30].copy_from_slice(&[0x0d, 0xc8]);
			page[30..32].copy_from_slice(&[0x00, 0x01]);
			page[34..36].copy_from_slice(&[0x0d, 0xc8]);
		}

		buffer
	}

	#[test]
	fn mmc3_fields() {
		let page = parse(&mmc3_recorder()).unwrap();

		assert!(page.read_cd_r && page.read_dvd_rom && page.read_dvd_ram);
		assert!(page.write_cd_r && page.write_dvd_r && page.write_dvd_ram);
		assert!(page.test_write);
		assert!(page.audio_play);
		assert!(page.lock && page.eject);

		assert_eq!(page.max_read_spd, 7056);
		assert_eq!(page.cur_read_spd, 3528);
		assert_eq!(page.num_vol_lvls, 256);
		assert_eq!(page.buf_size, 2048);
		assert_eq!(page.max_write_spd, 3528);
		assert_eq!(page.cur_write_spd, 3528);
		assert_eq!(page.copy_man_rev, 1);
		assert_eq!(page.rot_ctrl, RotCtrl::Cav);

		assert_eq!(page.write_spds, [3528]);
	}

	#[test]
	fn mmc1_drive_has_no_write_speed_table() {
		let mut buffer = mmc3_recorder();
		buffer[0..2].copy_from_slice(&[0x00, 0x1c]);	// page length 22
		buffer[8 + 1] = 20;

		let page = parse(&buffer).unwrap();

		assert_eq!(page.copy_man_rev, 0);
		assert_eq!(page.rot_ctrl, RotCtrl::Clv);
		// pre-MMC-3 current write speed lives at offset 20
		assert_eq!(page.cur_write_spd, 3528);
		assert!(page.write_spds.is_empty());
	}

	#[test]
	fn rejects_sub_1x_speeds() {
		let mut buffer = mmc3_recorder();
		buffer[8 + 8..8 + 10].copy_from_slice(&[0x00, 0x64]);	// 100 KB/s
		assert!(parse(&buffer).is_none());

		let mut buffer = mmc3_recorder();
		buffer[8 + 14..8 + 16].copy_from_slice(&[0x00, 0xaf]);
		assert!(parse(&buffer).is_none());
	}

	#[test]
	fn rejects_wrong_page_or_length() {
		let mut buffer = mmc3_recorder();
		buffer[8] = 0x05;
		assert!(parse(&buffer).is_none());

		let mut buffer = mmc3_recorder();
		buffer[0..2].copy_from_slice(&[0x00, 0x15]);	// page length 15
		assert!(parse(&buffer).is_none());
	}
}
