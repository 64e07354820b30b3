//! Mode page 0x05, the write parameters page (MMC-2, table 123).

use byteorder::{ByteOrder, BigEndian};

use scsi::Error;

/// Length of the page payload, header excluded.
pub const PAGE_LEN: usize = 52;

/// Write types (modes) a recorder can be put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum WriteType {
	Packet,
	Tao,
	Sao,
	Raw,
	LayerJump,
	/// Yamaha/Plextor extension, not in the official standard.
	AudioMaster,
	Reserved(u8),
}

impl WriteType {
	pub fn from_bits(bits: u8) -> WriteType {
		match bits & 0x0f {
			0 => WriteType::Packet,
			1 => WriteType::Tao,
			2 => WriteType::Sao,
			3 => WriteType::Raw,
			4 => WriteType::LayerJump,
			8 => WriteType::AudioMaster,
			other => WriteType::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			WriteType::Packet => 0,
			WriteType::Tao => 1,
			WriteType::Sao => 2,
			WriteType::Raw => 3,
			WriteType::LayerJump => 4,
			WriteType::AudioMaster => 8,
			WriteType::Reserved(bits) => bits,
		}
	}
}

/// Multi-session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum MultiSession {
	NextDisallowedNoB0,
	NextDisallowedB0,
	NextAllowedB0,
	Reserved(u8),
}

impl MultiSession {
	pub fn from_bits(bits: u8) -> MultiSession {
		match bits & 0x03 {
			0 => MultiSession::NextDisallowedNoB0,
			1 => MultiSession::NextDisallowedB0,
			3 => MultiSession::NextAllowedB0,
			other => MultiSession::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			MultiSession::NextDisallowedNoB0 => 0,
			MultiSession::NextDisallowedB0 => 1,
			MultiSession::NextAllowedB0 => 3,
			MultiSession::Reserved(bits) => bits,
		}
	}
}

/// Data block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum DataBlock {
	Raw2352,
	Raw2352Pq,
	Raw2352PwPack,
	Raw2352Pw,
	Mode1_2048,
	Mode2_2336,
	Mode2XaForm1_2048,
	Mode2XaForm1_2056,
	Mode2XaForm2_2324,
	Mode2XaMixed2332,
	Reserved(u8),
}

impl DataBlock {
	pub fn from_bits(bits: u8) -> DataBlock {
		match bits & 0x0f {
			0 => DataBlock::Raw2352,
			1 => DataBlock::Raw2352Pq,
			2 => DataBlock::Raw2352PwPack,
			3 => DataBlock::Raw2352Pw,
			8 => DataBlock::Mode1_2048,
			9 => DataBlock::Mode2_2336,
			10 => DataBlock::Mode2XaForm1_2048,
			11 => DataBlock::Mode2XaForm1_2056,
			12 => DataBlock::Mode2XaForm2_2324,
			13 => DataBlock::Mode2XaMixed2332,
			other => DataBlock::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			DataBlock::Raw2352 => 0,
			DataBlock::Raw2352Pq => 1,
			DataBlock::Raw2352PwPack => 2,
			DataBlock::Raw2352Pw => 3,
			DataBlock::Mode1_2048 => 8,
			DataBlock::Mode2_2336 => 9,
			DataBlock::Mode2XaForm1_2048 => 10,
			DataBlock::Mode2XaForm1_2056 => 11,
			DataBlock::Mode2XaForm2_2324 => 12,
			DataBlock::Mode2XaMixed2332 => 13,
			DataBlock::Reserved(bits) => bits,
		}
	}
}

/// Session formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub enum SessionFormat {
	CdRomCdda,
	CdI,
	CdRomXa,
	Reserved(u8),
}

impl SessionFormat {
	pub fn from_bits(bits: u8) -> SessionFormat {
		match bits {
			0 => SessionFormat::CdRomCdda,
			1 => SessionFormat::CdI,
			2 => SessionFormat::CdRomXa,
			other => SessionFormat::Reserved(other),
		}
	}

	pub fn bits(&self) -> u8 {
		match *self {
			SessionFormat::CdRomCdda => 0,
			SessionFormat::CdI => 1,
			SessionFormat::CdRomXa => 2,
			SessionFormat::Reserved(bits) => bits,
		}
	}
}

// Track mode flags (MMC-2, table 295)
pub const TRACK_MODE_AUDIO_2: u8 = 0x00;
pub const TRACK_MODE_AUDIO_4: u8 = 0x08;
/// Audio pre-emphasis, for use with either audio track mode.
pub const TRACK_MODE_PREEMP: u8 = 0x01;
pub const TRACK_MODE_DATA: u8 = 0x04;
/// Incremental data, for use with `TRACK_MODE_DATA`.
pub const TRACK_MODE_INCREMENTAL: u8 = 0x01;
pub const TRACK_MODE_COPY_ALLOWED: u8 = 0x03;

/// The write parameters page, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct ModePage05 {
	pub page_code: u8,
	pub ps: bool,
	pub page_len: u8,
	pub write_type: WriteType,
	pub test_write: bool,
	pub ls_v: bool,
	pub buf_e: bool,
	pub track_mode: u8,
	pub copy: bool,
	pub fp: bool,
	pub multi_session: MultiSession,
	pub data_block_type: DataBlock,
	pub link_size: u8,
	pub host_app_code: u8,
	pub session_format: SessionFormat,
	pub packed_size: u32,
	pub audio_pulse_len: u16,
	pub media_cat_num: [u8; 16],
	pub int_std_rec_code: [u8; 16],
	pub sub_hdrs: [u8; 4],
}

impl Default for ModePage05 {
	fn default() -> ModePage05 {
		ModePage05 {
			page_code: 0x05,
			ps: false,
			page_len: PAGE_LEN as u8,
			write_type: WriteType::Packet,
			test_write: false,
			ls_v: false,
			buf_e: false,
			track_mode: 0,
			copy: false,
			fp: false,
			multi_session: MultiSession::NextDisallowedNoB0,
			data_block_type: DataBlock::Raw2352,
			link_size: 0,
			host_app_code: 0,
			session_format: SessionFormat::CdRomCdda,
			packed_size: 0,
			audio_pulse_len: 0,
			media_cat_num: [0; 16],
			int_std_rec_code: [0; 16],
			sub_hdrs: [0; 4],
		}
	}
}

/**
Parses the write parameters page out of `buffer`, which must start with the
8-byte mode parameter header (SPC-4, table 291).

Returns `None` if the advertised page is shorter than the 52 bytes MMC-2
defines, or if the page code does not match.
*/
pub fn parse(buffer: &[u8]) -> Option<ModePage05> {
	if buffer.len() < 8 + PAGE_LEN {
		return None;
	}

	// validate the page length against the mode data length in the header
	let page_len = BigEndian::read_u16(&buffer[0..2]).checked_sub(6)?;
	if (page_len as usize) < PAGE_LEN {
		return None;
	}

	let page = &buffer[8..];

	if page[0] & 0x3f != 0x05 {
		return None;
	}

	let mut media_cat_num = [0u8; 16];
	media_cat_num.copy_from_slice(&page[16..32]);

	let mut int_std_rec_code = [0u8; 16];
	int_std_rec_code.copy_from_slice(&page[32..48]);

	let mut sub_hdrs = [0u8; 4];
	sub_hdrs.copy_from_slice(&page[48..52]);

	Some(ModePage05 {
		page_code: page[0] & 0x3f,
		ps: page[0] & 0x80 > 0,
		page_len: page[1],
		write_type: WriteType::from_bits(page[2] & 0x0f),
		test_write: page[2] & 0x10 > 0,
		ls_v: page[2] & 0x20 > 0,
		buf_e: page[2] & 0x40 > 0,
		track_mode: page[3] & 0x0f,
		copy: page[3] & 0x10 > 0,
		fp: page[3] & 0x20 > 0,
		multi_session: MultiSession::from_bits((page[3] & 0xc0) >> 6),
		data_block_type: DataBlock::from_bits(page[4] & 0x0f),
		link_size: page[5],
		host_app_code: page[7] & 0x3f,
		session_format: SessionFormat::from_bits(page[8]),
		packed_size: BigEndian::read_u32(&page[10..14]),
		audio_pulse_len: BigEndian::read_u16(&page[14..16]),
		media_cat_num: media_cat_num,
		int_std_rec_code: int_std_rec_code,
		sub_hdrs: sub_hdrs,
	})
}

impl ModePage05 {
	/**
	Writes the page back out in its canonical binary layout. Only the 52-byte
	page payload is produced, not the header expected by
	[`parse`](fn.parse.html).
	*/
	pub fn read(&self, buffer: &mut [u8]) -> Result<(), Error> {
		if buffer.len() < PAGE_LEN {
			return Err(Error::InvalidArgument("buffer too small for mode page 0x05"));
		}

		for byte in buffer.iter_mut() {
			*byte = 0;
		}

		buffer[0] = self.page_code & 0x3f;
		if self.ps {
			buffer[0] |= 0x80;
		}

		buffer[1] = self.page_len;

		buffer[2] = self.write_type.bits() & 0x0f;
		if self.test_write {
			buffer[2] |= 0x10;
		}
		if self.ls_v {
			buffer[2] |= 0x20;
		}
		if self.buf_e {
			buffer[2] |= 0x40;
		}

		buffer[3] = self.track_mode & 0x0f;
		if self.copy {
			buffer[3] |= 0x10;
		}
		if self.fp {
			buffer[3] |= 0x20;
		}
		buffer[3] |= (self.multi_session.bits() & 0x03) << 6;

		buffer[4] = self.data_block_type.bits() & 0x0f;
		buffer[5] = self.link_size;
		buffer[7] = self.host_app_code & 0x3f;
		buffer[8] = self.session_format.bits();

		BigEndian::write_u32(&mut buffer[10..14], self.packed_size);
		BigEndian::write_u16(&mut buffer[14..16], self.audio_pulse_len);

		buffer[16..32].copy_from_slice(&self.media_cat_num);
		buffer[32..48].copy_from_slice(&self.int_std_rec_code);
		buffer[48..52].copy_from_slice(&self.sub_hdrs);

		Ok(())
	}

	/// Resets the page to track-at-once defaults.
	pub fn reset_tao(&mut self) {
		self.write_type = WriteType::Tao;
		self.track_mode = TRACK_MODE_DATA;
		self.data_block_type = DataBlock::Mode1_2048;
		self.session_format = SessionFormat::CdRomCdda;
		self.audio_pulse_len = 150;
	}

	/// Resets the page to session-at-once defaults.
	pub fn reset_sao(&mut self) {
		self.write_type = WriteType::Sao;
		self.track_mode = TRACK_MODE_DATA;
		self.data_block_type = DataBlock::Mode1_2048;
		self.session_format = SessionFormat::CdRomCdda;
		self.audio_pulse_len = 150;

		self.ls_v = false;
		self.copy = false;
		self.fp = false;
		self.multi_session = MultiSession::NextDisallowedNoB0;
		self.host_app_code = 0;
	}
}
