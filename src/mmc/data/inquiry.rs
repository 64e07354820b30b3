//! Standard INQUIRY data (SPC-2, table 46).

use super::ascii_field;

#[derive(Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct Inquiry {
	pub periph_dev_type: u8,
	pub periph_qualifier: u8,
	pub rmb: bool,
	pub version: u8,
	pub response_data_format: u8,
	pub hi_sup: bool,
	pub norm_aca: bool,
	pub aerc: bool,
	pub additional_len: u8,
	pub sccs: bool,
	pub addr_16: bool,
	pub mchngr: bool,
	pub multi_p: bool,
	pub vs_1: bool,
	pub enc_serv: bool,
	pub bque: bool,
	pub vs_2: bool,
	pub cmd_que: bool,
	pub linked: bool,
	pub sync: bool,
	pub wbus_16: bool,
	pub rel_addr: bool,

	pub vendor: String,
	pub product: String,
	pub revision: String,
}

fn is_set(x: u8, bit: usize) -> bool {
	x & (1 << bit) != 0
}

/// Parses the 36 bytes of standard inquiry data. Returns `None` if `data` is
/// too short to hold them.
pub fn parse(data: &[u8]) -> Option<Inquiry> {
	if data.len() < 36 {
		return None;
	}

	Some(Inquiry {
		periph_dev_type: data[0] & 0x1f,
		periph_qualifier: data[0] >> 5,
		rmb: is_set(data[1], 7),
		version: data[2],
		response_data_format: data[3] & 0x0f,
		hi_sup: is_set(data[3], 4),
		norm_aca: is_set(data[3], 5),
		aerc: is_set(data[3], 7),
		additional_len: data[4],
		sccs: is_set(data[5], 7),
		addr_16: is_set(data[6], 0),
		mchngr: is_set(data[6], 3),
		multi_p: is_set(data[6], 4),
		vs_1: is_set(data[6], 5),
		enc_serv: is_set(data[6], 6),
		bque: is_set(data[6], 7),
		vs_2: is_set(data[7], 0),
		cmd_que: is_set(data[7], 3),
		linked: is_set(data[7], 4),
		sync: is_set(data[7], 5),
		wbus_16: is_set(data[7], 6),
		rel_addr: is_set(data[7], 7),

		vendor: ascii_field(&data[8..16]),
		product: ascii_field(&data[16..32]),
		revision: ascii_field(&data[32..36]),
	})
}
