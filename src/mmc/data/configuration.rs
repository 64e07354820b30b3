//! GET CONFIGURATION data: the header (MMC-3, table 74) and the feature
//! descriptor list that follows it.

use std::cmp;

use byteorder::{ByteOrder, BigEndian};

use mmc::Profile;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct Configuration {
	pub data_len: u32,
	pub cur_profile: Profile,
}

/// Parses the 8-byte configuration header.
pub fn parse(buffer: &[u8]) -> Option<Configuration> {
	if buffer.len() < 8 {
		return None;
	}

	Some(Configuration {
		data_len: BigEndian::read_u32(&buffer[0..4]),
		cur_profile: Profile::from_u16(BigEndian::read_u16(&buffer[6..8])),
	})
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct FeatureDescriptor {
	pub code: u16,
	pub current: bool,
	pub persistent: bool,
	pub version: u8,
	pub additional_len: u8,
}

/**
Walks the feature descriptor list following the configuration header in
`buffer`. Each descriptor is a 4-byte header plus `additional_len` bytes of
feature-specific data, which is skipped.

The walk stops at the advertised data length or at the end of the buffer,
whichever comes first.
*/
pub fn descriptors(buffer: &[u8]) -> Vec<FeatureDescriptor> {
	let mut list = vec![];

	let header = match parse(buffer) {
		Some(header) => header,
		None => return list,
	};

	// the data length field covers everything after its own four bytes
	let end = cmp::min(buffer.len() as u64, header.data_len as u64 + 4) as usize;

	let mut pos = 8;
	while pos + 4 <= end {
		let desc = FeatureDescriptor {
			code: BigEndian::read_u16(&buffer[pos..pos + 2]),
			current: buffer[pos + 2] & 0x01 > 0,
			persistent: buffer[pos + 2] & 0x02 > 0,
			version: (buffer[pos + 2] >> 2) & 0x0f,
			additional_len: buffer[pos + 3],
		};

		pos += 4 + desc.additional_len as usize;
		list.push(desc);
	}

	list
}

#[cfg(test)]
mod tests {
	use super::*;
	use mmc::Profile;

	#[test]
	fn header() {
		let buffer = [0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x1b];
		let config = parse(&buffer).unwrap();

		assert_eq!(config.data_len, 0x10);
		assert_eq!(config.cur_profile, Profile::DvdPlusR);

		assert!(parse(&buffer[..7]).is_none());
	}

	#[test]
	fn descriptor_walk() {
		let mut buffer = vec![0u8; 64];
		buffer[3] = 16;	// 12 descriptor bytes follow the header
		buffer[6..8].copy_from_slice(&[0x00, 0x08]);

		// DVD+R, current + persistent, with four bytes of payload
		buffer[8..12].copy_from_slice(&[0x00, 0x2b, 0x07, 0x04]);
		// BD read
		buffer[16..20].copy_from_slice(&[0x00, 0x40, 0x01, 0x00]);

		let list = descriptors(&buffer);

		assert_eq!(list.len(), 2);

		assert_eq!(list[0].code, 0x002b);
		assert!(list[0].current);
		assert!(list[0].persistent);
		assert_eq!(list[0].version, 1);
		assert_eq!(list[0].additional_len, 4);

		assert_eq!(list[1].code, 0x0040);
		assert_eq!(list[1].additional_len, 0);
	}

	#[test]
	fn walk_respects_advertised_length() {
		let mut buffer = vec![0u8; 64];
		buffer[3] = 8;	// only one descriptor inside the advertised length

		buffer[8..12].copy_from_slice(&[0x00, 0x2a, 0x01, 0x00]);
		buffer[12..16].copy_from_slice(&[0x00, 0x40, 0x01, 0x00]);

		let list = descriptors(&buffer);

		assert_eq!(list.len(), 1);
		assert_eq!(list[0].code, 0x002a);
	}
}
