//! The CRC-32 used by Ogg pages
//!
//! Polynomial 0x04C11DB7, no reflection, zero initial value and no final xor.

const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
	let mut table = [0u32; 256];
	let mut i = 0;
	while i < 256 {
		let mut crc = (i as u32) << 24;
		let mut bit = 0;
		while bit < 8 {
			if crc & 0x8000_0000 != 0 {
				crc = (crc << 1) ^ 0x04C1_1DB7;
			} else {
				crc <<= 1;
			}
			bit += 1;
		}
		table[i] = crc;
		i += 1;
	}
	table
}

pub(crate) fn crc32(data: &[u8]) -> u32 {
	let mut crc = 0u32;
	for byte in data {
		crc = (crc << 8) ^ CRC_TABLE[(((crc >> 24) as u8) ^ byte) as usize];
	}
	crc
}

#[cfg(test)]
mod tests {
	#[test_log::test]
	fn check_value() {
		assert_eq!(super::crc32(b"123456789"), 0x89A1_897F);
	}
}
