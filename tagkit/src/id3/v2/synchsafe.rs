//! Utilities for working with unsynchronized ID3v2 content

use crate::error::Result;
use crate::macros::err;

/// The maximum value that can be stored in a 28-bit synchsafe integer
pub(crate) const U28_MAX: u32 = 0x0FFF_FFFF;

/// A synchsafe integer stores 7 bits per byte so that no byte of a size field
/// can ever look like a frame sync (0xFF).
pub(crate) trait SynchsafeInteger: Sized {
	/// Create the synchsafe form of the integer
	fn synch(self) -> Result<Self>;
	/// Restore the integer from its synchsafe form
	fn unsynch(self) -> Self;
}

impl SynchsafeInteger for u32 {
	fn synch(self) -> Result<Self> {
		if self > U28_MAX {
			err!(TooMuchData);
		}

		Ok(((self & 0x0FE0_0000) << 3)
			| ((self & 0x001F_C000) << 2)
			| ((self & 0x0000_3F80) << 1)
			| (self & 0x0000_007F))
	}

	fn unsynch(self) -> Self {
		((self & 0x7F00_0000) >> 3)
			| ((self & 0x007F_0000) >> 2)
			| ((self & 0x0000_7F00) >> 1)
			| (self & 0x0000_007F)
	}
}

/// Undo content unsynchronisation, dropping the 0x00 inserted after every 0xFF
pub(crate) fn remove_unsynchronisation(data: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(data.len());

	let mut i = 0;
	while i < data.len() {
		out.push(data[i]);
		if data[i] == 0xFF && data.get(i + 1) == Some(&0x00) {
			i += 1;
		}
		i += 1;
	}

	out
}

#[cfg(test)]
mod tests {
	use super::SynchsafeInteger;

	#[test_log::test]
	fn u32_synch() {
		assert_eq!(0x0FFF_FFFF_u32.synch().unwrap(), 0x7F7F_7F7F);
		assert_eq!(0x7F7F_7F7F_u32.unsynch(), 0x0FFF_FFFF);
		assert_eq!(255u32.synch().unwrap(), 0x017F);
		assert_eq!(0x017F_u32.unsynch(), 255);

		// Cannot fit in 28 bits
		assert!(0x1000_0000_u32.synch().is_err());
	}

	#[test_log::test]
	fn unsynchronisation_removal() {
		assert_eq!(
			super::remove_unsynchronisation(&[0xFF, 0x00, 0xE0, 0xFF, 0x00, 0x00, 0x12]),
			&[0xFF, 0xE0, 0xFF, 0x00, 0x12]
		);
		assert_eq!(super::remove_unsynchronisation(&[0xFF]), &[0xFF]);
	}
}
