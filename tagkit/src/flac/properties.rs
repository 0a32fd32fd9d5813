//! STREAMINFO parsing

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

/// Unpack the bit fields of a STREAMINFO block
///
/// `stream_len` is the length of the audio frames, used for the bitrate.
pub(crate) fn read_streaminfo(content: &[u8], stream_len: u64) -> Result<AudioProperties> {
	if content.len() < 18 {
		decode_err!(@BAIL Flac, "STREAMINFO block is too short");
	}

	// 20 bits of sample rate, 3 of channel count, 5 of bits per sample and
	// 36 of total samples, packed back to back
	let sample_rate = (u32::from(content[10]) << 12)
		| (u32::from(content[11]) << 4)
		| (u32::from(content[12]) >> 4);
	let channels = ((content[12] >> 1) & 0x7) + 1;
	let total_samples =
		(u64::from(content[13] & 0xF) << 32) | u64::from(BigEndian::read_u32(&content[14..18]));

	if sample_rate == 0 {
		decode_err!(@BAIL Flac, "STREAMINFO block has a sample rate of zero");
	}

	let duration_ms = (total_samples * 1000).div_round(u64::from(sample_rate));
	let bitrate = if duration_ms > 0 {
		((stream_len * 8).div_round(duration_ms)) as u32
	} else {
		0
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels,
	})
}

#[cfg(test)]
mod tests {
	#[test_log::test]
	fn truncated_streaminfo_is_rejected() {
		assert!(super::read_streaminfo(&[0; 10], 0).is_err());
	}
}
