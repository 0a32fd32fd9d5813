//! True Audio stream properties

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::io::Cursor;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt};

/// Read the properties from a TTA1 header
///
/// `data` is the audio region of the file, tags excluded.
pub(crate) fn read_properties(data: &[u8]) -> Result<AudioProperties> {
	if data.len() < 22 || &data[..4] != b"TTA1" {
		decode_err!(@BAIL Tta, "Expected \"TTA1\" to start a True Audio stream");
	}

	let mut reader = Cursor::new(&data[4..]);
	let _audio_format = reader.read_u16::<LittleEndian>()?;
	let channels = reader.read_u16::<LittleEndian>()?;
	let _bits_per_sample = reader.read_u16::<LittleEndian>()?;
	let sample_rate = reader.read_u32::<LittleEndian>()?;
	let total_samples = reader.read_u32::<LittleEndian>()?;

	if sample_rate == 0 {
		decode_err!(@BAIL Tta, "True Audio header has a sample rate of zero");
	}

	let duration_ms = (u64::from(total_samples) * 1000).div_round(u64::from(sample_rate));
	let bitrate = if duration_ms > 0 {
		((data.len() as u64 * 8).div_round(duration_ms)) as u32
	} else {
		0
	};

	Ok(AudioProperties {
		duration: Duration::from_millis(duration_ms),
		bitrate,
		sample_rate,
		channels: channels as u8,
	})
}
