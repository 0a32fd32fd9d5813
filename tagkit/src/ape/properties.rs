//! Monkey's Audio stream properties

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::io::Cursor;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt};

// The header was restructured in 3.98
const NEW_HEADER_VERSION: u16 = 3980;

/// Read the properties from a Monkey's Audio stream
///
/// `data` is the audio region of the file, tags excluded, starting at the
/// `MAC ` signature.
pub(crate) fn read_properties(data: &[u8]) -> Result<AudioProperties> {
	if data.len() < 8 || &data[..4] != b"MAC " {
		decode_err!(@BAIL Ape, "Expected \"MAC \" to start a Monkey's Audio stream");
	}

	let version = u16::from_le_bytes([data[4], data[5]]);
	let (sample_rate, channels, total_samples) = if version >= NEW_HEADER_VERSION {
		read_new_header(data)?
	} else {
		read_old_header(data, version)?
	};

	if sample_rate == 0 {
		decode_err!(@BAIL Ape, "Monkey's Audio header has a sample rate of zero");
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
		channels,
	})
}

fn read_new_header(data: &[u8]) -> Result<(u32, u8, u32)> {
	let mut reader = Cursor::new(&data[8..]);
	let descriptor_bytes = reader.read_u32::<LittleEndian>()?;

	if (descriptor_bytes as usize).saturating_add(24) > data.len() {
		decode_err!(@BAIL Ape, "Monkey's Audio descriptor is larger than the stream");
	}

	let mut header = Cursor::new(&data[descriptor_bytes as usize..]);
	let _compression_level = header.read_u16::<LittleEndian>()?;
	let _format_flags = header.read_u16::<LittleEndian>()?;
	let blocks_per_frame = header.read_u32::<LittleEndian>()?;
	let final_frame_blocks = header.read_u32::<LittleEndian>()?;
	let total_frames = header.read_u32::<LittleEndian>()?;
	let _bits_per_sample = header.read_u16::<LittleEndian>()?;
	let channels = header.read_u16::<LittleEndian>()?;
	let sample_rate = header.read_u32::<LittleEndian>()?;

	let total_samples = total_samples(total_frames, blocks_per_frame, final_frame_blocks);
	Ok((sample_rate, channels as u8, total_samples))
}

fn read_old_header(data: &[u8], version: u16) -> Result<(u32, u8, u32)> {
	let mut reader = Cursor::new(&data[6..]);
	let compression_level = reader.read_u16::<LittleEndian>()?;
	let _format_flags = reader.read_u16::<LittleEndian>()?;
	let channels = reader.read_u16::<LittleEndian>()?;
	let sample_rate = reader.read_u32::<LittleEndian>()?;
	let _header_bytes = reader.read_u32::<LittleEndian>()?;
	let _terminating_bytes = reader.read_u32::<LittleEndian>()?;
	let total_frames = reader.read_u32::<LittleEndian>()?;
	let final_frame_blocks = reader.read_u32::<LittleEndian>()?;

	let blocks_per_frame = if version >= 3950 {
		73728 * 4
	} else if version >= 3900 || (version >= 3800 && compression_level == 4000) {
		73728
	} else {
		9216
	};

	let total_samples = total_samples(total_frames, blocks_per_frame, final_frame_blocks);
	Ok((sample_rate, channels as u8, total_samples))
}

fn total_samples(total_frames: u32, blocks_per_frame: u32, final_frame_blocks: u32) -> u32 {
	if total_frames == 0 {
		return 0;
	}

	(total_frames - 1).saturating_mul(blocks_per_frame) + final_frame_blocks
}

#[cfg(test)]
mod tests {
	use byteorder::{LittleEndian, WriteBytesExt};

	fn new_header_stream() -> Vec<u8> {
		let mut data = Vec::new();
		data.extend_from_slice(b"MAC ");
		data.write_u16::<LittleEndian>(3990).unwrap();
		data.write_u16::<LittleEndian>(0).unwrap();
		// Descriptor sizes, only the descriptor length matters here
		data.write_u32::<LittleEndian>(52).unwrap();
		data.write_u32::<LittleEndian>(24).unwrap();
		data.write_u32::<LittleEndian>(0).unwrap();
		data.write_u32::<LittleEndian>(0).unwrap();
		data.write_u32::<LittleEndian>(0).unwrap();
		data.write_u32::<LittleEndian>(0).unwrap();
		data.write_u32::<LittleEndian>(0).unwrap();
		data.extend_from_slice(&[0; 16]);

		// Header: 10 full frames of 73728 blocks at 44.1 kHz stereo
		data.write_u16::<LittleEndian>(2000).unwrap();
		data.write_u16::<LittleEndian>(0).unwrap();
		data.write_u32::<LittleEndian>(73728).unwrap();
		data.write_u32::<LittleEndian>(73728).unwrap();
		data.write_u32::<LittleEndian>(10).unwrap();
		data.write_u16::<LittleEndian>(16).unwrap();
		data.write_u16::<LittleEndian>(2).unwrap();
		data.write_u32::<LittleEndian>(44100).unwrap();
		data
	}

	#[test_log::test]
	fn new_header_properties() {
		let properties = super::read_properties(&new_header_stream()).unwrap();
		assert_eq!(properties.sample_rate(), 44100);
		assert_eq!(properties.channels(), 2);
		// 737280 samples at 44100 Hz
		assert_eq!(properties.duration().as_millis(), 16718);
	}

	#[test_log::test]
	fn garbage_is_rejected() {
		assert!(super::read_properties(b"not monkey audio").is_err());
	}
}
