//! MPEG stream properties, VBR headers included

use crate::error::Result;
use crate::macros::decode_err;
use crate::mpeg::header::{self, MpegHeader};
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

struct VbrInfo {
	frames: u32,
	bytes: Option<u32>,
}

/// Read the properties of an MPEG stream
///
/// `data` is the audio region of the file, tags excluded.
pub(crate) fn read_properties(data: &[u8]) -> Result<AudioProperties> {
	let Some((frame_range, first)) = header::search_for_frame_sync(data) else {
		decode_err!(@BAIL Mpeg, "File contains no valid MPEG frames");
	};

	let stream_len = (data.len() - frame_range.start) as u64;
	let frame = &data[frame_range.clone()];

	let vbr = read_xing(frame, &first).or_else(|| read_vbri(frame));

	let (duration, bitrate) = match vbr {
		Some(vbr) if vbr.frames > 0 => {
			let samples = u64::from(vbr.frames) * u64::from(first.samples_per_frame);
			let duration_ms = (samples * 1000).div_round(u64::from(first.sample_rate));

			let bytes = vbr.bytes.map_or(stream_len, u64::from);
			let bitrate = if duration_ms > 0 {
				((bytes * 8).div_round(duration_ms)) as u32
			} else {
				first.bitrate
			};

			(Duration::from_millis(duration_ms), bitrate)
		},
		// Assume CBR and derive the length from the stream size
		_ => {
			let duration_ms = if first.bitrate > 0 {
				(stream_len * 8).div_round(u64::from(first.bitrate))
			} else {
				0
			};

			(Duration::from_millis(duration_ms), first.bitrate)
		},
	};

	Ok(AudioProperties {
		duration,
		bitrate,
		sample_rate: first.sample_rate,
		channels: first.channels(),
	})
}

fn read_xing(frame: &[u8], header: &MpegHeader) -> Option<VbrInfo> {
	let offset = header.xing_offset();
	let content = frame.get(offset..)?;
	if content.len() < 16 || (&content[..4] != b"Xing" && &content[..4] != b"Info") {
		return None;
	}

	let flags = BigEndian::read_u32(&content[4..8]);
	let mut pos = 8;

	let mut frames = None;
	if flags & 0x1 == 0x1 {
		frames = Some(BigEndian::read_u32(content.get(pos..pos + 4)?));
		pos += 4;
	}

	let mut bytes = None;
	if flags & 0x2 == 0x2 {
		bytes = Some(BigEndian::read_u32(content.get(pos..pos + 4)?));
	}

	Some(VbrInfo {
		frames: frames?,
		bytes,
	})
}

// VBRI always sits 32 bytes after the four byte frame header
fn read_vbri(frame: &[u8]) -> Option<VbrInfo> {
	let content = frame.get(36..)?;
	if content.len() < 22 || &content[..4] != b"VBRI" {
		return None;
	}

	let bytes = BigEndian::read_u32(&content[10..14]);
	let frames = BigEndian::read_u32(&content[14..18]);

	Some(VbrInfo {
		frames,
		bytes: Some(bytes),
	})
}

#[cfg(test)]
mod tests {
	use byteorder::{BigEndian, ByteOrder};

	// V1 Layer III, 128 kbps, 44.1 kHz, stereo; frame length 417
	const CBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

	fn cbr_stream(frames: usize) -> Vec<u8> {
		let mut data = Vec::new();
		for _ in 0..frames {
			data.extend_from_slice(&CBR_HEADER);
			data.extend_from_slice(&[0; 413]);
		}
		data
	}

	#[test_log::test]
	fn cbr_properties() {
		// 38 frames, roughly one second of audio
		let data = cbr_stream(38);
		let properties = super::read_properties(&data).unwrap();

		assert_eq!(properties.bitrate(), 128);
		assert_eq!(properties.sample_rate(), 44100);
		assert_eq!(properties.channels(), 2);
		// 38 * 417 bytes at 128 kbps
		assert_eq!(properties.duration().as_millis(), 990);
	}

	#[test_log::test]
	fn xing_header_wins() {
		let mut data = cbr_stream(1);
		// Stereo V1 puts Xing at frame offset 36
		data[36..40].copy_from_slice(b"Xing");
		BigEndian::write_u32(&mut data[40..44], 0x3);
		BigEndian::write_u32(&mut data[44..48], 3800); // frames
		BigEndian::write_u32(&mut data[48..52], 1_600_000); // bytes

		let properties = super::read_properties(&data).unwrap();
		// 3800 * 1152 samples at 44.1 kHz is ~99.3 s
		assert_eq!(properties.duration().as_secs(), 99);
		assert_eq!(properties.bitrate(), 129);
	}

	#[test_log::test]
	fn no_frames_is_an_error() {
		assert!(super::read_properties(&[0u8; 128]).is_err());
	}
}
