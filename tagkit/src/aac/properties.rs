//! ADTS stream properties

use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::AudioProperties;
use crate::util::math::RoundedDivision;

use std::time::Duration;

const SAMPLE_RATES: [u32; 13] = [
	96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

const SAMPLES_PER_BLOCK: u64 = 1024;

struct AdtsHeader {
	sample_rate: u32,
	channels: u8,
	frame_length: usize,
	raw_data_blocks: u8,
}

impl AdtsHeader {
	fn parse(data: &[u8]) -> Option<Self> {
		if data.len() < 7 || data[0] != 0xFF || data[1] & 0xF6 != 0xF0 {
			return None;
		}

		let sample_rate_index = (data[2] >> 2) & 0xF;
		let sample_rate = *SAMPLE_RATES.get(sample_rate_index as usize)?;

		let channel_configuration = ((data[2] & 0x1) << 2) | (data[3] >> 6);
		let channels = match channel_configuration {
			// Defined in an in-band PCE, assume stereo
			0 => 2,
			7 => 8,
			c => c,
		};

		let frame_length = (usize::from(data[3] & 0x3) << 11)
			| (usize::from(data[4]) << 3)
			| usize::from(data[5] >> 5);
		if frame_length < 7 {
			return None;
		}

		let raw_data_blocks = (data[6] & 0x3) + 1;

		Some(Self {
			sample_rate,
			channels,
			frame_length,
			raw_data_blocks,
		})
	}
}

/// Read the properties of an ADTS stream by walking its frames
///
/// `data` is the audio region of the file, tags excluded.
pub(crate) fn read_properties(data: &[u8]) -> Result<AudioProperties> {
	// Resync once past any leading garbage
	let start = data
		.windows(2)
		.position(|w| w[0] == 0xFF && w[1] & 0xF6 == 0xF0)
		.unwrap_or(0);

	let mut pos = start;
	let mut first: Option<(u32, u8)> = None;
	let mut blocks = 0u64;

	while pos + 7 <= data.len() {
		let Some(header) = AdtsHeader::parse(&data[pos..]) else {
			break;
		};

		if first.is_none() {
			first = Some((header.sample_rate, header.channels));
		}

		blocks += u64::from(header.raw_data_blocks);
		pos += header.frame_length;
	}

	let Some((sample_rate, channels)) = first else {
		decode_err!(@BAIL Aac, "File contains no valid ADTS frames");
	};

	let duration_ms = (blocks * SAMPLES_PER_BLOCK * 1000).div_round(u64::from(sample_rate));
	let stream_len = (data.len() - start) as u64;
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
	fn adts_frame(len: usize) -> Vec<u8> {
		let mut frame = vec![0u8; len];
		frame[0] = 0xFF;
		frame[1] = 0xF1;
		// AAC LC, 44.1 kHz, stereo
		frame[2] = 0x50;
		frame[3] = 0x80 | ((len >> 11) as u8 & 0x3);
		frame[4] = (len >> 3) as u8;
		frame[5] = ((len & 0x7) as u8) << 5;
		frame[6] = 0xFC;
		frame
	}

	#[test_log::test]
	fn adts_walk() {
		// 43 frames of 1024 samples each is just under a second at 44.1 kHz
		let mut data = Vec::new();
		for _ in 0..43 {
			data.extend_from_slice(&adts_frame(160));
		}

		let properties = super::read_properties(&data).unwrap();
		assert_eq!(properties.sample_rate(), 44100);
		assert_eq!(properties.channels(), 2);
		assert_eq!(properties.duration().as_millis(), 998);
		// 43 * 160 bytes over 998 ms
		assert_eq!(properties.bitrate(), 55);
	}

	#[test_log::test]
	fn garbage_is_rejected() {
		assert!(super::read_properties(&[0u8; 64]).is_err());
	}
}
