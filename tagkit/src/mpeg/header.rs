//! MPEG frame header parsing

use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MpegVersion {
	V1,
	V2,
	V25,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Layer {
	Layer1,
	Layer2,
	Layer3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChannelMode {
	Stereo,
	JointStereo,
	DualChannel,
	SingleChannel,
}

// Rows are [V1 L1, V1 L2, V1 L3, V2 L1, V2 L2/L3], in kbps
const BITRATES: [[u32; 15]; 5] = [
	[
		0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
	],
	[
		0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
	],
	[
		0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
	],
	[
		0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
	],
	[0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

const SAMPLE_RATES: [[u32; 3]; 3] = [
	[44100, 48000, 32000],
	[22050, 24000, 16000],
	[11025, 12000, 8000],
];

#[derive(Copy, Clone, Debug)]
pub(crate) struct MpegHeader {
	pub version: MpegVersion,
	pub layer: Layer,
	pub bitrate: u32,
	pub sample_rate: u32,
	pub channel_mode: ChannelMode,
	pub frame_length: usize,
	pub samples_per_frame: u32,
}

impl MpegHeader {
	/// Parse a four byte frame header, `None` when any field is reserved or zero
	pub(crate) fn parse(data: [u8; 4]) -> Option<Self> {
		if data[0] != 0xFF || data[1] & 0xE0 != 0xE0 {
			return None;
		}

		let version = match (data[1] >> 3) & 0x3 {
			0 => MpegVersion::V25,
			2 => MpegVersion::V2,
			3 => MpegVersion::V1,
			_ => return None,
		};

		let layer = match (data[1] >> 1) & 0x3 {
			1 => Layer::Layer3,
			2 => Layer::Layer2,
			3 => Layer::Layer1,
			_ => return None,
		};

		let bitrate_row = match (version, layer) {
			(MpegVersion::V1, Layer::Layer1) => 0,
			(MpegVersion::V1, Layer::Layer2) => 1,
			(MpegVersion::V1, Layer::Layer3) => 2,
			(_, Layer::Layer1) => 3,
			(_, _) => 4,
		};
		let bitrate_index = (data[2] >> 4) & 0xF;
		if bitrate_index == 0 || bitrate_index == 15 {
			return None;
		}
		let bitrate = BITRATES[bitrate_row][bitrate_index as usize];

		let sample_rate_row = match version {
			MpegVersion::V1 => 0,
			MpegVersion::V2 => 1,
			MpegVersion::V25 => 2,
		};
		let sample_rate_index = (data[2] >> 2) & 0x3;
		if sample_rate_index == 3 {
			return None;
		}
		let sample_rate = SAMPLE_RATES[sample_rate_row][sample_rate_index as usize];

		let padding = u32::from((data[2] >> 1) & 0x1);
		let channel_mode = match (data[3] >> 6) & 0x3 {
			0 => ChannelMode::Stereo,
			1 => ChannelMode::JointStereo,
			2 => ChannelMode::DualChannel,
			_ => ChannelMode::SingleChannel,
		};

		let samples_per_frame = match (layer, version) {
			(Layer::Layer1, _) => 384,
			(Layer::Layer2, _) | (Layer::Layer3, MpegVersion::V1) => 1152,
			(Layer::Layer3, _) => 576,
		};

		let frame_length = match layer {
			Layer::Layer1 => (12 * bitrate * 1000 / sample_rate + padding) * 4,
			_ => samples_per_frame / 8 * bitrate * 1000 / sample_rate + padding,
		} as usize;

		if frame_length <= 4 {
			return None;
		}

		Some(Self {
			version,
			layer,
			bitrate,
			sample_rate,
			channel_mode,
			frame_length,
			samples_per_frame,
		})
	}

	pub(crate) fn channels(&self) -> u8 {
		if self.channel_mode == ChannelMode::SingleChannel {
			1
		} else {
			2
		}
	}

	/// Offset of a Xing/Info header within the frame, relative to the frame start
	pub(crate) fn xing_offset(&self) -> usize {
		let side_info = match (self.version, self.channel_mode) {
			(MpegVersion::V1, ChannelMode::SingleChannel) => 17,
			(MpegVersion::V1, _) => 32,
			(_, ChannelMode::SingleChannel) => 9,
			(_, _) => 17,
		};

		4 + side_info
	}
}

/// Find the first frame sync that parses as a valid header
pub(crate) fn search_for_frame_sync(data: &[u8]) -> Option<(Range<usize>, MpegHeader)> {
	let mut pos = 0;
	while pos + 4 <= data.len() {
		if data[pos] == 0xFF && data[pos + 1] & 0xE0 == 0xE0 {
			if let Some(header) =
				MpegHeader::parse([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
			{
				let end = (pos + header.frame_length).min(data.len());
				return Some((pos..end, header));
			}
		}

		pos += 1;
	}

	None
}

#[cfg(test)]
mod tests {
	use super::{ChannelMode, Layer, MpegHeader, MpegVersion};

	#[test_log::test]
	fn cbr_header() {
		// V1 Layer III, 128 kbps, 44.1 kHz, stereo
		let header = MpegHeader::parse([0xFF, 0xFB, 0x90, 0x00]).unwrap();
		assert_eq!(header.version, MpegVersion::V1);
		assert_eq!(header.layer, Layer::Layer3);
		assert_eq!(header.bitrate, 128);
		assert_eq!(header.sample_rate, 44100);
		assert_eq!(header.channel_mode, ChannelMode::Stereo);
		assert_eq!(header.frame_length, 417);
		assert_eq!(header.samples_per_frame, 1152);
	}

	#[test_log::test]
	fn reserved_fields_are_rejected() {
		// Free-format bitrate
		assert!(MpegHeader::parse([0xFF, 0xFB, 0x00, 0x00]).is_none());
		// Reserved sample rate
		assert!(MpegHeader::parse([0xFF, 0xFB, 0x9C, 0x00]).is_none());
		// Not a sync
		assert!(MpegHeader::parse([0x00, 0xFB, 0x90, 0x00]).is_none());
	}

	#[test_log::test]
	fn sync_search_skips_garbage() {
		let mut data = vec![0x00, 0xFF, 0x12];
		data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
		data.extend_from_slice(&[0u8; 32]);

		let (range, header) = super::search_for_frame_sync(&data).unwrap();
		assert_eq!(range.start, 3);
		assert_eq!(header.bitrate, 128);
	}
}
