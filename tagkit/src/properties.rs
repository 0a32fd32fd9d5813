//! Audio stream properties

use std::time::Duration;

/// Read-only stream information, computed once when a file is opened
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct AudioProperties {
	pub(crate) duration: Duration,
	pub(crate) bitrate: u32,
	pub(crate) sample_rate: u32,
	pub(crate) channels: u8,
}

impl AudioProperties {
	/// The length of the audio stream
	pub fn duration(&self) -> Duration {
		self.duration
	}

	/// The audio bitrate in kbps
	///
	/// For VBR streams this is the average over the whole stream.
	pub fn bitrate(&self) -> u32 {
		self.bitrate
	}

	/// The sample rate in Hz
	pub fn sample_rate(&self) -> u32 {
		self.sample_rate
	}

	/// The channel count
	pub fn channels(&self) -> u8 {
		self.channels
	}
}
