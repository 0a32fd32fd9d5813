//! The [`TaggedFile`] facade
//!
//! One handle per file: [`TaggedFile::read`] detects the format, parses the
//! metadata, and computes the audio properties in a single pass. Setters only
//! touch the in-memory [`Tag`] until [`TaggedFile::save`] rewrites the file.

use crate::error::{ErrorKind, FileDecodingError, Result, TagError};
use crate::layout::{Layout, ParsedFile};
use crate::picture::Picture;
use crate::probe::FileFormat;
use crate::properties::AudioProperties;
use crate::tag::{ItemKey, Tag, TagType};
use crate::{aac, ape, asf, flac, iff, mp4, mpeg, musepack, ogg, save, tta};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An open audio file and its parsed metadata
///
/// A `TaggedFile` is not safe for concurrent mutation from multiple threads,
/// and two handles on the same path will race; synchronization is the
/// caller's job.
pub struct TaggedFile {
	path: PathBuf,
	format: FileFormat,
	data: Vec<u8>,
	tag: Tag,
	properties: AudioProperties,
	layout: Layout,
}

/// Parse `data` as `format`
pub(crate) fn parse(format: FileFormat, data: &[u8]) -> Result<ParsedFile> {
	let parsed = match format {
		FileFormat::Aac => aac::read(data),
		FileFormat::Aiff | FileFormat::Wav => iff::read(data),
		FileFormat::Ape => ape::read(data),
		FileFormat::Asf => asf::read(data),
		FileFormat::Flac => flac::read(data),
		FileFormat::Mp4 => mp4::read(data),
		FileFormat::Mpc => musepack::read(data),
		FileFormat::Mpeg => mpeg::read(data),
		FileFormat::Opus | FileFormat::Speex | FileFormat::Vorbis => ogg::read(data),
		FileFormat::Tta => tta::read(data),
	};

	parsed.map_err(|err| err.into_invalid_file(format))
}

/// Produce the full rewritten file image for `tag`
pub(crate) fn render(
	format: FileFormat,
	data: &[u8],
	layout: &Layout,
	tag: &Tag,
) -> Result<Vec<u8>> {
	match layout {
		Layout::Edge(edges) => {
			crate::layout::render_edges(data, edges, tag, format.primary_tag_type())
		},
		Layout::Flac(flac) => flac::render(data, flac, tag),
		Layout::Ogg(ogg) => ogg::render(data, ogg, tag),
		Layout::Mp4(mp4) => mp4::render(data, mp4, tag),
		Layout::Asf(asf) => asf::render(data, asf, tag),
		Layout::Iff(iff) => iff::render(data, iff, tag),
	}
}

impl TaggedFile {
	/// Open and parse the file at `path`
	///
	/// The format is sniffed from the content first; the extension is only a
	/// fallback, so a renamed file still resolves correctly.
	pub fn read(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let data = fs::read(path).map_err(|err| {
			log::debug!("cannot read {}: {err}", path.display());
			TagError::from(FileDecodingError::from_description("File is unreadable"))
		})?;

		let format = FileFormat::from_buffer(&data)
			.or_else(|| FileFormat::from_path(path))
			.ok_or_else(|| {
				TagError::from(FileDecodingError::from_description(
					"No format could be determined from the provided file",
				))
			})?;

		log::debug!("reading {} as {format:?}", path.display());
		let parsed = parse(format, &data)?;

		Ok(Self {
			path: path.to_path_buf(),
			format,
			data,
			tag: parsed.tag,
			properties: parsed.properties,
			layout: parsed.layout,
		})
	}

	/// The detected format
	pub fn format(&self) -> FileFormat {
		self.format
	}

	/// The path the file was opened from
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The full parsed tag
	pub fn tag(&self) -> &Tag {
		&self.tag
	}

	/// Mutable access to the full parsed tag
	///
	/// The standard accessors replace every value for their key; this is the
	/// way in for multi-valued edits.
	pub fn tag_mut(&mut self) -> &mut Tag {
		&mut self.tag
	}

	/// Replace the entire tag
	pub fn set_tag_contents(&mut self, tag: Tag) {
		self.tag = tag;
	}

	/// The stream properties, computed once at open
	pub fn properties(&self) -> &AudioProperties {
		&self.properties
	}

	/// The stream duration
	pub fn length(&self) -> Duration {
		self.properties.duration()
	}

	/// The average bitrate in kbps
	pub fn bitrate(&self) -> u32 {
		self.properties.bitrate()
	}

	/// The sample rate in Hz
	pub fn sample_rate(&self) -> u32 {
		self.properties.sample_rate()
	}

	/// The channel count
	pub fn channels(&self) -> u8 {
		self.properties.channels()
	}

	/// The first value stored for `name`, or `""` when the key is unset
	///
	/// Keys use the uppercase property-name form ("ALBUMARTIST",
	/// "CATALOGNUMBER"); well-known names map onto the same items the
	/// standard accessors use.
	pub fn get_tag(&self, name: &str) -> &str {
		let key = ItemKey::from_key(TagType::VorbisComments, name);
		self.tag.get_string(&key).unwrap_or_default()
	}

	/// Set `name` to `value`, replacing all existing values for the key
	///
	/// An empty value removes the key.
	pub fn set_tag(&mut self, name: &str, value: String) {
		let key = ItemKey::from_key(TagType::VorbisComments, name);
		self.tag.insert_text(key, value);
	}

	/// The first embedded picture
	pub fn picture(&self) -> Result<&Picture> {
		self.tag
			.pictures()
			.first()
			.ok_or_else(|| TagError::new(ErrorKind::NoPicture))
	}

	/// Replace all embedded pictures with `picture`
	pub fn set_picture(&mut self, picture: Picture) {
		self.tag.set_picture(picture);
	}

	/// Remove every embedded picture
	pub fn remove_pictures(&mut self) {
		self.tag.remove_pictures();
	}

	/// Write the current tag back to disk
	///
	/// Either the whole save succeeds or the file on disk is left untouched.
	/// The handle stays open and tracks the rewritten bytes afterwards.
	pub fn save(&mut self) -> Result<()> {
		let image = render(self.format, &self.data, &self.layout, &self.tag)
			.map_err(|err| err.into_save_failed(self.format))?;

		save::commit(&self.path, &self.data, &image, self.format)
			.map_err(|err| err.into_save_failed(self.format))?;

		// The old layout described the old bytes
		let parsed =
			parse(self.format, &image).map_err(|err| err.into_save_failed(self.format))?;
		self.layout = parsed.layout;
		self.data = image;

		Ok(())
	}

	/// Release the handle
	///
	/// Consuming `self` makes use-after-close unrepresentable.
	pub fn close(self) {}
}

impl fmt::Debug for TaggedFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TaggedFile")
			.field("path", &self.path)
			.field("format", &self.format)
			.field("properties", &self.properties)
			.field("tag", &self.tag)
			.finish_non_exhaustive()
	}
}

macro_rules! facade_accessor {
	($($name:ident => $key:ident;)+) => {
		paste::paste! {
			$(
				#[doc = "The " $name ", or `\"\"` when unset"]
				pub fn $name(&self) -> &str {
					self.tag.get_string(&ItemKey::$key).unwrap_or_default()
				}

				#[doc = "Sets the " $name ", replacing all existing values. An empty value removes it."]
				pub fn [<set_ $name>](&mut self, value: String) {
					self.tag.insert_text(ItemKey::$key, value);
				}
			)+
		}
	}
}

impl TaggedFile {
	facade_accessor! {
		title        => TrackTitle;
		artist       => TrackArtist;
		album        => AlbumTitle;
		album_artist => AlbumArtist;
		genre        => Genre;
		comment      => Comment;
	}

	/// The track number, or 0 when unset
	pub fn track(&self) -> u32 {
		self.tag.track().unwrap_or(0)
	}

	pub fn set_track(&mut self, value: u32) {
		self.tag.set_track(value);
	}

	/// The release year, or 0 when unset
	///
	/// An absent year and an explicit 0 both read as 0 here; the distinction
	/// survives in [`Tag::year`].
	pub fn year(&self) -> u32 {
		self.tag.year().unwrap_or(0)
	}

	pub fn set_year(&mut self, value: u32) {
		self.tag.set_year(value);
	}
}
