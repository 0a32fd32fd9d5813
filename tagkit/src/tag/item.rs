use crate::tag::TagType;

macro_rules! first_key {
	($key:tt $(| $remaining:tt)*) => {
		$key
	};
}

macro_rules! first_value {
	($value:expr $(, $remaining:expr)*) => {
		$value
	};
}

// Creates the per-format key maps.
//
// Each entry maps one or more format-specific keys to one or more ItemKey
// variants. The standard key must come first in a '|' list, and the most
// applicable variant must come first on the right-hand side; lookups in
// either direction resolve to the first listed.
macro_rules! gen_map {
	(
		$NAME:ident;

		$(
			$($key:literal)|+ => $($variant:ident)|+
		),+ $(,)?
	) => {
		#[allow(non_camel_case_types)]
		struct $NAME;

		impl $NAME {
			pub(crate) fn get_item_key(&self, key: &str) -> Option<ItemKey> {
				$(
					if $(key.eq_ignore_ascii_case($key))||+ {
						return Some(first_value!($(ItemKey::$variant),+));
					}
				)+

				None
			}

			pub(crate) fn get_key(&self, item_key: &ItemKey) -> Option<&'static str> {
				match item_key {
					$(
						$(ItemKey::$variant)|+ => Some(first_key!($($key)|*)),
					)+
					_ => None,
				}
			}
		}
	}
}

gen_map!(
	ID3V2_MAP;

	"TALB"                                  => AlbumTitle,
	"TPE2" | "ALBUMARTIST" | "ALBUM ARTIST" => AlbumArtist,
	"TPE1"                                  => TrackArtist,
	"TIT2"                                  => TrackTitle,
	"TRCK"                                  => TrackNumber | TrackTotal,
	"TPOS"                                  => DiscNumber | DiscTotal,
	"TDRC"                                  => RecordingDate | Year,
	"COMM"                                  => Comment,
	"TCON"                                  => Genre,
	"TCOM"                                  => Composer,
	"TPE3"                                  => Conductor,
	"TPUB"                                  => Label,
	"TCOP"                                  => CopyrightMessage,
	"TENC"                                  => EncodedBy,
	"TSSE"                                  => EncoderSoftware,
	"USLT"                                  => Lyrics
);

gen_map!(
	VORBIS_MAP;

	"ALBUM"                     => AlbumTitle,
	"ALBUMARTIST" | "ALBUM ARTIST" => AlbumArtist,
	"ARTIST"                    => TrackArtist,
	"TITLE"                     => TrackTitle,
	"TRACKNUMBER"               => TrackNumber,
	"TRACKTOTAL" | "TOTALTRACKS" => TrackTotal,
	"DISCNUMBER"                => DiscNumber,
	"DISCTOTAL" | "TOTALDISCS"  => DiscTotal,
	"DATE"                      => RecordingDate,
	"YEAR"                      => Year,
	"COMMENT"                   => Comment,
	"GENRE"                     => Genre,
	"COMPOSER"                  => Composer,
	"CONDUCTOR"                 => Conductor,
	"LABEL" | "ORGANIZATION"    => Label,
	"COPYRIGHT"                 => CopyrightMessage,
	"ENCODEDBY" | "ENCODED-BY"  => EncodedBy,
	"ENCODER"                   => EncoderSoftware,
	"LYRICS"                    => Lyrics
);

gen_map!(
	APE_MAP;

	"Album"                        => AlbumTitle,
	"Album Artist" | "ALBUMARTIST" => AlbumArtist,
	"Artist"                       => TrackArtist,
	"Title"                        => TrackTitle,
	"Track"                        => TrackNumber | TrackTotal,
	"Disc"                         => DiscNumber | DiscTotal,
	// The ecosystem agreed on "Year", even for full date strings
	"Year"                         => RecordingDate | Year,
	"Comment"                      => Comment,
	"Genre"                        => Genre,
	"Composer"                     => Composer,
	"Conductor"                    => Conductor,
	"Label"                        => Label,
	"Copyright"                    => CopyrightMessage,
	"EncodedBy"                    => EncodedBy,
	"Encoder"                      => EncoderSoftware,
	"Lyrics"                       => Lyrics
);

gen_map!(
	ILST_MAP;

	"\u{a9}alb"                          => AlbumTitle,
	"aART"                               => AlbumArtist,
	"\u{a9}ART"                          => TrackArtist,
	"\u{a9}nam"                          => TrackTitle,
	"trkn"                               => TrackNumber | TrackTotal,
	"disk"                               => DiscNumber | DiscTotal,
	"\u{a9}day"                          => RecordingDate | Year,
	"\u{a9}cmt"                          => Comment,
	"\u{a9}gen"                          => Genre,
	"\u{a9}wrt"                          => Composer,
	"----:com.apple.iTunes:CONDUCTOR"    => Conductor,
	"----:com.apple.iTunes:LABEL"        => Label,
	"cprt"                               => CopyrightMessage,
	"\u{a9}enc"                          => EncodedBy,
	"\u{a9}too"                          => EncoderSoftware,
	"\u{a9}lyr"                          => Lyrics
);

gen_map!(
	ASF_MAP;

	"WM/AlbumTitle"  => AlbumTitle,
	"WM/AlbumArtist" => AlbumArtist,
	"Author"         => TrackArtist,
	"Title"          => TrackTitle,
	"WM/TrackNumber" => TrackNumber,
	"WM/PartOfSet"   => DiscNumber | DiscTotal,
	"WM/Year"        => RecordingDate | Year,
	"Description"    => Comment,
	"WM/Genre"       => Genre,
	"WM/Composer"    => Composer,
	"WM/Conductor"   => Conductor,
	"WM/Publisher"   => Label,
	"Copyright"      => CopyrightMessage,
	"WM/EncodedBy"   => EncodedBy,
	"WM/ToolName"    => EncoderSoftware,
	"WM/Lyrics"      => Lyrics
);

gen_map!(
	ID3V1_MAP;

	"Title"   => TrackTitle,
	"Artist"  => TrackArtist,
	"Album"   => AlbumTitle,
	"Year"    => Year,
	"Comment" => Comment,
	"Genre"   => Genre,
	"Track"   => TrackNumber
);

/// A format-agnostic item key
///
/// The well-known variants map to the right key in each tag container.
/// Everything else travels as [`ItemKey::Unknown`], holding the key verbatim
/// in its uppercase property-name form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ItemKey {
	AlbumTitle,
	AlbumArtist,
	TrackArtist,
	TrackTitle,
	TrackNumber,
	TrackTotal,
	DiscNumber,
	DiscTotal,
	Year,
	RecordingDate,
	Comment,
	Genre,
	Composer,
	Conductor,
	Label,
	CopyrightMessage,
	EncodedBy,
	EncoderSoftware,
	Lyrics,
	/// A key with no variant of its own
	Unknown(String),
}

impl ItemKey {
	/// Resolve a format-specific key into an `ItemKey`
	///
	/// Unrecognized keys become [`ItemKey::Unknown`], uppercased so that
	/// lookups behave the same regardless of the format they came from.
	pub fn from_key(tag_type: TagType, key: &str) -> Self {
		let mapped = match tag_type {
			TagType::Ape => APE_MAP.get_item_key(key),
			TagType::Asf => ASF_MAP.get_item_key(key),
			TagType::Id3v1 => ID3V1_MAP.get_item_key(key),
			TagType::Id3v2 => ID3V2_MAP.get_item_key(key),
			TagType::Mp4Ilst => ILST_MAP.get_item_key(key),
			TagType::VorbisComments => VORBIS_MAP.get_item_key(key),
		};

		match mapped {
			Some(item_key) => item_key,
			None => Self::Unknown(key.to_ascii_uppercase()),
		}
	}

	/// Map an `ItemKey` back to the format-specific key
	///
	/// Returns `None` when the format has no place for this key.
	pub fn map_key(&self, tag_type: TagType) -> Option<&str> {
		if let ItemKey::Unknown(unknown) = self {
			return Some(unknown);
		}

		match tag_type {
			TagType::Ape => APE_MAP.get_key(self),
			TagType::Asf => ASF_MAP.get_key(self),
			TagType::Id3v1 => ID3V1_MAP.get_key(self),
			TagType::Id3v2 => ID3V2_MAP.get_key(self),
			TagType::Mp4Ilst => ILST_MAP.get_key(self),
			TagType::VorbisComments => VORBIS_MAP.get_key(self),
		}
	}
}

/// The value of a [`TagItem`](crate::tag::TagItem)
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemValue {
	/// A UTF-8 string
	Text(String),
	/// A URL or file reference
	Locator(String),
	/// Raw bytes, e.g. an unrecognized ID3v2 frame carried for round-trip fidelity
	Binary(Vec<u8>),
}

impl ItemValue {
	/// The value as text, if it is textual
	pub fn text(&self) -> Option<&str> {
		match self {
			Self::Text(text) | Self::Locator(text) => Some(text),
			Self::Binary(_) => None,
		}
	}

	pub(crate) fn into_string(self) -> Option<String> {
		match self {
			Self::Text(text) | Self::Locator(text) => Some(text),
			Self::Binary(_) => None,
		}
	}
}

/// A single key/value entry of a [`Tag`](crate::tag::Tag)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagItem {
	pub(crate) key: ItemKey,
	pub(crate) value: ItemValue,
}

impl TagItem {
	pub fn new(key: ItemKey, value: ItemValue) -> Self {
		Self { key, value }
	}

	pub fn text(key: ItemKey, text: impl Into<String>) -> Self {
		Self {
			key,
			value: ItemValue::Text(text.into()),
		}
	}

	pub fn key(&self) -> &ItemKey {
		&self.key
	}

	pub fn value(&self) -> &ItemValue {
		&self.value
	}

	pub fn into_value(self) -> ItemValue {
		self.value
	}
}

#[cfg(test)]
mod tests {
	use super::ItemKey;
	use crate::tag::TagType;

	#[test_log::test]
	fn key_lookup_is_case_insensitive() {
		assert_eq!(
			ItemKey::from_key(TagType::VorbisComments, "artist"),
			ItemKey::TrackArtist
		);
		assert_eq!(
			ItemKey::from_key(TagType::Ape, "album artist"),
			ItemKey::AlbumArtist
		);
	}

	#[test_log::test]
	fn multi_mapped_keys_resolve_to_first() {
		assert_eq!(
			ItemKey::from_key(TagType::Id3v2, "TRCK"),
			ItemKey::TrackNumber
		);
		assert_eq!(
			ItemKey::TrackTotal.map_key(TagType::Id3v2),
			Some("TRCK")
		);
	}

	#[test_log::test]
	fn unknown_keys_are_uppercased() {
		let key = ItemKey::from_key(TagType::VorbisComments, "CatalogNumber");
		assert_eq!(key, ItemKey::Unknown(String::from("CATALOGNUMBER")));
		assert_eq!(key.map_key(TagType::VorbisComments), Some("CATALOGNUMBER"));
	}

	#[test_log::test]
	fn formats_without_a_key_mapping() {
		// ASF has no dedicated total-tracks attribute
		assert_eq!(ItemKey::TrackTotal.map_key(TagType::Asf), None);
	}
}
