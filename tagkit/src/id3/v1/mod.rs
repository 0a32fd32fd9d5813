//! ID3v1
//!
//! The fixed 128-byte trailer. It only exists to stay in sync with the richer
//! tags; it is never the primary container and is never created from scratch.

use crate::tag::{ItemKey, Tag};
use crate::util::text::latin1_decode;

use std::ops::Range;

/// The ID3v1 (and ID3v2 TCON) genre list
#[rustfmt::skip]
pub(crate) const GENRES: [&str; 148] = [
	"Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
	"Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap",
	"Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks",
	"Soundtrack", "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
	"Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
	"AlternRock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
	"Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
	"Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
	"Native American", "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes", "Trailer", "Lo-Fi",
	"Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
	"Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion", "Bebob", "Latin", "Revival",
	"Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock",
	"Big Band", "Chorus", "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera",
	"Chamber Music", "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam",
	"Club", "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle",
	"Duet", "Punk Rock", "Drum Solo", "A capella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
	"Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Negerpunk", "Polsk Punk", "Beat",
	"Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian", "Christian Rock", "Merengue", "Salsa",
	"Thrash Metal", "Anime", "Jpop", "Synthpop",
];

/// Locate a trailing ID3v1 tag
pub(crate) fn find(data: &[u8]) -> Option<Range<usize>> {
	if data.len() < 128 {
		return None;
	}

	let start = data.len() - 128;
	if &data[start..start + 3] == b"TAG" {
		return Some(start..data.len());
	}

	None
}

fn field(bytes: &[u8]) -> Option<String> {
	let text = latin1_decode(bytes);
	let trimmed = text.trim_end_matches([' ', '\0']);

	if trimmed.is_empty() {
		return None;
	}

	Some(trimmed.to_string())
}

/// Merge a 128-byte ID3v1 frame into `tag`, filling in only the missing keys
///
/// Richer containers always win; ID3v1 can never overwrite them.
pub(crate) fn merge_into(frame: &[u8], tag: &mut Tag) {
	debug_assert!(frame.len() == 128 && &frame[..3] == b"TAG");

	let mut fill = |key: ItemKey, value: Option<String>| {
		if tag.get(&key).is_none() {
			if let Some(value) = value {
				tag.push_text(key, value);
			}
		}
	};

	fill(ItemKey::TrackTitle, field(&frame[3..33]));
	fill(ItemKey::TrackArtist, field(&frame[33..63]));
	fill(ItemKey::AlbumTitle, field(&frame[63..93]));
	fill(ItemKey::Year, field(&frame[93..97]));

	// ID3v1.1 steals the last comment byte for the track number
	if frame[125] == 0 && frame[126] != 0 {
		fill(ItemKey::Comment, field(&frame[97..125]));
		fill(ItemKey::TrackNumber, Some(frame[126].to_string()));
	} else {
		fill(ItemKey::Comment, field(&frame[97..127]));
	}

	let genre_index = frame[127];
	if let Some(genre) = GENRES.get(usize::from(genre_index)) {
		fill(ItemKey::Genre, Some((*genre).to_string()));
	}
}

fn put(frame: &mut [u8], value: Option<&str>) {
	let Some(value) = value else { return };

	for (slot, byte) in frame.iter_mut().zip(
		value
			.chars()
			.map(|c| if (c as u32) <= 255 { c as u8 } else { b'?' }),
	) {
		*slot = byte;
	}
}

/// Render `tag` as a 128-byte ID3v1.1 frame
///
/// Everything that does not fit Latin-1, 30 bytes, or the fixed genre list is
/// truncated or substituted; the full values live in the primary tag.
pub(crate) fn render(tag: &Tag) -> [u8; 128] {
	let mut frame = [0u8; 128];
	frame[..3].copy_from_slice(b"TAG");

	put(&mut frame[3..33], tag.title());
	put(&mut frame[33..63], tag.artist());
	put(&mut frame[63..93], tag.album());
	if let Some(year) = tag.year() {
		put(&mut frame[93..97], Some(&year.to_string()));
	}
	put(&mut frame[97..125], tag.comment());

	if let Some(track) = tag.track() {
		if track <= u32::from(u8::MAX) {
			frame[126] = track as u8;
		}
	}

	frame[127] = match tag.genre() {
		Some(genre) => GENRES
			.iter()
			.position(|g| g.eq_ignore_ascii_case(genre))
			.map_or(255, |i| i as u8),
		None => 255,
	};

	frame
}

#[cfg(test)]
mod tests {
	use crate::tag::{ItemKey, Tag};

	#[test_log::test]
	fn v1_round_trip() {
		let mut tag = Tag::new();
		tag.set_title(String::from("Title"));
		tag.set_artist(String::from("Artist"));
		tag.set_album(String::from("Album"));
		tag.set_year(1986);
		tag.set_comment(String::from("a comment"));
		tag.set_track(7);
		tag.set_genre(String::from("Jazz"));

		let frame = super::render(&tag);
		assert_eq!(&frame[..3], b"TAG");

		let mut parsed = Tag::new();
		super::merge_into(&frame, &mut parsed);
		assert_eq!(parsed.title(), Some("Title"));
		assert_eq!(parsed.artist(), Some("Artist"));
		assert_eq!(parsed.album(), Some("Album"));
		assert_eq!(parsed.year(), Some(1986));
		assert_eq!(parsed.comment(), Some("a comment"));
		assert_eq!(parsed.track(), Some(7));
		assert_eq!(parsed.genre(), Some("Jazz"));
	}

	#[test_log::test]
	fn merge_never_overwrites() {
		let mut v1_only = Tag::new();
		v1_only.set_title(String::from("From v1"));
		let frame = super::render(&v1_only);

		let mut tag = Tag::new();
		tag.set_title(String::from("From v2"));
		super::merge_into(&frame, &mut tag);
		assert_eq!(tag.title(), Some("From v2"));
	}

	#[test_log::test]
	fn unknown_genre_is_absent() {
		let mut tag = Tag::new();
		tag.set_title(String::from("x"));
		let frame = super::render(&tag);
		assert_eq!(frame[127], 255);

		let mut parsed = Tag::new();
		super::merge_into(&frame, &mut parsed);
		assert!(parsed.get(&ItemKey::Genre).is_none());
	}
}
