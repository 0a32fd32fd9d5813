use crate::util;

use tagkit::{ErrorKind, Picture, PictureType, TaggedFile};

// Enough of a PNG for signature sniffing
const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

#[test_log::test]
fn bare_file_has_no_picture() {
	let (_dir, path) = util::temp_file("audio.flac", &util::flac());

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.length().as_secs(), 10);

	let err = file.picture().unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::NoPicture));
}

#[test_log::test]
fn set_picture_replaces_all_pictures() {
	let (_dir, path) = util::temp_file("audio.flac", &util::flac());

	let mut file = TaggedFile::read(&path).unwrap();
	for _ in 0..2 {
		file.tag_mut().push_picture(Picture::new(
			PictureType::Other,
			None,
			None,
			PNG.to_vec(),
		));
	}
	file.save().unwrap();

	let mut file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.tag().pictures().len(), 2);

	let front = Picture::new(
		PictureType::CoverFront,
		None,
		Some(String::from("cover")),
		PNG.to_vec(),
	);
	file.set_picture(front);
	file.save().unwrap();

	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.tag().pictures().len(), 1);

	let picture = file.picture().unwrap();
	assert_eq!(picture.pic_type(), PictureType::CoverFront);
	assert_eq!(picture.description(), Some("cover"));
	assert_eq!(picture.data(), PNG);
}

#[test_log::test]
fn album_artist_is_sugar_over_get_tag() {
	let (_dir, path) = util::temp_file("audio.flac", &util::flac());

	let mut file = TaggedFile::read(&path).unwrap();
	file.set_tag("ALBUMARTIST", String::from("Various"));
	assert_eq!(file.album_artist(), "Various");

	file.save().unwrap();
	let file = TaggedFile::read(&path).unwrap();
	assert_eq!(file.album_artist(), "Various");
	assert_eq!(file.get_tag("ALBUMARTIST"), "Various");
}
