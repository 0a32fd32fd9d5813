//! The atomic save engine
//!
//! A save either fully succeeds or leaves the file on disk untouched. When the
//! rewritten image is the same size as the original, only the span that
//! actually changed is overwritten in place. Any size change goes through a
//! temporary file in the same directory, which is flushed, re-parsed as a
//! sanity check, and then renamed over the original.

use crate::error::Result;
use crate::file;
use crate::probe::FileFormat;

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Put `image` on disk at `path`, which currently holds `original`
pub(crate) fn commit(path: &Path, original: &[u8], image: &[u8], format: FileFormat) -> Result<()> {
	if original.len() == image.len() {
		return overwrite_changed_span(path, original, image);
	}

	replace(path, image, format)
}

// Equal-size rewrites touch only the bytes that differ, which for a typical
// padded ID3v2 edit is just the tag region at the front of the file.
fn overwrite_changed_span(path: &Path, original: &[u8], image: &[u8]) -> Result<()> {
	let Some(start) = original
		.iter()
		.zip(image)
		.position(|(old, new)| old != new)
	else {
		log::debug!("save produced an identical image, nothing to write");
		return Ok(());
	};

	let end = original
		.iter()
		.zip(image)
		.rposition(|(old, new)| old != new)
		.unwrap_or(start)
		+ 1;

	log::debug!("overwriting {} changed bytes in place", end - start);

	let mut target = OpenOptions::new().write(true).open(path)?;
	target.seek(SeekFrom::Start(start as u64))?;
	target.write_all(&image[start..end])?;
	target.sync_all()?;

	Ok(())
}

fn replace(path: &Path, image: &[u8], format: FileFormat) -> Result<()> {
	// The temporary lives next to the target so the final rename never
	// crosses a filesystem boundary.
	let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
	let mut temp = NamedTempFile::new_in(parent.unwrap_or(Path::new(".")))?;

	temp.write_all(image)?;
	temp.flush()?;
	temp.as_file().sync_all()?;

	// The original must survive a botched re-encode, so the new image has to
	// parse before it is allowed to take the original's place.
	file::parse(format, image)?;

	log::debug!("replacing {} with a {} byte rewrite", path.display(), image.len());
	temp.persist(path).map_err(|err| err.error)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::probe::FileFormat;

	use std::fs;

	#[test_log::test]
	fn equal_size_saves_stay_in_place() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("audio.bin");

		let original = vec![0u8; 64];
		let mut image = original.clone();
		image[10..14].copy_from_slice(b"edit");

		fs::write(&path, &original).unwrap();
		super::commit(&path, &original, &image, FileFormat::Mpeg).unwrap();

		assert_eq!(fs::read(&path).unwrap(), image);
	}

	#[test_log::test]
	fn unparseable_rewrite_leaves_the_original_alone() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("audio.flac");

		let original = vec![0x11u8; 32];
		fs::write(&path, &original).unwrap();

		// A garbage image of a different size forces the temp-file path,
		// where the verification re-parse rejects it.
		let image = vec![0x22u8; 48];
		assert!(super::commit(&path, &original, &image, FileFormat::Flac).is_err());
		assert_eq!(fs::read(&path).unwrap(), original);
	}
}
