//! The unified tag model
//!
//! Every format parses into a [`Tag`], and every format is written back out of
//! one. Between a read and a save the `Tag` is the single source of truth;
//! nothing re-touches the file.

mod item;

pub use item::{ItemKey, ItemValue, TagItem};

use crate::picture::Picture;

/// The tag containers the engine reads and writes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TagType {
	Ape,
	Asf,
	Id3v1,
	Id3v2,
	Mp4Ilst,
	VorbisComments,
}

macro_rules! impl_accessor {
	($($name:ident => $key:ident;)+) => {
		paste::paste! {
			$(
				#[doc = "Returns the " $name]
				pub fn $name(&self) -> Option<&str> {
					self.get_string(&ItemKey::$key)
				}

				#[doc = "Sets the " $name ", replacing all existing values"]
				pub fn [<set_ $name>](&mut self, value: String) {
					self.insert(TagItem::text(ItemKey::$key, value));
				}

				#[doc = "Removes the " $name]
				pub fn [<remove_ $name>](&mut self) {
					self.remove_key(&ItemKey::$key);
				}
			)+
		}
	}
}

/// A unified, format-agnostic tag
///
/// Multi-valued keys are stored as repeated items in their original order, so
/// a rewrite reproduces what was read. Unset fields are simply absent; an
/// empty string is never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tag {
	pub(crate) items: Vec<TagItem>,
	pub(crate) pictures: Vec<Picture>,
}

impl Tag {
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether the tag has no items and no pictures
	pub fn is_empty(&self) -> bool {
		self.items.is_empty() && self.pictures.is_empty()
	}

	pub fn items(&self) -> impl Iterator<Item = &TagItem> {
		self.items.iter()
	}

	/// The first item with the given key
	pub fn get(&self, key: &ItemKey) -> Option<&TagItem> {
		self.items.iter().find(|item| &item.key == key)
	}

	/// The first *textual* value for the given key
	pub fn get_string(&self, key: &ItemKey) -> Option<&str> {
		self.items
			.iter()
			.filter(|item| &item.key == key)
			.find_map(|item| item.value.text())
	}

	/// All textual values for the given key, in insertion order
	pub fn get_strings<'a>(&'a self, key: &'a ItemKey) -> impl Iterator<Item = &'a str> {
		self.items
			.iter()
			.filter(move |item| &item.key == key)
			.filter_map(|item| item.value.text())
	}

	/// Insert an item, replacing all existing values for its key
	pub fn insert(&mut self, item: TagItem) {
		self.remove_key(&item.key);
		self.items.push(item);
	}

	/// Insert a textual item, replacing all existing values for the key
	///
	/// An empty value removes the key instead; absent and empty are the same thing.
	pub fn insert_text(&mut self, key: ItemKey, value: String) {
		if value.is_empty() {
			self.remove_key(&key);
			return;
		}

		self.insert(TagItem::text(key, value));
	}

	/// Append an item, keeping existing values for its key
	pub fn push(&mut self, item: TagItem) {
		self.items.push(item);
	}

	/// Append a textual item unless the value is empty
	pub fn push_text(&mut self, key: ItemKey, value: String) {
		if value.is_empty() {
			return;
		}

		self.items.push(TagItem::text(key, value));
	}

	/// Remove all items with the given key
	pub fn remove_key(&mut self, key: &ItemKey) {
		self.items.retain(|item| &item.key != key);
	}

	pub fn pictures(&self) -> &[Picture] {
		&self.pictures
	}

	/// Append a picture
	pub fn push_picture(&mut self, picture: Picture) {
		self.pictures.push(picture);
	}

	/// Replace all pictures with the given one
	pub fn set_picture(&mut self, picture: Picture) {
		self.pictures.clear();
		self.pictures.push(picture);
	}

	pub fn remove_pictures(&mut self) {
		self.pictures.clear();
	}

	impl_accessor! {
		title        => TrackTitle;
		artist       => TrackArtist;
		album        => AlbumTitle;
		album_artist => AlbumArtist;
		genre        => Genre;
		comment      => Comment;
	}

	/// The track number
	pub fn track(&self) -> Option<u32> {
		self.get_string(&ItemKey::TrackNumber)
			.and_then(|t| t.parse().ok())
	}

	pub fn set_track(&mut self, value: u32) {
		self.insert_text(ItemKey::TrackNumber, value.to_string());
	}

	/// The release year
	///
	/// Falls back to the leading year of a full recording date.
	pub fn year(&self) -> Option<u32> {
		if let Some(year) = self.get_string(&ItemKey::Year) {
			if let Ok(year) = year.parse() {
				return Some(year);
			}
		}

		self.get_string(&ItemKey::RecordingDate)
			.and_then(|date| date.get(..4))
			.and_then(|year| year.parse().ok())
	}

	pub fn set_year(&mut self, value: u32) {
		self.insert_text(ItemKey::Year, value.to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::{ItemKey, ItemValue, Tag, TagItem};

	#[test_log::test]
	fn insert_replaces_all_values() {
		let mut tag = Tag::new();
		tag.push_text(ItemKey::TrackArtist, String::from("Foo"));
		tag.push_text(ItemKey::TrackArtist, String::from("Bar"));
		assert_eq!(tag.get_strings(&ItemKey::TrackArtist).count(), 2);

		tag.insert_text(ItemKey::TrackArtist, String::from("Baz"));
		assert_eq!(
			tag.get_strings(&ItemKey::TrackArtist).collect::<Vec<_>>(),
			["Baz"]
		);
	}

	#[test_log::test]
	fn empty_values_are_absent() {
		let mut tag = Tag::new();
		tag.insert_text(ItemKey::Comment, String::from("hi"));
		tag.insert_text(ItemKey::Comment, String::new());
		assert!(tag.get(&ItemKey::Comment).is_none());
		assert!(tag.is_empty());
	}

	#[test_log::test]
	fn year_falls_back_to_recording_date() {
		let mut tag = Tag::new();
		tag.insert_text(ItemKey::RecordingDate, String::from("2004-07-16"));
		assert_eq!(tag.year(), Some(2004));

		tag.set_year(1999);
		assert_eq!(tag.year(), Some(1999));
	}

	#[test_log::test]
	fn binary_values_are_not_text() {
		let mut tag = Tag::new();
		tag.push(TagItem::new(
			ItemKey::Unknown(String::from("UFID")),
			ItemValue::Binary(vec![0, 1, 2]),
		));
		assert!(
			tag.get_string(&ItemKey::Unknown(String::from("UFID")))
				.is_none()
		);
	}
}
