//! ID3v2
//!
//! v2.2, v2.3, and v2.4 tags are read; tags are always written back as v2.4
//! with UTF-8 text and no unsynchronisation.

pub(crate) mod header;
pub(crate) mod read;
pub(crate) mod synchsafe;
pub(crate) mod write;
