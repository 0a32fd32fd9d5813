//! ID3v1 and ID3v2 tags

pub(crate) mod v1;
pub(crate) mod v2;
