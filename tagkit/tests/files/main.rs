#![allow(missing_docs)]

mod flac;
mod mp4;
mod mpeg;
mod probe;
pub(crate) mod util;
mod wav;
