// crates/reelmux-core/src/lib.rs
//
// Pure data types shared between reelmux-fetcher (the decode engine) and any
// consumer (reelmux-cli, or a future curses renderer). No ffmpeg, no thread
// handles — just plain data, mirroring velocut-core/src/media_types.rs.

pub mod bitmap;
pub mod flags;
pub mod geometry;
pub mod media_type;

pub use bitmap::PixelBitmap;
pub use flags::FetcherFlags;
pub use geometry::{bound_dims, Dim2};
pub use media_type::MediaKind;
