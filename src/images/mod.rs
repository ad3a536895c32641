//! Poster images: raw provider downloads and final composition.
//!
//! Raw posters are stored once per provider item by [`PosterStorage`];
//! [`PosterComposer`] turns a raw poster (or the fallback background) into
//! the branded image that gets posted.

mod canvas;
mod composer;
mod font;
mod storage;

pub use canvas::{apply_gradient, fallback_canvas, FALLBACK_HEIGHT};
pub use composer::{output_filename, subtitle_line, FittedTitle, PosterComposer};
pub use font::TextFace;
pub use storage::{PosterStorage, StoredPoster};
