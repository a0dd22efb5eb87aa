//! `FrameSource` implementations for the rain predictor.
//!
//! - `rainviewer`: RainViewer index parsing and tile URLs; the blocking HTTP
//!   client is behind the `http` feature.
//! - `directory`: replay of recorded `<unix-seconds>.png` frames.
//! - `simulated`: a synthetic storm that needs no network.
pub mod decode;
pub mod directory;
pub mod error;
pub mod rainviewer;
pub mod simulated;

pub use decode::{decode_png, encode_png};
pub use directory::DirectorySource;
pub use error::SourceError;
#[cfg(feature = "http")]
pub use rainviewer::RainViewerSource;
pub use rainviewer::{TileOptions, parse_index, tile_extent, tile_url, zoom_to_cover};
pub use simulated::SimulatedStorm;
