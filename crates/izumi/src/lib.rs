//! # DASH manifest flattening
//!
//! Parses an MPD document and flattens it into per-rendition segment lists in
//! an HLS-style shape: attribute bags cascade from the manifest root down to
//! each Representation, and whichever segment-description mechanism is in
//! effect there ([`SegmentTemplate`], [`SegmentList`] or [`SegmentBase`]) is
//! expanded into a concrete, numbered, timed sequence of segments — including
//! the live-window arithmetic for dynamic presentations.
//!
//! The engine is synchronous and performs no I/O. The manifest arrives as
//! text, the clock arrives as [`ParseOptions::now`], and the result is a
//! [`Manifest`] of renditions grouped by media type. Parsing the same text
//! with the same options always yields the same result.
//!
//! ```no_run
//! # fn run() -> izumi::IzumiResult<()> {
//! let manifest_text = std::fs::read_to_string("stream.mpd").unwrap();
//! let options = izumi::ParseOptions {
//!     manifest_uri: "https://cdn.example/stream.mpd".to_string(),
//!     ..Default::default()
//! };
//! let manifest = izumi::parse(&manifest_text, &options)?;
//! for rendition in &manifest.video {
//!     println!("{:?}: {} segments", rendition.name, rendition.segments.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`SegmentTemplate`]: segment::segments_from_template
//! [`SegmentList`]: segment::segments_from_list
//! [`SegmentBase`]: segment::segments_from_base

pub mod attributes;
pub mod drm;
pub mod error;
pub mod inherit;
pub mod playlist;
pub mod resolve;
pub mod segment;
pub mod template;
pub mod time;
pub mod utc_timing;
pub mod xml;

pub use error::{IzumiError, IzumiResult};
pub use playlist::{Manifest, MediaGroup, Rendition, Resolution};
pub use segment::{ByteRange, InitializationSegment, Playlist, Segment};
pub use utc_timing::{UtcTiming, UtcTimingMethod};

use chrono::Utc;

/// Options for one parse invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Location the manifest was fetched from; segment URLs resolve against
    /// it when the manifest declares no `BaseURL` of its own.
    pub manifest_uri: String,
    /// Wall clock in milliseconds since the epoch. Supplied explicitly so
    /// live-window results are reproducible.
    pub now: f64,
    /// Client clock offset from `now`, in milliseconds.
    pub client_offset: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            manifest_uri: String::new(),
            now: Utc::now().timestamp_millis() as f64,
            client_offset: 0.0,
        }
    }
}

/// Parses a manifest into renditions with fully derived segment lists.
pub fn parse(manifest: &str, options: &ParseOptions) -> IzumiResult<Manifest> {
    let mpd = xml::parse_manifest(manifest)?;
    let units = inherit::inherit_attributes(&mpd, options)?;
    let playlists = segment::to_playlists(&units)?;
    Ok(playlist::to_manifest(playlists))
}

/// Extracts the UTC timing declaration from a manifest, independent of the
/// main parse.
pub fn parse_utc_timing(manifest: &str) -> IzumiResult<Option<UtcTiming>> {
    let mpd = xml::parse_manifest(manifest)?;
    utc_timing::parse_utc_timing_scheme(&mpd)
}
