//! Reshapes derived playlists into the final manifest description: renditions
//! grouped by media type, with the per-rendition metadata a playlist consumer
//! needs to pick and play a stream.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::attributes::AttributeBag;
use crate::segment::{Playlist, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub width: f64,
    pub height: f64,
}

/// One playable rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendition {
    pub name: Option<String>,
    pub bandwidth: Option<f64>,
    pub codecs: Option<String>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<f64>,
    /// True when the segment list is complete (static presentation).
    pub end_list: bool,
    pub timeline: u64,
    /// Target segment duration in seconds.
    pub target_duration: f64,
    pub media_sequence: u64,
    pub segments: Vec<Segment>,
    pub content_protection: Option<AttributeBag>,
}

/// A labeled group of alternative renditions (one audio language/role, one
/// subtitle language).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaGroup {
    pub language: String,
    pub autoselect: bool,
    pub default: bool,
    pub playlists: Vec<Rendition>,
}

/// Full description of a parsed presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    /// Total source duration in seconds (0 for an unbounded live source).
    pub duration: f64,
    /// Refresh interval in milliseconds, when the source declares one.
    pub minimum_update_period: Option<f64>,
    pub video: Vec<Rendition>,
    pub audio: BTreeMap<String, MediaGroup>,
    pub subtitles: BTreeMap<String, MediaGroup>,
}

enum MediaKind {
    Video,
    Audio,
    Subtitles,
}

fn media_kind(attributes: &AttributeBag) -> Option<MediaKind> {
    let mime_type = attributes.string("mimeType").unwrap_or("");
    let content_type = attributes.string("contentType").unwrap_or("");

    if mime_type == "video/mp4" || content_type == "video" {
        Some(MediaKind::Video)
    } else if mime_type == "audio/mp4" || content_type == "audio" {
        Some(MediaKind::Audio)
    } else if mime_type == "text/vtt" || content_type == "text" {
        Some(MediaKind::Subtitles)
    } else {
        None
    }
}

// @frameRate is either a plain rate or a ratio such as 30000/1001
fn parse_frame_rate(value: &str) -> f64 {
    let (numerator, denominator) = value.split_once('/').unwrap_or((value, "1"));
    let numerator = numerator.trim().parse::<f64>().unwrap_or(f64::NAN);
    let denominator = denominator.trim().parse::<f64>().unwrap_or(f64::NAN);
    ((numerator / denominator) * 1000.0).round() / 1000.0
}

fn format_rendition(playlist: &Playlist) -> Rendition {
    let attributes = &playlist.attributes;
    let segments = playlist.segments.clone().unwrap_or_default();

    Rendition {
        name: attributes.string("id").map(str::to_string),
        bandwidth: attributes.number("bandwidth"),
        codecs: attributes.string("codecs").map(str::to_string),
        resolution: match (attributes.number("width"), attributes.number("height")) {
            (Some(width), Some(height)) => Some(Resolution { width, height }),
            _ => None,
        },
        frame_rate: attributes.string("frameRate").map(parse_frame_rate),
        end_list: attributes
            .string("type")
            .filter(|presentation_type| !presentation_type.is_empty())
            .unwrap_or("static")
            == "static",
        timeline: attributes.number("periodIndex").unwrap_or(0.0) as u64,
        target_duration: attributes.number("duration").unwrap_or(0.0),
        media_sequence: segments.first().map(|segment| segment.number).unwrap_or(1),
        content_protection: attributes.bag("contentProtection").cloned(),
        segments,
    }
}

fn format_subtitle_rendition(playlist: &Playlist) -> Rendition {
    let attributes = &playlist.attributes;
    let base_url = attributes.string("baseUrl").unwrap_or("").to_string();
    let source_duration = attributes.number("sourceDuration").unwrap_or(0.0);
    let timeline = attributes.number("periodIndex").unwrap_or(0.0) as u64;

    let (segments, target_duration) = match &playlist.segments {
        Some(segments) => (segments.clone(), attributes.number("duration").unwrap_or(0.0)),
        // subtitle tracks may be a single file addressed by a bare BaseURL
        None => (
            vec![Segment {
                uri: base_url.clone(),
                resolved_uri: base_url,
                byterange: None,
                duration: source_duration,
                time: 0.0,
                timeline,
                number: 0,
                map: None,
            }],
            source_duration,
        ),
    };

    Rendition {
        name: attributes.string("id").map(str::to_string),
        bandwidth: attributes.number("bandwidth"),
        codecs: None,
        resolution: None,
        frame_rate: None,
        end_list: attributes
            .string("type")
            .filter(|presentation_type| !presentation_type.is_empty())
            .unwrap_or("static")
            == "static",
        timeline,
        target_duration,
        media_sequence: segments.first().map(|segment| segment.number).unwrap_or(1),
        content_protection: None,
        segments,
    }
}

fn organize_audio(groups: &mut BTreeMap<String, MediaGroup>, playlist: &Playlist) {
    let attributes = &playlist.attributes;
    let role = attributes
        .bag("role")
        .and_then(|role| role.string("value"))
        .filter(|value| !value.is_empty())
        .unwrap_or("main")
        .to_string();
    let language = attributes.string("lang").unwrap_or("").to_string();
    let label = if language.is_empty() {
        "main".to_string()
    } else {
        format!("{language} ({role})")
    };

    // only the highest-bandwidth rendition per label survives
    if let Some(existing) = groups.get(&label) {
        let existing_bandwidth = existing
            .playlists
            .first()
            .and_then(|playlist| playlist.bandwidth)
            .unwrap_or(0.0);
        if existing_bandwidth > attributes.number("bandwidth").unwrap_or(0.0) {
            return;
        }
    }

    groups.insert(
        label,
        MediaGroup {
            language,
            autoselect: true,
            default: role == "main",
            playlists: vec![format_rendition(playlist)],
        },
    );
}

fn organize_subtitles(groups: &mut BTreeMap<String, MediaGroup>, playlist: &Playlist) {
    let label = playlist
        .attributes
        .string("lang")
        .unwrap_or("text")
        .to_string();

    // first rendition per language wins
    if groups.contains_key(&label) {
        return;
    }

    groups.insert(
        label.clone(),
        MediaGroup {
            language: label,
            autoselect: false,
            default: false,
            playlists: vec![format_subtitle_rendition(playlist)],
        },
    );
}

/// Groups derived playlists into the final manifest description.
pub fn to_manifest(playlists: Vec<Playlist>) -> Manifest {
    let Some(first) = playlists.first() else {
        return Manifest::default();
    };

    let mut manifest = Manifest {
        duration: first.attributes.number("sourceDuration").unwrap_or(0.0),
        minimum_update_period: first
            .attributes
            .number("minimumUpdatePeriod")
            .map(|seconds| seconds * 1000.0),
        ..Default::default()
    };

    for playlist in &playlists {
        match media_kind(&playlist.attributes) {
            Some(MediaKind::Video) => manifest.video.push(format_rendition(playlist)),
            Some(MediaKind::Audio) => organize_audio(&mut manifest.audio, playlist),
            Some(MediaKind::Subtitles) => organize_subtitles(&mut manifest.subtitles, playlist),
            None => {}
        }
    }

    manifest
}
