//! Turns a flattened representation unit into its concrete segment list,
//! dispatching on whichever segment-description mechanism the manifest
//! declared for it.

use serde::Serialize;

use crate::attributes::{lenient_int, merge, AttributeBag, Value};
use crate::error::{IzumiError, IzumiResult};
use crate::inherit::RepresentationUnit;
use crate::resolve::resolve_url;
use crate::template::{construct_template_url, TemplateValues};

pub mod duration;
pub mod timeline;

pub use duration::parse_by_duration;
pub use timeline::parse_by_timeline;

/// Single contiguous byte range, expressed as offset plus length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Timing tuple produced by the enumerators before any URL is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTiming {
    pub number: u64,
    /// Duration in seconds.
    pub duration: f64,
    /// Start time in timescale units.
    pub time: f64,
    pub timeline: u64,
}

/// Initialization segment reference shared by every media segment of a
/// rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializationSegment {
    pub uri: String,
    pub resolved_uri: String,
    pub byterange: Option<ByteRange>,
}

/// One playable media segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub uri: String,
    pub resolved_uri: String,
    pub byterange: Option<ByteRange>,
    /// Duration in seconds.
    pub duration: f64,
    /// Start time in timescale units.
    pub time: f64,
    pub timeline: u64,
    pub number: u64,
    pub map: Option<InitializationSegment>,
}

/// A rendition's attribute bag plus its derived segments. `segments` is
/// `None` when the representation declared no segment mechanism at all
/// (a bare `BaseURL` subtitle track, for instance).
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub attributes: AttributeBag,
    pub segments: Option<Vec<Segment>>,
}

struct UrlType {
    uri: String,
    resolved_uri: String,
    byterange: Option<ByteRange>,
}

impl UrlType {
    fn into_map(self) -> InitializationSegment {
        InitializationSegment {
            uri: self.uri,
            resolved_uri: self.resolved_uri,
            byterange: self.byterange,
        }
    }
}

fn url_type_to_segment(base_url: &str, source: &str, range: &str) -> UrlType {
    UrlType {
        uri: source.to_string(),
        resolved_uri: resolve_url(base_url, source),
        byterange: parse_byte_range(range),
    }
}

fn parse_byte_range(range: &str) -> Option<ByteRange> {
    if range.is_empty() {
        return None;
    }
    let (start, end) = range.split_once('-')?;
    let offset = lenient_int(start);
    let end = lenient_int(end);
    if offset.is_nan() || end.is_nan() {
        return None;
    }
    Some(ByteRange {
        offset: offset as u64,
        length: (end - offset) as u64,
    })
}

fn initialization_url_type(attributes: &AttributeBag, base_url: &str) -> UrlType {
    let initialization = attributes.bag("initialization");
    let source = initialization
        .and_then(|init| init.string("sourceURL"))
        .unwrap_or("");
    let range = initialization
        .and_then(|init| init.string("range"))
        .unwrap_or("");
    url_type_to_segment(base_url, source, range)
}

/// Generates segments from a `SegmentTemplate` description: the
/// initialization reference is templated once with the rendition identity,
/// then each enumerated tuple fills in `Number` and `Time`.
pub fn segments_from_template(
    attributes: &AttributeBag,
    timeline: Option<&[Value]>,
) -> Vec<Segment> {
    let mut values = TemplateValues::new();
    if let Some(id) = attributes.string("id") {
        values.insert(TemplateValues::REPRESENTATION_ID, id.to_string());
    }
    values.insert(
        TemplateValues::BANDWIDTH,
        attributes.nonzero_number("bandwidth").unwrap_or(0.0).to_string(),
    );

    let base_url = attributes.string("baseUrl").unwrap_or("");
    let initialization = attributes.bag("initialization");
    let init_source = initialization
        .and_then(|init| init.string("sourceURL"))
        .unwrap_or("");
    let init_range = initialization
        .and_then(|init| init.string("range"))
        .unwrap_or("");
    let map = url_type_to_segment(
        base_url,
        &construct_template_url(init_source, &values),
        init_range,
    )
    .into_map();

    let media = attributes.string("media").unwrap_or("");

    let mut segments = Vec::new();
    for timing in parse_template_info(attributes, timeline) {
        values.insert(TemplateValues::NUMBER, timing.number.to_string());
        values.insert(TemplateValues::TIME, timing.time.to_string());

        let uri = construct_template_url(media, &values);
        segments.push(Segment {
            resolved_uri: resolve_url(base_url, &uri),
            uri,
            byterange: None,
            duration: timing.duration,
            time: timing.time,
            timeline: timing.timeline,
            number: timing.number,
            map: Some(map.clone()),
        });
    }
    segments
}

/// Picks the timing source for a template: a constant duration, an explicit
/// timeline, or, with neither present, exactly one segment spanning the
/// whole source.
fn parse_template_info(attributes: &AttributeBag, timeline: Option<&[Value]>) -> Vec<SegmentTiming> {
    let duration = attributes.nonzero_number("duration");

    if duration.is_none() && timeline.is_none() {
        return vec![SegmentTiming {
            number: attributes.nonzero_number("startNumber").unwrap_or(1.0) as u64,
            duration: attributes.number("sourceDuration").unwrap_or(0.0),
            time: 0.0,
            timeline: attributes.number("periodIndex").unwrap_or(0.0) as u64,
        }];
    }

    if duration.is_some() {
        return parse_by_duration(attributes);
    }

    parse_by_timeline(attributes, timeline.unwrap_or(&[]))
}

/// Generates the single segment described by a `SegmentBase`: the rendition
/// is one indexed blob at the base URL.
pub fn segments_from_base(attributes: &AttributeBag) -> IzumiResult<Vec<Segment>> {
    let base_url = attributes
        .string("baseUrl")
        .filter(|url| !url.is_empty())
        .ok_or(IzumiError::NoBaseUrl)?;

    let map = initialization_url_type(attributes, base_url).into_map();
    let index_range = attributes.string("indexRange").unwrap_or("");
    let seed = url_type_to_segment(base_url, base_url, index_range);

    let mut segment = Segment {
        uri: seed.uri,
        resolved_uri: seed.resolved_uri,
        byterange: seed.byterange,
        duration: 0.0,
        time: 0.0,
        timeline: 0,
        number: 0,
        map: Some(map),
    };

    if attributes.nonzero_number("duration").is_some() {
        let timings = parse_by_duration(attributes);
        if let Some(first) = timings.first() {
            segment.duration = first.duration;
            segment.timeline = first.timeline;
        }
    } else if let Some(source_duration) = attributes.nonzero_number("sourceDuration") {
        let timescale = attributes.number_or("timescale", 1.0);
        segment.duration = source_duration / timescale;
        segment.timeline = 0;
    }

    Ok(vec![segment])
}

/// Generates segments from a `SegmentList` description, pairing each declared
/// `SegmentURL` positionally with an enumerated timing tuple. The enumerator
/// may legitimately over-produce at the tail; tuples without a matching URL
/// are dropped.
pub fn segments_from_list(
    attributes: &AttributeBag,
    timeline: Option<&[Value]>,
) -> IzumiResult<Vec<Segment>> {
    let duration = attributes.nonzero_number("duration");

    // with neither declared the segment timing is undeterminable, and
    // declaring both is disallowed ([DASH] 5.3.9.2.1)
    if duration.is_some() == timeline.is_some() {
        return Err(IzumiError::MissingSegmentTiming);
    }

    let base_url = attributes.string("baseUrl").unwrap_or("");
    let map = initialization_url_type(attributes, base_url).into_map();

    let seeds: Vec<UrlType> = attributes
        .list("segmentUrls")
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_bag)
        .map(|segment_url| {
            url_type_to_segment(
                base_url,
                segment_url.string("media").unwrap_or(""),
                segment_url.string("mediaRange").unwrap_or(""),
            )
        })
        .collect();

    let timings = if duration.is_some() {
        parse_by_duration(attributes)
    } else {
        parse_by_timeline(attributes, timeline.unwrap_or(&[]))
    };

    Ok(timings
        .into_iter()
        .zip(seeds)
        .map(|(timing, seed)| Segment {
            uri: seed.uri,
            resolved_uri: seed.resolved_uri,
            byterange: seed.byterange,
            duration: timing.duration,
            time: timing.time,
            timeline: timing.timeline,
            number: timing.number,
            map: Some(map.clone()),
        })
        .collect())
}

/// Derives the segment list for one representation unit and normalizes its
/// target duration to seconds.
pub fn generate_segments(unit: &RepresentationUnit) -> IzumiResult<Playlist> {
    let info = &unit.segment_info;

    let (mut attributes, segments) = if let Some(template) = info.template() {
        let merged = merge(&unit.attributes, template);
        let segments = segments_from_template(&merged, info.timeline());
        (merged, segments)
    } else if let Some(base) = info.base() {
        let merged = merge(&unit.attributes, base);
        let segments = segments_from_base(&merged)?;
        (merged, segments)
    } else if let Some(list) = info.list() {
        let merged = merge(&unit.attributes, list);
        let segments = segments_from_list(&merged, info.timeline())?;
        (merged, segments)
    } else {
        return Ok(Playlist {
            attributes: unit.attributes.clone(),
            segments: None,
        });
    };

    // @duration arrives in timescale units; from here on it is the rendition's
    // target duration and must be in seconds
    if let Some(duration) = attributes.nonzero_number("duration") {
        let timescale = attributes.number_or("timescale", 1.0);
        attributes.insert("duration", Value::Number(duration / timescale));
    } else if !segments.is_empty() {
        let target = segments.iter().fold(0.0_f64, |max, segment| {
            let rounded = segment.duration.ceil();
            if rounded.is_nan() || max.is_nan() {
                f64::NAN
            } else {
                max.max(rounded)
            }
        });
        attributes.insert("duration", Value::Number(target));
    } else {
        attributes.insert("duration", Value::Number(0.0));
    }

    Ok(Playlist {
        attributes,
        segments: Some(segments),
    })
}

/// Runs every representation unit through segment generation.
pub fn to_playlists(units: &[RepresentationUnit]) -> IzumiResult<Vec<Playlist>> {
    units.iter().map(generate_segments).collect()
}
