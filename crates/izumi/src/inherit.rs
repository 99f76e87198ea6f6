//! Recursive descent over MPD → Period → AdaptationSet → Representation,
//! accumulating attributes, base URLs and segment descriptions on the way
//! down and fanning out into flat representation units at the bottom.

use crate::attributes::{merge, parse_attributes, AttributeBag, Value};
use crate::drm::key_system_information;
use crate::error::{IzumiError, IzumiResult};
use crate::resolve::build_base_urls;
use crate::xml::Element;
use crate::ParseOptions;

/// Segment description captured at one tree level: the mechanism bags
/// (`template` / `list` / `base`) plus the expanded `timeline` entries, each
/// present only when declared. Levels combine through [`merged`], with the
/// closer level's attributes taking precedence per mechanism.
///
/// [`merged`]: SegmentInformation::merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentInformation(AttributeBag);

impl SegmentInformation {
    pub fn template(&self) -> Option<&AttributeBag> {
        self.0.bag("template")
    }

    pub fn list(&self) -> Option<&AttributeBag> {
        self.0.bag("list")
    }

    pub fn base(&self) -> Option<&AttributeBag> {
        self.0.bag("base")
    }

    pub fn timeline(&self) -> Option<&[Value]> {
        self.0.list("timeline")
    }

    pub fn merged(&self, closer: &SegmentInformation) -> SegmentInformation {
        SegmentInformation(merge(&self.0, &closer.0))
    }
}

/// Flattened product of one Representation and one resolved base URL; the
/// unit of work for segment generation. Built once, consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationUnit {
    pub attributes: AttributeBag,
    pub segment_info: SegmentInformation,
}

/// Reads the segment description mechanisms declared directly under a node.
pub fn get_segment_information(node: &Element) -> SegmentInformation {
    let segment_template = node.find_child("SegmentTemplate");
    let segment_list = node.find_child("SegmentList");
    let segment_base = node.find_child("SegmentBase");

    let timeline_parent = segment_list.or(segment_template);
    let segment_timeline = timeline_parent.and_then(|parent| parent.find_child("SegmentTimeline"));

    let initialization_parent = segment_list.or(segment_base).or(segment_template);
    let segment_initialization =
        initialization_parent.and_then(|parent| parent.find_child("Initialization"));
    let initialization_attributes = segment_initialization
        .map(parse_attributes)
        .unwrap_or_default();

    let mut info = AttributeBag::new();

    if let Some(template_node) = segment_template {
        let mut template = parse_attributes(template_node);
        // @initialization is a templated string, while the <Initialization>
        // element carries an explicit URL and byte range. [DASH] leaves the
        // interaction between the two undefined; when both are present the
        // element wins, so the choice is at least deterministic.
        if segment_initialization.is_some() {
            template.insert("initialization", Value::Bag(initialization_attributes.clone()));
        } else if let Some(source_url) = template.string("initialization").map(str::to_string) {
            let mut initialization = AttributeBag::new();
            initialization.insert("sourceURL", Value::String(source_url));
            template.insert("initialization", Value::Bag(initialization));
        }
        info.insert("template", Value::Bag(template));
    }

    if let Some(timeline) = segment_timeline {
        let entries: Vec<Value> = timeline
            .children("S")
            .map(|s| Value::Bag(parse_attributes(s)))
            .collect();
        info.insert("timeline", Value::List(entries));
    }

    if let Some(list_node) = segment_list {
        let segment_urls: Vec<Value> = list_node
            .children("SegmentURL")
            .map(|segment_url| {
                let mut url = AttributeBag::new();
                url.insert("tag", Value::String("SegmentURL".to_string()));
                Value::Bag(merge(&url, &parse_attributes(segment_url)))
            })
            .collect();

        let mut list = parse_attributes(list_node);
        list.insert("segmentUrls", Value::List(segment_urls));
        list.insert("initialization", Value::Bag(initialization_attributes.clone()));
        info.insert("list", Value::Bag(list));
    }

    if let Some(base_node) = segment_base {
        let mut base = parse_attributes(base_node);
        base.insert("initialization", Value::Bag(initialization_attributes));
        info.insert("base", Value::Bag(base));
    }

    SegmentInformation(info)
}

/// Walks the manifest tree and returns one representation unit per
/// Representation × resolved-base-URL pair.
pub fn inherit_attributes(
    mpd: &Element,
    options: &ParseOptions,
) -> IzumiResult<Vec<RepresentationUnit>> {
    let periods: Vec<&Element> = mpd.children("Period").collect();
    // presentations with more than one period are out of scope; fail instead
    // of silently deriving the wrong timeline
    if periods.len() != 1 {
        return Err(IzumiError::InvalidPeriodCount(periods.len()));
    }

    let mut mpd_attributes = parse_attributes(mpd);
    let mpd_base_urls = build_base_urls(
        std::slice::from_ref(&options.manifest_uri),
        &mpd.children("BaseURL").collect::<Vec<_>>(),
    );

    let source_duration = mpd_attributes
        .nonzero_number("mediaPresentationDuration")
        .unwrap_or(0.0);
    mpd_attributes.insert("sourceDuration", Value::Number(source_duration));
    mpd_attributes.insert("NOW", Value::Number(options.now));
    mpd_attributes.insert("clientOffset", Value::Number(options.client_offset));

    let mut units = Vec::new();
    for (period_index, period) in periods.into_iter().enumerate() {
        walk_period(period, period_index, &mpd_attributes, &mpd_base_urls, &mut units);
    }

    tracing::debug!(units = units.len(), "flattened manifest into representation units");
    Ok(units)
}

fn walk_period(
    period: &Element,
    period_index: usize,
    mpd_attributes: &AttributeBag,
    mpd_base_urls: &[String],
    units: &mut Vec<RepresentationUnit>,
) {
    let period_base_urls =
        build_base_urls(mpd_base_urls, &period.children("BaseURL").collect::<Vec<_>>());
    let mut period_attributes = merge(mpd_attributes, &parse_attributes(period));
    period_attributes.insert("periodIndex", Value::Number(period_index as f64));
    let period_segment_info = get_segment_information(period);

    for adaptation_set in period.children("AdaptationSet") {
        walk_adaptation_set(
            adaptation_set,
            &period_attributes,
            &period_base_urls,
            &period_segment_info,
            units,
        );
    }
}

fn walk_adaptation_set(
    adaptation_set: &Element,
    period_attributes: &AttributeBag,
    period_base_urls: &[String],
    period_segment_info: &SegmentInformation,
    units: &mut Vec<RepresentationUnit>,
) {
    let adaptation_base_urls = build_base_urls(
        period_base_urls,
        &adaptation_set.children("BaseURL").collect::<Vec<_>>(),
    );

    let role = adaptation_set
        .find_child("Role")
        .map(parse_attributes)
        .unwrap_or_default();
    let mut attributes = merge(period_attributes, &parse_attributes(adaptation_set));
    attributes.insert("role", Value::Bag(role));

    let content_protection = key_system_information(
        &adaptation_set.children("ContentProtection").collect::<Vec<_>>(),
    );
    if !content_protection.is_empty() {
        attributes.insert("contentProtection", Value::Bag(content_protection));
    }

    let segment_info = period_segment_info.merged(&get_segment_information(adaptation_set));

    for representation in adaptation_set.children("Representation") {
        walk_representation(representation, &attributes, &adaptation_base_urls, &segment_info, units);
    }
}

fn walk_representation(
    representation: &Element,
    adaptation_attributes: &AttributeBag,
    adaptation_base_urls: &[String],
    adaptation_segment_info: &SegmentInformation,
    units: &mut Vec<RepresentationUnit>,
) {
    let representation_base_urls = build_base_urls(
        adaptation_base_urls,
        &representation.children("BaseURL").collect::<Vec<_>>(),
    );
    let attributes = merge(adaptation_attributes, &parse_attributes(representation));
    let segment_info = adaptation_segment_info.merged(&get_segment_information(representation));

    for base_url in representation_base_urls {
        let mut unit_attributes = attributes.clone();
        unit_attributes.insert("baseUrl", Value::String(base_url));
        units.push(RepresentationUnit {
            attributes: unit_attributes,
            segment_info: segment_info.clone(),
        });
    }
}
