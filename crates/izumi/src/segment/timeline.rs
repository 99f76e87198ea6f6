use crate::attributes::{AttributeBag, Value};

use super::SegmentTiming;

/// Expands an explicit `SegmentTimeline` into per-segment timing tuples.
///
/// A running time cursor tracks the presentation time in timescale units. An
/// entry whose explicit start time lies beyond the cursor is a discontinuity;
/// the policy here is to jump the cursor forward to the declared start time
/// without synthesizing filler segments (`advance_past_gap`).
pub fn parse_by_timeline(attributes: &AttributeBag, timeline: &[Value]) -> Vec<SegmentTiming> {
    let presentation_type = attributes.string("type").unwrap_or("static");
    let minimum_update_period = attributes.number_or("minimumUpdatePeriod", 0.0);
    let media = attributes.string("media").unwrap_or("");
    let source_duration = attributes.number("sourceDuration").unwrap_or(f64::NAN);
    let timescale = attributes.number_or("timescale", 1.0);
    let start_number = attributes.number_or("startNumber", 1.0);
    let timeline_index = attributes.number("periodIndex").unwrap_or(0.0) as u64;

    let mut segments: Vec<SegmentTiming> = Vec::new();
    let mut time = -1.0_f64;

    for (index, entry) in timeline.iter().enumerate() {
        let Some(entry) = entry.as_bag() else {
            continue;
        };

        let duration = entry.number("d").unwrap_or(f64::NAN);
        let repeat = entry.nonzero_number("r").unwrap_or(0.0);
        let segment_time = entry.nonzero_number("t").unwrap_or(0.0);

        if time < 0.0 {
            // first entry seeds the cursor
            time = segment_time;
        }

        if segment_time != 0.0 && segment_time > time {
            time = advance_past_gap(segment_time);
        }

        let count = if repeat < 0.0 {
            resolve_open_repeat(
                attributes,
                timeline,
                index,
                time,
                duration,
                presentation_type,
                minimum_update_period,
                media,
                source_duration,
                timescale,
            )
        } else {
            repeat + 1.0
        };

        // a fractional count still emits ceil(count) segments
        let first = start_number + segments.len() as f64;
        let end = first + count;
        let mut number = first;
        while number < end {
            segments.push(SegmentTiming {
                number: number as u64,
                duration: duration / timescale,
                time,
                timeline: timeline_index,
            });
            time += duration;
            number += 1.0;
        }
    }

    segments
}

/// Single decision point for the discontinuity-gap policy: the cursor jumps
/// to the declared start time and the skipped range is not represented.
fn advance_past_gap(declared_start: f64) -> f64 {
    declared_start
}

/// Resolves an open-ended repeat count (`r` < 0).
///
/// Anywhere but the last entry, the run extends to the next entry's start
/// time. On the last entry a live presentation extends to the live edge,
/// while anything else extends to the end of the source duration.
#[allow(clippy::too_many_arguments)]
fn resolve_open_repeat(
    attributes: &AttributeBag,
    timeline: &[Value],
    index: usize,
    time: f64,
    duration: f64,
    presentation_type: &str,
    minimum_update_period: f64,
    media: &str,
    source_duration: f64,
    timescale: f64,
) -> f64 {
    let next = index + 1;
    if next < timeline.len() {
        let next_start = timeline[next]
            .as_bag()
            .and_then(|entry| entry.number("t"))
            .unwrap_or(f64::NAN);
        return (next_start - time) / duration;
    }

    let numbered_media = media.find("$Number$").is_some_and(|position| position > 0);
    if presentation_type == "dynamic" && minimum_update_period > 0.0 && numbered_media {
        live_repeat_count(attributes, time, duration)
    } else {
        (source_duration * timescale - time) / duration
    }
}

/// Repeat count that reaches the live edge of a dynamic presentation: the
/// period is taken to end one update interval past the supplied wall clock.
fn live_repeat_count(attributes: &AttributeBag, time: f64, duration: f64) -> f64 {
    let now_ms = attributes.number("NOW").unwrap_or(f64::NAN);
    let client_offset = attributes.number("clientOffset").unwrap_or(f64::NAN);
    let availability_start_time = attributes.number("availabilityStartTime").unwrap_or(f64::NAN);
    let timescale = attributes.number_or("timescale", 1.0);
    let start = attributes.number_or("start", 0.0);
    let minimum_update_period = attributes.number_or("minimumUpdatePeriod", 0.0);

    let now = (now_ms + client_offset) / 1000.0;
    let period_start = availability_start_time + start;
    let period_end = now + minimum_update_period;
    let period_duration = period_end - period_start;

    ((period_duration * timescale - time) / duration).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeBag;

    fn entry(d: f64, r: Option<f64>, t: Option<f64>) -> Value {
        let mut bag = AttributeBag::new();
        bag.insert("d", Value::Number(d));
        if let Some(r) = r {
            bag.insert("r", Value::Number(r));
        }
        if let Some(t) = t {
            bag.insert("t", Value::Number(t));
        }
        Value::Bag(bag)
    }

    fn base_attributes() -> AttributeBag {
        let mut attributes = AttributeBag::new();
        attributes.insert("timescale", Value::Number(1.0));
        attributes.insert("startNumber", Value::Number(1.0));
        attributes.insert("periodIndex", Value::Number(0.0));
        attributes.insert("sourceDuration", Value::Number(0.0));
        attributes
    }

    #[test]
    fn test_repeat_expansion() {
        let timeline = vec![entry(2.0, Some(2.0), Some(0.0)), entry(3.0, None, None)];
        let segments = parse_by_timeline(&base_attributes(), &timeline);

        let numbers: Vec<u64> = segments.iter().map(|s| s.number).collect();
        let times: Vec<f64> = segments.iter().map(|s| s.time).collect();
        let durations: Vec<f64> = segments.iter().map(|s| s.duration).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(times, vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(durations, vec![2.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_timescale_division() {
        let mut attributes = base_attributes();
        attributes.insert("timescale", Value::Number(1000.0));
        let timeline = vec![entry(2000.0, Some(1.0), None)];

        let segments = parse_by_timeline(&attributes, &timeline);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].duration, 2.0);
        // time stays in timescale units for $Time$ substitution
        assert_eq!(segments[1].time, 2000.0);
    }

    #[test]
    fn jumps_forward_over_timeline_gap() {
        let timeline = vec![
            entry(1.0, Some(2.0), Some(0.0)),
            entry(1.0, None, Some(5.0)),
        ];
        let segments = parse_by_timeline(&base_attributes(), &timeline);

        let times: Vec<f64> = segments.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 5.0]);
        // numbering stays contiguous across the gap
        let numbers: Vec<u64> = segments.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_open_repeat_until_next_entry() {
        let timeline = vec![
            entry(1.0, Some(2.0), Some(0.0)),
            entry(1.0, Some(-1.0), None),
            entry(2.0, None, Some(10.0)),
        ];
        let segments = parse_by_timeline(&base_attributes(), &timeline);

        // 3 + 7 + 1: the open repeat fills [3, 10) with one-second segments
        assert_eq!(segments.len(), 11);
        assert_eq!(segments[9].time, 9.0);
        assert_eq!(segments[10].time, 10.0);
        assert_eq!(segments[10].duration, 2.0);
    }

    #[test]
    fn test_open_repeat_until_source_duration() {
        let mut attributes = base_attributes();
        attributes.insert("sourceDuration", Value::Number(10.0));
        let timeline = vec![entry(1.0, Some(2.0), Some(5.0)), entry(1.0, Some(-1.0), None)];

        let segments = parse_by_timeline(&attributes, &timeline);
        // cursor starts at 5; the open repeat fills the rest of the 10s source
        let times: Vec<f64> = segments.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_open_repeat_until_live_edge() {
        let mut attributes = base_attributes();
        attributes.insert("type", Value::String("dynamic".to_string()));
        attributes.insert("minimumUpdatePeriod", Value::Number(0.0));
        attributes.insert("media", Value::String("seg-$Number$.mp4".to_string()));
        attributes.insert("NOW", Value::Number(20_000.0));
        attributes.insert("clientOffset", Value::Number(0.0));
        attributes.insert("availabilityStartTime", Value::Number(0.0));
        attributes.insert("sourceDuration", Value::Number(3.0));

        let timeline = vec![entry(1.0, Some(-1.0), Some(0.0))];

        // without a positive update period the source duration bounds the run
        let segments = parse_by_timeline(&attributes, &timeline);
        assert_eq!(segments.len(), 3);

        // with one, the run extends to the live edge: now (20s) + update period (5s)
        attributes.insert("minimumUpdatePeriod", Value::Number(5.0));
        let segments = parse_by_timeline(&attributes, &timeline);
        assert_eq!(segments.len(), 25);
        assert_eq!(segments.first().unwrap().number, 1);
        assert_eq!(segments.last().unwrap().time, 24.0);
    }
}
