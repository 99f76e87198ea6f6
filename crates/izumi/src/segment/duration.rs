use crate::attributes::AttributeBag;

use super::SegmentTiming;

/// Entire range of segment indices for a static presentation.
fn segment_range_static(attributes: &AttributeBag) -> (f64, f64) {
    let duration = attributes.number("duration").unwrap_or(f64::NAN);
    let timescale = attributes.number_or("timescale", 1.0);
    let source_duration = attributes.number("sourceDuration").unwrap_or(f64::NAN);

    (0.0, (source_duration / (duration / timescale)).ceil())
}

/// Segment indices currently available in the live window of a dynamic
/// presentation. Indices below the window have expired out of the time-shift
/// buffer; indices above it do not exist yet.
fn segment_range_dynamic(attributes: &AttributeBag) -> (f64, f64) {
    let now_ms = attributes.number("NOW").unwrap_or(f64::NAN);
    let client_offset = attributes.number("clientOffset").unwrap_or(f64::NAN);
    let availability_start_time = attributes.number("availabilityStartTime").unwrap_or(f64::NAN);
    let timescale = attributes.number_or("timescale", 1.0);
    let duration = attributes.number("duration").unwrap_or(f64::NAN);
    let start = attributes.number_or("start", 0.0);
    let minimum_update_period = attributes.number_or("minimumUpdatePeriod", 0.0);
    let time_shift_buffer_depth = attributes.number_or("timeShiftBufferDepth", f64::INFINITY);

    let now = (now_ms + client_offset) / 1000.0;
    let period_start = availability_start_time + start;
    let period_end = now + minimum_update_period;
    let period_duration = period_end - period_start;

    let segment_count = (period_duration * timescale / duration).ceil();
    let available_start =
        ((now - period_start - time_shift_buffer_depth) * timescale / duration).floor();
    let available_end = ((now - period_start) * timescale / duration).floor();

    (available_start.max(0.0), available_end.min(segment_count))
}

/// Derives per-segment timing tuples from a constant segment duration.
///
/// The static range covers the whole source; the dynamic range is clamped to
/// the live window. For static presentations the final segment is shortened
/// to consume the source duration exactly.
pub fn parse_by_duration(attributes: &AttributeBag) -> Vec<SegmentTiming> {
    let presentation_type = attributes.string("type").unwrap_or("static");
    let duration = attributes.number("duration").unwrap_or(f64::NAN);
    let timescale = attributes.number_or("timescale", 1.0);
    let source_duration = attributes.number("sourceDuration").unwrap_or(f64::NAN);
    let start_number = attributes.number_or("startNumber", 1.0);
    let timeline_index = attributes.number("periodIndex").unwrap_or(0.0) as u64;

    let (range_start, range_end) = if presentation_type == "dynamic" {
        segment_range_dynamic(attributes)
    } else {
        segment_range_static(attributes)
    };

    let mut segments: Vec<SegmentTiming> = Vec::new();
    let mut number = range_start;
    let mut index = 0.0_f64;
    while number < range_end {
        segments.push(SegmentTiming {
            number: (start_number + number) as u64,
            duration: duration / timescale,
            time: index * duration,
            timeline: timeline_index,
        });
        number += 1.0;
        index += 1.0;
    }

    if presentation_type == "static" {
        if let Some(last_index) = segments.len().checked_sub(1) {
            // the final segment absorbs the rounding remainder
            segments[last_index].duration =
                source_duration - (duration / timescale) * last_index as f64;
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Value;

    fn static_attributes(duration: f64, timescale: f64, source_duration: f64) -> AttributeBag {
        let mut attributes = AttributeBag::new();
        attributes.insert("duration", Value::Number(duration));
        attributes.insert("timescale", Value::Number(timescale));
        attributes.insert("sourceDuration", Value::Number(source_duration));
        attributes.insert("startNumber", Value::Number(1.0));
        attributes.insert("periodIndex", Value::Number(0.0));
        attributes
    }

    #[test]
    fn test_static_segment_count_and_remainder() {
        let segments = parse_by_duration(&static_attributes(2.0, 1.0, 7.0));

        assert_eq!(segments.len(), 4);
        let numbers: Vec<u64> = segments.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        // 2 + 2 + 2 + 1 == 7, the last segment is shortened
        assert_eq!(segments[3].duration, 1.0);
        assert_eq!(segments.iter().map(|s| s.duration).sum::<f64>(), 7.0);
    }

    #[test]
    fn test_static_exact_fit_keeps_full_durations() {
        let segments = parse_by_duration(&static_attributes(2.0, 1.0, 8.0));
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.duration == 2.0));
    }

    #[test]
    fn test_static_timescale_units() {
        let segments = parse_by_duration(&static_attributes(90_000.0, 90_000.0, 3.0));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].duration, 1.0);
        assert_eq!(segments[1].time, 90_000.0);
    }

    fn dynamic_attributes(now_ms: f64) -> AttributeBag {
        let mut attributes = AttributeBag::new();
        attributes.insert("type", Value::String("dynamic".to_string()));
        attributes.insert("NOW", Value::Number(now_ms));
        attributes.insert("clientOffset", Value::Number(0.0));
        attributes.insert("duration", Value::Number(2.0));
        attributes.insert("timescale", Value::Number(1.0));
        attributes.insert("startNumber", Value::Number(0.0));
        attributes.insert("periodIndex", Value::Number(0.0));
        attributes.insert("minimumUpdatePeriod", Value::Number(0.0));
        attributes
    }

    #[test]
    fn test_dynamic_window_respects_time_shift_buffer() {
        let now_ms = 100_000.0;
        let mut attributes = dynamic_attributes(now_ms);
        // the period started 100 seconds ago; only the last 30 are replayable
        attributes.insert("availabilityStartTime", Value::Number(0.0));
        attributes.insert("timeShiftBufferDepth", Value::Number(30.0));

        let segments = parse_by_duration(&attributes);
        let first = segments.first().unwrap();
        let last = segments.last().unwrap();

        assert_eq!(first.number, 35);
        assert_eq!(last.number, 49);
        assert_eq!(segments.len(), 15);
        // window bounds stay within [0, total segment count]
        assert!(segments.iter().all(|s| s.number <= 50));
    }

    #[test]
    fn test_dynamic_window_clamps_to_zero_without_history() {
        let mut attributes = dynamic_attributes(10_000.0);
        attributes.insert("availabilityStartTime", Value::Number(0.0));
        attributes.insert("timeShiftBufferDepth", Value::Number(60.0));

        let segments = parse_by_duration(&attributes);
        assert_eq!(segments.first().unwrap().number, 0);
        assert_eq!(segments.len(), 5);
    }

    #[test]
    fn test_dynamic_window_without_buffer_depth_starts_at_zero() {
        let mut attributes = dynamic_attributes(10_000.0);
        attributes.insert("availabilityStartTime", Value::Number(0.0));

        let segments = parse_by_duration(&attributes);
        assert_eq!(segments.first().unwrap().number, 0);
    }
}
