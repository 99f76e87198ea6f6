use serde::Serialize;

use crate::attributes::parse_attributes;
use crate::error::{IzumiError, IzumiResult};
use crate::time::parse_date;
use crate::xml::Element;

/// How a client should obtain the presentation's reference wall clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UtcTimingMethod {
    /// Issue a HEAD request and read the response `Date` header.
    Head { url: String },
    /// Fetch the body and parse it as an ISO 8601 date-time.
    Get { url: String },
    /// The declared value is the time itself, in seconds since the epoch.
    Direct { time: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtcTiming {
    pub scheme_id_uri: String,
    pub method: UtcTimingMethod,
}

/// Extracts the `UTCTiming` declaration from a manifest root, if any. NTP and
/// SNTP schemes are not supported and fail distinctly.
pub fn parse_utc_timing_scheme(mpd: &Element) -> IzumiResult<Option<UtcTiming>> {
    let Some(node) = mpd.find_child("UTCTiming") else {
        return Ok(None);
    };

    let attributes = parse_attributes(node);
    let scheme_id_uri = attributes.string("schemeIdUri").unwrap_or("").to_string();
    let value = attributes.string("value").unwrap_or("").to_string();

    let method = match scheme_id_uri.as_str() {
        "urn:mpeg:dash:utc:http-head:2014" | "urn:mpeg:dash:utc:http-head:2012" => {
            UtcTimingMethod::Head { url: value }
        }
        "urn:mpeg:dash:utc:http-xsdate:2014"
        | "urn:mpeg:dash:utc:http-iso:2014"
        | "urn:mpeg:dash:utc:http-xsdate:2012"
        | "urn:mpeg:dash:utc:http-iso:2012" => UtcTimingMethod::Get { url: value },
        "urn:mpeg:dash:utc:direct:2014" | "urn:mpeg:dash:utc:direct:2012" => {
            UtcTimingMethod::Direct {
                time: parse_date(&value),
            }
        }
        scheme => {
            tracing::warn!(scheme, "unsupported UTCTiming scheme");
            return Err(IzumiError::UnsupportedUtcTimingScheme(scheme_id_uri.clone()));
        }
    };

    Ok(Some(UtcTiming {
        scheme_id_uri,
        method,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_manifest;

    fn timing(scheme: &str, value: &str) -> IzumiResult<Option<UtcTiming>> {
        let mpd = parse_manifest(&format!(
            r#"<MPD><UTCTiming schemeIdUri="{scheme}" value="{value}" /><Period></Period></MPD>"#
        ))
        .unwrap();
        parse_utc_timing_scheme(&mpd)
    }

    #[test]
    fn test_no_timing_node() {
        let mpd = parse_manifest("<MPD><Period></Period></MPD>").unwrap();
        assert_eq!(parse_utc_timing_scheme(&mpd).unwrap(), None);
    }

    #[test]
    fn test_head_method() {
        let timing = timing("urn:mpeg:dash:utc:http-head:2014", "https://time.example/")
            .unwrap()
            .unwrap();
        assert_eq!(
            timing.method,
            UtcTimingMethod::Head {
                url: "https://time.example/".to_string()
            }
        );
    }

    #[test]
    fn test_get_method() {
        for scheme in [
            "urn:mpeg:dash:utc:http-xsdate:2014",
            "urn:mpeg:dash:utc:http-iso:2014",
            "urn:mpeg:dash:utc:http-xsdate:2012",
            "urn:mpeg:dash:utc:http-iso:2012",
        ] {
            let timing = timing(scheme, "https://time.example/iso").unwrap().unwrap();
            assert_eq!(timing.scheme_id_uri, scheme);
            assert_eq!(
                timing.method,
                UtcTimingMethod::Get {
                    url: "https://time.example/iso".to_string()
                }
            );
        }
    }

    #[test]
    fn test_direct_method_parses_value() {
        let timing = timing("urn:mpeg:dash:utc:direct:2014", "1970-01-01T00:00:30Z")
            .unwrap()
            .unwrap();
        assert_eq!(timing.method, UtcTimingMethod::Direct { time: 30.0 });
    }

    #[test]
    fn test_ntp_schemes_rejected() {
        for scheme in [
            "urn:mpeg:dash:utc:http-ntp:2014",
            "urn:mpeg:dash:utc:ntp:2014",
            "urn:mpeg:dash:utc:sntp:2014",
            "urn:example:something-else",
        ] {
            assert!(matches!(
                timing(scheme, "whatever"),
                Err(IzumiError::UnsupportedUtcTimingScheme(_))
            ));
        }
    }
}
