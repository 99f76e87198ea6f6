use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::xml::Element;

static SCHEME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^[a-z]+:").unwrap());

/// Joins a segment location against a base URL.
///
/// A relative URL that already carries a scheme passes through unchanged. An
/// absolute base resolves through the `url` crate. A base without a scheme
/// (including the empty default manifest URI) is combined with the relative
/// URL by a plain textual merge, so the result stays relative.
pub fn resolve_url(base: &str, relative: &str) -> String {
    if SCHEME_REGEX.is_match(relative) {
        return relative.to_string();
    }

    if let Ok(base) = Url::parse(base) {
        return match base.join(relative) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => relative.to_string(),
        };
    }

    merge_relative(base, relative)
}

fn merge_relative(base: &str, relative: &str) -> String {
    if base.is_empty() {
        return relative.to_string();
    }
    if relative.is_empty() {
        return base.to_string();
    }
    if relative.starts_with('/') {
        return relative.to_string();
    }

    let directory = match base.rfind('/') {
        Some(index) => &base[..=index],
        None => "",
    };
    remove_dot_segments(&format!("{directory}{relative}"))
}

fn remove_dot_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Builds the list of base URLs in effect below a tree level: the cartesian
/// product of the URLs inherited from above and the `BaseURL` elements
/// declared locally, in parent-major order. With no local elements the
/// inherited list passes through untouched.
pub fn build_base_urls(reference_urls: &[String], base_url_elements: &[&Element]) -> Vec<String> {
    if base_url_elements.is_empty() {
        return reference_urls.to_vec();
    }

    reference_urls
        .iter()
        .flat_map(|reference| {
            base_url_elements
                .iter()
                .map(move |element| resolve_url(reference, element.content()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_manifest;

    #[test]
    fn test_absolute_relative_passes_through() {
        assert_eq!(
            resolve_url("https://a.example/", "https://b.example/x.mp4"),
            "https://b.example/x.mp4"
        );
        assert_eq!(resolve_url("", "HTTPS://b.example/x.mp4"), "HTTPS://b.example/x.mp4");
    }

    #[test]
    fn test_absolute_base() {
        assert_eq!(
            resolve_url("https://a.example/path/manifest.mpd", "seg-1.mp4"),
            "https://a.example/path/seg-1.mp4"
        );
        assert_eq!(
            resolve_url("https://a.example/path/manifest.mpd", "/seg-1.mp4"),
            "https://a.example/seg-1.mp4"
        );
        assert_eq!(
            resolve_url("https://a.example/path/", "../seg-1.mp4"),
            "https://a.example/seg-1.mp4"
        );
    }

    #[test]
    fn test_relative_base() {
        assert_eq!(resolve_url("", "seg-1.mp4"), "seg-1.mp4");
        assert_eq!(resolve_url("media/manifest.mpd", "seg-1.mp4"), "media/seg-1.mp4");
        assert_eq!(resolve_url("media/a/manifest.mpd", "../seg-1.mp4"), "media/seg-1.mp4");
        assert_eq!(resolve_url("manifest.mpd", ""), "manifest.mpd");
    }

    #[test]
    fn test_base_url_fan_out() {
        let mpd = parse_manifest(
            r#"<MPD>
                 <BaseURL>x/</BaseURL>
                 <BaseURL>y/</BaseURL>
               </MPD>"#,
        )
        .unwrap();
        let elements: Vec<_> = mpd.children("BaseURL").collect();
        let references = vec!["http://a/".to_string(), "http://b/".to_string()];

        assert_eq!(
            build_base_urls(&references, &elements),
            vec![
                "http://a/x/".to_string(),
                "http://a/y/".to_string(),
                "http://b/x/".to_string(),
                "http://b/y/".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_base_url_elements_passes_references_through() {
        let references = vec!["http://a/".to_string()];
        assert_eq!(build_base_urls(&references, &[]), references);
    }
}
