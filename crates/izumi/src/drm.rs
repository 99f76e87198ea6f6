use std::collections::HashMap;
use std::sync::LazyLock;

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine};

use crate::attributes::{parse_attributes, AttributeBag, Value};
use crate::xml::Element;

/// Well-known DRM key system URNs.
static KEY_SYSTEMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("urn:uuid:1077efec-c0b2-4d02-ace3-3c1e52e2fb4b", "org.w3.clearkey"),
        ("urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed", "com.widevine.alpha"),
        ("urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95", "com.microsoft.playready"),
        ("urn:uuid:f239e769-efa3-4850-9c16-a903c6932efb", "com.adobe.primetime"),
    ])
});

static ENGINE: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
});

/// Decodes an embedded initialization-data payload. The rest of the engine
/// stays free of encoding concerns.
pub fn decode_pssh<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, DecodeError> {
    ENGINE.decode(input)
}

/// Folds `ContentProtection` elements into a bag keyed by key system name.
/// Each entry carries the element's attributes and, when a `cenc:pssh` child
/// is present, its decoded payload. Unknown key system URNs are skipped.
pub fn key_system_information(content_protection: &[&Element]) -> AttributeBag {
    let mut systems = AttributeBag::new();

    for node in content_protection {
        let attributes = parse_attributes(node);
        let Some(key_system) = attributes
            .string("schemeIdUri")
            .and_then(|urn| KEY_SYSTEMS.get(urn).copied())
        else {
            continue;
        };

        let pssh = node
            .find_child("cenc:pssh")
            .map(Element::content)
            .filter(|text| !text.is_empty())
            .and_then(|text| decode_pssh(text).ok());

        let mut entry = AttributeBag::new();
        entry.insert("attributes", Value::Bag(attributes));
        if let Some(pssh) = pssh {
            entry.insert("pssh", Value::Bytes(pssh));
        }
        systems.insert(key_system, Value::Bag(entry));
    }

    systems
}
