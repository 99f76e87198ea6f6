use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex, Replacer};

// $Identifier$ or $Identifier%0[width]d$. An empty identifier with no format
// tag, i.e. `$$`, is the literal-dollar escape.
static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z]*)(?:%0([0-9]+)d)?\$").unwrap());

/// Substitution values for a segment URL template.
pub struct TemplateValues {
    values: HashMap<&'static str, String>,
}

impl TemplateValues {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self {
            values: HashMap::with_capacity(4),
        }
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.values.insert(key, value);
    }
}

impl Default for TemplateValues {
    fn default() -> Self {
        Self::new()
    }
}

/// Constructs a segment URL from a template string, replacing every known
/// identifier with its value. Identifiers without a value are left verbatim.
pub fn construct_template_url(template: &str, values: &TemplateValues) -> String {
    IDENTIFIER_REGEX
        .replace_all(template, IdentifierReplacer(&values.values))
        .to_string()
}

struct IdentifierReplacer<'a>(&'a HashMap<&'static str, String>);

impl Replacer for IdentifierReplacer<'_> {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        let whole = caps.get(0).unwrap().as_str();
        if whole == "$$" {
            dst.push('$');
            return;
        }

        let identifier = caps.get(1).unwrap().as_str();
        let Some(value) = self.0.get(identifier) else {
            dst.push_str(whole);
            return;
        };

        // The format tag shall not be used with RepresentationID
        if identifier == TemplateValues::REPRESENTATION_ID {
            dst.push_str(value);
            return;
        }

        match caps.get(2).and_then(|width| width.as_str().parse::<usize>().ok()) {
            Some(width) => dst.push_str(&format!("{value:0>width$}")),
            None => dst.push_str(value),
        }
    }
}
