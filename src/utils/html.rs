use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe inline tags (<b>, <sub>, <sup>) survive, scripts and
/// event attributes are stripped. Applied to every free-text field at the
/// write boundary.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Plain text for print output: drops tags, turns `<br>` into newlines and
/// decodes named and numeric entities.
pub fn to_plain_text(input: &str) -> String {
    let with_breaks = input
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n");
    let stripped = TAG.replace_all(&with_breaks, "");

    html_escape::decode_html_entities(&stripped).into_owned()
}
