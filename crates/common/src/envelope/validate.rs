use std::sync::OnceLock;

use regex::Regex;

/// Largest plaintext an envelope may describe (100 MiB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Longest accepted filename, in characters
pub const MAX_FILENAME_LEN: usize = 255;

fn filename_pattern() -> &'static Regex {
    static FILENAME: OnceLock<Regex> = OnceLock::new();
    FILENAME.get_or_init(|| Regex::new(r"^[\w\-. ]+$").expect("static regex"))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,32}$").expect("static regex"))
}

fn mimetype_pattern() -> &'static Regex {
    static MIMETYPE: OnceLock<Regex> = OnceLock::new();
    MIMETYPE.get_or_init(|| {
        Regex::new(r"^[a-z]+/[a-zA-Z0-9][a-zA-Z0-9!#$&^_.+-]{0,126}$").expect("static regex")
    })
}

/// A bare file name: no separators, not `.` or `..`.
pub fn is_valid_filename(name: &str) -> bool {
    // length is checked outside the pattern; a bounded Unicode \w repeat
    // blows past the regex compile size limit
    name != "."
        && name != ".."
        && name.chars().count() <= MAX_FILENAME_LEN
        && filename_pattern().is_match(name)
}

pub fn is_valid_tag(tag: &str) -> bool {
    tag_pattern().is_match(tag)
}

/// `type/subtype`, e.g. `text/plain` or `application/vnd.ms-excel`.
pub fn is_valid_mimetype(mimetype: &str) -> bool {
    mimetype_pattern().is_match(mimetype)
}
