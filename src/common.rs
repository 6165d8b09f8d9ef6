//! Common HTML entity helpers.

use html_escape::NAMED_ENTITIES;

/// The largest code point a numeric entity may name.
pub const MAX_CODE_POINT: u32 = 0x0010_ffff;

/// Returns the decoded value of the named entity `name`, which excludes the
/// leading `&` and trailing `;`.
pub fn named_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .binary_search_by(|(t_name, _)| t_name.cmp(&name.as_bytes()))
        .ok()
        .map(|index| NAMED_ENTITIES[index].1)
}

/// Returns the value of the numeric entity whose digits are `digits`, or
/// `None` if the digits are invalid or out of range.
pub fn numeric_entity_value(digits: &str, hexadecimal: bool) -> Option<u32> {
    if hexadecimal {
        u32::from_str_radix(digits, 16)
    } else {
        digits.parse::<u32>()
    }
    .ok()
    .filter(|value| (1..=MAX_CODE_POINT).contains(value))
}
