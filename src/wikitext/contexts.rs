//! Tokenizer contexts.
//!
//! A context is a set of flags describing what the tokenizer is currently
//! inside of. Every speculative frame on the tokenizer stack carries one, and
//! the flags decide which delimiters are meaningful, which characters are
//! forbidden, and what happens when the input ends while the frame is open.
//!
//! Local (per-frame) contexts:
//!
//! * [`TEMPLATE`](Context::TEMPLATE): `{{ name | key = value }}`
//! * [`ARGUMENT`](Context::ARGUMENT): `{{{ name | default }}}`
//! * [`WIKILINK`](Context::WIKILINK): `[[ title | text ]]`
//! * [`EXT_LINK`](Context::EXT_LINK): `[ uri title ]`
//! * [`HEADING`](Context::HEADING): one flag per level, `== title ==`
//! * [`TAG`](Context::TAG): `<name attr="value">body</name>`
//! * [`STYLE`](Context::STYLE): `''italic''` and `'''bold'''`
//! * [`DL_TERM`](Context::DL_TERM): `;term:definition`
//! * [`SAFETY_CHECK`](Context::SAFETY_CHECK): scratch flags used by
//!   `verify_safe` while scanning template names and link titles
//! * [`TABLE`](Context::TABLE): `{| ... |}`
//!
//! Global contexts live in [`GlobalContext`] and apply to the whole
//! tokenizer run instead of one frame.

bitflags::bitflags! {
    /// Local tokenizer context flags.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Context: u64 {
        const TEMPLATE_NAME = 1 << 0;
        const TEMPLATE_PARAM_KEY = 1 << 1;
        const TEMPLATE_PARAM_VALUE = 1 << 2;
        const TEMPLATE = Self::TEMPLATE_NAME.bits()
            | Self::TEMPLATE_PARAM_KEY.bits()
            | Self::TEMPLATE_PARAM_VALUE.bits();

        const ARGUMENT_NAME = 1 << 3;
        const ARGUMENT_DEFAULT = 1 << 4;
        const ARGUMENT = Self::ARGUMENT_NAME.bits() | Self::ARGUMENT_DEFAULT.bits();

        const WIKILINK_TITLE = 1 << 5;
        const WIKILINK_TEXT = 1 << 6;
        const WIKILINK = Self::WIKILINK_TITLE.bits() | Self::WIKILINK_TEXT.bits();

        const EXT_LINK_URI = 1 << 7;
        const EXT_LINK_TITLE = 1 << 8;
        const EXT_LINK = Self::EXT_LINK_URI.bits() | Self::EXT_LINK_TITLE.bits();

        const HEADING_LEVEL_1 = 1 << 9;
        const HEADING_LEVEL_2 = 1 << 10;
        const HEADING_LEVEL_3 = 1 << 11;
        const HEADING_LEVEL_4 = 1 << 12;
        const HEADING_LEVEL_5 = 1 << 13;
        const HEADING_LEVEL_6 = 1 << 14;
        const HEADING = Self::HEADING_LEVEL_1.bits()
            | Self::HEADING_LEVEL_2.bits()
            | Self::HEADING_LEVEL_3.bits()
            | Self::HEADING_LEVEL_4.bits()
            | Self::HEADING_LEVEL_5.bits()
            | Self::HEADING_LEVEL_6.bits();

        const TAG_OPEN = 1 << 15;
        const TAG_ATTR = 1 << 16;
        const TAG_BODY = 1 << 17;
        const TAG_CLOSE = 1 << 18;
        const TAG = Self::TAG_OPEN.bits()
            | Self::TAG_ATTR.bits()
            | Self::TAG_BODY.bits()
            | Self::TAG_CLOSE.bits();

        const STYLE_ITALICS = 1 << 19;
        const STYLE_BOLD = 1 << 20;
        const STYLE_PASS_AGAIN = 1 << 21;
        const STYLE_SECOND_PASS = 1 << 22;
        const STYLE = Self::STYLE_ITALICS.bits()
            | Self::STYLE_BOLD.bits()
            | Self::STYLE_PASS_AGAIN.bits()
            | Self::STYLE_SECOND_PASS.bits();

        const DL_TERM = 1 << 23;

        const HAS_TEXT = 1 << 24;
        const FAIL_ON_TEXT = 1 << 25;
        const FAIL_NEXT = 1 << 26;
        const FAIL_ON_LBRACE = 1 << 27;
        const FAIL_ON_RBRACE = 1 << 28;
        const FAIL_ON_EQUALS = 1 << 29;
        const HAS_TEMPLATE = 1 << 30;
        const SAFETY_CHECK = Self::HAS_TEXT.bits()
            | Self::FAIL_ON_TEXT.bits()
            | Self::FAIL_NEXT.bits()
            | Self::FAIL_ON_LBRACE.bits()
            | Self::FAIL_ON_RBRACE.bits()
            | Self::FAIL_ON_EQUALS.bits()
            | Self::HAS_TEMPLATE.bits();

        const TABLE_OPEN = 1 << 31;
        const TABLE_CELL_OPEN = 1 << 32;
        const TABLE_CELL_STYLE = 1 << 33;
        const TABLE_ROW_OPEN = 1 << 34;
        const TABLE_TD_LINE = 1 << 35;
        const TABLE_TH_LINE = 1 << 36;
        const TABLE_CELL_LINE_CONTEXTS = Self::TABLE_TD_LINE.bits()
            | Self::TABLE_TH_LINE.bits()
            | Self::TABLE_CELL_STYLE.bits();
        const TABLE = Self::TABLE_OPEN.bits()
            | Self::TABLE_CELL_OPEN.bits()
            | Self::TABLE_CELL_STYLE.bits()
            | Self::TABLE_ROW_OPEN.bits()
            | Self::TABLE_TD_LINE.bits()
            | Self::TABLE_TH_LINE.bits();

        const HTML_ENTITY = 1 << 37;

        /// Contexts that must be closed before the end of input.
        const FAIL = Self::TEMPLATE.bits()
            | Self::ARGUMENT.bits()
            | Self::WIKILINK.bits()
            | Self::EXT_LINK_TITLE.bits()
            | Self::HEADING.bits()
            | Self::TAG.bits()
            | Self::STYLE.bits()
            | Self::TABLE.bits();

        /// Contexts in which every character is checked by `verify_safe`.
        const UNSAFE = Self::TEMPLATE_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK_TITLE.bits()
            | Self::TEMPLATE_PARAM_KEY.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::TAG_CLOSE.bits();

        /// Contexts that sit on top of an extra frame belonging to the same
        /// construct. Failing one of these pops both frames.
        const DOUBLE = Self::TEMPLATE_PARAM_KEY.bits()
            | Self::TAG_CLOSE.bits()
            | Self::TABLE_ROW_OPEN.bits();

        /// Contexts in which `[[` is plain text.
        const NO_WIKILINKS = Self::TEMPLATE_NAME.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK_URI.bits();

        /// Contexts in which external links are not recognised.
        const NO_EXT_LINKS = Self::TEMPLATE_NAME.bits()
            | Self::ARGUMENT_NAME.bits()
            | Self::WIKILINK_TITLE.bits()
            | Self::EXT_LINK.bits();
    }
}

impl Context {
    /// Returns the heading context for the given number of `=`, clamped to
    /// level 6.
    pub(crate) fn heading(level: usize) -> Self {
        Self::from_bits_retain(Self::HEADING_LEVEL_1.bits() << (level.clamp(1, 6) - 1))
    }

    /// Returns the heading level (1-6) encoded in this context, if any.
    pub(crate) fn heading_level(self) -> Option<u8> {
        let bits = (self & Self::HEADING).bits() >> Self::HEADING_LEVEL_1.bits().trailing_zeros();
        u8::try_from(u64::BITS - bits.leading_zeros())
            .ok()
            .filter(|level| *level != 0)
    }

    /// Parses a comma-separated list of flag names, case-insensitively.
    pub fn parse_names(names: &str) -> Option<Self> {
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Self::empty(), |acc, name| {
                Self::from_name(&name.to_ascii_uppercase()).map(|flag| acc | flag)
            })
    }
}

bitflags::bitflags! {
    /// Tokenizer-wide context flags.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub(crate) struct GlobalContext: u8 {
        /// A heading is open somewhere on the stack. Headings never nest.
        const HEADING = 1 << 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels() {
        assert_eq!(Context::heading(1), Context::HEADING_LEVEL_1);
        assert_eq!(Context::heading(3), Context::HEADING_LEVEL_3);
        assert_eq!(Context::heading(9), Context::HEADING_LEVEL_6);
        assert_eq!(Context::HEADING_LEVEL_4.heading_level(), Some(4));
        assert_eq!(
            (Context::HEADING_LEVEL_2 | Context::HAS_TEXT).heading_level(),
            Some(2)
        );
        assert_eq!(Context::TEMPLATE_NAME.heading_level(), None);
    }

    #[test]
    fn aggregates() {
        assert!(Context::FAIL.contains(Context::TABLE_ROW_OPEN));
        assert!(!Context::FAIL.intersects(Context::EXT_LINK_URI));
        assert!(Context::NO_EXT_LINKS.contains(Context::EXT_LINK_URI));
        assert!(Context::DOUBLE.contains(Context::TAG_CLOSE));
    }

    #[test]
    fn names() {
        assert_eq!(
            Context::parse_names("ext_link_uri"),
            Some(Context::EXT_LINK_URI)
        );
        assert_eq!(
            Context::parse_names("TEMPLATE, dl_term"),
            Some(Context::TEMPLATE | Context::DL_TERM)
        );
        assert_eq!(Context::parse_names(""), Some(Context::empty()));
        assert_eq!(Context::parse_names("bogus"), None);
    }
}
