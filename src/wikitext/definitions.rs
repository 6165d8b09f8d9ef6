//! Static tables describing HTML tags and URI schemes known to the tokenizer.

/// URI schemes recognised in external links, mapped to whether the scheme
/// must be followed by `//`.
static URI_SCHEMES: phf::Map<&str, bool> = phf::phf_map! {
    "bitcoin" => false,
    "ftp" => true,
    "ftps" => true,
    "geo" => false,
    "git" => true,
    "gopher" => true,
    "http" => true,
    "https" => true,
    "irc" => true,
    "ircs" => true,
    "magnet" => false,
    "mailto" => false,
    "mms" => true,
    "news" => false,
    "nntp" => true,
    "redis" => true,
    "sftp" => true,
    "sip" => false,
    "sips" => false,
    "sms" => false,
    "ssh" => true,
    "svn" => true,
    "tel" => false,
    "telnet" => true,
    "urn" => false,
    "worldwind" => true,
    "xmpp" => false,
};

/// Tags whose contents are not parsed as wikitext.
static PARSER_BLACKLIST: phf::Set<&str> = phf::phf_set! {
    "categorytree", "ce", "chem", "gallery", "graph", "hiero", "imagemap",
    "inputbox", "math", "nowiki", "pre", "score", "section", "source",
    "syntaxhighlight", "templatedata", "timeline",
};

/// Tags that produce no visible output of their own.
static INVISIBLE_TAGS: phf::Set<&str> = phf::phf_set! {
    "categorytree", "gallery", "graph", "imagemap", "inputbox", "math",
    "score", "section", "templatedata", "timeline",
};

/// Tags that can never have a body.
static SINGLE_ONLY: phf::Set<&str> = phf::phf_set! {
    "br", "wbr", "hr", "meta", "link", "img",
};

/// Tags that may be left unclosed.
static SINGLE: phf::Set<&str> = phf::phf_set! {
    "br", "wbr", "hr", "meta", "link", "img", "li", "dt", "dd", "th", "td", "tr",
};

/// Returns the HTML tag name for a list or definition bullet.
pub(crate) fn get_html_tag(markup: char) -> Option<&'static str> {
    match markup {
        '#' | '*' => Some("li"),
        ';' => Some("dt"),
        ':' => Some("dd"),
        _ => None,
    }
}

/// Returns true if the contents of `tag` are parsed as wikitext.
pub fn is_parsable(tag: &str) -> bool {
    !PARSER_BLACKLIST.contains(tag.to_ascii_lowercase().as_str())
}

/// Returns true if `tag` is invisible in rendered output.
pub fn is_visible(tag: &str) -> bool {
    !INVISIBLE_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

/// Returns true if `tag` may be used without a closing tag.
pub fn is_single(tag: &str) -> bool {
    SINGLE.contains(tag.to_ascii_lowercase().as_str())
}

/// Returns true if `tag` can never have a closing tag.
pub fn is_single_only(tag: &str) -> bool {
    SINGLE_ONLY.contains(tag.to_ascii_lowercase().as_str())
}

/// Returns true if `scheme` is a known URI scheme. When `slashes` is false,
/// only schemes which do not require `//` match.
pub fn is_scheme(scheme: &str, slashes: bool) -> bool {
    URI_SCHEMES
        .get(scheme.to_ascii_lowercase().as_str())
        .is_some_and(|needs_slashes| slashes || !needs_slashes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes() {
        assert!(is_scheme("http", true));
        assert!(is_scheme("HTTPS", true));
        assert!(!is_scheme("http", false));
        assert!(is_scheme("mailto", false));
        assert!(is_scheme("mailto", true));
        assert!(!is_scheme("javascript", true));
    }

    #[test]
    fn tags() {
        assert!(!is_parsable("NoWiki"));
        assert!(is_parsable("span"));
        assert!(is_single("li"));
        assert!(!is_single_only("li"));
        assert!(is_single_only("BR"));
        assert!(!is_visible("math"));
        assert_eq!(get_html_tag(';'), Some("dt"));
        assert_eq!(get_html_tag('!'), None);
    }
}
