//! Markdown parsing into an owned event stream.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser};

pub fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Parse `source` into events that no longer borrow from it, so the stream
/// can be walked more than once.
pub fn parse(source: &str) -> Vec<Event<'static>> {
    Parser::new_ext(source, options())
        .map(Event::into_static)
        .collect()
}

pub fn heading_level(level: HeadingLevel) -> u8 {
    level as u8
}

/// The language named by a fenced block's info string, if any.
pub fn fence_language(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{HeadingLevel, Tag};

    #[test]
    fn can_parse_owned_events() {
        let events = {
            let source = String::from("# Title\n\nSome *text*.\n");
            parse(&source)
        };
        assert!(matches!(
            events.first(),
            Some(Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }))
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Text(t) if t.as_ref() == "text")));
    }

    #[test]
    fn can_convert_heading_levels() {
        assert_eq!(heading_level(HeadingLevel::H1), 1);
        assert_eq!(heading_level(HeadingLevel::H6), 6);
    }

    #[test]
    fn can_read_fence_languages() {
        assert_eq!(fence_language("rust"), Some("rust"));
        assert_eq!(fence_language("js title=\"x\""), Some("js"));
        assert_eq!(fence_language("python,ignore"), Some("python"));
        assert_eq!(fence_language("  "), None);
    }
}
