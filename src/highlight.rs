//! Syntax highlighting for fenced code blocks.

use crate::document::Colour;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Colour used when no theme colouring applies.
pub const PLAIN_COLOUR: Colour = Colour::new_rgb_bytes(60, 60, 60);

/// A fragment of highlighted code. Text may contain newlines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColouredToken {
    pub text: String,
    pub colour: Colour,
    pub bold: bool,
}

impl ColouredToken {
    pub fn plain<S: Into<String>>(text: S) -> ColouredToken {
        ColouredToken {
            text: text.into(),
            colour: PLAIN_COLOUR,
            bold: false,
        }
    }
}

/// Map common shorthand language tags to the names syntax definitions use.
pub fn normalize_language_name(language: &str) -> String {
    let language = language.trim().to_lowercase();
    let normalized = match language.as_str() {
        "golang" => "go",
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "yml" => "yaml",
        "md" => "markdown",
        "sh" | "shell" => "bash",
        "dockerfile" => "docker",
        other => other,
    };
    normalized.to_string()
}

fn theme_alias(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "github" | "github-light" | "inspired-github" => Some("InspiredGitHub"),
        "solarized" | "solarized-light" => Some("Solarized (light)"),
        "solarized-dark" => Some("Solarized (dark)"),
        "ocean" | "base16-ocean" | "ocean-dark" => Some("base16-ocean.dark"),
        "ocean-light" => Some("base16-ocean.light"),
        "eighties" => Some("base16-eighties.dark"),
        "mocha" => Some("base16-mocha.dark"),
        _ => None,
    }
}

/// Names of the themes available to `syntax_theme`.
pub fn available_themes() -> Vec<String> {
    ThemeSet::load_defaults().themes.into_keys().collect()
}

pub struct SyntaxHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
    theme_name: String,
}

impl SyntaxHighlighter {
    /// Build a highlighter for the named theme. Unknown names fall back to
    /// the default theme.
    pub fn new(theme_name: &str) -> SyntaxHighlighter {
        let mut themes = ThemeSet::load_defaults();
        let resolved = if themes.themes.contains_key(theme_name) {
            Some(theme_name.to_string())
        } else if let Some(alias) = theme_alias(theme_name) {
            Some(alias.to_string())
        } else {
            themes
                .themes
                .keys()
                .find(|k| k.eq_ignore_ascii_case(theme_name))
                .cloned()
        };

        let (theme_name, theme) = match resolved.and_then(|n| themes.themes.remove(&n).map(|t| (n, t))) {
            Some(found) => found,
            None => {
                log::warn!("Unknown syntax theme `{theme_name}`, using {DEFAULT_THEME}");
                let theme = themes.themes.remove(DEFAULT_THEME).unwrap_or_default();
                (DEFAULT_THEME.to_string(), theme)
            }
        };

        SyntaxHighlighter {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
            theme_name,
        }
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Find a syntax by token (name or extension), after normalizing aliases.
    pub fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        let language = normalize_language_name(language);
        if language.is_empty() {
            return None;
        }
        self.syntaxes
            .find_syntax_by_token(&language)
            .or_else(|| self.syntaxes.find_syntax_by_extension(&language))
    }

    /// Guess the language of unlabelled code from its first line (shebangs,
    /// XML prologs, editor mode lines).
    pub fn detect_language(&self, code: &str) -> Option<String> {
        let first = code.lines().next()?;
        self.syntaxes
            .find_syntax_by_first_line(first)
            .map(|syntax| syntax.name.to_lowercase())
    }

    /// Split `code` into coloured tokens. Unknown languages are coloured as
    /// plain text with the theme's foreground; a tokenizer failure returns the
    /// whole input as one plain token.
    pub fn highlight_code(&self, code: &str, language: &str) -> Vec<ColouredToken> {
        let syntax = match self.find_syntax(language) {
            Some(syntax) => syntax,
            None => {
                if !language.trim().is_empty() {
                    log::warn!("Unknown code language `{language}`, rendering as plain text");
                }
                self.syntaxes.find_syntax_plain_text()
            }
        };

        let mut h = HighlightLines::new(syntax, &self.theme);
        let mut tokens: Vec<ColouredToken> = Vec::new();
        for line in LinesWithEndings::from(code) {
            let ranges = match h.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges,
                Err(e) => {
                    log::warn!("Failed to highlight {language} code, rendering as plain text: {e}");
                    return vec![ColouredToken::plain(code)];
                }
            };
            for (style, text) in ranges {
                let colour = Colour::new_rgb_bytes(
                    style.foreground.r,
                    style.foreground.g,
                    style.foreground.b,
                );
                let bold = style.font_style.intersects(FontStyle::BOLD);
                match tokens.last_mut() {
                    Some(last) if last.colour == colour && last.bold == bold => {
                        last.text.push_str(text)
                    }
                    _ => tokens.push(ColouredToken {
                        text: text.to_string(),
                        colour,
                        bold,
                    }),
                }
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn distinct_colours(tokens: &[ColouredToken]) -> usize {
        tokens
            .iter()
            .filter(|t| !t.text.trim().is_empty())
            .map(|t| t.colour)
            .collect::<HashSet<Colour>>()
            .len()
    }

    #[test]
    fn can_normalize_language_names() {
        assert_eq!(normalize_language_name("golang"), "go");
        assert_eq!(normalize_language_name(" JS "), "javascript");
        assert_eq!(normalize_language_name("shell"), "bash");
        assert_eq!(normalize_language_name("sh"), "bash");
        assert_eq!(normalize_language_name("Dockerfile"), "docker");
        assert_eq!(normalize_language_name("rust"), "rust");
    }

    #[test]
    fn can_highlight_aliased_language() {
        let highlighter = SyntaxHighlighter::new("github");
        assert_eq!(highlighter.theme_name(), "InspiredGitHub");
        assert_eq!(
            highlighter.find_syntax("js").map(|s| s.name.as_str()),
            Some("JavaScript")
        );

        let code = "function answer() {\n    return 42;\n}\n";
        let tokens = highlighter.highlight_code(code, "js");
        assert!(distinct_colours(&tokens) > 1);
        let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, code);
    }

    #[test]
    fn unknown_language_is_single_colour() {
        let highlighter = SyntaxHighlighter::new("github");
        let code = "frobnicate the widgets\n  twice\n";
        let tokens = highlighter.highlight_code(code, "xyzzy");
        assert!(!tokens.is_empty());
        assert_eq!(distinct_colours(&tokens), 1);
        let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, code);
    }

    #[test]
    fn unknown_theme_falls_back() {
        let highlighter = SyntaxHighlighter::new("no-such-theme");
        assert_eq!(highlighter.theme_name(), DEFAULT_THEME);
        let highlighter = SyntaxHighlighter::new("solarized-dark");
        assert_eq!(highlighter.theme_name(), "Solarized (dark)");
    }

    #[test]
    fn can_detect_language_from_shebang() {
        let highlighter = SyntaxHighlighter::new("github");
        let detected = highlighter.detect_language("#!/usr/bin/env python\nprint('hi')\n");
        assert_eq!(detected.as_deref(), Some("python"));
        assert_eq!(highlighter.detect_language("just some words"), None);
    }

    #[test]
    fn can_list_themes() {
        let themes = available_themes();
        assert!(themes.iter().any(|t| t == DEFAULT_THEME));
    }
}
