//! Terminal rendering of the transcript.
//!
//! Entry text goes through [`omnichat_core::markup::format`] first, and the
//! resulting markup is turned into ANSI styles here. Tags the formatter
//! never emits are printed as they are.

use std::fmt::Write as _;
use std::sync::LazyLock;

use omnichat_core::markup;
use omnichat_core::{ChatError, Citation, ConversationEntry, Speaker};
use owo_colors::{OwoColorize, Style};
use regex::Regex;

/// Prefix of every line belonging to an entry.
pub const BAR_CHAR: &str = "▎";

const MAX_TITLE_CHARS: usize = 30;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a literal covered by the tests below.
    Regex::new(r"<(/?)(h1|h2|h3|strong|em|code|pre)(?:\s[^>]*)?>|<br\s*/?>")
        .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Heading1,
    Heading2,
    Heading3,
    Strong,
    Emphasis,
    Code,
    Preformatted,
}

impl Tag {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "h1" => Tag::Heading1,
            "h2" => Tag::Heading2,
            "h3" => Tag::Heading3,
            "strong" => Tag::Strong,
            "em" => Tag::Emphasis,
            "code" => Tag::Code,
            "pre" => Tag::Preformatted,
            _ => return None,
        })
    }

    fn apply(self, style: Style) -> Style {
        match self {
            Tag::Heading1 => style.bold().underline().bright_white(),
            Tag::Heading2 => style.bold().bright_cyan(),
            Tag::Heading3 => style.bold().cyan(),
            Tag::Strong => style.bold(),
            Tag::Emphasis => style.italic(),
            Tag::Code => style.yellow(),
            Tag::Preformatted => style.bright_cyan(),
        }
    }

    /// Whether the element ends a line, like the block it stands for.
    fn is_block(self) -> bool {
        matches!(
            self,
            Tag::Heading1 | Tag::Heading2 | Tag::Heading3 | Tag::Preformatted
        )
    }
}

/// Turns transcript entries into text for the terminal.
#[derive(Clone, Copy, Debug)]
pub struct Renderer {
    colored: bool,
}

impl Renderer {
    /// Creates a renderer. Without colors the output is plain text.
    #[inline]
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Converts the formatter's markup into styled text.
    pub fn markup(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut open_tags: Vec<Tag> = vec![];
        let mut last_end = 0;

        for caps in TAG.captures_iter(html) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let text = &html[last_end..whole.start()];
            self.push_text(&mut out, text, &open_tags);
            last_end = whole.end();

            let Some(name) = caps.get(2) else {
                // Line break.
                out.push('\n');
                continue;
            };
            let Some(tag) = Tag::from_name(name.as_str()) else {
                out.push_str(whole.as_str());
                continue;
            };
            let closing = caps.get(1).is_some_and(|m| !m.is_empty());
            if !closing {
                open_tags.push(tag);
                continue;
            }
            match open_tags.iter().rposition(|open| *open == tag) {
                Some(index) => {
                    open_tags.remove(index);
                    if tag.is_block() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                None => out.push_str(whole.as_str()),
            }
        }
        self.push_text(&mut out, &html[last_end..], &open_tags);
        out
    }

    /// Renders a whole entry: badge, time, formatted text and sources.
    pub fn entry(&self, entry: &ConversationEntry) -> String {
        let (badge, bar_style) = match entry.speaker() {
            Speaker::User => ("ME", Style::new().bright_blue()),
            Speaker::Assistant => ("AI", Style::new().bright_cyan()),
            Speaker::System => ("!!", Style::new().bright_yellow()),
        };
        let bar = self.paint(BAR_CHAR, bar_style);
        let time = entry.created_at().format("%H:%M").to_string();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{bar}{} {}",
            self.paint(badge, bar_style.bold()),
            self.paint(&time, Style::new().dimmed()),
        );

        let body = self.markup(&markup::format(entry.text()));
        for line in body.trim_end_matches('\n').lines() {
            let _ = writeln!(out, "{bar}{line}");
        }

        let citations: Vec<_> = entry.unique_citations().collect();
        if !citations.is_empty() {
            let _ = writeln!(out, "{bar}");
            let _ = writeln!(
                out,
                "{bar}{}",
                self.paint("SOURCES", Style::new().bold().dimmed())
            );
            for citation in citations {
                let _ = writeln!(out, "{bar}{}", self.citation(citation));
            }
        }
        out
    }

    /// Renders the title shown when the program starts.
    pub fn header(&self, model: Option<&str>) -> String {
        let mut out = format!(
            "{} {}",
            self.paint("OmniChat", Style::new().bold().bright_magenta()),
            self.paint("Universal AI Assistant", Style::new().dimmed()),
        );
        if let Some(model) = model {
            let _ = write!(out, " ({})", self.paint(model, Style::new().cyan()));
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "{}",
            self.note(
                "Answers may use Google Search. Please verify sensitive facts."
            )
        );
        out
    }

    /// Renders a secondary line of text.
    pub fn note(&self, text: &str) -> String {
        self.paint(text, Style::new().dimmed().italic())
    }

    /// Renders the error banner.
    pub fn banner(&self, error: &ChatError) -> String {
        let text = format!(" ⚠ {} ", error.user_message());
        self.paint(&text, Style::new().bold().white().on_red())
    }

    fn citation(&self, citation: &Citation) -> String {
        let title = truncate_title(&citation.title);
        format!(
            " • {} {}",
            self.paint(&title, Style::new().bright_magenta()),
            self.paint(&citation.uri, Style::new().dimmed().underline()),
        )
    }

    fn push_text(&self, out: &mut String, text: &str, open_tags: &[Tag]) {
        if text.is_empty() {
            return;
        }
        if open_tags.is_empty() {
            out.push_str(text);
            return;
        }
        let style = open_tags
            .iter()
            .fold(Style::new(), |style, tag| tag.apply(style));
        out.push_str(&self.paint(text, style));
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.colored {
            text.style(style).to_string()
        } else {
            text.to_owned()
        }
    }
}

/// Shortens a citation title to 30 characters, marking the cut with `...`.
pub fn truncate_title(title: &str) -> String {
    match title.char_indices().nth(MAX_TITLE_CHARS) {
        Some((cut, _)) => format!("{}...", &title[..cut]),
        None => title.to_owned(),
    }
}

/// A one-line glimpse of text that is still streaming.
pub fn preview(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let count = line.chars().count();
    if count <= max_chars {
        return line.to_owned();
    }
    let skip = count - max_chars;
    format!("…{}", line.chars().skip(skip + 1).collect::<String>())
}

#[cfg(test)]
mod tests {
    use omnichat_core::Transcript;

    use super::*;

    fn plain() -> Renderer {
        Renderer::new(false)
    }

    #[test]
    fn test_markup_to_text() {
        let html = markup::format("# Title\nSome **bold** and *it*.\nNext");
        assert_eq!(plain().markup(&html), "Title\nSome bold and it.\nNext");
    }

    #[test]
    fn test_headings_end_lines() {
        let html = markup::format("## Part\n### Sub\nbody");
        assert_eq!(plain().markup(&html), "Part\nSub\nbody");
    }

    #[test]
    fn test_unknown_and_stray_tags() {
        assert_eq!(plain().markup("a <div>b</div>"), "a <div>b</div>");
        assert_eq!(plain().markup("x</strong>y"), "x</strong>y");
        assert_eq!(plain().markup("<em>open"), "open");
    }

    #[test]
    fn test_colored_markup() {
        let renderer = Renderer::new(true);
        let out = renderer.markup("<strong>bold</strong> plain");
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("bold"));
        assert!(out.ends_with(" plain"));

        let out = renderer.markup(&markup::format("run `ls`"));
        assert!(out.contains("\x1b[33m"));
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("Rust Blog"), "Rust Blog");
        let exact = "a".repeat(30);
        assert_eq!(truncate_title(&exact), exact);
        assert_eq!(
            truncate_title("The Rust Programming Language Official Blog"),
            "The Rust Programming Language ..."
        );
        assert_eq!(
            truncate_title(&"é".repeat(31)),
            format!("{}...", "é".repeat(30))
        );
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("first\nsecond\n\n", 20), "second");
        assert_eq!(preview("", 20), "");
        assert_eq!(preview("abcdefghij", 5), "…ghij");
    }

    #[test]
    fn test_entry() {
        let mut transcript = Transcript::new();
        let id = transcript.begin_response().unwrap();
        transcript
            .append_chunk(
                id,
                "Rust 1.0 shipped in **2015**.",
                vec![
                    Citation::new("Rust Blog", "https://blog.rust-lang.org"),
                    Citation::new("Wiki", "https://en.wikipedia.org"),
                    Citation::new("Rust Blog", "https://blog.rust-lang.org"),
                ],
            )
            .unwrap();
        transcript.finalize(id).unwrap();
        let entry = transcript.get(id).unwrap();

        let time = entry.created_at().format("%H:%M").to_string();
        let expected = [
            format!("{BAR_CHAR}AI {time}"),
            format!("{BAR_CHAR}Rust 1.0 shipped in 2015."),
            BAR_CHAR.to_owned(),
            format!("{BAR_CHAR}SOURCES"),
            format!("{BAR_CHAR} • Rust Blog https://blog.rust-lang.org"),
            format!("{BAR_CHAR} • Wiki https://en.wikipedia.org"),
        ]
        .map(|line| line + "\n")
        .concat();
        assert_eq!(plain().entry(entry), expected);
    }

    #[test]
    fn test_user_entry_without_sources() {
        let mut transcript = Transcript::new();
        let id = transcript.submit_user("Hi *there*");
        let out = plain().entry(transcript.get(id).unwrap());
        assert!(out.starts_with(&format!("{BAR_CHAR}ME ")));
        assert!(out.ends_with(&format!("{BAR_CHAR}Hi there\n")));
        assert!(!out.contains("SOURCES"));
    }

    #[test]
    fn test_header() {
        let header = plain().header(Some("gemini-2.5-flash"));
        assert!(header.starts_with(
            "OmniChat Universal AI Assistant (gemini-2.5-flash)\n"
        ));
        assert!(!plain().header(None).contains('('));
    }

    #[test]
    fn test_banner() {
        let err = ChatError::Initialization("no key".to_owned());
        assert_eq!(
            plain().banner(&err),
            " ⚠ Failed to initialize chat session. Please check your configuration. "
        );
    }
}
