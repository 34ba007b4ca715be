//! Markdown-lite to HTML markup.
//!
//! This is a fixed pipeline of substitutions applied in order, each one on
//! the output of the previous. It is not a markdown parser and must keep
//! producing byte-identical output for the same input, quirks included:
//! headings are not anchored to the line start, unmatched markers pass
//! through, and inline code runs before fenced blocks.

use std::sync::LazyLock;

use regex::Regex;

/// Characters a JavaScript-style `.` refuses to match.
macro_rules! any_but_eol {
    () => {
        r"[^\n\r\x{2028}\x{2029}]"
    };
}

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            // Patterns are literals covered by the tests below.
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        }
    }

    #[inline]
    fn apply(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, self.replacement)
            .into_owned()
    }
}

static HEADING_3: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!("### (", any_but_eol!(), r"*?)(?:\n|$)"),
        r#"<h3 class="text-lg font-bold mt-4 mb-2">${1}</h3>"#,
    )
});

static HEADING_2: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!("## (", any_but_eol!(), r"*?)(?:\n|$)"),
        r#"<h2 class="text-xl font-bold mt-5 mb-3">${1}</h2>"#,
    )
});

static HEADING_1: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!("# (", any_but_eol!(), r"*?)(?:\n|$)"),
        r#"<h1 class="text-2xl font-bold mt-6 mb-4">${1}</h1>"#,
    )
});

static BOLD: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!(r"\*\*(", any_but_eol!(), r"*?)\*\*"),
        "<strong>${1}</strong>",
    )
});

static ITALIC: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(concat!(r"\*(", any_but_eol!(), r"*?)\*"), "<em>${1}</em>")
});

static INLINE_CODE: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!("`(", any_but_eol!(), "*?)`"),
        r#"<code class="bg-slate-800 px-1 rounded text-pink-400">${1}</code>"#,
    )
});

static FENCED_CODE: LazyLock<Rule> = LazyLock::new(|| {
    Rule::new(
        concat!("```(?:", any_but_eol!(), r"*?)\n([\s\S]*?)```"),
        r#"<pre class="bg-slate-900 p-3 rounded-lg my-3 overflow-x-auto border border-slate-700"><code class="text-sm text-cyan-300">${1}</code></pre>"#,
    )
});

static LINE_BREAK: LazyLock<Rule> =
    LazyLock::new(|| Rule::new(r"\n", "<br />"));

/// Converts the markdown-lite `raw` text into HTML markup.
///
/// Total and deterministic: any input is accepted and the same input always
/// yields the same output.
pub fn format(raw: &str) -> String {
    let rules: [&Rule; 8] = [
        &HEADING_3,
        &HEADING_2,
        &HEADING_1,
        &BOLD,
        &ITALIC,
        &INLINE_CODE,
        &FENCED_CODE,
        &LINE_BREAK,
    ];
    rules
        .iter()
        .fold(raw.to_owned(), |text, rule| rule.apply(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = r#"<h1 class="text-2xl font-bold mt-6 mb-4">"#;
    const H2: &str = r#"<h2 class="text-xl font-bold mt-5 mb-3">"#;
    const H3: &str = r#"<h3 class="text-lg font-bold mt-4 mb-2">"#;
    const CODE: &str = r#"<code class="bg-slate-800 px-1 rounded text-pink-400">"#;

    #[test]
    fn test_heading_and_emphasis() {
        assert_eq!(
            format("# Hi\n**bold** and *it*"),
            format!("{H1}Hi</h1><strong>bold</strong> and <em>it</em>")
        );
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            format("### Three\n## Two\n# One"),
            format!("{H3}Three</h3>{H2}Two</h2>{H1}One</h1>")
        );
    }

    #[test]
    fn test_heading_not_anchored() {
        assert_eq!(format("see # this"), format!("see {H1}this</h1>"));
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(format("a\nb\n"), "a<br />b<br />");
        assert_eq!(format(""), "");
    }

    #[test]
    fn test_unmatched_markers() {
        assert_eq!(format("2 * 3 = 6"), "2 * 3 = 6");
        // The lone pair of asterisks is an empty emphasis.
        assert_eq!(format("**open"), "<em></em>open");
        assert_eq!(format("*open"), "*open");
        assert_eq!(format("a `tick"), "a `tick");
    }

    #[test]
    fn test_bold_before_italic() {
        assert_eq!(
            format("**a** and *b* and **c**"),
            "<strong>a</strong> and <em>b</em> and <strong>c</strong>"
        );
    }

    #[test]
    fn test_emphasis_does_not_cross_lines() {
        assert_eq!(format("*a\nb*"), "*a<br />b*");
        assert_eq!(format("*a\r\nb*"), "*a\r<br />b*");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            format("run `cargo test` now"),
            format!("run {CODE}cargo test</code> now")
        );
    }

    #[test]
    fn test_inline_code_runs_before_fences() {
        // Backtick pairs are consumed by the inline rule first, so a fence
        // never survives to the block rule.
        assert_eq!(
            format("```rust\nlet x = 1;\n```"),
            format!("{CODE}</code>`rust<br />let x = 1;<br />{CODE}</code>`")
        );
    }

    #[test]
    fn test_fenced_block_is_lazy() {
        let pre = r#"<pre class="bg-slate-900 p-3 rounded-lg my-3 overflow-x-auto border border-slate-700"><code class="text-sm text-cyan-300">"#;
        assert_eq!(
            FENCED_CODE.apply("```js\none()\n``` mid ```\ntwo()\n```"),
            format!("{pre}one()\n</code></pre> mid {pre}two()\n</code></pre>")
        );
    }

    #[test]
    fn test_deterministic() {
        let input = "## Title\nSome **bold**, *it*, `code`.\n";
        assert_eq!(format(input), format(input));
    }
}
