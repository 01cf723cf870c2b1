//! Markdown to styled-line rendering
//!
//! Rendering is not incremental: callers pass the whole accumulated source
//! every time, because a partial span (an unterminated code fence, a lone
//! `**`) can change meaning once more text arrives.

/// Converts markdown source into a safe, styled document.
pub trait MarkdownRenderer: Send {
    fn render(&self, source: &str) -> RenderedContent;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedContent {
    pub lines: Vec<RenderedLine>,
}

impl RenderedContent {
    /// Visible text without styling, one line per rendered line
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub kind: LineKind,
    pub spans: Vec<StyledSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Text,
    Heading(u8),
    Bullet,
    /// Ordered list item carrying its marker, e.g. `"3."`
    Ordered(String),
    Quote,
    Code,
    Rule,
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

impl StyledSpan {
    fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Default renderer for terminal front ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMarkdown;

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, source: &str) -> RenderedContent {
        let source = sanitize(source);
        let mut lines = Vec::new();
        let mut fence: Option<char> = None;

        for line in source.split('\n') {
            let trimmed = line.trim_start();

            if let Some(marker) = fence_marker(trimmed) {
                match fence {
                    Some(open) if open == marker => fence = None,
                    Some(_) => lines.push(code_line(line)),
                    None => fence = Some(marker),
                }
                continue;
            }

            if fence.is_some() {
                lines.push(code_line(line));
                continue;
            }

            lines.push(render_block_line(trimmed));
        }

        RenderedContent { lines }
    }
}

/// Strip control characters so streamed text cannot emit terminal escapes
fn sanitize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn fence_marker(trimmed: &str) -> Option<char> {
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

fn code_line(line: &str) -> RenderedLine {
    RenderedLine {
        kind: LineKind::Code,
        spans: vec![StyledSpan {
            text: line.to_string(),
            code: true,
            ..Default::default()
        }],
    }
}

fn render_block_line(trimmed: &str) -> RenderedLine {
    if trimmed.is_empty() {
        return RenderedLine {
            kind: LineKind::Blank,
            spans: Vec::new(),
        };
    }

    if let Some((level, rest)) = heading(trimmed) {
        let spans = parse_inline(rest)
            .into_iter()
            .map(|mut s| {
                s.bold = true;
                s
            })
            .collect();
        return RenderedLine {
            kind: LineKind::Heading(level),
            spans,
        };
    }

    if is_rule(trimmed) {
        return RenderedLine {
            kind: LineKind::Rule,
            spans: Vec::new(),
        };
    }

    if let Some(rest) = trimmed.strip_prefix('>') {
        return RenderedLine {
            kind: LineKind::Quote,
            spans: parse_inline(rest.strip_prefix(' ').unwrap_or(rest)),
        };
    }

    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            return RenderedLine {
                kind: LineKind::Bullet,
                spans: parse_inline(rest),
            };
        }
    }

    if let Some((marker, rest)) = ordered_item(trimmed) {
        return RenderedLine {
            kind: LineKind::Ordered(marker),
            spans: parse_inline(rest),
        };
    }

    RenderedLine {
        kind: LineKind::Text,
        spans: parse_inline(trimmed),
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level as u8, ""));
    }
    rest.strip_prefix(' ').map(|r| (level as u8, r.trim_end_matches('#').trim_end()))
}

fn is_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], '-' | '*' | '_')
        && compact.iter().all(|c| *c == compact[0])
}

fn ordered_item(line: &str) -> Option<(String, &str)> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &line[digits..];
    let delim = rest.chars().next().filter(|c| *c == '.' || *c == ')')?;
    let body = rest[1..].strip_prefix(' ')?;
    Some((format!("{}{}", &line[..digits], delim), body))
}

/// Parse inline `**bold**`, `*italic*`/`_italic_` and `` `code` `` spans.
/// Markers without a closing partner are kept as literal text.
fn parse_inline(text: &str) -> Vec<StyledSpan> {
    let mut spans: Vec<StyledSpan> = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut current_text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '`' {
            if let Some(end) = find_char(&chars, i + 1, '`') {
                flush(&mut spans, &mut current_text);
                spans.push(StyledSpan {
                    text: chars[i + 1..end].iter().collect(),
                    code: true,
                    ..Default::default()
                });
                i = end + 1;
                continue;
            }
        } else if c == '*' && chars.get(i + 1) == Some(&'*') {
            if let Some(end) = find_double_star(&chars, i + 2) {
                if end > i + 2 {
                    flush(&mut spans, &mut current_text);
                    spans.push(StyledSpan {
                        text: chars[i + 2..end].iter().collect(),
                        bold: true,
                        ..Default::default()
                    });
                    i = end + 2;
                    continue;
                }
            }
            current_text.push_str("**");
            i += 2;
            continue;
        } else if (c == '*' || c == '_') && opens_emphasis(&chars, i) {
            if let Some(end) = find_char(&chars, i + 1, c) {
                if end > i + 1 {
                    flush(&mut spans, &mut current_text);
                    spans.push(StyledSpan {
                        text: chars[i + 1..end].iter().collect(),
                        italic: true,
                        ..Default::default()
                    });
                    i = end + 1;
                    continue;
                }
            }
        }

        current_text.push(c);
        i += 1;
    }

    flush(&mut spans, &mut current_text);
    spans
}

fn flush(spans: &mut Vec<StyledSpan>, current_text: &mut String) {
    if !current_text.is_empty() {
        spans.push(StyledSpan::raw(std::mem::take(current_text)));
    }
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == needle)
}

fn find_double_star(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == '*' && chars[j + 1] == '*')
}

// `snake_case_names` must not turn italic
fn opens_emphasis(chars: &[char], i: usize) -> bool {
    let after_ok = chars.get(i + 1).is_some_and(|c| !c.is_whitespace());
    let before_ok = i == 0 || !chars[i - 1].is_alphanumeric();
    after_ok && (chars[i] == '*' || before_ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> RenderedContent {
        TerminalMarkdown.render(source)
    }

    #[test]
    fn test_plain_paragraph() {
        let out = render("Hi there");
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].kind, LineKind::Text);
        assert_eq!(out.plain_text(), "Hi there");
    }

    #[test]
    fn test_bold_and_italic_spans() {
        let out = render("a **bold** and *soft* word");
        let spans = &out.lines[0].spans;
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[1].text, "bold");
        assert!(spans[1].bold);
        assert_eq!(spans[3].text, "soft");
        assert!(spans[3].italic);
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let out = render("start **never closed");
        assert_eq!(out.plain_text(), "start **never closed");
        assert!(out.lines[0].spans.iter().all(|s| !s.bold));
    }

    #[test]
    fn test_snake_case_is_not_italic() {
        let out = render("call my_func_name now");
        assert_eq!(out.lines[0].spans.len(), 1);
        assert!(!out.lines[0].spans[0].italic);
    }

    #[test]
    fn test_inline_code() {
        let out = render("run `cargo test` please");
        let code: Vec<_> = out.lines[0].spans.iter().filter(|s| s.code).collect();
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].text, "cargo test");
    }

    #[test]
    fn test_block_kinds() {
        let out = render("# Title\n- item\n2. second\n> quoted\n---\n\ntext");
        let kinds: Vec<_> = out.lines.iter().map(|l| l.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Heading(1),
                LineKind::Bullet,
                LineKind::Ordered("2.".to_string()),
                LineKind::Quote,
                LineKind::Rule,
                LineKind::Blank,
                LineKind::Text,
            ]
        );
        assert!(out.lines[0].spans[0].bold);
        assert_eq!(out.lines[3].spans[0].text, "quoted");
    }

    #[test]
    fn test_unterminated_fence_changes_meaning_of_tail() {
        let partial = render("intro\n```\nlet x = **1**;");
        assert_eq!(partial.lines[1].kind, LineKind::Code);
        assert_eq!(partial.lines[1].spans[0].text, "let x = **1**;");

        let complete = render("intro\n```\nlet x = **1**;\n```\n**after**");
        assert_eq!(complete.lines.len(), 3);
        assert_eq!(complete.lines[2].kind, LineKind::Text);
        assert!(complete.lines[2].spans[0].bold);
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let out = render("safe\u{1b}[31mred\u{7}\tend");
        assert_eq!(out.plain_text(), "safe[31mred    end");
    }

    #[test]
    fn test_notice_after_blank_line() {
        let out = render("partial answer\n\n(generation interrupted)");
        assert_eq!(out.lines.len(), 3);
        assert_eq!(out.lines[1].kind, LineKind::Blank);
        assert_eq!(out.lines[2].spans[0].text, "(generation interrupted)");
    }
}
