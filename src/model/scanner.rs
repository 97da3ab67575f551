// File: ./src/model/scanner.rs
use crate::model::parser::ParseOptions;
use std::ops::Range;

const BUILTIN_SCHEMES: [&str; 2] = ["https", "http"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyntaxType {
    Text,
    Done,
    Priority,
    /// A second priority letter in the head of the line. Left as title text.
    DuplicatePriority,
    Tag,
    Project,
    Context,
    Link,
    Special,
    Due,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken<'a> {
    pub kind: SyntaxType,
    pub range: Range<usize>,
    /// The whole matched slice, `&line[range]`.
    pub text: &'a str,
    /// Identifier of a `{key:value}` attribute.
    pub key: Option<&'a str>,
    /// Tag/project/context name, link target or attribute value.
    pub value: Option<&'a str>,
    pub value_range: Option<Range<usize>>,
}

impl<'a> SyntaxToken<'a> {
    fn new(kind: SyntaxType, line: &'a str, range: Range<usize>) -> Self {
        Self {
            kind,
            text: &line[range.clone()],
            range,
            key: None,
            value: None,
            value_range: None,
        }
    }

    fn with_value(mut self, line: &'a str, range: Range<usize>) -> Self {
        self.value = Some(&line[range.clone()]);
        self.value_range = Some(range);
        self
    }
}

/// Walks one line left to right and yields tokens lazily. A clone taken before
/// iterating replays the same tokens.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    line: &'a str,
    pos: usize,
    done_symbol: &'a str,
    link_schemes: &'a [String],
    /// Only the completion marker and a priority letter have been seen so far.
    at_head: bool,
    done_seen: bool,
    priority_seen: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(line: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            line,
            pos: 0,
            done_symbol: options.done_symbol.as_str(),
            link_schemes: &options.link_schemes,
            at_head: true,
            done_seen: false,
            priority_seen: false,
        }
    }

    fn at_word_start(&self) -> bool {
        self.line[..self.pos]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace)
    }

    /// Length of a link starting at `at`, if one does.
    fn link_len(&self, at: usize) -> Option<usize> {
        let rest = &self.line[at..];
        let custom = self
            .link_schemes
            .iter()
            .map(|s| s.trim().trim_end_matches("://"))
            .filter(|s| !s.is_empty());
        let scheme_len = BUILTIN_SCHEMES
            .into_iter()
            .chain(custom)
            .filter_map(|name| {
                let head = rest.get(..name.len())?;
                let sep = rest.get(name.len()..name.len() + 3)?;
                (head.eq_ignore_ascii_case(name) && sep == "://").then_some(name.len() + 3)
            })
            .max()?;
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        (len > scheme_len).then_some(len)
    }

    fn scan_done(&self, rest: &str) -> Option<Range<usize>> {
        if self.done_symbol.is_empty() {
            return None;
        }
        let after = rest.strip_prefix(self.done_symbol)?;
        let trailing = after.len() - after.trim_start().len();
        (trailing > 0).then(|| self.pos..self.pos + self.done_symbol.len() + trailing)
    }

    fn scan_priority(&self, rest: &str) -> Option<Range<usize>> {
        let mut chars = rest.chars();
        let letter = chars.next()?;
        let next = chars.next()?;
        (letter.is_ascii_uppercase() && next.is_whitespace()).then(|| self.pos..self.pos + 1)
    }

    fn scan_sigil(&self, rest: &str) -> Option<SyntaxToken<'a>> {
        let kind = match rest.chars().next()? {
            '#' => SyntaxType::Tag,
            '+' => SyntaxType::Project,
            '@' => SyntaxType::Context,
            _ => return None,
        };
        let name = &rest[1..];
        let len = name.find(|c: char| !is_word_char(c)).unwrap_or(name.len());
        if len == 0 {
            return None;
        }
        let start = self.pos;
        Some(
            SyntaxToken::new(kind, self.line, start..start + 1 + len)
                .with_value(self.line, start + 1..start + 1 + len),
        )
    }

    /// `{key}` or `{key:value}`; the value runs to the first `}`.
    fn scan_special(&self, at: usize) -> Option<SyntaxToken<'a>> {
        let rest = self.line[at..].strip_prefix('{')?;
        let close = rest.find('}')?;
        let body = &rest[..close];
        let (key, value) = match body.split_once(':') {
            Some((k, v)) => (k, Some(v)),
            None => (body, None),
        };
        if key.is_empty() || !key.chars().all(is_word_char) {
            return None;
        }
        let kind = if key == "due" {
            SyntaxType::Due
        } else {
            SyntaxType::Special
        };
        let range = at..at + close + 2;
        let mut token = SyntaxToken::new(kind, self.line, range);
        token.key = Some(&self.line[at + 1..at + 1 + key.len()]);
        if let Some(v) = value {
            let value_start = at + 2 + key.len();
            token = token.with_value(self.line, value_start..value_start + v.len());
        }
        Some(token)
    }

    /// Plain text up to whitespace, or up to where a link or attribute begins.
    fn scan_text(&self) -> SyntaxToken<'a> {
        let start = self.pos;
        let mut end = self.line.len();
        for (offset, c) in self.line[start..].char_indices() {
            let at = start + offset;
            if c.is_whitespace() {
                end = at;
                break;
            }
            if offset > 0 && (self.link_len(at).is_some() || self.scan_special(at).is_some()) {
                end = at;
                break;
            }
        }
        SyntaxToken::new(SyntaxType::Text, self.line, start..end)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = SyntaxToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.line[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
        if self.pos >= self.line.len() {
            return None;
        }
        let rest = &self.line[self.pos..];

        let token = if let Some(len) = self.link_len(self.pos) {
            let range = self.pos..self.pos + len;
            let token = SyntaxToken::new(SyntaxType::Link, self.line, range.clone());
            self.at_head = false;
            token.with_value(self.line, range)
        } else if let Some(token) = self.scan_special(self.pos) {
            self.at_head = false;
            token
        } else if self.at_word_start() {
            if self.at_head
                && !self.done_seen
                && !self.priority_seen
                && let Some(range) = self.scan_done(rest)
            {
                self.done_seen = true;
                SyntaxToken::new(SyntaxType::Done, self.line, range)
            } else if self.at_head
                && let Some(range) = self.scan_priority(rest)
            {
                let kind = if self.priority_seen {
                    self.at_head = false;
                    SyntaxType::DuplicatePriority
                } else {
                    self.priority_seen = true;
                    SyntaxType::Priority
                };
                SyntaxToken::new(kind, self.line, range.clone()).with_value(self.line, range)
            } else if let Some(token) = self.scan_sigil(rest) {
                self.at_head = false;
                token
            } else {
                self.at_head = false;
                self.scan_text()
            }
        } else {
            self.at_head = false;
            self.scan_text()
        };

        self.pos = token.range.end;
        Some(token)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '/'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<(SyntaxType, String)> {
        let options = ParseOptions::default();
        Scanner::new(line, &options)
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn recognises_each_family() {
        let line = "x A call #mom +family @phone {due:2023-01-10} https://a.b/#x {h}";
        let got = kinds(line);
        let expected = [
            (SyntaxType::Done, "x "),
            (SyntaxType::Priority, "A"),
            (SyntaxType::Text, "call"),
            (SyntaxType::Tag, "#mom"),
            (SyntaxType::Project, "+family"),
            (SyntaxType::Context, "@phone"),
            (SyntaxType::Due, "{due:2023-01-10}"),
            (SyntaxType::Link, "https://a.b/#x"),
            (SyntaxType::Special, "{h}"),
        ];
        assert_eq!(got.len(), expected.len());
        for ((kind, text), (want_kind, want_text)) in got.iter().zip(expected) {
            assert_eq!(*kind, want_kind);
            assert_eq!(text, want_text);
        }
    }

    #[test]
    fn priority_only_in_head_position() {
        let got = kinds("task A later");
        assert!(got.iter().all(|(k, _)| *k == SyntaxType::Text));

        let got = kinds("A B task");
        assert_eq!(got[0].0, SyntaxType::Priority);
        assert_eq!(got[1].0, SyntaxType::DuplicatePriority);
        assert_eq!(got[2].0, SyntaxType::Text);
    }

    #[test]
    fn tag_inside_link_is_not_a_tag() {
        let options = ParseOptions::default();
        let tokens: Vec<_> = Scanner::new("see http://host/page#anchor", &options).collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, SyntaxType::Link);
        assert_eq!(tokens[1].range, 4..27);
    }

    #[test]
    fn custom_link_scheme() {
        let options = ParseOptions {
            link_schemes: vec!["obsidian".to_string()],
            ..ParseOptions::default()
        };
        let tokens: Vec<_> = Scanner::new("open obsidian://vault/note", &options).collect();
        assert_eq!(tokens[1].kind, SyntaxType::Link);
        assert_eq!(tokens[1].value, Some("obsidian://vault/note"));
    }

    #[test]
    fn special_value_may_contain_spaces() {
        let options = ParseOptions::default();
        let tokens: Vec<_> = Scanner::new("a {note:two words} b", &options).collect();
        assert_eq!(tokens[1].kind, SyntaxType::Special);
        assert_eq!(tokens[1].key, Some("note"));
        assert_eq!(tokens[1].value, Some("two words"));
        assert_eq!(tokens[1].value_range, Some(8..17));
    }

    #[test]
    fn lone_sigils_and_open_braces_are_text() {
        let got = kinds("# + @ {oops");
        assert!(got.iter().all(|(k, _)| *k == SyntaxType::Text));
    }

    #[test]
    fn scanning_is_restartable() {
        let options = ParseOptions::default();
        let scanner = Scanner::new("B fix #bug", &options);
        let first: Vec<_> = scanner.clone().collect();
        let second: Vec<_> = scanner.collect();
        assert_eq!(first, second);
    }
}
