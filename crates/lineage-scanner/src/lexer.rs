//! Directive-only lexer for Pug templates
//!
//! This is not a Pug parser. It walks the source one character at a time and
//! only stops to look at the first token of each line, where `extends` and
//! `include` statements live. Comment lines, filters and dot-terminated tags
//! open a verbatim block; every line indented deeper than the opener belongs
//! to that block and is skipped wholesale, so keyword-looking text inside
//! `script.` bodies or commented-out markup never produces a directive.

use lineage_core::DirectiveKind;
use regex::Regex;
use std::sync::LazyLock;

/// `extends path`, `include path`, `include:filter(args) path`
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(extends|include)(?::[\w-]+(?:\([^)]*\))?)*[ \t]+(\S.*?)[ \t\r]*$")
        .expect("directive pattern is valid")
});

/// A tag line ending in `.`: `script.`, `p.`, `.note.`, `div#x(a="b").`
static DOT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][\w:-]*|[#.][\w-]+)(?:[#.][\w-]+)*(?:\([^)]*\))?(?:[#.][\w-]+)*\.[ \t\r]*$")
        .expect("dot block pattern is valid")
});

/// A directive as written in the source, before path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirective {
    pub kind: DirectiveKind,
    pub path: String,
    /// 1-based source line.
    pub line: usize,
}

/// Lex `source` and return its directives in source order.
pub fn lex(source: &str) -> Vec<RawDirective> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    at_line_start: bool,
    /// Indentation of enclosing lines; the bottom entry is column 0.
    indents: Vec<usize>,
    /// Baseline indentation of the open verbatim block, if any.
    verbatim: Option<usize>,
    directives: Vec<RawDirective>,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            at_line_start: true,
            indents: vec![0],
            verbatim: None,
            directives: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<RawDirective> {
        while self.pos < self.src.len() {
            if self.at_line_start {
                self.at_line_start = false;
                if self.enter_line() {
                    continue;
                }
                if self.comment() || self.directive() || self.text_block() {
                    continue;
                }
            }
            self.advance();
        }
        self.directives
    }

    /// Measure the indentation of the line at `pos` and update block state.
    /// Returns true when the whole line was consumed (blank or verbatim).
    fn enter_line(&mut self) -> bool {
        let rest = self.line_rest();
        let indent = rest.len() - rest.trim_start_matches([' ', '\t']).len();

        if rest.trim().is_empty() {
            self.consume_line();
            return true;
        }

        if let Some(baseline) = self.verbatim {
            if indent > baseline {
                self.consume_line();
                return true;
            }
            self.verbatim = None;
        }

        while self.indents.len() > 1 && self.indents.last().is_some_and(|&top| top > indent) {
            self.indents.pop();
        }
        if self.indents.last().is_some_and(|&top| indent > top) {
            self.indents.push(indent);
        }

        self.pos += indent;
        false
    }

    /// `//` and `//-` comments; their indented body is verbatim.
    fn comment(&mut self) -> bool {
        if !self.line_rest().starts_with("//") {
            return false;
        }
        self.open_verbatim();
        self.consume_line();
        true
    }

    fn directive(&mut self) -> bool {
        let rest = self.line_rest();
        let Some(caps) = DIRECTIVE.captures(rest) else {
            return false;
        };
        let kind = match &caps[1] {
            "extends" => DirectiveKind::Extends,
            _ => DirectiveKind::Include,
        };
        self.directives.push(RawDirective {
            kind,
            path: caps[2].to_string(),
            line: self.line,
        });
        self.consume_line();
        true
    }

    /// Filters (`:markdown`), dot-terminated tags and bare `-` code blocks
    /// carry raw bodies.
    fn text_block(&mut self) -> bool {
        let rest = self.line_rest();
        let is_code = rest.trim_end() == "-";
        let is_filter = rest
            .strip_prefix(':')
            .and_then(|name| name.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic());
        if !is_code && !is_filter && !DOT_BLOCK.is_match(rest) {
            return false;
        }
        self.open_verbatim();
        self.consume_line();
        true
    }

    fn open_verbatim(&mut self) {
        self.verbatim = self.indents.last().copied();
    }

    /// Source from `pos` up to, not including, the next newline.
    fn line_rest(&self) -> &'s str {
        let rest = &self.src[self.pos..];
        match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }

    fn consume_line(&mut self) {
        match self.src[self.pos..].find('\n') {
            Some(end) => {
                self.pos += end + 1;
                self.line += 1;
                self.at_line_start = true;
            }
            None => self.pos = self.src.len(),
        }
    }

    fn advance(&mut self) {
        let Some(c) = self.src[self.pos..].chars().next() else {
            self.pos = self.src.len();
            return;
        };
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        }
    }
}
