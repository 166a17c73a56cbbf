//! Terminal rendering for streamed transcripts
//!
//! The backend writes lightweight markup: ATX headings, `**strong**`,
//! `*emphasis*`, `` `code` ``, fenced blocks, list items and paragraphs.
//! Text arrives in arbitrary fragments, so [`MarkupRenderer`] buffers until a
//! line is complete. Every emitted line fits the width; tokens longer than
//! the width (URLs, identifiers) are split rather than overflowing.

use colored::*;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_WIDTH: usize = 80;
const MIN_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
  Plain,
  Strong,
  Emphasis,
  Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
  text: String,
  style: Style,
  /// No whitespace between this word and the previous one
  glued: bool,
}

fn inline_pattern() -> Option<&'static Regex> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  PATTERN
    .get_or_init(|| {
      Regex::new(concat!(
        r"(?P<code>`[^`]+`)",
        r"|(?P<strong>\*\*[^*]+?\*\*|__[^_]+?__)",
        r"|(?P<em>\*[^*\s][^*]*?\*|\b_[^_]+_\b)",
      ))
      .ok()
    })
    .as_ref()
}

fn heading_pattern() -> Option<&'static Regex> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$").ok()).as_ref()
}

fn list_pattern() -> Option<&'static Regex> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^(\s*)([-*+]|\d+[.)])\s+(.*)$").ok()).as_ref()
}

/// Split `text` into words, marking whether each one touches its predecessor
fn push_words(words: &mut Vec<Word>, text: &str, style: Style, glued_start: bool) {
  let mut glued = glued_start && !text.starts_with(char::is_whitespace);
  for word in text.split_whitespace() {
    words.push(Word { text: word.to_string(), style, glued });
    glued = false;
  }
}

fn parse_inline(line: &str) -> Vec<Word> {
  let mut words = Vec::new();
  let mut last = 0;

  let Some(pattern) = inline_pattern() else {
    push_words(&mut words, line, Style::Plain, false);
    return words;
  };

  for caps in pattern.captures_iter(line) {
    let Some(whole) = caps.get(0) else { continue };

    let before = &line[last..whole.start()];
    push_words(&mut words, before, Style::Plain, last > 0 && !line[..last].ends_with(' '));

    let (style, inner) = if caps.name("code").is_some() {
      (Style::Code, &whole.as_str()[1..whole.len() - 1])
    } else if caps.name("strong").is_some() {
      (Style::Strong, &whole.as_str()[2..whole.len() - 2])
    } else {
      (Style::Emphasis, &whole.as_str()[1..whole.len() - 1])
    };

    let glued = whole.start() > 0 && !line[..whole.start()].ends_with(char::is_whitespace);
    push_words(&mut words, inner, style, glued);
    last = whole.end();
  }

  let rest = &line[last..];
  push_words(&mut words, rest, Style::Plain, last > 0);
  words
}

/// Display columns taken by `text`; wide CJK characters and emoji count as two
fn text_width(text: &str) -> usize {
  console::measure_text_width(text)
}

fn char_width(c: char) -> usize {
  let mut buf = [0u8; 4];
  text_width(c.encode_utf8(&mut buf))
}

/// Split a token into chunks of at most `width` columns
fn hard_split(text: &str, width: usize) -> Vec<String> {
  let width = width.max(1);
  let mut chunks = Vec::new();
  let mut chunk = String::new();
  let mut used = 0;

  for c in text.chars() {
    let w = char_width(c);
    if used + w > width && !chunk.is_empty() {
      chunks.push(std::mem::take(&mut chunk));
      used = 0;
    }
    chunk.push(c);
    used += w;
  }

  if !chunk.is_empty() || chunks.is_empty() {
    chunks.push(chunk);
  }
  chunks
}

/// Drop leading indentation (then cut) until `prefix` takes at most `max` columns
fn fit_prefix(prefix: &str, max: usize) -> String {
  let mut fitted = prefix;
  while text_width(fitted) > max {
    match fitted.strip_prefix(char::is_whitespace) {
      Some(rest) => fitted = rest,
      None => break,
    }
  }
  if text_width(fitted) <= max {
    return fitted.to_string();
  }
  hard_split(fitted, max).into_iter().next().unwrap_or_default()
}

/// Greedy word wrap. Over-long words are split so no line exceeds `width`.
fn wrap_words(words: Vec<Word>, width: usize) -> Vec<Vec<Word>> {
  let width = width.max(1);
  let mut lines: Vec<Vec<Word>> = Vec::new();
  let mut current: Vec<Word> = Vec::new();
  let mut current_len = 0;

  for word in words {
    let len = text_width(&word.text);

    if len > width {
      if !current.is_empty() {
        lines.push(std::mem::take(&mut current));
        current_len = 0;
      }
      let mut chunks = hard_split(&word.text, width);
      let tail = chunks.pop().unwrap_or_default();
      for chunk in chunks {
        lines.push(vec![Word { text: chunk, style: word.style, glued: false }]);
      }
      current_len = text_width(&tail);
      current.push(Word { text: tail, style: word.style, glued: false });
      continue;
    }

    let gap = if current.is_empty() || word.glued { 0 } else { 1 };
    if !current.is_empty() && current_len + gap + len > width {
      lines.push(std::mem::take(&mut current));
      current_len = 0;
    }

    current_len += if current.is_empty() { len } else { gap + len };
    current.push(word);
  }

  if !current.is_empty() {
    lines.push(current);
  }
  lines
}

fn paint(text: &str, style: Style, styled: bool) -> String {
  if !styled {
    return text.to_string();
  }
  match style {
    Style::Plain => text.to_string(),
    Style::Strong => text.bold().to_string(),
    Style::Emphasis => text.italic().to_string(),
    Style::Code => text.yellow().to_string(),
  }
}

fn join_words(words: &[Word], styled: bool) -> String {
  let mut line = String::new();
  for (i, word) in words.iter().enumerate() {
    if i > 0 && !word.glued {
      line.push(' ');
    }
    line.push_str(&paint(&word.text, word.style, styled));
  }
  line
}

/// Incremental renderer for one transcript
#[derive(Debug, Clone)]
pub struct MarkupRenderer {
  width: usize,
  styled: bool,
  pending: String,
  in_code_block: bool,
}

impl MarkupRenderer {
  /// Colored output wrapped at `width`
  pub fn new(width: usize) -> Self {
    Self { width: width.max(MIN_WIDTH), styled: true, pending: String::new(), in_code_block: false }
  }

  /// Markers stripped, no colors
  pub fn plain(width: usize) -> Self {
    Self { styled: false, ..Self::new(width) }
  }

  /// Width of stdout when it is a terminal, 80 columns otherwise
  pub fn for_terminal() -> Self {
    let width = console::Term::stdout()
      .size_checked()
      .map(|(_, cols)| cols as usize)
      .unwrap_or(DEFAULT_WIDTH);
    Self::new(width)
  }

  /// Feed a fragment; returns the lines it completed
  pub fn push(&mut self, fragment: &str) -> Vec<String> {
    self.pending.push_str(fragment);

    let mut lines = Vec::new();
    while let Some(pos) = self.pending.find('\n') {
      let line: String = self.pending.drain(..=pos).collect();
      lines.extend(self.render_line(line.trim_end_matches(['\n', '\r'])));
    }
    lines
  }

  /// Render whatever is left after the last newline
  pub fn finish(&mut self) -> Vec<String> {
    if self.pending.is_empty() {
      return Vec::new();
    }
    let rest = std::mem::take(&mut self.pending);
    self.render_line(&rest)
  }

  fn render_line(&mut self, line: &str) -> Vec<String> {
    if line.trim_start().starts_with("```") {
      self.in_code_block = !self.in_code_block;
      return Vec::new();
    }

    if self.in_code_block {
      return hard_split(line, self.width)
        .into_iter()
        .map(|chunk| if self.styled { chunk.dimmed().to_string() } else { chunk })
        .collect();
    }

    if line.trim().is_empty() {
      return vec![String::new()];
    }

    if let Some(caps) = heading_pattern().and_then(|p| p.captures(line)) {
      let level = caps.get(1).map_or(1, |m| m.len());
      let text = caps.get(2).map_or("", |m| m.as_str());
      return self.render_heading(level, text);
    }

    if let Some(caps) = list_pattern().and_then(|p| p.captures(line)) {
      let indent = caps.get(1).map_or(String::new(), |m| m.as_str().replace('\t', "  "));
      let marker = caps.get(2).map_or("-", |m| m.as_str());
      let body = caps.get(3).map_or("", |m| m.as_str());
      let bullet = if marker.chars().all(|c| "-*+".contains(c)) { "•" } else { marker };
      return self.render_prefixed(&format!("{indent}{bullet} "), body);
    }

    if let Some(quote) = line.trim_start().strip_prefix('>') {
      return self.render_prefixed("│ ", quote.trim_start());
    }

    wrap_words(parse_inline(line), self.width)
      .iter()
      .map(|words| join_words(words, self.styled))
      .collect()
  }

  fn render_heading(&self, level: usize, text: &str) -> Vec<String> {
    let words: Vec<Word> = parse_inline(text)
      .into_iter()
      .map(|w| Word { style: Style::Plain, ..w })
      .collect();

    wrap_words(words, self.width)
      .iter()
      .map(|words| {
        let line = join_words(words, false);
        match (self.styled, level) {
          (false, _) => line,
          (true, 1 | 2) => line.cyan().bold().underline().to_string(),
          (true, _) => line.bold().to_string(),
        }
      })
      .collect()
  }

  /// Wrap `body` after a first-line prefix, with a hanging indent of the same
  /// width. Deeply nested prefixes lose indentation so the body keeps at least
  /// half the line.
  fn render_prefixed(&self, prefix: &str, body: &str) -> Vec<String> {
    let prefix = fit_prefix(prefix, self.width / 2);
    let prefix_len = text_width(&prefix);
    let hanging = " ".repeat(prefix_len);
    let available = self.width.saturating_sub(prefix_len).max(1);

    wrap_words(parse_inline(body), available)
      .iter()
      .enumerate()
      .map(|(i, words)| {
        let lead = if i == 0 { prefix.as_str() } else { hanging.as_str() };
        format!("{lead}{}", join_words(words, self.styled))
      })
      .collect()
  }
}

/// Render a complete transcript in one go
pub fn render_markup(text: &str, width: usize, styled: bool) -> Vec<String> {
  let mut renderer = if styled { MarkupRenderer::new(width) } else { MarkupRenderer::plain(width) };
  let mut lines = renderer.push(text);
  lines.extend(renderer.finish());
  lines
}
