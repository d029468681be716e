//! Serialization of the stylesheet model back to CSS text.
//!
//! Two modes share one code path: compact (`minify`) keeps one top-level
//! block per line, formatted uses 2-space indentation with one declaration
//! per line. Adjacent rules under the same media query collapse into a
//! single `@media` block, and selector-list members are re-grouped into
//! their source comma list, emitted when the first member is reached.

use std::collections::HashSet;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::declaration::Declaration;
use crate::error::PrinterError;
use crate::printer::{MediaFilter, Printer, PrinterOptions};
use crate::rules::{AtRule, AtRuleContent, CssRule, StyleRule};
use crate::stylesheet::StyleSheet;
use crate::traits::ToCss;

impl StyleSheet {
  /// Compact CSS text: one top-level block per line.
  pub fn to_css_string(&self) -> String {
    self.to_css(PrinterOptions {
      minify: true,
      media: MediaFilter::All,
    })
  }

  /// Formatted CSS text with 2-space indentation.
  pub fn to_css_formatted(&self) -> String {
    self.to_css(PrinterOptions {
      minify: false,
      media: MediaFilter::All,
    })
  }

  /// Serializes with explicit options. Serialization itself cannot fail;
  /// a dangling index here is a bug in a mutation and panics.
  pub fn to_css(&self, options: PrinterOptions) -> String {
    let mut dest = String::new();
    let mut printer = Printer::new(&mut dest, options.minify);
    self
      .serialize(&mut printer, &options)
      .expect("writing to a String cannot fail");
    dest
  }

  fn serialize<W: std::fmt::Write>(
    &self,
    dest: &mut Printer<W>,
    options: &PrinterOptions,
  ) -> Result<(), PrinterError> {
    if let Some(charset) = &self.charset {
      write!(dest, "@charset \"{}\";", charset)?;
      dest.newline()?;
    }

    let mut emitted_lists: HashSet<u32> = HashSet::new();
    let mut emit: Vec<&CssRule> = Vec::new();
    for rule in &self.rules {
      if !self.should_emit(rule, options) {
        continue;
      }
      if let Some(list_id) = rule.selector_list_id() {
        if !emitted_lists.insert(list_id) {
          continue;
        }
      }
      emit.push(rule);
    }

    let mut first = true;
    let grouped = emit.into_iter().group_by(|r| r.media_query_id());
    for (media_id, group) in &grouped {
      if first {
        first = false;
      } else {
        dest.newline()?;
      }
      match media_id {
        None => {
          for (i, rule) in group.enumerate() {
            if i > 0 {
              dest.newline()?;
            }
            self.rule_to_css(rule, dest)?;
          }
        }
        Some(id) => {
          write!(dest, "@media {}", self.media_header(id))?;
          dest.whitespace()?;
          dest.write_char('{')?;
          dest.indent();
          for rule in group {
            dest.newline()?;
            self.rule_to_css(rule, dest)?;
          }
          dest.dedent();
          dest.newline()?;
          dest.write_char('}')?;
        }
      }
    }
    if !first {
      dest.newline()?;
    }
    Ok(())
  }

  fn should_emit(&self, rule: &CssRule, options: &PrinterOptions) -> bool {
    let types = match &options.media {
      MediaFilter::All => return true,
      MediaFilter::Only(_) if options.media.is_all() => return true,
      MediaFilter::Only(types) => types,
    };
    match rule {
      // Formatted output always carries the base rules alongside the
      // requested media; compact output emits the requested media only.
      CssRule::At(_) => !options.minify,
      CssRule::Style(style) => {
        if style.is_base() {
          return !options.minify;
        }
        types.iter().any(|ty| {
          self
            .media_index()
            .get(ty)
            .is_some_and(|ids| ids.binary_search(&style.id).is_ok())
        })
      }
    }
  }

  /// The `@media` prelude for a query id: the full comma list when the
  /// query belongs to one, otherwise its own text.
  fn media_header(&self, id: u32) -> String {
    match self.media_query_lists.values().find(|ids| ids.contains(&id)) {
      Some(ids) => ids
        .iter()
        .filter_map(|i| self.media_queries.get(*i as usize))
        .map(|q| q.text())
        .join(", "),
      None => self.media_queries[id as usize].text(),
    }
  }

  fn rule_to_css<W: std::fmt::Write>(
    &self,
    rule: &CssRule,
    dest: &mut Printer<W>,
  ) -> Result<(), PrinterError> {
    match rule {
      CssRule::Style(style) => {
        self.selector_to_css(style, dest)?;
        dest.whitespace()?;
        declarations_block(&style.declarations, dest)
      }
      CssRule::At(at) => at.to_css(dest),
    }
  }

  fn selector_to_css<W: std::fmt::Write>(
    &self,
    rule: &StyleRule,
    dest: &mut Printer<W>,
  ) -> Result<(), PrinterError> {
    if let Some(list_id) = rule.selector_list_id {
      if let Some(members) = self.selector_lists.get(&list_id) {
        if members.len() > 1 {
          for (i, id) in members.iter().enumerate() {
            if i > 0 {
              dest.write_char(',')?;
              dest.whitespace()?;
            }
            let member = self.rules[*id as usize]
              .as_style()
              .expect("selector list member is a style rule");
            dest.write_str(&member.selector)?;
          }
          return Ok(());
        }
      }
    }
    dest.write_str(&rule.selector)
  }
}

/// Renders `{ ... }` for a declaration list in the current mode.
fn declarations_block<W: std::fmt::Write>(
  declarations: &[Declaration],
  dest: &mut Printer<W>,
) -> Result<(), PrinterError> {
  dest.write_char('{')?;
  if declarations.is_empty() {
    dest.whitespace()?;
    return dest.write_char('}');
  }
  if dest.minify {
    for decl in declarations {
      dest.whitespace()?;
      decl.to_css(dest)?;
    }
    dest.whitespace()?;
    dest.write_char('}')
  } else {
    dest.indent();
    for decl in declarations {
      dest.newline()?;
      decl.to_css(dest)?;
    }
    dest.dedent();
    dest.newline()?;
    dest.write_char('}')
  }
}

impl ToCss for AtRule {
  fn to_css<W>(&self, dest: &mut Printer<W>) -> Result<(), PrinterError>
  where
    W: std::fmt::Write,
  {
    dest.write_str(&self.selector)?;
    dest.whitespace()?;
    match &self.content {
      AtRuleContent::Declarations(declarations) => declarations_block(declarations, dest),
      AtRuleContent::Rules(stops) => {
        dest.write_char('{')?;
        if dest.minify {
          for stop in stops {
            dest.whitespace()?;
            dest.write_str(&stop.selector)?;
            dest.whitespace()?;
            declarations_block(&stop.declarations, dest)?;
          }
          dest.whitespace()?;
          dest.write_char('}')
        } else {
          dest.indent();
          for stop in stops {
            dest.newline()?;
            dest.write_str(&stop.selector)?;
            dest.whitespace()?;
            declarations_block(&stop.declarations, dest)?;
          }
          dest.dedent();
          dest.newline()?;
          dest.write_char('}')
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::media_query::MediaType;
  use crate::parser::ParserOptions;
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  fn sheet(css: &str) -> StyleSheet {
    StyleSheet::parse(css, ParserOptions::default()).unwrap()
  }

  #[test]
  fn compact_one_block_per_line() {
    let s = sheet(".a { color: red; margin: 0 } .b{color:blue}");
    assert_eq!(
      s.to_css_string(),
      ".a { color: red; margin: 0; }\n.b { color: blue; }\n"
    );
  }

  #[test]
  fn selector_lists_round_trip() {
    let s = sheet("h1, h2 { color: red; }");
    assert_eq!(s.to_css_string(), "h1, h2 { color: red; }\n");
  }

  #[test]
  fn adjacent_media_rules_share_a_block() {
    let s = sheet("@media screen { .a { color: red; } .b { color: blue; } }");
    assert_eq!(
      s.to_css_string(),
      "@media screen {\n.a { color: red; }\n.b { color: blue; }\n}\n"
    );
  }

  #[test]
  fn formatted_output() {
    let s = sheet("@media screen and (max-width: 600px) { .a { color: red; } } .b { margin: 0; }");
    assert_eq!(
      s.to_css_formatted(),
      indoc! {"
        @media screen and (max-width: 600px) {
          .a {
            color: red;
          }
        }
        .b {
          margin: 0;
        }
      "}
    );
  }

  #[test]
  fn charset_comes_first() {
    let s = sheet("@charset \"utf-8\"; .a { color: red; }");
    assert_eq!(
      s.to_css_string(),
      "@charset \"utf-8\";\n.a { color: red; }\n"
    );
  }

  #[test]
  fn important_is_emitted() {
    let s = sheet(".a { color: red !important; }");
    assert_eq!(s.to_css_string(), ".a { color: red !important; }\n");
  }

  #[test]
  fn keyframes_render_nested_blocks() {
    let s = sheet("@keyframes spin { from { opacity: 0; } to { opacity: 1; } }");
    assert_eq!(
      s.to_css_string(),
      "@keyframes spin { from { opacity: 0; } to { opacity: 1; } }\n"
    );
    assert_eq!(
      s.to_css_formatted(),
      indoc! {"
        @keyframes spin {
          from {
            opacity: 0;
          }
          to {
            opacity: 1;
          }
        }
      "}
    );
  }

  #[test]
  fn compact_media_filter_excludes_base_rules() {
    let s = sheet(".base { color: red; } @media print { .p { margin: 0; } }");
    let out = s.to_css(PrinterOptions {
      minify: true,
      media: MediaFilter::Only(vec![MediaType::Print]),
    });
    assert_eq!(out, "@media print {\n.p { margin: 0; }\n}\n");
  }

  #[test]
  fn formatted_media_filter_keeps_base_rules() {
    let s = sheet(".base { color: red; } @media print { .p { margin: 0; } } \
                   @media screen { .s { margin: 0; } }");
    let out = s.to_css(PrinterOptions {
      minify: false,
      media: MediaFilter::Only(vec![MediaType::Print]),
    });
    assert!(out.contains(".base"));
    assert!(out.contains(".p"));
    assert!(!out.contains(".s"));
  }

  #[test]
  fn compound_media_lists_round_trip() {
    let s = sheet("@media screen, print { .a { color: red; } }");
    assert_eq!(
      s.to_css_string(),
      "@media screen, print {\n.a { color: red; }\n}\n"
    );
  }
}
