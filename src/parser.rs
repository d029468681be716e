//! The CSS tokenizer/parser.
//!
//! A single forward pass over the raw bytes builds the stylesheet model.
//! All character classification happens on bytes; multi-byte UTF-8
//! sequences only ever appear inside identifiers, strings and values, where
//! they are copied through untouched. There are no regular expressions and
//! no backtracking beyond one-byte lookahead.
//!
//! Recoverable syntax errors (a declaration missing its `:`, an unterminated
//! block at EOF) skip to the next safe point and keep going; the
//! `raise_parse_errors` option upgrades them to hard errors with a source
//! location. Structural limits (nesting depth, media query count, property
//! lengths) always fail.

use std::path::PathBuf;
use std::rc::Rc;

use log::warn;
use smallvec::SmallVec;

use crate::declaration::Declaration;
use crate::error::{Error, ErrorLocation, ParserError};
use crate::importer::ImportOptions;
use crate::media_query::{compose_media_text, MediaQuery};
use crate::rules::{AtRule, AtRuleContent, CssRule, ImportStatement, NestingStyle, StyleRule};
use crate::stylesheet::StyleSheet;

/// Maximum depth of nested blocks (`@media` inside `@supports`, nested
/// selectors, ...).
pub const MAX_PARSE_DEPTH: usize = 10;
/// Maximum number of distinct media queries per stylesheet.
pub const MAX_MEDIA_QUERIES: usize = 1000;
/// Maximum length of a property name.
pub const MAX_PROPERTY_NAME_LENGTH: usize = 256;
/// Maximum length of a property value.
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 32768;

/// Resolves a relative URL reference against a base.
pub trait UriResolver {
  /// Returns the absolute form of `relative` against `base`, or `None` when
  /// the reference cannot be resolved.
  fn resolve(&self, base: &str, relative: &str) -> Option<String>;
}

/// The default resolver, backed by the WHATWG URL algorithm.
pub struct DefaultUriResolver;

impl UriResolver for DefaultUriResolver {
  fn resolve(&self, base: &str, relative: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    base.join(relative).ok().map(|u| u.into())
  }
}

/// Options controlling parsing and loading.
#[derive(Clone)]
pub struct ParserOptions {
  /// Group rules that came from one source comma list so serialization can
  /// re-emit `h1, h2 { ... }`.
  pub selector_lists: bool,
  /// Turn recoverable syntax errors into hard errors.
  pub raise_parse_errors: bool,
  /// Rewrite relative `url(...)` references in values against `base_uri`.
  pub absolute_paths: bool,
  /// Base URI for `url()` rewriting and `load_uri`.
  pub base_uri: Option<String>,
  /// Base directory for `load_file` and file imports.
  pub base_dir: Option<PathBuf>,
  /// Whether `load_file`/`load_uri` propagate I/O errors. When off, failed
  /// loads are logged and return the stylesheet built so far.
  pub io_exceptions: bool,
  /// `@import` resolution: `None` disables it, `Some` enables it with the
  /// given options.
  pub import: Option<ImportOptions>,
  /// Overrides [`DefaultUriResolver`] for `url()` rewriting.
  pub uri_resolver: Option<Rc<dyn UriResolver>>,
}

impl Default for ParserOptions {
  fn default() -> ParserOptions {
    ParserOptions {
      selector_lists: true,
      raise_parse_errors: false,
      absolute_paths: false,
      base_uri: None,
      base_dir: None,
      io_exceptions: true,
      import: None,
      uri_resolver: None,
    }
  }
}

impl std::fmt::Debug for ParserOptions {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("ParserOptions")
      .field("selector_lists", &self.selector_lists)
      .field("raise_parse_errors", &self.raise_parse_errors)
      .field("absolute_paths", &self.absolute_paths)
      .field("base_uri", &self.base_uri)
      .field("base_dir", &self.base_dir)
      .field("io_exceptions", &self.io_exceptions)
      .field("import", &self.import)
      .field("uri_resolver", &self.uri_resolver.as_ref().map(|_| ".."))
      .finish()
  }
}

/// The effective media context while parsing nested blocks: the
/// canonicalized text of the first query plus every query id in the list.
#[derive(Clone)]
struct MediaContext {
  text: String,
  ids: SmallVec<[u32; 2]>,
}

pub(crate) fn parse_into(sheet: &mut StyleSheet, css: &str) -> Result<(), Error<ParserError>> {
  let selector_lists = sheet.options().selector_lists;
  let strict = sheet.options().raise_parse_errors;
  let absolute_paths = sheet.options().absolute_paths;
  let base_uri = sheet.options().base_uri.clone();
  let resolver = sheet.options().uri_resolver.clone();

  let mut parser = Parser {
    input: css,
    bytes: css.as_bytes(),
    pos: 0,
    sheet,
    selector_lists,
    strict,
    absolute_paths,
    base_uri,
    resolver,
    seen_style_rule: false,
  };
  parser.skip_bom();
  parser.parse_rule_list(0, None, true)
}

struct Parser<'i, 's> {
  input: &'i str,
  bytes: &'i [u8],
  pos: usize,
  sheet: &'s mut StyleSheet,
  selector_lists: bool,
  strict: bool,
  absolute_paths: bool,
  base_uri: Option<String>,
  resolver: Option<Rc<dyn UriResolver>>,
  seen_style_rule: bool,
}

impl<'i, 's> Parser<'i, 's> {
  fn skip_bom(&mut self) {
    if self.bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
      self.pos = 3;
    }
  }

  fn eof(&self) -> bool {
    self.pos >= self.bytes.len()
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn location(&self) -> ErrorLocation {
    ErrorLocation::from_offset(self.bytes, self.pos)
  }

  fn soft_error(&self, kind: ParserError) -> Result<(), Error<ParserError>> {
    if self.strict {
      Err(Error::at(kind, self.location()))
    } else {
      warn!("recovered from CSS parse error: {}", kind.reason());
      Ok(())
    }
  }

  fn hard_error<T>(&self, kind: ParserError) -> Result<T, Error<ParserError>> {
    Err(Error::at(kind, self.location()))
  }

  /// Skips whitespace and `/* ... */` comments.
  fn skip_ws_and_comments(&mut self) {
    loop {
      while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
        self.pos += 1;
      }
      if self.peek() == Some(b'/') && self.bytes.get(self.pos + 1) == Some(&b'*') {
        self.pos += 2;
        while self.pos < self.bytes.len() {
          if self.bytes[self.pos] == b'*' && self.bytes.get(self.pos + 1) == Some(&b'/') {
            self.pos += 2;
            break;
          }
          self.pos += 1;
        }
      } else {
        return;
      }
    }
  }

  /// Consumes a quoted string starting at the current position, returning
  /// the unquoted contents.
  fn read_string(&mut self) -> String {
    let quote = self.bytes[self.pos];
    self.pos += 1;
    let start = self.pos;
    while self.pos < self.bytes.len() {
      let b = self.bytes[self.pos];
      if b == b'\\' {
        self.pos += 2;
      } else if b == quote {
        let s = self.input[start..self.pos].to_string();
        self.pos += 1;
        return s;
      } else {
        self.pos += 1;
      }
    }
    self.input[start..].to_string()
  }

  /// Scans forward to the first of the `stops` bytes at bracket depth zero,
  /// skipping strings, comments, `(...)` and `[...]` contents.
  ///
  /// Returns the scanned span and the terminator (`None` at EOF). The
  /// terminator is not consumed.
  fn scan_until(&mut self, stops: &[u8]) -> (usize, usize, Option<u8>) {
    let start = self.pos;
    let mut depth = 0usize;
    while self.pos < self.bytes.len() {
      let b = self.bytes[self.pos];
      match b {
        b'\'' | b'"' => {
          self.read_string();
          continue;
        }
        b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
          let end = self.pos;
          self.skip_ws_and_comments();
          if self.pos == end {
            self.pos += 1;
          }
          continue;
        }
        b'(' | b'[' => depth += 1,
        b')' | b']' => depth = depth.saturating_sub(1),
        _ if depth == 0 && stops.contains(&b) => {
          return (start, self.pos, Some(b));
        }
        _ => {}
      }
      self.pos += 1;
    }
    (start, self.pos, None)
  }

  /// Consumes a balanced `{ ... }` block, assuming the cursor sits on the
  /// opening brace.
  fn skip_block(&mut self) {
    debug_assert_eq!(self.peek(), Some(b'{'));
    let mut depth = 0usize;
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'\'' | b'"' => {
          self.read_string();
          continue;
        }
        b'{' => depth += 1,
        b'}' => {
          depth -= 1;
          if depth == 0 {
            self.pos += 1;
            return;
          }
        }
        _ => {}
      }
      self.pos += 1;
    }
  }

  /// Reads the identifier following `@`.
  fn read_at_name(&mut self) -> &'i str {
    let start = self.pos;
    while self
      .peek()
      .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
      self.pos += 1;
    }
    &self.input[start..self.pos]
  }

  /// The top-level (and nested-group) rule loop.
  fn parse_rule_list(
    &mut self,
    depth: usize,
    media: Option<&MediaContext>,
    top_level: bool,
  ) -> Result<(), Error<ParserError>> {
    loop {
      self.skip_ws_and_comments();
      if self.eof() {
        if !top_level {
          self.soft_error(ParserError::UnterminatedBlock)?;
        }
        return Ok(());
      }
      match self.peek() {
        Some(b'}') => {
          self.pos += 1;
          if top_level {
            self.soft_error(ParserError::MalformedDeclaration("}".into()))?;
            continue;
          }
          return Ok(());
        }
        Some(b'@') => self.parse_at_rule(depth, media)?,
        _ => self.parse_style_rule(depth, media)?,
      }
    }
  }

  fn parse_style_rule(
    &mut self,
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    let (start, end, terminator) = self.scan_until(&[b'{', b';', b'}']);
    match terminator {
      Some(b'{') => {}
      Some(b';') | Some(b'}') => {
        self.pos += 1;
        return self.soft_error(ParserError::MalformedDeclaration(
          self.input[start..end].trim().to_string(),
        ));
      }
      None => {
        return self.soft_error(ParserError::UnexpectedEof);
      }
      _ => unreachable!("scan_until only returns a stop byte or None"),
    }

    let selector_text = &self.input[start..end];
    let members: Vec<String> = split_top_level_commas(selector_text)
      .into_iter()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_string)
      .collect();

    if members.is_empty() {
      warn!("skipping block with empty selector");
      self.skip_block();
      return Ok(());
    }

    let list_id = if self.selector_lists && members.len() > 1 {
      Some(self.sheet.allocate_selector_list())
    } else {
      None
    };

    let mut member_ids: SmallVec<[u32; 4]> = SmallVec::new();
    for selector in &members {
      let id = self.sheet.next_rule_id();
      let mut rule = StyleRule::new(id, selector.clone());
      rule.media_query_id = media.and_then(|m| m.ids.first().copied());
      rule.selector_list_id = list_id;
      if let Some(list_id) = list_id {
        self.sheet.register_selector_list(list_id, id);
      }
      self.sheet.rules.push(CssRule::Style(rule));
      member_ids.push(id);
    }
    self.seen_style_rule = true;

    self.pos += 1; // consume '{'
    self.parse_block(&member_ids, &members, depth + 1, media)
  }

  /// Parses a declaration block, broadcasting declarations to every member
  /// of the selector list and recursing into nested rules.
  fn parse_block(
    &mut self,
    member_ids: &[u32],
    member_selectors: &[String],
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    if depth > MAX_PARSE_DEPTH {
      return self.hard_error(ParserError::DepthLimitExceeded);
    }

    loop {
      self.skip_ws_and_comments();
      if self.eof() {
        return self.soft_error(ParserError::UnterminatedBlock);
      }
      match self.peek() {
        Some(b'}') => {
          self.pos += 1;
          return Ok(());
        }
        Some(b'@') => {
          // The flat model cannot represent at-rules nested inside a style
          // rule; skip the whole construct.
          warn!("skipping at-rule nested inside a declaration block");
          let (_, _, terminator) = self.scan_until(&[b'{', b';', b'}']);
          match terminator {
            Some(b'{') => self.skip_block(),
            Some(b';') => self.pos += 1,
            _ => {}
          }
        }
        _ => {
          let (start, end, terminator) = self.scan_until(&[b'{', b';', b'}']);
          match terminator {
            Some(b'{') => {
              self.pos += 1;
              let selector_text = self.input[start..end].to_string();
              self.parse_nested_rule(&selector_text, member_ids, member_selectors, depth, media)?;
            }
            Some(b';') => {
              self.handle_declaration(start, end, member_ids)?;
              self.pos += 1;
            }
            Some(b'}') => {
              self.handle_declaration(start, end, member_ids)?;
              self.pos += 1;
              return Ok(());
            }
            None => {
              self.handle_declaration(start, end, member_ids)?;
              return self.soft_error(ParserError::UnterminatedBlock);
            }
            _ => unreachable!("scan_until only returns a stop byte or None"),
          }
        }
      }
    }
  }

  fn parse_nested_rule(
    &mut self,
    selector_text: &str,
    parent_ids: &[u32],
    parent_selectors: &[String],
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    self.sheet.has_nesting = true;

    let child_members: Vec<&str> = split_top_level_commas(selector_text)
      .into_iter()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .collect();
    if child_members.is_empty() {
      self.skip_nested_body();
      return Ok(());
    }

    let mut resolved: Vec<(String, u32, NestingStyle)> = Vec::new();
    for (parent_id, parent_selector) in parent_ids.iter().zip(parent_selectors) {
      for child in &child_members {
        let (selector, style) = resolve_nested_selector(parent_selector, child);
        resolved.push((selector, *parent_id, style));
      }
    }

    let list_id = if self.selector_lists && resolved.len() > 1 {
      Some(self.sheet.allocate_selector_list())
    } else {
      None
    };

    let mut child_ids: SmallVec<[u32; 4]> = SmallVec::new();
    let mut child_selectors: Vec<String> = Vec::new();
    for (selector, parent_id, style) in resolved {
      let id = self.sheet.next_rule_id();
      let mut rule = StyleRule::new(id, selector.clone());
      rule.media_query_id = media.and_then(|m| m.ids.first().copied());
      rule.parent_rule_id = Some(parent_id);
      rule.nesting_style = Some(style);
      rule.selector_list_id = list_id;
      if let Some(list_id) = list_id {
        self.sheet.register_selector_list(list_id, id);
      }
      self.sheet.rules.push(CssRule::Style(rule));
      child_ids.push(id);
      child_selectors.push(selector);
    }

    self.parse_block(&child_ids, &child_selectors, depth + 1, media)
  }

  /// Skips a nested block body after its `{` has been consumed.
  fn skip_nested_body(&mut self) {
    let mut depth = 1usize;
    while self.pos < self.bytes.len() {
      match self.bytes[self.pos] {
        b'\'' | b'"' => {
          self.read_string();
          continue;
        }
        b'{' => depth += 1,
        b'}' => {
          depth -= 1;
          if depth == 0 {
            self.pos += 1;
            return;
          }
        }
        _ => {}
      }
      self.pos += 1;
    }
  }

  fn handle_declaration(
    &mut self,
    start: usize,
    end: usize,
    member_ids: &[u32],
  ) -> Result<(), Error<ParserError>> {
    let text = &self.input[start..end];
    if text.trim().is_empty() {
      return Ok(());
    }

    let Some(colon) = text.find(':') else {
      return self.soft_error(ParserError::MalformedDeclaration(text.trim().to_string()));
    };
    let name = text[..colon].trim();
    let raw_value = &text[colon + 1..];

    if name.len() > MAX_PROPERTY_NAME_LENGTH {
      return self.hard_error(ParserError::PropertyNameTooLong);
    }
    if raw_value.len() > MAX_PROPERTY_VALUE_LENGTH {
      return self.hard_error(ParserError::PropertyValueTooLong);
    }
    if name.is_empty() {
      return self.soft_error(ParserError::MalformedDeclaration(text.trim().to_string()));
    }

    let Some(mut decl) = Declaration::from_raw(name, raw_value) else {
      // Empty values are discarded silently.
      return Ok(());
    };

    if self.absolute_paths {
      if let (Some(base), Some(resolver)) = (&self.base_uri, &self.resolver) {
        decl.value = rewrite_urls(&decl.value, base, resolver.as_ref());
      } else if let Some(base) = &self.base_uri {
        decl.value = rewrite_urls(&decl.value, base, &DefaultUriResolver);
      }
    }

    for id in member_ids {
      if let Some(CssRule::Style(rule)) = self.sheet.rules.get_mut(*id as usize) {
        rule.declarations.push(decl.clone());
      }
    }
    Ok(())
  }

  /// Parses a declaration-only body (e.g. `@font-face`), consuming the
  /// closing brace. Nested blocks are invalid here and skipped.
  fn parse_declaration_body(&mut self) -> Result<Vec<Declaration>, Error<ParserError>> {
    let mut declarations = Vec::new();
    loop {
      self.skip_ws_and_comments();
      if self.eof() {
        self.soft_error(ParserError::UnterminatedBlock)?;
        return Ok(declarations);
      }
      if self.peek() == Some(b'}') {
        self.pos += 1;
        return Ok(declarations);
      }

      let (start, end, terminator) = self.scan_until(&[b'{', b';', b'}']);
      if terminator == Some(b'{') {
        warn!("skipping unexpected block inside a declaration body");
        self.skip_block();
        continue;
      }

      let text = &self.input[start..end];
      if let Some(colon) = text.find(':') {
        let name = text[..colon].trim();
        let raw_value = &text[colon + 1..];
        if name.len() > MAX_PROPERTY_NAME_LENGTH {
          return self.hard_error(ParserError::PropertyNameTooLong);
        }
        if raw_value.len() > MAX_PROPERTY_VALUE_LENGTH {
          return self.hard_error(ParserError::PropertyValueTooLong);
        }
        if !name.is_empty() {
          if let Some(decl) = Declaration::from_raw(name, raw_value) {
            declarations.push(decl);
          }
        }
      } else if !text.trim().is_empty() {
        self.soft_error(ParserError::MalformedDeclaration(text.trim().to_string()))?;
      }

      match terminator {
        Some(b';') => self.pos += 1,
        Some(b'}') => {
          self.pos += 1;
          return Ok(declarations);
        }
        _ => {
          self.soft_error(ParserError::UnterminatedBlock)?;
          return Ok(declarations);
        }
      }
    }
  }

  fn parse_at_rule(
    &mut self,
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    self.pos += 1; // consume '@'
    let raw_name = self.read_at_name();
    let name = raw_name.to_ascii_lowercase();

    match name.as_str() {
      "charset" => self.parse_charset(),
      "import" => self.parse_import(media),
      "media" => self.parse_media(depth, media),
      "supports" | "layer" | "container" | "scope" => self.parse_transparent_group(depth, media),
      "font-face" => {
        if let Some(rule) = self.parse_declaration_at_rule("@font-face".to_string())? {
          self.push_at_rule(rule);
        }
        Ok(())
      }
      _ if name == "keyframes" || name.ends_with("-keyframes") => {
        self.parse_keyframes(raw_name, depth)
      }
      _ => {
        // @page, @property, @counter-style and unknown at-rules with
        // declaration bodies are preserved uniformly; statement forms are
        // skipped.
        let (start, end, terminator) = self.scan_until(&[b'{', b';', b'}']);
        match terminator {
          Some(b'{') => {
            let prelude = self.input[start..end].trim();
            let selector = if prelude.is_empty() {
              format!("@{}", raw_name)
            } else {
              format!("@{} {}", raw_name, prelude)
            };
            if let Some(rule) = self.parse_declaration_at_rule(selector)? {
              self.push_at_rule(rule);
            }
            Ok(())
          }
          Some(b';') => {
            self.pos += 1;
            warn!("ignoring statement at-rule @{}", raw_name);
            Ok(())
          }
          _ => self.soft_error(ParserError::AtRuleInvalid(raw_name.to_string())),
        }
      }
    }
  }

  fn push_at_rule(&mut self, mut rule: AtRule) {
    rule.id = self.sheet.next_rule_id();
    self.sheet.rules.push(CssRule::At(rule));
    self.seen_style_rule = true;
  }

  fn parse_charset(&mut self) -> Result<(), Error<ParserError>> {
    self.skip_ws_and_comments();
    let value = match self.peek() {
      Some(b'\'') | Some(b'"') => {
        let v = self.read_string();
        let (_, _, terminator) = self.scan_until(&[b';']);
        if terminator == Some(b';') {
          self.pos += 1;
        }
        v
      }
      _ => {
        let (start, end, terminator) = self.scan_until(&[b';']);
        if terminator == Some(b';') {
          self.pos += 1;
        }
        self.input[start..end].trim().trim_matches('"').to_string()
      }
    };

    if self.sheet.charset.is_none() {
      self.sheet.charset = Some(value);
    } else {
      warn!("ignoring duplicate @charset");
    }
    Ok(())
  }

  fn parse_import(&mut self, media: Option<&MediaContext>) -> Result<(), Error<ParserError>> {
    if media.is_some() || self.seen_style_rule {
      self.soft_error(ParserError::MisplacedImport)?;
      let (_, _, terminator) = self.scan_until(&[b';', b'{']);
      match terminator {
        Some(b';') => self.pos += 1,
        Some(b'{') => self.skip_block(),
        _ => {}
      }
      return Ok(());
    }

    self.skip_ws_and_comments();
    let url = match self.peek() {
      Some(b'\'') | Some(b'"') => Some(self.read_string()),
      Some(b'u') | Some(b'U') => self.read_url_function(),
      _ => None,
    };
    let Some(url) = url else {
      self.soft_error(ParserError::AtRuleInvalid("import".into()))?;
      let (_, _, terminator) = self.scan_until(&[b';']);
      if terminator == Some(b';') {
        self.pos += 1;
      }
      return Ok(());
    };

    let (start, end, terminator) = self.scan_until(&[b';']);
    if terminator == Some(b';') {
      self.pos += 1;
    }
    let media_text = self.input[start..end].trim().to_string();

    let media_query_id = if media_text.is_empty() {
      None
    } else {
      // A comma list canonicalizes to its first query; the raw text is kept
      // for resolution-time composition.
      let first = split_top_level_commas(&media_text)
        .into_iter()
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
      let (ty, cond) = MediaQuery::parse_text(&first);
      Some(self.allocate_media_query(ty, cond)?)
    };

    let id = self.sheet.next_rule_id();
    self.sheet.imports.push(ImportStatement {
      id,
      url,
      media: if media_text.is_empty() {
        None
      } else {
        Some(media_text)
      },
      media_query_id,
      resolved: false,
    });
    Ok(())
  }

  /// Reads a `url(...)` token, returning its unquoted contents.
  fn read_url_function(&mut self) -> Option<String> {
    let rest = &self.input[self.pos..];
    if rest.len() < 4 || !rest[..4].eq_ignore_ascii_case("url(") {
      return None;
    }
    self.pos += 4;
    self.skip_ws_and_comments();
    let url = match self.peek() {
      Some(b'\'') | Some(b'"') => self.read_string(),
      _ => {
        let (start, end, _) = self.scan_until(&[b')']);
        self.input[start..end].trim().to_string()
      }
    };
    let (_, _, terminator) = self.scan_until(&[b')']);
    if terminator == Some(b')') {
      self.pos += 1;
    }
    Some(url)
  }

  fn allocate_media_query(
    &mut self,
    ty: crate::media_query::MediaType,
    conditions: Option<String>,
  ) -> Result<u32, Error<ParserError>> {
    match self.sheet.allocate_media_query(ty, conditions) {
      Some(id) => Ok(id),
      None => self.hard_error(ParserError::MediaQueryLimitExceeded),
    }
  }

  fn parse_media(
    &mut self,
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    let (start, end, terminator) = self.scan_until(&[b'{', b';']);
    match terminator {
      Some(b'{') => {}
      Some(b';') => {
        self.pos += 1;
        return self.soft_error(ParserError::AtRuleInvalid("media".into()));
      }
      None => return self.soft_error(ParserError::UnexpectedEof),
      _ => unreachable!("scan_until only returns a stop byte or None"),
    }
    let prelude = self.input[start..end].trim().to_string();
    self.pos += 1; // consume '{'

    if depth + 1 > MAX_PARSE_DEPTH {
      return self.hard_error(ParserError::DepthLimitExceeded);
    }

    if prelude.is_empty() {
      // `@media { ... }` adds no constraints; parse transparently.
      let ctx = media.cloned();
      return self.parse_rule_list(depth + 1, ctx.as_ref(), false);
    }

    let mut ids: SmallVec<[u32; 2]> = SmallVec::new();
    let mut first_text = None;
    for part in split_top_level_commas(&prelude) {
      let part = part.trim();
      if part.is_empty() {
        continue;
      }
      let effective = match media {
        Some(ctx) => compose_media_text(&ctx.text, part),
        None => part.to_string(),
      };
      let (ty, cond) = MediaQuery::parse_text(&effective);
      let id = self.allocate_media_query(ty, cond)?;
      if first_text.is_none() {
        first_text = Some(effective);
      }
      if !ids.contains(&id) {
        ids.push(id);
      }
    }

    if ids.len() > 1 {
      self.sheet.allocate_media_query_list(ids.to_vec());
    }

    let ctx = MediaContext {
      text: first_text.unwrap_or_default(),
      ids,
    };
    self.parse_rule_list(depth + 1, Some(&ctx), false)
  }

  fn parse_transparent_group(
    &mut self,
    depth: usize,
    media: Option<&MediaContext>,
  ) -> Result<(), Error<ParserError>> {
    let (_, _, terminator) = self.scan_until(&[b'{', b';']);
    match terminator {
      Some(b'{') => {
        self.pos += 1;
        if depth + 1 > MAX_PARSE_DEPTH {
          return self.hard_error(ParserError::DepthLimitExceeded);
        }
        self.parse_rule_list(depth + 1, media, false)
      }
      Some(b';') => {
        // Statement form, e.g. `@layer base, theme;`.
        self.pos += 1;
        Ok(())
      }
      None => self.soft_error(ParserError::UnexpectedEof),
      _ => unreachable!("scan_until only returns a stop byte or None"),
    }
  }

  fn parse_keyframes(&mut self, raw_name: &str, depth: usize) -> Result<(), Error<ParserError>> {
    let (start, end, terminator) = self.scan_until(&[b'{', b';']);
    match terminator {
      Some(b'{') => {}
      Some(b';') => {
        self.pos += 1;
        return self.soft_error(ParserError::AtRuleInvalid(raw_name.to_string()));
      }
      None => return self.soft_error(ParserError::UnexpectedEof),
      _ => unreachable!("scan_until only returns a stop byte or None"),
    }
    let prelude = self.input[start..end].trim().to_string();
    self.pos += 1; // consume '{'

    if depth + 1 > MAX_PARSE_DEPTH {
      return self.hard_error(ParserError::DepthLimitExceeded);
    }

    let mut stops: Vec<StyleRule> = Vec::new();
    loop {
      self.skip_ws_and_comments();
      if self.eof() {
        self.soft_error(ParserError::UnterminatedBlock)?;
        break;
      }
      if self.peek() == Some(b'}') {
        self.pos += 1;
        break;
      }

      let (start, end, terminator) = self.scan_until(&[b'{', b';', b'}']);
      match terminator {
        Some(b'{') => {
          self.pos += 1;
          let selector_text = self.input[start..end].to_string();
          let declarations = self.parse_declaration_body()?;
          for member in split_top_level_commas(&selector_text) {
            let member = member.trim();
            if member.is_empty() {
              continue;
            }
            let mut rule = StyleRule::new(stops.len() as u32, member.to_string());
            rule.declarations = declarations.clone();
            stops.push(rule);
          }
        }
        Some(b';') => {
          self.pos += 1;
          self.soft_error(ParserError::MalformedDeclaration(
            self.input[start..end].trim().to_string(),
          ))?;
        }
        Some(b'}') => {
          self.pos += 1;
          break;
        }
        None => {
          self.soft_error(ParserError::UnterminatedBlock)?;
          break;
        }
        _ => unreachable!("scan_until only returns a stop byte or None"),
      }
    }

    let selector = if prelude.is_empty() {
      format!("@{}", raw_name)
    } else {
      format!("@{} {}", raw_name, prelude)
    };
    self.push_at_rule(AtRule {
      id: 0,
      selector,
      content: AtRuleContent::Rules(stops),
    });
    Ok(())
  }

  fn parse_declaration_at_rule(
    &mut self,
    selector: String,
  ) -> Result<Option<AtRule>, Error<ParserError>> {
    self.skip_ws_and_comments();
    if self.peek() != Some(b'{') {
      self.soft_error(ParserError::AtRuleInvalid(
        selector.trim_start_matches('@').to_string(),
      ))?;
      let (_, _, terminator) = self.scan_until(&[b';']);
      if terminator == Some(b';') {
        self.pos += 1;
      }
      return Ok(None);
    }
    self.pos += 1;
    let declarations = self.parse_declaration_body()?;
    Ok(Some(AtRule {
      id: 0,
      selector,
      content: AtRuleContent::Declarations(declarations),
    }))
  }
}

fn resolve_nested_selector(parent: &str, child: &str) -> (String, NestingStyle) {
  if child.contains('&') {
    (child.replace('&', parent), NestingStyle::Explicit)
  } else {
    (format!("{} {}", parent, child), NestingStyle::Implicit)
  }
}

/// Splits on top-level commas, respecting `(...)`, `[...]` and strings.
pub(crate) fn split_top_level_commas(s: &str) -> Vec<&str> {
  let bytes = s.as_bytes();
  let mut parts = Vec::new();
  let mut start = 0;
  let mut depth = 0usize;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' => {
        i = skip_str(bytes, i);
        continue;
      }
      b'(' | b'[' => depth += 1,
      b')' | b']' => depth = depth.saturating_sub(1),
      b',' if depth == 0 => {
        parts.push(&s[start..i]);
        start = i + 1;
      }
      _ => {}
    }
    i += 1;
  }
  parts.push(&s[start..]);
  parts
}

/// Splits on top-level whitespace, respecting `(...)`, `[...]` and strings.
pub(crate) fn split_top_level_tokens(s: &str) -> Vec<&str> {
  let bytes = s.as_bytes();
  let mut tokens = Vec::new();
  let mut i = 0;
  while i < bytes.len() {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
      i += 1;
    }
    if i == bytes.len() {
      break;
    }
    let start = i;
    let mut depth = 0usize;
    while i < bytes.len() {
      match bytes[i] {
        b'\'' | b'"' => {
          i = skip_str(bytes, i);
          continue;
        }
        b'(' | b'[' => depth += 1,
        b')' | b']' => depth = depth.saturating_sub(1),
        b if b.is_ascii_whitespace() && depth == 0 => break,
        _ => {}
      }
      i += 1;
    }
    tokens.push(&s[start..i]);
  }
  tokens
}

fn skip_str(bytes: &[u8], open_at: usize) -> usize {
  let quote = bytes[open_at];
  let mut i = open_at + 1;
  while i < bytes.len() {
    if bytes[i] == b'\\' {
      i += 2;
    } else if bytes[i] == quote {
      return i + 1;
    } else {
      i += 1;
    }
  }
  bytes.len()
}

/// Rewrites relative `url(...)` references in a declaration value against
/// `base`, preserving the original quoting style.
fn rewrite_urls(value: &str, base: &str, resolver: &dyn UriResolver) -> String {
  let lower = value.to_ascii_lowercase();
  if !lower.contains("url(") {
    return value.to_string();
  }

  let bytes = value.as_bytes();
  let mut out = String::with_capacity(value.len());
  let mut i = 0;
  while i < bytes.len() {
    if lower[i..].starts_with("url(") {
      let inner_start = i + 4;
      let mut j = inner_start;
      let mut depth = 1usize;
      while j < bytes.len() {
        match bytes[j] {
          b'(' => depth += 1,
          b')' => {
            depth -= 1;
            if depth == 0 {
              break;
            }
          }
          b'\'' | b'"' => {
            j = skip_str(bytes, j);
            continue;
          }
          _ => {}
        }
        j += 1;
      }

      let inner = value[inner_start..j.min(value.len())].trim();
      let (quote, url) = match inner.as_bytes().first() {
        Some(b'\'') => ("'", inner.trim_matches('\'')),
        Some(b'"') => ("\"", inner.trim_matches('"')),
        _ => ("", inner),
      };

      let rewritten = if is_relative_url(url) {
        resolver.resolve(base, url)
      } else {
        None
      };

      out.push_str("url(");
      match rewritten {
        Some(abs) => {
          out.push_str(quote);
          out.push_str(&abs);
          out.push_str(quote);
        }
        None => out.push_str(inner),
      }
      out.push(')');
      i = (j + 1).min(bytes.len());
    } else {
      // Copy one full UTF-8 character.
      let ch_len = utf8_len(bytes[i]);
      out.push_str(&value[i..(i + ch_len).min(value.len())]);
      i += ch_len;
    }
  }
  out
}

fn utf8_len(b: u8) -> usize {
  if b < 0x80 {
    1
  } else if b >> 5 == 0b110 {
    2
  } else if b >> 4 == 0b1110 {
    3
  } else {
    4
  }
}

/// A URL is relative when it has no scheme, is not protocol-relative and is
/// not a fragment reference.
fn is_relative_url(url: &str) -> bool {
  if url.is_empty() || url.starts_with('#') || url.starts_with("//") {
    return false;
  }
  let bytes = url.as_bytes();
  if !bytes[0].is_ascii_alphabetic() {
    return true;
  }
  for (i, b) in bytes.iter().enumerate() {
    match b {
      b':' => return i == 0,
      b if b.is_ascii_alphanumeric() || *b == b'+' || *b == b'.' || *b == b'-' => {}
      _ => return true,
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn comma_splitting_respects_brackets() {
    assert_eq!(
      split_top_level_commas("h1, h2[title=\"a,b\"], h3:not(.x, .y)"),
      ["h1", " h2[title=\"a,b\"]", " h3:not(.x, .y)"]
    );
  }

  #[test]
  fn token_splitting() {
    assert_eq!(
      split_top_level_tokens("screen and (max-width: 600px)"),
      ["screen", "and", "(max-width: 600px)"]
    );
  }

  #[test]
  fn relative_url_detection() {
    assert!(is_relative_url("images/a.png"));
    assert!(is_relative_url("../a.css"));
    assert!(!is_relative_url("https://example.com/a.png"));
    assert!(!is_relative_url("data:image/png;base64,xyz"));
    assert!(!is_relative_url("#anchor"));
    assert!(!is_relative_url("//example.com/a.png"));
  }

  #[test]
  fn url_rewriting_preserves_quotes() {
    struct Fake;
    impl UriResolver for Fake {
      fn resolve(&self, base: &str, relative: &str) -> Option<String> {
        Some(format!("{}/{}", base, relative))
      }
    }
    assert_eq!(
      rewrite_urls("url('a.png')", "http://x", &Fake),
      "url('http://x/a.png')"
    );
    assert_eq!(
      rewrite_urls("url(a.png) no-repeat", "http://x", &Fake),
      "url(http://x/a.png) no-repeat"
    );
    assert_eq!(
      rewrite_urls("url(data:foo) url(#f)", "http://x", &Fake),
      "url(data:foo) url(#f)"
    );
  }

  #[test]
  fn nested_selector_resolution() {
    assert_eq!(
      resolve_nested_selector(".card", "span"),
      (".card span".to_string(), NestingStyle::Implicit)
    );
    assert_eq!(
      resolve_nested_selector(".card", "&:hover"),
      (".card:hover".to_string(), NestingStyle::Explicit)
    );
  }
}
