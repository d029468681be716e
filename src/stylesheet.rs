//! The stylesheet model: a flat, id-addressed rule list plus the indices
//! that hang off it.
//!
//! `rules` is the source of truth; every auxiliary structure refers into it
//! by rule id, and rule ids always equal rule positions. Mutations that
//! remove or splice renumber in one pass and drop the lazily built media
//! index, which is rebuilt from the rules on next access.

use std::cell::OnceCell;
use std::fs;
use std::ops::{Add, Index, Sub};
use std::path::Path;

use ahash::AHashMap;
use indexmap::IndexMap;
use log::warn;

use crate::declaration::Declaration;
use crate::error::{Error, ImportError, ParserError};
use crate::importer;
use crate::media_query::{MediaQuery, MediaType};
use crate::parser::{self, ParserOptions, MAX_MEDIA_QUERIES};
use crate::rules::{CssRule, ImportStatement, StyleRule};

/// An in-memory stylesheet.
#[derive(Debug, Clone)]
pub struct StyleSheet {
  /// Rules in document order; `rules[i].id() == i`.
  pub rules: Vec<CssRule>,
  /// Media queries indexed by their id.
  pub media_queries: Vec<MediaQuery>,
  /// `@import` statements in document order.
  pub imports: Vec<ImportStatement>,
  /// The first `@charset` value, quotes stripped.
  pub charset: Option<String>,
  /// Whether any nested rule was seen during parsing.
  pub has_nesting: bool,
  pub(crate) options: ParserOptions,
  pub(crate) selector_lists: IndexMap<u32, Vec<u32>>,
  pub(crate) media_query_lists: IndexMap<u32, Vec<u32>>,
  pub(crate) next_selector_list_id: u32,
  pub(crate) next_media_query_list_id: u32,
  media_index: OnceCell<IndexMap<MediaType, Vec<u32>>>,
}

impl Default for StyleSheet {
  fn default() -> StyleSheet {
    StyleSheet::new(ParserOptions::default())
  }
}

impl StyleSheet {
  pub fn new(options: ParserOptions) -> StyleSheet {
    StyleSheet {
      rules: Vec::new(),
      media_queries: Vec::new(),
      imports: Vec::new(),
      charset: None,
      has_nesting: false,
      options,
      selector_lists: IndexMap::new(),
      media_query_lists: IndexMap::new(),
      next_selector_list_id: 0,
      next_media_query_list_id: 0,
      media_index: OnceCell::new(),
    }
  }

  /// Parses `code` into a fresh stylesheet, resolving imports when the
  /// `import` option is enabled.
  pub fn parse(code: &str, options: ParserOptions) -> Result<StyleSheet, Error<ParserError>> {
    let mut sheet = StyleSheet::new(options);
    sheet.add_block(code)?;
    if sheet.options.import.is_some() {
      if let Err(e) = sheet.resolve_imports() {
        warn!("import resolution failed: {}", e);
      }
    }
    Ok(sheet)
  }

  pub fn options(&self) -> &ParserOptions {
    &self.options
  }

  /// Appends a block of CSS. New rules get ids starting at the current
  /// high-water mark. On a hard parse error the stylesheet is left exactly
  /// as it was.
  pub fn add_block(&mut self, css: &str) -> Result<(), Error<ParserError>> {
    let snapshot = self.snapshot();
    match parser::parse_into(self, css) {
      Ok(()) => {
        self.invalidate_caches();
        Ok(())
      }
      Err(e) => {
        self.restore(snapshot);
        Err(e)
      }
    }
  }

  /// Reads a file (relative paths resolve against `base_dir`) and appends
  /// its contents. The file's directory becomes the new `base_dir`.
  ///
  /// With `io_exceptions` off, read failures are logged and the stylesheet
  /// is left as built so far.
  pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error<ImportError>> {
    let path = path.as_ref();
    let full = match &self.options.base_dir {
      Some(base) if path.is_relative() => base.join(path),
      _ => path.to_path_buf(),
    };

    let css = match fs::read_to_string(&full) {
      Ok(css) => css,
      Err(e) => {
        if self.options.io_exceptions {
          return Err(Error::new(ImportError::Io(e)));
        }
        warn!("failed to load {}: {}", full.display(), e);
        return Ok(());
      }
    };

    if let Some(dir) = full.parent() {
      self.options.base_dir = Some(dir.to_path_buf());
    }
    self.add_block(&css)?;
    self.resolve_imports_if_enabled()
  }

  /// Fetches a URI (relative references resolve against `base_uri`) and
  /// appends its contents. The URI becomes the new `base_uri`.
  pub fn load_uri(&mut self, uri: &str) -> Result<(), Error<ImportError>> {
    let absolute = match &self.options.base_uri {
      Some(base) => match url::Url::parse(base).and_then(|b| b.join(uri)) {
        Ok(u) => u.to_string(),
        Err(_) => uri.to_string(),
      },
      None => uri.to_string(),
    };

    let fetch_options = self.options.import.clone().unwrap_or_default();
    let css = match importer::fetch_uri(&absolute, &fetch_options) {
      Ok(css) => css,
      Err(e) => {
        if self.options.io_exceptions {
          return Err(e);
        }
        warn!("failed to load {}: {}", absolute, e);
        return Ok(());
      }
    };

    self.options.base_uri = Some(absolute);
    self.add_block(&css)?;
    self.resolve_imports_if_enabled()
  }

  /// Resolves this sheet's `@import` statements in place, using the
  /// configured import options (or defaults).
  pub fn resolve_imports(&mut self) -> Result<(), Error<ImportError>> {
    let options = self.options.import.clone().unwrap_or_default();
    importer::resolve_imports(self, &options)
  }

  fn resolve_imports_if_enabled(&mut self) -> Result<(), Error<ImportError>> {
    if self.options.import.is_none() {
      return Ok(());
    }
    match self.resolve_imports() {
      Ok(()) => Ok(()),
      Err(e) => {
        if self.options.io_exceptions {
          Err(e)
        } else {
          warn!("import resolution failed: {}", e);
          Ok(())
        }
      }
    }
  }

  // === Accessors ===

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, CssRule> {
    self.rules.iter()
  }

  pub fn get(&self, id: u32) -> Option<&CssRule> {
    self.rules.get(id as usize)
  }

  /// All style rule selectors, in document order.
  pub fn selectors(&self) -> Vec<&str> {
    self
      .rules
      .iter()
      .filter_map(|r| r.as_style())
      .map(|r| r.selector.as_str())
      .collect()
  }

  /// Rules that came from one source comma list, keyed by list id.
  pub fn selector_lists(&self) -> &IndexMap<u32, Vec<u32>> {
    &self.selector_lists
  }

  /// Media queries that came from one source `@media A, B` prelude.
  pub fn media_query_lists(&self) -> &IndexMap<u32, Vec<u32>> {
    &self.media_query_lists
  }

  /// The media index: media type → sorted rule ids. Built lazily from the
  /// rules and dropped by every mutation.
  ///
  /// Base rules (no media query) do not appear; rules under a compound
  /// query appear under every listed type.
  pub fn media_index(&self) -> &IndexMap<MediaType, Vec<u32>> {
    self.media_index.get_or_init(|| {
      let mut index: IndexMap<MediaType, Vec<u32>> = IndexMap::new();
      for rule in &self.rules {
        let Some(style) = rule.as_style() else {
          continue;
        };
        let Some(query_id) = style.media_query_id else {
          continue;
        };
        for ty in self.media_types_for(query_id) {
          let ids = index.entry(ty).or_default();
          if ids.last() != Some(&style.id) {
            ids.push(style.id);
          }
        }
      }
      index
    })
  }

  /// Every media type the query participates in: its own, plus those of any
  /// compound list containing it.
  fn media_types_for(&self, query_id: u32) -> Vec<MediaType> {
    let list = self
      .media_query_lists
      .values()
      .find(|ids| ids.contains(&query_id));
    let ids: Vec<u32> = match list {
      Some(ids) => ids.clone(),
      None => vec![query_id],
    };
    let mut types = Vec::with_capacity(ids.len());
    for id in ids {
      if let Some(query) = self.media_queries.get(id as usize) {
        if !types.contains(&query.media_type) {
          types.push(query.media_type.clone());
        }
      }
    }
    types
  }

  /// `--custom-property` values per media context, last write wins.
  ///
  /// `None` considers every rule; `Some(m)` considers base rules plus rules
  /// registered under `m`.
  pub fn custom_properties(&self, media: Option<&MediaType>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for rule in &self.rules {
      let Some(style) = rule.as_style() else {
        continue;
      };
      if !self.rule_in_media(style, media) {
        continue;
      }
      for decl in &style.declarations {
        if decl.is_custom_property() {
          out.insert(decl.property.clone(), decl.value.clone());
        }
      }
    }
    out
  }

  fn rule_in_media(&self, rule: &StyleRule, media: Option<&MediaType>) -> bool {
    match media {
      None => true,
      Some(MediaType::All) => true,
      Some(m) => {
        rule.is_base()
          || self
            .media_index()
            .get(m)
            .is_some_and(|ids| ids.binary_search(&rule.id).is_ok())
      }
    }
  }

  /// Declaration blocks of every rule whose selector matches exactly,
  /// rendered as `property: value;` strings.
  pub fn find_by_selector(&self, selector: &str, media: Option<&MediaType>) -> Vec<String> {
    let selector = selector.trim();
    let mut out = Vec::new();
    for rule in &self.rules {
      let Some(style) = rule.as_style() else {
        continue;
      };
      if style.selector != selector || !self.rule_in_media(style, media) {
        continue;
      }
      out.push(render_declarations(&style.declarations));
    }
    out
  }

  /// Rules whose selector matches any of the given selectors.
  pub fn find_rule_sets(&self, selectors: &[&str], media: Option<&MediaType>) -> Vec<&CssRule> {
    let wanted: Vec<&str> = selectors.iter().map(|s| s.trim()).collect();
    self
      .rules
      .iter()
      .filter(|rule| match rule.as_style() {
        Some(style) => {
          wanted.contains(&style.selector.as_str()) && self.rule_in_media(style, media)
        }
        None => false,
      })
      .collect()
  }

  /// Starts a chainable query over this sheet's rules.
  pub fn query(&self) -> RuleScope<'_> {
    RuleScope::new(self)
  }

  // === Cascade ===

  /// Cascade-flattens into a new stylesheet. See [`crate::flatten`].
  pub fn flatten(&self) -> StyleSheet {
    crate::flatten::flatten_sheet(self)
  }

  /// Cascade-flattens in place.
  pub fn flatten_in_place(&mut self) {
    *self = self.flatten();
  }

  // === Mutation ===

  /// Removes a rule by id, renumbering every subsequent rule and rewriting
  /// the indices.
  pub fn remove_rule(&mut self, id: u32) {
    self.remove_ids(&[id]);
  }

  pub(crate) fn remove_ids(&mut self, doomed: &[u32]) {
    for import in &mut self.imports {
      let shift = doomed.iter().filter(|d| **d < import.id).count() as u32;
      import.id -= shift;
    }
    self.rules.retain(|r| !doomed.contains(&r.id()));
    self.renumber();
  }

  /// Reassigns every rule id to its position, remapping nested-rule parents
  /// and rebuilding the selector list index. Splice operations must have
  /// made ids unique beforehand.
  pub(crate) fn renumber(&mut self) {
    let mut old_to_new: AHashMap<u32, u32> = AHashMap::with_capacity(self.rules.len());
    for (i, rule) in self.rules.iter_mut().enumerate() {
      old_to_new.insert(rule.id(), i as u32);
      rule.set_id(i as u32);
    }

    let mut lists: IndexMap<u32, Vec<u32>> = IndexMap::new();
    for rule in &mut self.rules {
      if let CssRule::Style(style) = rule {
        if let Some(parent) = style.parent_rule_id {
          style.parent_rule_id = old_to_new.get(&parent).copied();
        }
        if let Some(list_id) = style.selector_list_id {
          lists.entry(list_id).or_default().push(style.id);
        }
      }
    }
    self.selector_lists = lists;
    self.invalidate_caches();
  }

  pub(crate) fn invalidate_caches(&mut self) {
    self.media_index = OnceCell::new();
  }

  // === Allocation (used by the parser and the import resolver) ===

  pub(crate) fn next_rule_id(&self) -> u32 {
    self.rules.len() as u32
  }

  /// Interns a media query, deduplicating by `(type, conditions)`. `None`
  /// when a new query would exceed [`MAX_MEDIA_QUERIES`].
  pub(crate) fn allocate_media_query(
    &mut self,
    media_type: MediaType,
    conditions: Option<String>,
  ) -> Option<u32> {
    let candidate = MediaQuery::new(0, media_type, conditions);
    if let Some(existing) = self.media_queries.iter().find(|q| **q == candidate) {
      return Some(existing.id);
    }
    if self.media_queries.len() >= MAX_MEDIA_QUERIES {
      return None;
    }
    let id = self.media_queries.len() as u32;
    self.media_queries.push(MediaQuery { id, ..candidate });
    Some(id)
  }

  pub(crate) fn intern_media_query(
    &mut self,
    media_type: MediaType,
    conditions: Option<String>,
  ) -> u32 {
    match self.allocate_media_query(media_type.clone(), conditions.clone()) {
      Some(id) => id,
      // Past the cap, fold everything onto the last query rather than grow.
      None => (self.media_queries.len() - 1) as u32,
    }
  }

  pub(crate) fn allocate_media_query_list(&mut self, ids: Vec<u32>) -> u32 {
    let id = self.next_media_query_list_id;
    self.next_media_query_list_id += 1;
    self.media_query_lists.insert(id, ids);
    id
  }

  pub(crate) fn allocate_selector_list(&mut self) -> u32 {
    let id = self.next_selector_list_id;
    self.next_selector_list_id += 1;
    id
  }

  pub(crate) fn register_selector_list(&mut self, list_id: u32, rule_id: u32) {
    self.selector_lists.entry(list_id).or_default().push(rule_id);
  }

  // === Set algebra ===

  /// Appends another sheet's rules in document order, remapping every id
  /// space into this sheet's.
  pub(crate) fn append_sheet(&mut self, other: &StyleSheet) {
    let rule_offset = self.rules.len() as u32;

    let mut query_map: AHashMap<u32, u32> = AHashMap::new();
    for query in &other.media_queries {
      let new_id = self.intern_media_query(query.media_type.clone(), query.conditions.clone());
      query_map.insert(query.id, new_id);
    }
    for ids in other.media_query_lists.values() {
      let new_ids: Vec<u32> = ids.iter().filter_map(|i| query_map.get(i).copied()).collect();
      if new_ids.len() > 1 {
        self.allocate_media_query_list(new_ids);
      }
    }

    let mut list_map: AHashMap<u32, u32> = AHashMap::new();
    for rule in &other.rules {
      match rule.clone() {
        CssRule::Style(mut style) => {
          style.id += rule_offset;
          style.parent_rule_id = style.parent_rule_id.map(|p| p + rule_offset);
          style.media_query_id = style.media_query_id.and_then(|q| query_map.get(&q).copied());
          if let Some(list_id) = style.selector_list_id {
            let new_list = *list_map
              .entry(list_id)
              .or_insert_with(|| {
                let id = self.next_selector_list_id;
                self.next_selector_list_id += 1;
                id
              });
            style.selector_list_id = Some(new_list);
            self.selector_lists.entry(new_list).or_default().push(style.id);
          }
          self.rules.push(CssRule::Style(style));
        }
        CssRule::At(mut at) => {
          at.id += rule_offset;
          self.rules.push(CssRule::At(at));
        }
      }
    }

    for import in &other.imports {
      let mut import = import.clone();
      import.id += rule_offset;
      import.media_query_id = import.media_query_id.and_then(|q| query_map.get(&q).copied());
      self.imports.push(import);
    }

    if self.charset.is_none() {
      self.charset = other.charset.clone();
    }
    self.has_nesting |= other.has_nesting;
    self.invalidate_caches();
  }

  /// In-place concatenation followed by a cascade flatten.
  pub fn concat(&mut self, other: &StyleSheet) {
    self.append_sheet(other);
    self.flatten_in_place();
  }

  // === Snapshot/rollback for add_block ===

  fn snapshot(&self) -> Snapshot {
    Snapshot {
      rules: self.rules.len(),
      media_queries: self.media_queries.len(),
      imports: self.imports.len(),
      charset: self.charset.clone(),
      has_nesting: self.has_nesting,
      next_selector_list_id: self.next_selector_list_id,
      next_media_query_list_id: self.next_media_query_list_id,
    }
  }

  fn restore(&mut self, snapshot: Snapshot) {
    self.rules.truncate(snapshot.rules);
    self.media_queries.truncate(snapshot.media_queries);
    self.imports.truncate(snapshot.imports);
    self.charset = snapshot.charset;
    self.has_nesting = snapshot.has_nesting;
    self
      .selector_lists
      .retain(|id, _| *id < snapshot.next_selector_list_id);
    self
      .media_query_lists
      .retain(|id, _| *id < snapshot.next_media_query_list_id);
    self.next_selector_list_id = snapshot.next_selector_list_id;
    self.next_media_query_list_id = snapshot.next_media_query_list_id;
    self.invalidate_caches();
  }
}

struct Snapshot {
  rules: usize,
  media_queries: usize,
  imports: usize,
  charset: Option<String>,
  has_nesting: bool,
  next_selector_list_id: u32,
  next_media_query_list_id: u32,
}

fn render_declarations(declarations: &[Declaration]) -> String {
  use crate::traits::ToCss;
  declarations
    .iter()
    .map(|d| d.to_css_string())
    .collect::<Vec<_>>()
    .join(" ")
}

impl Index<usize> for StyleSheet {
  type Output = CssRule;

  fn index(&self, index: usize) -> &CssRule {
    &self.rules[index]
  }
}

impl<'a> IntoIterator for &'a StyleSheet {
  type Item = &'a CssRule;
  type IntoIter = std::slice::Iter<'a, CssRule>;

  fn into_iter(self) -> Self::IntoIter {
    self.rules.iter()
  }
}

/// Semantic equality: rules element-wise (style rules compare expanded
/// declaration sets) and media queries element-wise. Charset is ignored.
impl PartialEq for StyleSheet {
  fn eq(&self, other: &StyleSheet) -> bool {
    if self.rules.len() != other.rules.len()
      || self.media_queries.len() != other.media_queries.len()
    {
      return false;
    }
    let rules_equal = self.rules.iter().zip(&other.rules).all(|(a, b)| match (a, b) {
      (CssRule::Style(a), CssRule::Style(b)) => {
        a.semantic_eq(b) && a.media_query_id == b.media_query_id
      }
      (CssRule::At(a), CssRule::At(b)) => a.selector == b.selector && a.content == b.content,
      _ => false,
    });
    rules_equal
      && self
        .media_queries
        .iter()
        .zip(&other.media_queries)
        .all(|(a, b)| a == b)
  }
}

/// Document-order concatenation followed by a flatten.
impl Add<&StyleSheet> for StyleSheet {
  type Output = StyleSheet;

  fn add(mut self, other: &StyleSheet) -> StyleSheet {
    self.concat(other);
    self
  }
}

/// Removes every rule semantically equal to a rule of `other`. Does not
/// flatten.
impl Sub<&StyleSheet> for StyleSheet {
  type Output = StyleSheet;

  fn sub(mut self, other: &StyleSheet) -> StyleSheet {
    let doomed: Vec<u32> = self
      .rules
      .iter()
      .filter_map(|rule| {
        let style = rule.as_style()?;
        let matched = other
          .rules
          .iter()
          .filter_map(CssRule::as_style)
          .any(|o| style.semantic_eq(o));
        matched.then_some(style.id)
      })
      .collect();
    self.remove_ids(&doomed);
    self
  }
}

/// A chainable filter over a stylesheet's rules.
///
/// Filters combine with logical and; terminal operations materialize the
/// matching rules.
#[derive(Clone)]
pub struct RuleScope<'a> {
  sheet: &'a StyleSheet,
  media: Option<MediaType>,
  specificity_min: Option<u32>,
  specificity_max: Option<u32>,
  selector: Option<String>,
  selector_contains: Option<String>,
  property: Option<String>,
  value: Option<String>,
  prefix_match: bool,
  base_only: bool,
  at_rule: Option<String>,
  important: Option<bool>,
  important_property: Option<String>,
}

impl<'a> RuleScope<'a> {
  fn new(sheet: &'a StyleSheet) -> RuleScope<'a> {
    RuleScope {
      sheet,
      media: None,
      specificity_min: None,
      specificity_max: None,
      selector: None,
      selector_contains: None,
      property: None,
      value: None,
      prefix_match: false,
      base_only: false,
      at_rule: None,
      important: None,
      important_property: None,
    }
  }

  /// Restricts to rules applying under the given media type. Base rules
  /// match every media type; `MediaType::All` matches everything.
  pub fn media(mut self, media: MediaType) -> Self {
    self.media = Some(media);
    self
  }

  pub fn specificity(mut self, value: u32) -> Self {
    self.specificity_min = Some(value);
    self.specificity_max = Some(value);
    self
  }

  pub fn specificity_range(mut self, min: u32, max: u32) -> Self {
    self.specificity_min = Some(min);
    self.specificity_max = Some(max);
    self
  }

  pub fn selector(mut self, selector: &str) -> Self {
    self.selector = Some(selector.trim().to_string());
    self
  }

  pub fn selector_contains(mut self, fragment: &str) -> Self {
    self.selector_contains = Some(fragment.to_string());
    self
  }

  /// Restricts to rules declaring the property.
  pub fn property(mut self, property: &str) -> Self {
    self.property = Some(property.to_ascii_lowercase());
    self
  }

  /// Additionally requires the property's value; exact by default, prefix
  /// when [`RuleScope::prefix_match`] is set.
  pub fn value(mut self, value: &str) -> Self {
    self.value = Some(value.to_string());
    self
  }

  pub fn prefix_match(mut self, on: bool) -> Self {
    self.prefix_match = on;
    self
  }

  /// Restricts to rules outside any media query.
  pub fn base_only(mut self) -> Self {
    self.base_only = true;
    self
  }

  /// Restricts to at-rules of the given name (with or without the `@`).
  pub fn at_rule_type(mut self, name: &str) -> Self {
    let name = name.trim();
    self.at_rule = Some(if name.starts_with('@') {
      name.to_string()
    } else {
      format!("@{}", name)
    });
    self
  }

  /// Restricts to rules with at least one `!important` declaration, or,
  /// combined with [`RuleScope::property`], to rules where that property is
  /// important.
  pub fn important(mut self) -> Self {
    self.important = Some(true);
    self
  }

  pub fn important_property(mut self, property: &str) -> Self {
    self.important_property = Some(property.to_ascii_lowercase());
    self
  }

  pub fn ids(&self) -> Vec<u32> {
    self
      .sheet
      .rules
      .iter()
      .filter(|r| self.matches(r))
      .map(|r| r.id())
      .collect()
  }

  pub fn rules(&self) -> Vec<&'a CssRule> {
    self
      .sheet
      .rules
      .iter()
      .filter(|r| self.matches(r))
      .collect()
  }

  pub fn style_rules(&self) -> Vec<&'a StyleRule> {
    self
      .sheet
      .rules
      .iter()
      .filter(|r| self.matches(r))
      .filter_map(|r| r.as_style())
      .collect()
  }

  pub fn count(&self) -> usize {
    self.sheet.rules.iter().filter(|r| self.matches(r)).count()
  }

  fn matches(&self, rule: &CssRule) -> bool {
    if let Some(at_name) = &self.at_rule {
      let Some(at) = rule.as_at() else {
        return false;
      };
      return at.name().eq_ignore_ascii_case(at_name);
    }

    let Some(style) = rule.as_style() else {
      // At-rules only pass filterless or media-all scopes.
      return self.is_unfiltered();
    };

    if self.base_only && !style.is_base() {
      return false;
    }
    if let Some(media) = &self.media {
      if !self.sheet.rule_in_media(style, Some(media)) {
        return false;
      }
    }
    if let Some(min) = self.specificity_min {
      if style.specificity() < min {
        return false;
      }
    }
    if let Some(max) = self.specificity_max {
      if style.specificity() > max {
        return false;
      }
    }
    if let Some(selector) = &self.selector {
      if style.selector != *selector {
        return false;
      }
    }
    if let Some(fragment) = &self.selector_contains {
      if !style.selector.contains(fragment.as_str()) {
        return false;
      }
    }
    if let Some(property) = &self.property {
      let matched = style.declarations.iter().any(|d| {
        d.property == *property
          && match &self.value {
            Some(value) if self.prefix_match => d.value.starts_with(value.as_str()),
            Some(value) => d.value == *value,
            None => true,
          }
      });
      if !matched {
        return false;
      }
    }
    if self.important == Some(true) {
      let matched = match (&self.important_property, &self.property) {
        (Some(p), _) | (None, Some(p)) => style
          .declarations
          .iter()
          .any(|d| d.property == *p && d.important),
        (None, None) => style.declarations.iter().any(|d| d.important),
      };
      if !matched {
        return false;
      }
    } else if let Some(p) = &self.important_property {
      if !style
        .declarations
        .iter()
        .any(|d| d.property == *p && d.important)
      {
        return false;
      }
    }

    true
  }

  fn is_unfiltered(&self) -> bool {
    self.media.as_ref().map_or(true, |m| *m == MediaType::All)
      && self.specificity_min.is_none()
      && self.specificity_max.is_none()
      && self.selector.is_none()
      && self.selector_contains.is_none()
      && self.property.is_none()
      && !self.base_only
      && self.important.is_none()
      && self.important_property.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sheet(css: &str) -> StyleSheet {
    StyleSheet::parse(css, ParserOptions::default()).unwrap()
  }

  #[test]
  fn ids_match_positions() {
    let s = sheet(".a { color: red; } .b, .c { color: blue; } .d { margin: 0; }");
    for (i, rule) in s.rules.iter().enumerate() {
      assert_eq!(rule.id() as usize, i);
    }
    assert_eq!(s.len(), 4);
  }

  #[test]
  fn selector_list_grouping() {
    let s = sheet("h1, h2 { color: red; }");
    assert_eq!(s.len(), 2);
    let lists = s.selector_lists();
    assert_eq!(lists.len(), 1);
    let (list_id, members) = lists.first().unwrap();
    assert_eq!(members.as_slice(), [0, 1]);
    for id in members {
      let rule = s.get(*id).unwrap().as_style().unwrap();
      assert_eq!(rule.selector_list_id, Some(*list_id));
    }
  }

  #[test]
  fn selector_lists_can_be_disabled() {
    let options = ParserOptions {
      selector_lists: false,
      ..ParserOptions::default()
    };
    let s = StyleSheet::parse("h1, h2 { color: red; }", options).unwrap();
    assert_eq!(s.len(), 2);
    assert!(s.selector_lists().is_empty());
    assert!(s.rules[0].as_style().unwrap().selector_list_id.is_none());
  }

  #[test]
  fn media_index_lists_rules_under_each_type() {
    let s = sheet("@media screen, print { .a { color: red; } } .b { color: blue; }");
    let index = s.media_index();
    assert_eq!(index.get(&MediaType::Screen).unwrap().as_slice(), [0]);
    assert_eq!(index.get(&MediaType::Print).unwrap().as_slice(), [0]);
    // Base rules never appear in the index.
    assert!(!index.values().any(|ids| ids.contains(&1)));
  }

  #[test]
  fn remove_rule_renumbers_and_rewrites_indices() {
    let mut s = sheet("h1, h2 { color: red; } .a { margin: 0; } @media print { .b { color: x; } }");
    s.remove_rule(1);
    for (i, rule) in s.rules.iter().enumerate() {
      assert_eq!(rule.id() as usize, i);
    }
    let lists = s.selector_lists();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists.first().unwrap().1.as_slice(), [0]);
    assert_eq!(s.media_index().get(&MediaType::Print).unwrap().as_slice(), [2]);
  }

  #[test]
  fn add_block_offsets_ids() {
    let mut s = sheet(".a { color: red; }");
    s.add_block("h1, h2 { margin: 0; }").unwrap();
    assert_eq!(s.len(), 3);
    assert_eq!(s.rules[1].id(), 1);
    assert_eq!(s.rules[1].as_style().unwrap().selector, "h1");
  }

  #[test]
  fn query_scopes() {
    let s = sheet(
      ".a { color: red !important; } #b { color: blue; } @media print { .c { margin: 0; } }",
    );
    assert_eq!(s.query().important().count(), 1);
    assert_eq!(s.query().specificity(100).ids(), [1]);
    assert_eq!(s.query().specificity_range(0, 50).ids(), [0, 2]);
    assert_eq!(s.query().media(MediaType::Print).ids(), [0, 1, 2]);
    assert_eq!(s.query().media(MediaType::Print).base_only().ids(), [0, 1]);
    assert_eq!(s.query().property("color").value("blue").ids(), [1]);
    assert_eq!(
      s.query().property("color").value("bl").prefix_match(true).ids(),
      [1]
    );
    assert_eq!(s.query().selector(".a").count(), 1);
  }

  #[test]
  fn at_rule_scope() {
    let s = sheet("@keyframes spin { from { opacity: 0; } } .a { color: red; }");
    assert_eq!(s.query().at_rule_type("keyframes").count(), 1);
    assert_eq!(s.query().at_rule_type("@keyframes").ids(), [0]);
  }

  #[test]
  fn custom_properties_last_write_wins() {
    let s = sheet(":root { --x: 1; --y: 2; } :root { --x: 3; }");
    let props = s.custom_properties(None);
    assert_eq!(props.get("--x").map(String::as_str), Some("3"));
    assert_eq!(props.get("--y").map(String::as_str), Some("2"));
  }

  #[test]
  fn subtraction_removes_semantically_equal_rules() {
    let a = sheet(".a { margin: 1px; } .b { color: red; }");
    let b = sheet(".a { margin-top: 1px; margin-right: 1px; margin-bottom: 1px; margin-left: 1px; }");
    let diff = a - &b;
    assert_eq!(diff.len(), 1);
    assert_eq!(diff.rules[0].as_style().unwrap().selector, ".b");
    assert_eq!(diff.rules[0].id(), 0);
  }

  #[test]
  fn addition_concatenates_and_flattens() {
    let a = sheet(".a { color: red; }");
    let b = sheet(".a { color: blue; }");
    let sum = a + &b;
    assert_eq!(sum.len(), 1);
    let rule = sum.rules[0].as_style().unwrap();
    assert_eq!(rule.declarations.len(), 1);
    assert_eq!(rule.declarations[0].value, "blue");
  }

  #[test]
  fn hard_error_rolls_back() {
    let mut s = sheet(".a { color: red; }");
    let deep = "@media screen {".repeat(11) + ".x { color: red; }" + &"}".repeat(11);
    assert!(s.add_block(&deep).is_err());
    assert_eq!(s.len(), 1);
    assert!(s.media_queries.is_empty());
  }
}
