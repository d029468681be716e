use crate::declaration::Declaration;
use crate::properties;
use crate::specificity::calculate_specificity;

/// How a nested rule's selector was combined with its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingStyle {
  /// No `&` in the source: the parent selector was prepended as a
  /// descendant combinator.
  Implicit,
  /// The source selector contained `&`, substituted with the parent
  /// selector at every occurrence.
  Explicit,
}

/// A style rule: one resolved selector plus its declarations.
///
/// The selector never contains a top-level comma; a source comma list
/// produces one rule per member, tied together by `selector_list_id`.
#[derive(Debug, Clone)]
pub struct StyleRule {
  /// Position of this rule in the owning stylesheet's `rules`.
  pub id: u32,
  pub selector: String,
  pub declarations: Vec<Declaration>,
  /// Memoized specificity. Computed on first use; never read directly,
  /// use [`StyleRule::specificity`].
  pub specificity: Option<u32>,
  /// The rule this one was nested inside, if any.
  pub parent_rule_id: Option<u32>,
  pub nesting_style: Option<NestingStyle>,
  /// Groups rules that came from one source comma list.
  pub selector_list_id: Option<u32>,
  /// The media query this rule is nested under. `None` means all media.
  pub media_query_id: Option<u32>,
}

impl StyleRule {
  pub fn new(id: u32, selector: String) -> StyleRule {
    StyleRule {
      id,
      selector,
      declarations: Vec::new(),
      specificity: None,
      parent_rule_id: None,
      nesting_style: None,
      selector_list_id: None,
      media_query_id: None,
    }
  }

  /// The selector's specificity, memoized from the first computation.
  pub fn specificity(&self) -> u32 {
    match self.specificity {
      Some(s) => s,
      None => calculate_specificity(&self.selector),
    }
  }

  /// Computes and stores the specificity, returning it.
  pub fn memoize_specificity(&mut self) -> u32 {
    let s = self.specificity();
    self.specificity = Some(s);
    s
  }

  /// Whether this rule applies outside any media query.
  pub fn is_base(&self) -> bool {
    self.media_query_id.is_none()
  }

  /// Declarations with every shorthand fully expanded, stably sorted by
  /// `(property, value, important)`.
  pub(crate) fn expanded_declarations(&self) -> Vec<Declaration> {
    let mut expanded = Vec::with_capacity(self.declarations.len());
    for decl in &self.declarations {
      expanded.extend(properties::expand_fully(decl));
    }
    expanded.sort();
    expanded
  }

  /// Semantic equality: same selector, and the same declaration set after
  /// shorthand expansion of both sides.
  pub fn semantic_eq(&self, other: &StyleRule) -> bool {
    self.selector == other.selector
      && self.expanded_declarations() == other.expanded_declarations()
  }
}

impl PartialEq for StyleRule {
  /// Structural equality, ignoring the memoization state of `specificity`.
  fn eq(&self, other: &StyleRule) -> bool {
    self.id == other.id
      && self.selector == other.selector
      && self.declarations == other.declarations
      && self.parent_rule_id == other.parent_rule_id
      && self.nesting_style == other.nesting_style
      && self.selector_list_id == other.selector_list_id
      && self.media_query_id == other.media_query_id
  }
}

/// The body of an at-rule record.
#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleContent {
  /// Nested rules, e.g. the stops of `@keyframes`. Ids are local to the
  /// body and do not participate in the stylesheet's id space.
  Rules(Vec<StyleRule>),
  /// A declaration body, e.g. `@font-face` or `@property`.
  Declarations(Vec<Declaration>),
}

/// A typed at-rule preserved in the rule list: `@keyframes`, `@font-face`,
/// `@page`, `@property`, `@counter-style` and unknown declaration-bodied
/// at-rules.
///
/// `@charset`, `@import`, `@media` and the conditional group rules are
/// handled by the parser and never stored as `AtRule` records.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
  /// Position of this rule in the owning stylesheet's `rules`.
  pub id: u32,
  /// The full prelude, e.g. `@keyframes spin` or `@font-face`.
  pub selector: String,
  pub content: AtRuleContent,
}

impl AtRule {
  /// The at-rule name including the `@`, e.g. `@keyframes`.
  pub fn name(&self) -> &str {
    self
      .selector
      .split_ascii_whitespace()
      .next()
      .unwrap_or(&self.selector)
  }
}

/// A rule in a stylesheet: either a style rule or a preserved at-rule.
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
  Style(StyleRule),
  At(AtRule),
}

impl CssRule {
  pub fn id(&self) -> u32 {
    match self {
      CssRule::Style(rule) => rule.id,
      CssRule::At(rule) => rule.id,
    }
  }

  pub(crate) fn set_id(&mut self, id: u32) {
    match self {
      CssRule::Style(rule) => rule.id = id,
      CssRule::At(rule) => rule.id = id,
    }
  }

  pub fn as_style(&self) -> Option<&StyleRule> {
    match self {
      CssRule::Style(rule) => Some(rule),
      CssRule::At(_) => None,
    }
  }

  pub fn as_at(&self) -> Option<&AtRule> {
    match self {
      CssRule::At(rule) => Some(rule),
      CssRule::Style(_) => None,
    }
  }

  pub(crate) fn media_query_id(&self) -> Option<u32> {
    match self {
      CssRule::Style(rule) => rule.media_query_id,
      CssRule::At(_) => None,
    }
  }

  pub(crate) fn selector_list_id(&self) -> Option<u32> {
    match self {
      CssRule::Style(rule) => rule.selector_list_id,
      CssRule::At(_) => None,
    }
  }
}

/// An `@import` statement recorded at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
  /// The rule position where resolved rules will be spliced in.
  pub id: u32,
  pub url: String,
  /// Raw media query text following the URL, if any.
  pub media: Option<String>,
  /// The canonicalized media query allocated for `media`.
  pub media_query_id: Option<u32>,
  pub resolved: bool,
}
