//! Shorthand property tables.
//!
//! Each supported shorthand defines two operations: *expand*, splitting the
//! shorthand's value into its full longhand set (unspecified components get
//! their initial values, since a shorthand resets every longhand it covers),
//! and *synthesize*, recombining a complete longhand set into a minimal
//! shorthand value. Synthesis refuses rather than lose information.

pub(crate) mod background;
pub(crate) mod border;
pub(crate) mod box_side;
pub(crate) mod font;
pub(crate) mod list_style;

use std::collections::HashMap;

use lazy_static::lazy_static;
use smallvec::SmallVec;

use crate::declaration::Declaration;

pub(crate) type Longhands = SmallVec<[Declaration; 8]>;

type ExpandFn = fn(&Declaration) -> Option<Longhands>;

lazy_static! {
  static ref EXPANDERS: HashMap<&'static str, ExpandFn> = {
    let mut m: HashMap<&'static str, ExpandFn> = HashMap::new();
    m.insert("margin", box_side::expand_margin as ExpandFn);
    m.insert("padding", box_side::expand_padding);
    m.insert("border-width", box_side::expand_border_width);
    m.insert("border-style", box_side::expand_border_style);
    m.insert("border-color", box_side::expand_border_color);
    m.insert("border", border::expand_border);
    m.insert("border-top", border::expand_border_top);
    m.insert("border-right", border::expand_border_right);
    m.insert("border-bottom", border::expand_border_bottom);
    m.insert("border-left", border::expand_border_left);
    m.insert("font", font::expand);
    m.insert("list-style", list_style::expand);
    m.insert("background", background::expand);
    m
  };
}

/// Whether the property is a shorthand this crate knows how to expand.
pub(crate) fn is_shorthand(property: &str) -> bool {
  EXPANDERS.contains_key(property)
}

/// Expands one level of shorthand. `None` for non-shorthands and for values
/// the table cannot split (which are then kept whole).
pub(crate) fn expand(decl: &Declaration) -> Option<Longhands> {
  EXPANDERS.get(decl.property.as_str())?(decl)
}

/// Recursively expands a declaration to its longhand set, in table order.
/// Non-shorthands come back as a single-element list.
pub(crate) fn expand_fully(decl: &Declaration) -> Longhands {
  let mut out = Longhands::new();
  expand_into(decl, &mut out);
  out
}

fn expand_into(decl: &Declaration, out: &mut Longhands) {
  match expand(decl) {
    Some(parts) => {
      for part in &parts {
        expand_into(part, out);
      }
    }
    None => out.push(decl.clone()),
  }
}

/// Opportunistically recombines longhands into shorthands, in place.
///
/// A shorthand is emitted only when every one of its longhands is present
/// with the same importance and the combined value loses nothing. The
/// shorthand takes the position of its first constituent.
pub(crate) fn synthesize_shorthands(declarations: &mut Vec<Declaration>) {
  for &(shorthand, sides) in box_side::SIDE_SHORTHANDS {
    try_combine(declarations, shorthand, sides, box_side::minimal_sides);
  }
  try_combine(
    declarations,
    "border",
    &["border-width", "border-style", "border-color"],
    border::minimal_border,
  );
  try_combine(declarations, "font", font::LONGHANDS, font::minimal_font);
  try_combine(
    declarations,
    "background",
    background::LONGHANDS,
    background::minimal_background,
  );
  try_combine(
    declarations,
    "list-style",
    list_style::LONGHANDS,
    list_style::minimal_list_style,
  );
}

fn try_combine(
  declarations: &mut Vec<Declaration>,
  shorthand: &str,
  longhands: &[&str],
  build: fn(&[&str]) -> Option<String>,
) {
  let mut positions: SmallVec<[usize; 8]> = SmallVec::new();
  for name in longhands {
    match declarations.iter().position(|d| d.property == *name) {
      Some(pos) => positions.push(pos),
      None => return,
    }
  }

  let important = declarations[positions[0]].important;
  if positions.iter().any(|p| declarations[*p].important != important) {
    return;
  }

  let value = {
    let values: SmallVec<[&str; 8]> = positions
      .iter()
      .map(|p| declarations[*p].value.as_str())
      .collect();
    match build(&values) {
      Some(value) => value,
      None => return,
    }
  };

  let slot = *positions.iter().min().unwrap();
  declarations[slot] = Declaration::new(shorthand, &value, important);
  let mut doomed: SmallVec<[usize; 8]> = positions
    .iter()
    .copied()
    .filter(|p| *p != slot)
    .collect();
  doomed.sort_unstable();
  for pos in doomed.into_iter().rev() {
    declarations.remove(pos);
  }
}

/// Splits a value on whitespace, keeping parenthesized groups and quoted
/// strings whole. `calc(1px + 2px)` and `url("a b.png")` are single tokens.
pub(crate) fn split_value_tokens(value: &str) -> SmallVec<[&str; 8]> {
  let bytes = value.as_bytes();
  let mut tokens: SmallVec<[&str; 8]> = SmallVec::new();
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
        b'(' => depth += 1,
        b')' => depth = depth.saturating_sub(1),
        b'\'' | b'"' => {
          let quote = bytes[i];
          i += 1;
          while i < bytes.len() && bytes[i] != quote {
            if bytes[i] == b'\\' {
              i += 1;
            }
            i += 1;
          }
        }
        ch if ch.is_ascii_whitespace() && depth == 0 => break,
        _ => {}
      }
      i += 1;
    }
    tokens.push(&value[start..i]);
  }
  tokens
}

/// Whether a token looks like a length, percentage or numeric value.
pub(crate) fn is_length_like(token: &str) -> bool {
  let bytes = token.as_bytes();
  match bytes.first() {
    Some(b) if b.is_ascii_digit() => true,
    Some(b'.') | Some(b'-') | Some(b'+') => bytes.get(1).is_some_and(|b| b.is_ascii_digit()),
    _ => {
      let lower = token.to_ascii_lowercase();
      lower.starts_with("calc(") || lower.starts_with("var(")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_splitting_respects_functions_and_strings() {
    let tokens = split_value_tokens("1px calc(2px + 3px) url(\"a b.png\") red");
    assert_eq!(
      tokens.as_slice(),
      ["1px", "calc(2px + 3px)", "url(\"a b.png\")", "red"]
    );
  }

  #[test]
  fn expand_fully_recurses() {
    let decl = Declaration::new("border", "1px solid red", false);
    let mut longhands: Vec<String> =
      expand_fully(&decl).iter().map(|d| d.property.clone()).collect();
    longhands.sort();
    assert_eq!(longhands.len(), 12);
    assert!(longhands.contains(&"border-top-width".to_string()));
    assert!(longhands.contains(&"border-left-color".to_string()));
  }

  #[test]
  fn expand_fully_keeps_longhands() {
    let decl = Declaration::new("color", "red", true);
    let out = expand_fully(&decl);
    assert_eq!(out.as_slice(), [decl]);
  }

  #[test]
  fn importance_propagates_to_all_longhands() {
    let decl = Declaration::new("margin", "1px 2px", true);
    assert!(expand_fully(&decl).iter().all(|d| d.important));
  }

  #[test]
  fn synthesis_requires_uniform_importance() {
    let mut decls = vec![
      Declaration::new("margin-top", "1px", true),
      Declaration::new("margin-right", "1px", false),
      Declaration::new("margin-bottom", "1px", false),
      Declaration::new("margin-left", "1px", false),
    ];
    synthesize_shorthands(&mut decls);
    assert_eq!(decls.len(), 4);
  }
}
