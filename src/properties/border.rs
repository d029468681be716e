//! The `border` shorthand and its per-side variants.
//!
//! `border: 1px solid red` takes 1–3 tokens in any order; each token is
//! classified as a width, a style or a color by shape.

use super::{is_length_like, split_value_tokens, Longhands};
use crate::declaration::Declaration;

const STYLE_KEYWORDS: [&str; 10] = [
  "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

const WIDTH_KEYWORDS: [&str; 3] = ["thin", "medium", "thick"];

const DEFAULT_WIDTH: &str = "medium";
const DEFAULT_STYLE: &str = "none";
const DEFAULT_COLOR: &str = "currentcolor";

fn is_style_keyword(token: &str) -> bool {
  STYLE_KEYWORDS.iter().any(|k| token.eq_ignore_ascii_case(k))
}

fn is_width(token: &str) -> bool {
  WIDTH_KEYWORDS.iter().any(|k| token.eq_ignore_ascii_case(k)) || is_length_like(token)
}

/// Classifies 1–3 tokens into `(width, style, color)`, falling back to the
/// component defaults for anything unspecified.
fn classify(value: &str) -> Option<(String, String, String)> {
  let tokens = split_value_tokens(value);
  if tokens.is_empty() || tokens.len() > 3 {
    return None;
  }

  let mut width = None;
  let mut style = None;
  let mut color = None;
  for token in tokens {
    if style.is_none() && is_style_keyword(token) {
      style = Some(token.to_string());
    } else if width.is_none() && is_width(token) {
      width = Some(token.to_string());
    } else if color.is_none() {
      color = Some(token.to_string());
    } else {
      return None;
    }
  }

  Some((
    width.unwrap_or_else(|| DEFAULT_WIDTH.into()),
    style.unwrap_or_else(|| DEFAULT_STYLE.into()),
    color.unwrap_or_else(|| DEFAULT_COLOR.into()),
  ))
}

pub(super) fn expand_border(decl: &Declaration) -> Option<Longhands> {
  let (width, style, color) = classify(&decl.value)?;
  Some(
    [
      ("border-width", width),
      ("border-style", style),
      ("border-color", color),
    ]
    .into_iter()
    .map(|(name, value)| Declaration::new(name, &value, decl.important))
    .collect(),
  )
}

fn expand_side(decl: &Declaration, side: &str) -> Option<Longhands> {
  let (width, style, color) = classify(&decl.value)?;
  Some(
    [
      (format!("border-{}-width", side), width),
      (format!("border-{}-style", side), style),
      (format!("border-{}-color", side), color),
    ]
    .into_iter()
    .map(|(name, value)| Declaration::new(&name, &value, decl.important))
    .collect(),
  )
}

pub(super) fn expand_border_top(decl: &Declaration) -> Option<Longhands> {
  expand_side(decl, "top")
}

pub(super) fn expand_border_right(decl: &Declaration) -> Option<Longhands> {
  expand_side(decl, "right")
}

pub(super) fn expand_border_bottom(decl: &Declaration) -> Option<Longhands> {
  expand_side(decl, "bottom")
}

pub(super) fn expand_border_left(decl: &Declaration) -> Option<Longhands> {
  expand_side(decl, "left")
}

/// Builds a minimal `border` value from `[border-width, border-style,
/// border-color]` values.
///
/// Refuses when any component is multi-token: per-side differences cannot be
/// expressed by the shorthand.
pub(super) fn minimal_border(values: &[&str]) -> Option<String> {
  let &[width, style, color] = values else {
    return None;
  };
  if values.iter().any(|v| split_value_tokens(v).len() != 1) {
    return None;
  }

  let mut parts: Vec<&str> = Vec::with_capacity(3);
  if !width.eq_ignore_ascii_case(DEFAULT_WIDTH) {
    parts.push(width);
  }
  if !style.eq_ignore_ascii_case(DEFAULT_STYLE) {
    parts.push(style);
  }
  if !color.eq_ignore_ascii_case(DEFAULT_COLOR) {
    parts.push(color);
  }
  if parts.is_empty() {
    parts.push(DEFAULT_STYLE);
  }
  Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_any_order() {
    assert_eq!(
      classify("solid 1px red").unwrap(),
      ("1px".to_string(), "solid".to_string(), "red".to_string())
    );
    assert_eq!(
      classify("red solid").unwrap(),
      (
        "medium".to_string(),
        "solid".to_string(),
        "red".to_string()
      )
    );
  }

  #[test]
  fn missing_components_default() {
    assert_eq!(
      classify("solid").unwrap(),
      (
        "medium".to_string(),
        "solid".to_string(),
        "currentcolor".to_string()
      )
    );
  }

  #[test]
  fn color_functions() {
    let (width, style, color) = classify("1px solid rgb(0, 0, 0)").unwrap();
    assert_eq!(width, "1px");
    assert_eq!(style, "solid");
    assert_eq!(color, "rgb(0, 0, 0)");
  }

  #[test]
  fn side_expansion() {
    let decl = Declaration::new("border-top", "2px dashed", false);
    let out = expand_border_top(&decl).unwrap();
    assert_eq!(out[0].property, "border-top-width");
    assert_eq!(out[0].value, "2px");
    assert_eq!(out[1].property, "border-top-style");
    assert_eq!(out[1].value, "dashed");
    assert_eq!(out[2].property, "border-top-color");
    assert_eq!(out[2].value, "currentcolor");
  }

  #[test]
  fn minimal_omits_defaults() {
    assert_eq!(
      minimal_border(&["1px", "solid", "red"]).unwrap(),
      "1px solid red"
    );
    assert_eq!(
      minimal_border(&["medium", "solid", "currentcolor"]).unwrap(),
      "solid"
    );
    assert_eq!(minimal_border(&["medium", "none", "currentcolor"]).unwrap(), "none");
    assert_eq!(minimal_border(&["1px 2px 1px 2px", "solid", "red"]), None);
  }
}
