//! The `font` shorthand: positional, with `/` separating size and
//! line-height.

use super::{split_value_tokens, Longhands};
use crate::declaration::Declaration;

pub(super) const LONGHANDS: &[&str] = &[
  "font-style",
  "font-variant",
  "font-weight",
  "font-size",
  "line-height",
  "font-family",
];

fn is_weight(token: &str) -> bool {
  matches!(
    token.to_ascii_lowercase().as_str(),
    "bold" | "bolder" | "lighter"
  ) || (token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()))
}

/// Splits `12px/1.5` style tokens at the first top-level slash.
fn split_slash(token: &str) -> (&str, Option<&str>) {
  let mut depth = 0usize;
  for (i, b) in token.bytes().enumerate() {
    match b {
      b'(' => depth += 1,
      b')' => depth = depth.saturating_sub(1),
      b'/' if depth == 0 => return (&token[..i], Some(&token[i + 1..])),
      _ => {}
    }
  }
  (token, None)
}

pub(super) fn expand(decl: &Declaration) -> Option<Longhands> {
  let tokens = split_value_tokens(&decl.value);
  let mut style = None;
  let mut variant = None;
  let mut weight = None;

  let mut idx = 0;
  while idx < tokens.len() {
    let token = tokens[idx];
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
      "normal" => {}
      "italic" | "oblique" if style.is_none() => style = Some(token.to_string()),
      "small-caps" if variant.is_none() => variant = Some(token.to_string()),
      _ if is_weight(token) && weight.is_none() => weight = Some(token.to_string()),
      _ => break,
    }
    idx += 1;
  }

  // The first unclassified token is the size, optionally with a line-height
  // after a slash. Everything after it is the family list.
  if idx == tokens.len() {
    return None;
  }
  let (size, mut line_height) = split_slash(tokens[idx]);
  if size.is_empty() {
    return None;
  }
  idx += 1;

  if line_height.is_none() && idx < tokens.len() {
    if tokens[idx] == "/" {
      line_height = tokens.get(idx + 1).copied();
      idx += 2;
    } else if let Some(rest) = tokens[idx].strip_prefix('/') {
      line_height = Some(rest);
      idx += 1;
    }
  }

  if idx == tokens.len() {
    // A size with no family is not a valid font shorthand (e.g. the system
    // font keywords); keep the declaration whole.
    return None;
  }
  let family = tokens[idx..].join(" ");

  Some(
    [
      ("font-style", style.unwrap_or_else(|| "normal".into())),
      ("font-variant", variant.unwrap_or_else(|| "normal".into())),
      ("font-weight", weight.unwrap_or_else(|| "normal".into())),
      ("font-size", size.to_string()),
      (
        "line-height",
        line_height.map(str::to_string).unwrap_or_else(|| "normal".into()),
      ),
      ("font-family", family),
    ]
    .into_iter()
    .map(|(name, value)| Declaration::new(name, &value, decl.important))
    .collect(),
  )
}

/// Builds a minimal `font` value from values in [`LONGHANDS`] order.
pub(super) fn minimal_font(values: &[&str]) -> Option<String> {
  let &[style, variant, weight, size, line_height, family] = values else {
    return None;
  };
  if size.is_empty() || family.is_empty() {
    return None;
  }
  if split_value_tokens(size).len() != 1 {
    return None;
  }

  let mut parts: Vec<String> = Vec::with_capacity(4);
  for component in [style, variant, weight] {
    if !component.eq_ignore_ascii_case("normal") {
      parts.push(component.to_string());
    }
  }
  if line_height.eq_ignore_ascii_case("normal") {
    parts.push(size.to_string());
  } else {
    parts.push(format!("{}/{}", size, line_height));
  }
  parts.push(family.to_string());
  Some(parts.join(" "))
}
