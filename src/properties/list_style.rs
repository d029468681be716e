//! The `list-style` shorthand, classified by keyword shape.

use super::{split_value_tokens, Longhands};
use crate::declaration::Declaration;

pub(super) const LONGHANDS: &[&str] =
  &["list-style-type", "list-style-position", "list-style-image"];

const DEFAULT_TYPE: &str = "disc";
const DEFAULT_POSITION: &str = "outside";
const DEFAULT_IMAGE: &str = "none";

pub(super) fn expand(decl: &Declaration) -> Option<Longhands> {
  let tokens = split_value_tokens(&decl.value);
  if tokens.is_empty() || tokens.len() > 3 {
    return None;
  }

  let mut style_type = None;
  let mut position = None;
  let mut image = None;
  for token in tokens {
    let lower = token.to_ascii_lowercase();
    if position.is_none() && (lower == "inside" || lower == "outside") {
      position = Some(token.to_string());
    } else if image.is_none() && lower.starts_with("url(") {
      image = Some(token.to_string());
    } else if lower == "none" {
      // `none` can mean either no marker or no image; fill type first.
      if style_type.is_none() {
        style_type = Some(token.to_string());
      } else if image.is_none() {
        image = Some(token.to_string());
      } else {
        return None;
      }
    } else if style_type.is_none() {
      style_type = Some(token.to_string());
    } else {
      return None;
    }
  }

  Some(
    [
      (
        "list-style-type",
        style_type.unwrap_or_else(|| DEFAULT_TYPE.into()),
      ),
      (
        "list-style-position",
        position.unwrap_or_else(|| DEFAULT_POSITION.into()),
      ),
      (
        "list-style-image",
        image.unwrap_or_else(|| DEFAULT_IMAGE.into()),
      ),
    ]
    .into_iter()
    .map(|(name, value)| Declaration::new(name, &value, decl.important))
    .collect(),
  )
}

/// Builds a minimal `list-style` value from values in [`LONGHANDS`] order.
pub(super) fn minimal_list_style(values: &[&str]) -> Option<String> {
  let &[style_type, position, image] = values else {
    return None;
  };

  let mut parts: Vec<&str> = Vec::with_capacity(3);
  if !style_type.eq_ignore_ascii_case(DEFAULT_TYPE) {
    parts.push(style_type);
  }
  if !position.eq_ignore_ascii_case(DEFAULT_POSITION) {
    parts.push(position);
  }
  if !image.eq_ignore_ascii_case(DEFAULT_IMAGE) {
    parts.push(image);
  }
  if parts.is_empty() {
    parts.push(style_type);
  }
  Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn expand_values(value: &str) -> Vec<(String, String)> {
    expand(&Declaration::new("list-style", value, false))
      .unwrap()
      .iter()
      .map(|d| (d.property.clone(), d.value.clone()))
      .collect()
  }

  #[test]
  fn keyword_classification() {
    assert_eq!(
      expand_values("square inside"),
      [
        ("list-style-type".to_string(), "square".to_string()),
        ("list-style-position".to_string(), "inside".to_string()),
        ("list-style-image".to_string(), "none".to_string()),
      ]
    );
  }

  #[test]
  fn image_url() {
    let out = expand_values("url(dot.png)");
    assert_eq!(out[0].1, "disc");
    assert_eq!(out[2].1, "url(dot.png)");
  }

  #[test]
  fn none_fills_type_then_image() {
    let out = expand_values("none");
    assert_eq!(out[0].1, "none");
    assert_eq!(out[2].1, "none");

    let out = expand_values("none none");
    assert_eq!(out[0].1, "none");
    assert_eq!(out[2].1, "none");
  }

  #[test]
  fn minimal_round_trip() {
    assert_eq!(
      minimal_list_style(&["square", "inside", "none"]).unwrap(),
      "square inside"
    );
    assert_eq!(
      minimal_list_style(&["disc", "outside", "none"]).unwrap(),
      "disc"
    );
    assert_eq!(
      minimal_list_style(&["disc", "outside", "url(dot.png)"]).unwrap(),
      "url(dot.png)"
    );
  }
}
