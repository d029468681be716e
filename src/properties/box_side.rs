//! Four-side dimension shorthands: `margin`, `padding`, `border-width`,
//! `border-style`, `border-color`.

use super::{split_value_tokens, Longhands};
use crate::declaration::Declaration;

/// Shorthand name plus its longhands in top/right/bottom/left order.
pub(super) const SIDE_SHORTHANDS: &[(&str, &[&str])] = &[
  (
    "margin",
    &["margin-top", "margin-right", "margin-bottom", "margin-left"],
  ),
  (
    "padding",
    &["padding-top", "padding-right", "padding-bottom", "padding-left"],
  ),
  (
    "border-width",
    &[
      "border-top-width",
      "border-right-width",
      "border-bottom-width",
      "border-left-width",
    ],
  ),
  (
    "border-style",
    &[
      "border-top-style",
      "border-right-style",
      "border-bottom-style",
      "border-left-style",
    ],
  ),
  (
    "border-color",
    &[
      "border-top-color",
      "border-right-color",
      "border-bottom-color",
      "border-left-color",
    ],
  ),
];

fn sides_for(shorthand: &str) -> &'static [&'static str] {
  SIDE_SHORTHANDS
    .iter()
    .find(|(name, _)| *name == shorthand)
    .map(|(_, sides)| *sides)
    .expect("unknown side shorthand")
}

/// One value → all sides; two → vertical, horizontal; three → top,
/// horizontal, bottom; four → top, right, bottom, left.
fn expand_sides(decl: &Declaration, shorthand: &str) -> Option<Longhands> {
  let tokens = split_value_tokens(&decl.value);
  let (t, r, b, l) = match tokens.len() {
    1 => (0, 0, 0, 0),
    2 => (0, 1, 0, 1),
    3 => (0, 1, 2, 1),
    4 => (0, 1, 2, 3),
    _ => return None,
  };

  let names = sides_for(shorthand);
  let values = [tokens[t], tokens[r], tokens[b], tokens[l]];
  Some(
    names
      .iter()
      .zip(values)
      .map(|(name, value)| Declaration::new(name, value, decl.important))
      .collect(),
  )
}

pub(super) fn expand_margin(decl: &Declaration) -> Option<Longhands> {
  expand_sides(decl, "margin")
}

pub(super) fn expand_padding(decl: &Declaration) -> Option<Longhands> {
  expand_sides(decl, "padding")
}

pub(super) fn expand_border_width(decl: &Declaration) -> Option<Longhands> {
  expand_sides(decl, "border-width")
}

pub(super) fn expand_border_style(decl: &Declaration) -> Option<Longhands> {
  expand_sides(decl, "border-style")
}

pub(super) fn expand_border_color(decl: &Declaration) -> Option<Longhands> {
  expand_sides(decl, "border-color")
}

/// Builds the minimal 1–4 value form from top/right/bottom/left values.
///
/// Refuses when a side value is itself multiple tokens, since re-expansion
/// of the shorthand would then misassign them.
pub(super) fn minimal_sides(values: &[&str]) -> Option<String> {
  let &[top, right, bottom, left] = values else {
    return None;
  };
  if values.iter().any(|v| split_value_tokens(v).len() != 1) {
    return None;
  }

  Some(if left == right {
    if top == bottom {
      if top == right {
        top.to_string()
      } else {
        format!("{} {}", top, right)
      }
    } else {
      format!("{} {} {}", top, right, bottom)
    }
  } else {
    format!("{} {} {} {}", top, right, bottom, left)
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn expand_values(value: &str) -> Vec<(String, String)> {
    expand_margin(&Declaration::new("margin", value, false))
      .unwrap()
      .iter()
      .map(|d| (d.property.clone(), d.value.clone()))
      .collect()
  }

  #[test]
  fn arity_one() {
    assert_eq!(
      expand_values("5px"),
      [
        ("margin-top".to_string(), "5px".to_string()),
        ("margin-right".to_string(), "5px".to_string()),
        ("margin-bottom".to_string(), "5px".to_string()),
        ("margin-left".to_string(), "5px".to_string()),
      ]
    );
  }

  #[test]
  fn arity_two_and_three() {
    assert_eq!(
      expand_values("1px 2px"),
      [
        ("margin-top".to_string(), "1px".to_string()),
        ("margin-right".to_string(), "2px".to_string()),
        ("margin-bottom".to_string(), "1px".to_string()),
        ("margin-left".to_string(), "2px".to_string()),
      ]
    );
    assert_eq!(
      expand_values("1px 2px 3px"),
      [
        ("margin-top".to_string(), "1px".to_string()),
        ("margin-right".to_string(), "2px".to_string()),
        ("margin-bottom".to_string(), "3px".to_string()),
        ("margin-left".to_string(), "2px".to_string()),
      ]
    );
  }

  #[test]
  fn functions_stay_whole() {
    assert_eq!(
      expand_values("calc(1px + 2px) 4px"),
      [
        ("margin-top".to_string(), "calc(1px + 2px)".to_string()),
        ("margin-right".to_string(), "4px".to_string()),
        ("margin-bottom".to_string(), "calc(1px + 2px)".to_string()),
        ("margin-left".to_string(), "4px".to_string()),
      ]
    );
  }

  #[test]
  fn minimal_forms() {
    assert_eq!(minimal_sides(&["1px"; 4]).unwrap(), "1px");
    assert_eq!(
      minimal_sides(&["1px", "2px", "1px", "2px"]).unwrap(),
      "1px 2px"
    );
    assert_eq!(
      minimal_sides(&["1px", "2px", "3px", "2px"]).unwrap(),
      "1px 2px 3px"
    );
    assert_eq!(
      minimal_sides(&["10px", "20px", "10px", "5px"]).unwrap(),
      "10px 20px 10px 5px"
    );
  }
}
