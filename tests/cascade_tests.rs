//! Cascade/flatten behavior across selectors, specificity, importance and
//! shorthand boundaries.

use cataract::{CssRule, Declaration, ParserOptions, StyleSheet};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn flat(css: &str) -> StyleSheet {
  StyleSheet::parse(css, ParserOptions::default())
    .unwrap()
    .flatten()
}

fn declarations_of<'a>(sheet: &'a StyleSheet, selector: &str) -> &'a [Declaration] {
  sheet
    .rules
    .iter()
    .filter_map(CssRule::as_style)
    .find(|r| r.selector == selector)
    .map(|r| r.declarations.as_slice())
    .unwrap_or_else(|| panic!("no rule for {}", selector))
}

#[test]
fn cascade_across_specificity() {
  // Rules for different selectors stay separate; each group keeps its own
  // winners.
  let sheet = flat(".t { color: black; } #t { color: red; } .t { margin: 10px; }");
  assert_eq!(sheet.len(), 2);

  let t = declarations_of(&sheet, ".t");
  assert!(t.iter().any(|d| d.property == "margin" && d.value == "10px"));
  assert!(t.iter().any(|d| d.property == "color" && d.value == "black"));

  let id = declarations_of(&sheet, "#t");
  assert_eq!(id, [Declaration::new("color", "red", false)]);
}

#[test]
fn important_dominates_specificity() {
  // P8: a !important declaration wins over any later or more specific
  // normal declaration in the same group.
  let sheet = flat(".t { color: black !important; } .t { color: red; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(t, [Declaration::new("color", "black", true)]);
}

#[test]
fn shorthand_expansion_then_resynthesis() {
  let sheet = flat(".t { margin: 10px 20px; } .t { margin-left: 5px; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(t, [Declaration::new("margin", "10px 20px 10px 5px", false)]);
}

#[test]
fn border_components_merge() {
  let sheet = flat(".t { border: 1px solid red; } .t { border-left-color: blue; }");
  let t = declarations_of(&sheet, ".t");
  assert!(t
    .iter()
    .any(|d| d.property == "border-width" && d.value == "1px"));
  assert!(t
    .iter()
    .any(|d| d.property == "border-style" && d.value == "solid"));
  assert!(t
    .iter()
    .any(|d| d.property == "border-color" && d.value == "red red red blue"));
}

#[test]
fn uniform_border_resynthesizes() {
  let sheet = flat(".t { border-width: 2px; border-style: dashed; border-color: red; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(t, [Declaration::new("border", "2px dashed red", false)]);
}

#[test]
fn font_round_trips_through_longhands() {
  let sheet = flat(".t { font: bold 12px/1.5 Arial, sans-serif; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(
    t,
    [Declaration::new("font", "bold 12px/1.5 Arial, sans-serif", false)]
  );
}

#[test]
fn later_shorthand_resets_earlier_longhand() {
  // A shorthand sets all of its longhands, so a later `background` must
  // override an earlier `background-image`.
  let sheet = flat(".t { background: red url(a.png); } .t { background: blue; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(t, [Declaration::new("background", "blue", false)]);
}

#[test]
fn every_declared_property_survives() {
  // P6: flattening never drops a property; it survives as itself, a
  // longhand, or a covering shorthand.
  let source = indoc! {"
    .t { margin: 1px; padding-top: 2px; color: red; }
    .t { margin-left: 3px; font-size: 10px; }
  "};
  let sheet = flat(source);
  let t = declarations_of(&sheet, ".t");
  for property in ["margin", "padding-top", "color", "font-size"] {
    assert!(
      t.iter().any(|d| d.property == property
        || d.property.starts_with(&format!("{}-", property))),
      "{} missing from {:?}",
      property,
      t
    );
  }
}

#[test]
fn groups_keep_first_appearance_order() {
  let sheet = flat(".b { color: blue; } .a { color: red; } .b { margin: 0; }");
  let selectors: Vec<&str> = sheet
    .rules
    .iter()
    .filter_map(CssRule::as_style)
    .map(|r| r.selector.as_str())
    .collect();
  assert_eq!(selectors, [".b", ".a"]);
}

#[test]
fn specificity_is_memoized_on_flattened_rules() {
  let sheet = flat("#a .b { color: red; }");
  let rule = sheet.rules[0].as_style().unwrap();
  assert_eq!(rule.specificity, Some(110));
}

#[test]
fn flatten_is_idempotent_over_mixed_content() {
  // P5.
  let source = indoc! {"
    @charset \"utf-8\";
    .t { margin: 10px 20px; }
    .t { margin-left: 5px; }
    @media screen, print { .t { color: red; } .u { color: blue; } }
    @keyframes spin { from { opacity: 0; } }
    @font-face { font-family: X; src: url(x.woff); }
  "};
  let once = flat(source);
  let twice = once.flatten();
  assert_eq!(once, twice);
}

#[test]
fn separate_media_groups_do_not_merge() {
  let sheet = flat(".t { color: red; } @media print { .t { color: blue; } }");
  assert_eq!(sheet.len(), 2);
  let base = sheet.rules[0].as_style().unwrap();
  assert_eq!(base.declarations[0].value, "red");
  let print = sheet.rules[1].as_style().unwrap();
  assert_eq!(print.declarations[0].value, "blue");
}

#[test]
fn mixed_importance_blocks_synthesis() {
  let sheet = flat(".t { margin: 1px; margin-left: 2px !important; }");
  let t = declarations_of(&sheet, ".t");
  assert_eq!(t.len(), 4);
  assert!(t
    .iter()
    .any(|d| d.property == "margin-left" && d.value == "2px" && d.important));
  assert!(t
    .iter()
    .any(|d| d.property == "margin-top" && d.value == "1px" && !d.important));
}
