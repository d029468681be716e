//! Parse → serialize → parse round-trips and the query surface.

use cataract::{MediaType, ParserOptions, StyleSheet};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn sheet(css: &str) -> StyleSheet {
  StyleSheet::parse(css, ParserOptions::default()).unwrap()
}

fn assert_round_trips(css: &str) {
  let first = sheet(css);
  let second = sheet(&first.to_css_string());
  assert_eq!(first, second, "round-trip changed the model for: {}", css);
}

#[test]
fn simple_rules_round_trip() {
  assert_round_trips(".a { color: red; margin: 0; }");
  assert_round_trips(".a { color: red !important; }");
  assert_round_trips("h1, h2 { color: red; } h3 { margin: 0; }");
}

#[test]
fn selector_list_round_trip_emits_one_block() {
  // S5.
  let s = sheet("h1, h2 { color: red; }");
  assert_eq!(s.len(), 2);
  assert_eq!(s.to_css_string(), "h1, h2 { color: red; }\n");
  assert_round_trips("h1, h2 { color: red; }");
}

#[test]
fn media_blocks_round_trip() {
  assert_round_trips("@media screen { .a { color: red; } }");
  assert_round_trips("@media screen and (max-width: 600px) { .a { color: red; } }");
  assert_round_trips("@media screen, print { .a { color: red; } .b { margin: 0; } }");
  assert_round_trips(".base { color: red; } @media print { .p { color: black; } } .tail { margin: 0; }");
}

#[test]
fn at_rules_round_trip() {
  assert_round_trips("@keyframes spin { from { opacity: 0; } to { opacity: 1; } }");
  assert_round_trips("@font-face { font-family: X; src: url(x.woff); }");
  assert_round_trips("@property --main-color { syntax: \"<color>\"; inherits: false; }");
  assert_round_trips("@charset \"utf-8\"; .a { color: red; }");
}

#[test]
fn nested_rules_round_trip_flat() {
  assert_round_trips(".card { color: red; & span { color: blue; } .deep { margin: 0; } }");
}

#[test]
fn shorthands_round_trip_verbatim() {
  assert_round_trips(".a { margin: 10px 20px; border: 1px solid red; font: 12px serif; }");
}

#[test]
fn formatted_output_round_trips_too() {
  let source = indoc! {"
    @media screen { .a { color: red; } }
    h1, h2 { margin: 0; }
  "};
  let first = sheet(source);
  let second = sheet(&first.to_css_formatted());
  assert_eq!(first, second);
}

#[test]
fn find_by_selector_returns_declaration_strings() {
  let s = sheet(".a { color: red; margin: 0; } .b { color: blue; } .a { padding: 1px; }");
  assert_eq!(
    s.find_by_selector(".a", None),
    ["color: red; margin: 0;", "padding: 1px;"]
  );
  assert!(s.find_by_selector(".missing", None).is_empty());
}

#[test]
fn find_by_selector_respects_media() {
  let s = sheet(".a { color: red; } @media print { .a { color: black; } }");
  assert_eq!(s.find_by_selector(".a", Some(&MediaType::Print)).len(), 2);
  assert_eq!(s.find_by_selector(".a", Some(&MediaType::Screen)).len(), 1);
}

#[test]
fn find_rule_sets_matches_multiple_selectors() {
  let s = sheet(".a { color: red; } .b { color: blue; } .c { color: green; }");
  let rules = s.find_rule_sets(&[".a", ".c"], None);
  assert_eq!(rules.len(), 2);
}

#[test]
fn custom_properties_per_media_context() {
  let s = sheet(indoc! {"
    :root { --accent: red; }
    @media print { :root { --accent: black; --print-only: 1; } }
  "});
  let base = s.custom_properties(Some(&MediaType::Screen));
  assert_eq!(base.get("--accent").map(String::as_str), Some("red"));
  assert_eq!(base.get("--print-only"), None);

  let print = s.custom_properties(Some(&MediaType::Print));
  assert_eq!(print.get("--accent").map(String::as_str), Some("black"));
  assert_eq!(print.get("--print-only").map(String::as_str), Some("1"));
}

#[test]
fn stylesheet_equality_ignores_charset() {
  let a = sheet("@charset \"utf-8\"; .a { color: red; }");
  let b = sheet(".a { color: red; }");
  assert_eq!(a, b);
}

#[test]
fn stylesheet_equality_is_semantic_over_shorthands() {
  let a = sheet(".a { margin: 1px; }");
  let b = sheet(
    ".a { margin-top: 1px; margin-right: 1px; margin-bottom: 1px; margin-left: 1px; }",
  );
  assert_eq!(a, b);

  let c = sheet(".a { margin: 2px; }");
  assert_ne!(a, c);
}
