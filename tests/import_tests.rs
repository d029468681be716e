//! `@import` resolution against an in-memory fetcher: splicing, media
//! composition, and the security gates.

use std::collections::HashMap;
use std::rc::Rc;

use cataract::{
  Error, ImportError, ImportFetcher, ImportOptions, MediaType, ParserOptions, Schemes, StyleSheet,
};
use pretty_assertions::assert_eq;

struct MapFetcher(HashMap<String, String>);

impl MapFetcher {
  fn new(entries: &[(&str, &str)]) -> MapFetcher {
    MapFetcher(
      entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    )
  }
}

impl ImportFetcher for MapFetcher {
  fn fetch(&self, url: &str, _options: &ImportOptions) -> Result<String, Error<ImportError>> {
    self.0.get(url).cloned().ok_or_else(|| Error {
      kind: ImportError::Network(format!("no such entry: {}", url)),
      loc: None,
    })
  }
}

fn options_with(fetcher: MapFetcher, max_depth: u8) -> ParserOptions {
  ParserOptions {
    import: Some(ImportOptions {
      allowed_schemes: Schemes::FILE | Schemes::HTTPS,
      base_path: Some("/v".into()),
      fetcher: Some(Rc::new(fetcher)),
      max_depth,
      ..ImportOptions::default()
    }),
    ..ParserOptions::default()
  }
}

fn resolved(css: &str, entries: &[(&str, &str)]) -> StyleSheet {
  let mut sheet = StyleSheet::new(options_with(MapFetcher::new(entries), 5));
  sheet.add_block(css).unwrap();
  sheet.resolve_imports().unwrap();
  sheet
}

fn resolve_err(css: &str, entries: &[(&str, &str)]) -> Error<ImportError> {
  let mut sheet = StyleSheet::new(options_with(MapFetcher::new(entries), 5));
  sheet.add_block(css).unwrap();
  sheet.resolve_imports().unwrap_err()
}

#[test]
fn imported_rules_splice_at_the_import_position() {
  let sheet = resolved(
    "@import \"a.css\"; .main { color: red; }",
    &[("/v/a.css", ".a1 { color: blue; } .a2 { color: green; }")],
  );

  let selectors: Vec<&str> = sheet.selectors();
  assert_eq!(selectors, [".a1", ".a2", ".main"]);
  for (i, rule) in sheet.rules.iter().enumerate() {
    assert_eq!(rule.id() as usize, i);
  }
  assert!(sheet.imports[0].resolved);
  assert_eq!(sheet.imports[0].id, 0);
}

#[test]
fn sibling_imports_splice_in_document_order() {
  let sheet = resolved(
    "@import \"a.css\"; @import \"b.css\"; .main { color: red; }",
    &[
      ("/v/a.css", ".a { color: blue; }"),
      ("/v/b.css", ".b { color: green; }"),
    ],
  );
  assert_eq!(sheet.selectors(), [".a", ".b", ".main"]);
}

#[test]
fn import_media_applies_to_plain_imported_rules() {
  let sheet = resolved(
    "@import \"m.css\" print;",
    &[("/v/m.css", ".x { color: red; }")],
  );
  let rule = sheet.rules[0].as_style().unwrap();
  let query = &sheet.media_queries[rule.media_query_id.unwrap() as usize];
  assert_eq!(query.media_type, MediaType::Print);
  assert_eq!(query.conditions, None);
}

#[test]
fn import_media_composes_with_inner_media() {
  // S4: `@import "m.css" screen;` where m.css wraps its rule in a feature
  // query yields `screen and (max-width: 768px)`.
  let sheet = resolved(
    "@import \"m.css\" screen;",
    &[("/v/m.css", "@media (max-width: 768px) { .x { color: red; } }")],
  );
  let rule = sheet.rules[0].as_style().unwrap();
  assert_eq!(rule.selector, ".x");
  let query = &sheet.media_queries[rule.media_query_id.unwrap() as usize];
  assert_eq!(query.media_type, MediaType::Screen);
  assert_eq!(query.conditions.as_deref(), Some("(max-width: 768px)"));
  assert_eq!(query.text(), "screen and (max-width: 768px)");
}

#[test]
fn nested_imports_resolve_relative_to_their_file() {
  let sheet = resolved(
    "@import \"sub/a.css\";",
    &[
      ("/v/sub/a.css", "@import \"b.css\"; .a { color: red; }"),
      ("/v/sub/b.css", ".b { color: blue; }"),
    ],
  );
  assert_eq!(sheet.selectors(), [".b", ".a"]);
}

#[test]
fn circular_imports_error() {
  let err = resolve_err(
    "@import \"a.css\";",
    &[
      ("/v/a.css", "@import \"b.css\";"),
      ("/v/b.css", "@import \"a.css\";"),
    ],
  );
  assert!(matches!(err.kind, ImportError::CircularImport(_)));
}

#[test]
fn self_import_errors() {
  let err = resolve_err("@import \"a.css\";", &[("/v/a.css", "@import \"a.css\";")]);
  assert!(matches!(err.kind, ImportError::CircularImport(_)));
}

#[test]
fn depth_limit_errors() {
  let entries = [
    ("/v/a.css", "@import \"b.css\";"),
    ("/v/b.css", "@import \"c.css\";"),
    ("/v/c.css", ".c { color: red; }"),
  ];
  let mut sheet = StyleSheet::new(options_with(MapFetcher::new(&entries), 2));
  sheet.add_block("@import \"a.css\";").unwrap();
  let err = sheet.resolve_imports().unwrap_err();
  assert!(matches!(err.kind, ImportError::DepthExceeded));
}

#[test]
fn disallowed_scheme_errors() {
  let err = resolve_err("@import \"http://x.test/a.css\";", &[]);
  assert!(matches!(err.kind, ImportError::DisallowedScheme(_)));
}

#[test]
fn disallowed_extension_errors() {
  let err = resolve_err("@import \"a.txt\";", &[]);
  assert!(matches!(err.kind, ImportError::DisallowedExtension(_)));
}

#[test]
fn fetch_failures_propagate() {
  let err = resolve_err("@import \"missing.css\";", &[]);
  assert!(matches!(err.kind, ImportError::Network(_)));
}

#[test]
fn selector_lists_survive_the_splice() {
  let sheet = resolved(
    "@import \"a.css\"; .main { color: red; }",
    &[("/v/a.css", "h1, h2 { margin: 0; }")],
  );
  assert_eq!(sheet.selectors(), ["h1", "h2", ".main"]);
  let lists = sheet.selector_lists();
  assert_eq!(lists.len(), 1);
  assert_eq!(lists.first().unwrap().1.as_slice(), [0, 1]);
  assert_eq!(
    sheet.to_css_string(),
    "h1, h2 { margin: 0; }\n.main { color: red; }\n"
  );
}

#[test]
fn media_index_rebuilds_after_resolution() {
  let sheet = resolved(
    "@import \"m.css\" print; .main { color: red; }",
    &[("/v/m.css", ".x { color: blue; }")],
  );
  let index = sheet.media_index();
  assert_eq!(index.get(&MediaType::Print).unwrap().as_slice(), [0]);
}
