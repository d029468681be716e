//! cataract is a CSS parsing, querying, transformation and serialization
//! library aimed at HTML-email inliner pipelines and CSS analysis tools.
//!
//! Raw CSS text is parsed by a single-pass byte-cursor tokenizer into a
//! flat, id-addressed [`StyleSheet`] model, which supports cascade-aware
//! flattening (shorthand expansion, per-selector merging by importance,
//! specificity and source order, shorthand re-synthesis), `@import`
//! resolution with a pluggable fetcher, chainable queries, and compact or
//! formatted re-serialization.
//!
//! ```
//! use cataract::{ParserOptions, StyleSheet};
//!
//! let css = ".t { margin: 10px 20px; } .t { margin-left: 5px; }";
//! let sheet = StyleSheet::parse(css, ParserOptions::default()).unwrap();
//! let flat = sheet.flatten();
//! assert_eq!(flat.to_css_string(), ".t { margin: 10px 20px 10px 5px; }\n");
//! ```

pub mod declaration;
pub mod error;
mod flatten;
pub mod importer;
pub mod media_query;
pub mod parser;
mod printer;
mod properties;
pub mod rules;
mod serialize;
pub mod specificity;
pub mod stylesheet;
mod traits;

pub use declaration::Declaration;
pub use error::{Error, ErrorLocation, ImportError, ParserError, PrinterError};
pub use importer::{DefaultFetcher, ImportFetcher, ImportOptions, Schemes};
pub use media_query::{MediaQuery, MediaType};
pub use parser::{
  DefaultUriResolver, ParserOptions, UriResolver, MAX_MEDIA_QUERIES, MAX_PARSE_DEPTH,
  MAX_PROPERTY_NAME_LENGTH, MAX_PROPERTY_VALUE_LENGTH,
};
pub use printer::{MediaFilter, PrinterOptions};
pub use rules::{AtRule, AtRuleContent, CssRule, ImportStatement, NestingStyle, StyleRule};
pub use specificity::calculate_specificity;
pub use stylesheet::{RuleScope, StyleSheet};
