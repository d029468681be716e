use std::fmt;

use crate::error::PrinterError;
use crate::parser::split_top_level_tokens;
use crate::printer::Printer;
use crate::traits::ToCss;

/// A media type: the leading identifier of a media query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaType {
  All,
  Print,
  Screen,
  Custom(String),
}

impl MediaType {
  pub fn parse(name: &str) -> MediaType {
    let name = name.to_ascii_lowercase();
    match name.as_str() {
      "all" => MediaType::All,
      "print" => MediaType::Print,
      "screen" => MediaType::Screen,
      _ => MediaType::Custom(name),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      MediaType::All => "all",
      MediaType::Print => "print",
      MediaType::Screen => "screen",
      MediaType::Custom(s) => s,
    }
  }
}

impl fmt::Display for MediaType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A canonicalized media query: a type plus optional feature conditions.
///
/// Equality is by `(media_type, conditions)`; the id is an index into the
/// owning stylesheet's `media_queries` and never participates in comparison.
#[derive(Debug, Clone)]
pub struct MediaQuery {
  pub id: u32,
  pub media_type: MediaType,
  pub conditions: Option<String>,
}

impl PartialEq for MediaQuery {
  fn eq(&self, other: &MediaQuery) -> bool {
    self.media_type == other.media_type && self.conditions == other.conditions
  }
}

impl MediaQuery {
  pub fn new(id: u32, media_type: MediaType, conditions: Option<String>) -> MediaQuery {
    MediaQuery {
      id,
      media_type,
      conditions,
    }
  }

  /// Canonicalizes raw media query text into `(type, conditions)`.
  ///
  /// `only` is dropped. A leading `not` is folded into the type so that the
  /// query round-trips through `text()`. Feature-only queries get type `all`.
  pub fn parse_text(text: &str) -> (MediaType, Option<String>) {
    let tokens = split_top_level_tokens(text.trim());
    if tokens.is_empty() {
      return (MediaType::All, None);
    }

    let mut idx = 0;
    if tokens[idx].eq_ignore_ascii_case("only") {
      idx += 1;
      if idx == tokens.len() {
        return (MediaType::All, None);
      }
    }

    let media_type = if tokens[idx].starts_with('(') {
      MediaType::All
    } else if tokens[idx].eq_ignore_ascii_case("not") && idx + 1 < tokens.len() {
      let ty = format!("not {}", tokens[idx + 1].to_ascii_lowercase());
      idx += 2;
      MediaType::Custom(ty)
    } else {
      let ty = MediaType::parse(tokens[idx]);
      idx += 1;
      ty
    };

    if idx < tokens.len() && tokens[idx].eq_ignore_ascii_case("and") {
      idx += 1;
    }

    let conditions = if idx < tokens.len() {
      Some(tokens[idx..].join(" "))
    } else {
      None
    };

    (media_type, conditions)
  }

  /// Reconstructs the query text: `"{type} and {conditions}"`, or just the
  /// conditions for type `all`, or just the type when there are none.
  pub fn text(&self) -> String {
    match (&self.media_type, &self.conditions) {
      (MediaType::All, Some(cond)) => cond.clone(),
      (ty, Some(cond)) => format!("{} and {}", ty.as_str(), cond),
      (ty, None) => ty.as_str().to_string(),
    }
  }
}

impl ToCss for MediaQuery {
  fn to_css<W>(&self, dest: &mut Printer<W>) -> Result<(), PrinterError>
  where
    W: std::fmt::Write,
  {
    dest.write_str(&self.text())
  }
}

/// Combines a child media query's text with an enclosing context's text.
///
/// Feature expressions (anything containing a `:`) are parenthesized unless
/// the child text already is.
pub(crate) fn compose_media_text(parent: &str, child: &str) -> String {
  let child = child.trim();
  if child.contains(':') && !child.starts_with('(') {
    format!("{} and ({})", parent, child)
  } else {
    format!("{} and {}", parent, child)
  }
}
