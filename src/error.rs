use std::fmt;

/// A line and column position within the source CSS.
///
/// Lines and columns are 1-based. Positions are computed from byte offsets
/// when an error is constructed, so errors carry no borrow of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLocation {
  pub line: u32,
  pub column: u32,
}

impl ErrorLocation {
  /// Computes the location of a byte offset within `input`.
  pub(crate) fn from_offset(input: &[u8], offset: usize) -> ErrorLocation {
    let offset = offset.min(input.len());
    let mut line = 1u32;
    let mut line_start = 0usize;
    for (i, b) in input[..offset].iter().enumerate() {
      if *b == b'\n' {
        line += 1;
        line_start = i + 1;
      }
    }
    ErrorLocation {
      line,
      column: (offset - line_start) as u32 + 1,
    }
  }
}

impl fmt::Display for ErrorLocation {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "line {}, column {}", self.line, self.column)
  }
}

/// An error with a kind and an optional source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Error<K> {
  /// The specific error that occurred.
  pub kind: K,
  /// The location where the error occurred, when known.
  pub loc: Option<ErrorLocation>,
}

impl<K> Error<K> {
  pub(crate) fn new(kind: K) -> Error<K> {
    Error { kind, loc: None }
  }

  pub(crate) fn at(kind: K, loc: ErrorLocation) -> Error<K> {
    Error {
      kind,
      loc: Some(loc),
    }
  }
}

impl<K: fmt::Display> fmt::Display for Error<K> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    self.kind.fmt(f)?;
    if let Some(loc) = &self.loc {
      write!(f, " at {}", loc)?;
    }
    Ok(())
  }
}

impl<K: fmt::Display + fmt::Debug> std::error::Error for Error<K> {}

/// A parser error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserError {
  /// A declaration was malformed and could not be recovered.
  MalformedDeclaration(String),
  /// A selector was missing its `{` block.
  UnexpectedEof,
  /// A block was left unterminated at the end of input.
  UnterminatedBlock,
  /// An unterminated string literal.
  UnterminatedString,
  /// An `@import` appeared after a style rule.
  MisplacedImport,
  /// Nested blocks exceeded the maximum parse depth.
  DepthLimitExceeded,
  /// The stylesheet declared more distinct media queries than allowed.
  MediaQueryLimitExceeded,
  /// A property name exceeded the maximum length.
  PropertyNameTooLong,
  /// A property value exceeded the maximum length.
  PropertyValueTooLong,
  /// An at-rule could not be parsed.
  AtRuleInvalid(String),
  /// A base URI was required but missing or unparseable.
  InvalidBaseUri(String),
}

impl ParserError {
  pub fn reason(&self) -> String {
    match self {
      ParserError::MalformedDeclaration(d) => format!("Malformed declaration `{}`", d),
      ParserError::UnexpectedEof => "Unexpected end of input".into(),
      ParserError::UnterminatedBlock => "Unterminated block".into(),
      ParserError::UnterminatedString => "Unterminated string".into(),
      ParserError::MisplacedImport => "@import must precede all style rules".into(),
      ParserError::DepthLimitExceeded => "Maximum nesting depth exceeded".into(),
      ParserError::MediaQueryLimitExceeded => "Too many distinct media queries".into(),
      ParserError::PropertyNameTooLong => "Property name too long".into(),
      ParserError::PropertyValueTooLong => "Property value too long".into(),
      ParserError::AtRuleInvalid(name) => format!("Invalid at-rule @{}", name),
      ParserError::InvalidBaseUri(uri) => format!("Invalid base URI `{}`", uri),
    }
  }
}

impl fmt::Display for ParserError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&self.reason())
  }
}

/// An error during `@import` resolution.
#[derive(Debug)]
pub enum ImportError {
  /// The import URL could not be parsed or resolved.
  InvalidUrl(String),
  /// The URL scheme is not in the allowed set.
  DisallowedScheme(String),
  /// The URL path extension is not in the allowed set.
  DisallowedExtension(String),
  /// The target refers to a sensitive filesystem path.
  SensitivePath(String),
  /// The file could not be read.
  Io(std::io::Error),
  /// An HTTP fetch failed.
  Network(String),
  /// HTTP fetching was requested but the `http` feature is disabled.
  FetchUnsupported(String),
  /// An import cycle was detected.
  CircularImport(String),
  /// Imports nested deeper than `max_depth`.
  DepthExceeded,
  /// The imported CSS failed to parse.
  Parse(Error<ParserError>),
}

impl ImportError {
  pub fn reason(&self) -> String {
    match self {
      ImportError::InvalidUrl(url) => format!("Invalid import URL `{}`", url),
      ImportError::DisallowedScheme(scheme) => format!("Scheme `{}` is not allowed", scheme),
      ImportError::DisallowedExtension(ext) => format!("Extension `{}` is not allowed", ext),
      ImportError::SensitivePath(path) => format!("Refusing to read `{}`", path),
      ImportError::Io(e) => e.to_string(),
      ImportError::Network(e) => e.clone(),
      ImportError::FetchUnsupported(url) => {
        format!("Cannot fetch `{}`: http support is disabled", url)
      }
      ImportError::CircularImport(url) => format!("Circular import of `{}`", url),
      ImportError::DepthExceeded => "Import nesting too deep".into(),
      ImportError::Parse(e) => e.to_string(),
    }
  }
}

impl fmt::Display for ImportError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&self.reason())
  }
}

impl From<std::io::Error> for ImportError {
  fn from(e: std::io::Error) -> ImportError {
    ImportError::Io(e)
  }
}

impl From<Error<ParserError>> for Error<ImportError> {
  fn from(e: Error<ParserError>) -> Error<ImportError> {
    Error {
      loc: e.loc,
      kind: ImportError::Parse(e),
    }
  }
}

/// A serialization error.
///
/// Writing into a `String` cannot fail, so this only surfaces when printing
/// into a caller-supplied writer.
#[derive(Debug, Clone, PartialEq)]
pub enum PrinterError {
  Fmt,
}

impl fmt::Display for PrinterError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      PrinterError::Fmt => f.write_str("Formatter error"),
    }
  }
}

impl From<fmt::Error> for PrinterError {
  fn from(_: fmt::Error) -> PrinterError {
    PrinterError::Fmt
  }
}
