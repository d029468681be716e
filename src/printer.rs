use crate::error::PrinterError;
use crate::media_query::MediaType;

/// Selects which rules a serializer pass emits.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MediaFilter {
  /// Emit every rule.
  #[default]
  All,
  /// Emit only rules registered under one of the given media types.
  Only(Vec<MediaType>),
}

impl MediaFilter {
  pub fn is_all(&self) -> bool {
    match self {
      MediaFilter::All => true,
      MediaFilter::Only(types) => types.iter().any(|t| *t == MediaType::All),
    }
  }
}

/// Options for serializing a stylesheet.
#[derive(Debug, Clone, Default)]
pub struct PrinterOptions {
  /// Compact single-line-per-block output when `true`, 2-space indented
  /// output when `false`.
  pub minify: bool,
  /// Restricts output to rules registered under the given media types.
  pub media: MediaFilter,
}

pub(crate) struct Printer<'a, W> {
  dest: &'a mut W,
  indent: u8,
  pub minify: bool,
}

impl<'a, W: std::fmt::Write + Sized> Printer<'a, W> {
  pub fn new(dest: &'a mut W, minify: bool) -> Printer<'a, W> {
    Printer {
      dest,
      indent: 0,
      minify,
    }
  }

  pub fn write_str(&mut self, s: &str) -> Result<(), PrinterError> {
    self.dest.write_str(s)?;
    Ok(())
  }

  pub fn write_char(&mut self, c: char) -> Result<(), PrinterError> {
    self.dest.write_char(c)?;
    Ok(())
  }

  pub fn whitespace(&mut self) -> Result<(), PrinterError> {
    self.write_char(' ')
  }

  /// A newline plus the current indentation. Compact output keeps one block
  /// per line, so the newline survives minification; the indent does not.
  pub fn newline(&mut self) -> Result<(), PrinterError> {
    self.write_char('\n')?;
    if !self.minify && self.indent > 0 {
      for _ in 0..self.indent {
        self.write_char(' ')?;
      }
    }
    Ok(())
  }

  pub fn indent(&mut self) {
    self.indent += 2;
  }

  pub fn dedent(&mut self) {
    self.indent -= 2;
  }
}

impl<'a, W: std::fmt::Write + Sized> std::fmt::Write for Printer<'a, W> {
  fn write_str(&mut self, s: &str) -> std::fmt::Result {
    self.dest.write_str(s)
  }
}
