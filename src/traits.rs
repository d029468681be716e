use crate::error::PrinterError;
use crate::printer::Printer;

/// Trait for things that can serialize themselves in CSS syntax.
pub(crate) trait ToCss {
  /// Serialize `self` in CSS syntax, writing to `dest`.
  fn to_css<W>(&self, dest: &mut Printer<W>) -> Result<(), PrinterError>
  where
    W: std::fmt::Write;

  /// Serialize `self` in CSS syntax and return a string.
  #[inline]
  fn to_css_string(&self) -> String {
    let mut s = String::new();
    let mut printer = Printer::new(&mut s, true);
    // Writing into a String cannot fail.
    self.to_css(&mut printer).unwrap();
    s
  }
}

impl<'a, T> ToCss for &'a T
where
  T: ToCss + ?Sized,
{
  fn to_css<W>(&self, dest: &mut Printer<W>) -> Result<(), PrinterError>
  where
    W: std::fmt::Write,
  {
    (*self).to_css(dest)
  }
}
