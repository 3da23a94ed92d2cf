mod format;
mod writer;

use std::fmt;

use crate::error::Result;

pub use format::{Locale, Template};
pub use writer::PrintWriter;

#[cfg(test)]
pub(crate) use writer::tests::SharedSink;

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// The text-output surface shared by [`PrintWriter`] and
/// [`CheckedWriter`](crate::CheckedWriter), so callers can hold either one.
///
/// Ranges are counted in `char`s. Like slice indexing, out-of-range offsets panic.
pub trait Print {
    fn write_char(&mut self, c: char) -> Result<()>;

    /// Writes `len` chars of `buf` starting at `off`.
    fn write_chars_range(&mut self, buf: &[char], off: usize, len: usize) -> Result<()>;

    fn write_chars(&mut self, buf: &[char]) -> Result<()>;

    /// Writes `len` chars of `s` starting at char `off`.
    fn write_str_range(&mut self, s: &str, off: usize, len: usize) -> Result<()>;

    fn write_str(&mut self, s: &str) -> Result<()>;

    fn print<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()>;

    fn println(&mut self) -> Result<()>;

    fn println_value<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()>;

    /// Writes `template` expanded with `args` using [`Locale::ROOT`].
    fn printf(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self>;

    fn printf_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self>;

    fn format(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
        self.printf(template, args)
    }

    fn format_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self> {
        self.printf_locale(locale, template, args)
    }

    fn append(&mut self, csq: &str) -> Result<&mut Self>;

    /// Appends chars `start..end` of `csq`.
    fn append_range(&mut self, csq: &str, start: usize, end: usize) -> Result<&mut Self>;

    fn append_char(&mut self, c: char) -> Result<&mut Self>;

    fn flush(&mut self);

    fn close(&mut self);

    /// Flushes and reports whether the writer has ever failed. Never fails itself.
    fn check_error(&mut self) -> bool;
}

/// A single value accepted by [`Print::print`] and the printf family.
#[derive(Clone, Copy)]
pub enum Printable<'a> {
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Chars(&'a [char]),
    Text(&'a str),
    Object(&'a dyn fmt::Display),
}

impl<'a> Printable<'a> {
    pub fn object<T: fmt::Display>(value: &'a T) -> Self {
        Self::Object(value)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Char(_) => "char",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Chars(_) => "char array",
            Self::Text(_) => "string",
            Self::Object(_) => "object",
        }
    }
}

// Plain decimal in [1e-3, 1e7), otherwise `d.dddE±n`, like print streams render doubles
fn fmt_float<T>(f: &mut fmt::Formatter<'_>, value: T) -> fmt::Result
where
    T: Into<f64> + fmt::Debug + fmt::LowerExp + Copy,
{
    let wide: f64 = value.into();
    let magnitude = wide.abs();

    if wide.is_nan() {
        return f.write_str("NaN");
    }
    if wide.is_infinite() {
        return f.write_str(if wide < 0.0 { "-Infinity" } else { "Infinity" });
    }
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        // Debug keeps the trailing ".0" on integral values
        return write!(f, "{:?}", value);
    }

    let exp = format!("{:e}", value);
    let (mantissa, exponent) = exp.split_once('e').unwrap_or((exp.as_str(), "0"));
    if mantissa.contains('.') {
        write!(f, "{}E{}", mantissa, exponent)
    } else {
        write!(f, "{}.0E{}", mantissa, exponent)
    }
}

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Char(c) => write!(f, "{}", c),
            Self::Int(i) => write!(f, "{}", i),
            Self::Long(l) => write!(f, "{}", l),
            Self::Float(v) => fmt_float(f, *v),
            Self::Double(v) => fmt_float(f, *v),
            Self::Chars(chars) => chars.iter().try_for_each(|c| write!(f, "{}", c)),
            Self::Text(s) => f.write_str(s),
            Self::Object(obj) => write!(f, "{}", obj),
        }
    }
}

impl fmt::Debug for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self)
    }
}

macro_rules! impl_from_printable {
    ($(($ty:ty, $variant:ident)),+) => {
        $(impl From<$ty> for Printable<'_> {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        })+
    };
}
impl_from_printable!(
    (bool, Bool),
    (char, Char),
    (i32, Int),
    (i64, Long),
    (f32, Float),
    (f64, Double)
);

impl<'a> From<&'a [char]> for Printable<'a> {
    fn from(value: &'a [char]) -> Self {
        Self::Chars(value)
    }
}

impl<'a> From<&'a str> for Printable<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for Printable<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value)
    }
}

// Chars `start..end` of `s`, panicking like slice indexing when out of range
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    assert!(
        start <= end,
        "range start {} is greater than range end {}",
        start,
        end
    );

    let mut boundaries = s
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()));
    let from = boundaries
        .nth(start)
        .unwrap_or_else(|| out_of_bounds(start, end, s));
    let to = if end == start {
        from
    } else {
        boundaries
            .nth(end - start - 1)
            .unwrap_or_else(|| out_of_bounds(start, end, s))
    };

    &s[from..to]
}

#[cold]
fn out_of_bounds(start: usize, end: usize, s: &str) -> ! {
    panic!(
        "range {}..{} out of bounds for {} chars",
        start,
        end,
        s.chars().count()
    )
}

impl<P: Print> Print for &mut P {
    fn write_char(&mut self, c: char) -> Result<()> {
        (**self).write_char(c)
    }

    fn write_chars_range(&mut self, buf: &[char], off: usize, len: usize) -> Result<()> {
        (**self).write_chars_range(buf, off, len)
    }

    fn write_chars(&mut self, buf: &[char]) -> Result<()> {
        (**self).write_chars(buf)
    }

    fn write_str_range(&mut self, s: &str, off: usize, len: usize) -> Result<()> {
        (**self).write_str_range(s, off, len)
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        (**self).write_str(s)
    }

    fn print<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        (**self).print(value)
    }

    fn println(&mut self) -> Result<()> {
        (**self).println()
    }

    fn println_value<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        (**self).println_value(value)
    }

    fn printf(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
        (**self).printf(template, args)?;
        Ok(self)
    }

    fn printf_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self> {
        (**self).printf_locale(locale, template, args)?;
        Ok(self)
    }

    fn append(&mut self, csq: &str) -> Result<&mut Self> {
        (**self).append(csq)?;
        Ok(self)
    }

    fn append_range(&mut self, csq: &str, start: usize, end: usize) -> Result<&mut Self> {
        (**self).append_range(csq, start, end)?;
        Ok(self)
    }

    fn append_char(&mut self, c: char) -> Result<&mut Self> {
        (**self).append_char(c)?;
        Ok(self)
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn check_error(&mut self) -> bool {
        (**self).check_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_primitives() {
        assert_eq!(Printable::from(true).to_string(), "true");
        assert_eq!(Printable::from('x').to_string(), "x");
        assert_eq!(Printable::from(-7).to_string(), "-7");
        assert_eq!(Printable::from(1_i64 << 40).to_string(), "1099511627776");
        assert_eq!(Printable::from(1.0_f32).to_string(), "1.0");
        assert_eq!(Printable::from(0.1_f32).to_string(), "0.1");
        assert_eq!(Printable::from(2.5_f64).to_string(), "2.5");
        assert_eq!(Printable::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Printable::from(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Printable::from(f32::INFINITY).to_string(), "Infinity");
    }

    #[test]
    fn test_display_float_exponents() {
        assert_eq!(Printable::from(1e20).to_string(), "1.0E20");
        assert_eq!(Printable::from(-2.5e10).to_string(), "-2.5E10");
        assert_eq!(Printable::from(1.5e-5).to_string(), "1.5E-5");
        assert_eq!(Printable::from(1e7).to_string(), "1.0E7");
        assert_eq!(Printable::from(9999999.0).to_string(), "9999999.0");
        assert_eq!(Printable::from(0.001).to_string(), "0.001");
        assert_eq!(Printable::from(0.0001_f32).to_string(), "1.0E-4");
        assert_eq!(Printable::from(-0.0).to_string(), "-0.0");
    }

    #[test]
    fn test_display_sequences_and_objects() {
        let chars = ['h', 'i'];
        assert_eq!(Printable::from(&chars[..]).to_string(), "hi");
        assert_eq!(Printable::from("text").to_string(), "text");

        let addr = std::net::Ipv4Addr::LOCALHOST;
        assert_eq!(Printable::object(&addr).to_string(), "127.0.0.1");
        assert_eq!(format!("{:?}", Printable::object(&addr)), "object(127.0.0.1)");
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("abc", 0, 3), "abc");
        assert_eq!(char_slice("abc", 1, 2), "b");
        assert_eq!(char_slice("abc", 3, 3), "");
        assert_eq!(char_slice("héllo", 1, 3), "él");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_char_slice_past_end() {
        char_slice("abc", 1, 4);
    }

    #[test]
    #[should_panic(expected = "greater than range end")]
    fn test_char_slice_inverted() {
        char_slice("abc", 2, 1);
    }
}
