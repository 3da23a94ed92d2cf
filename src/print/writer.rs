use std::fmt;
use std::io;
use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::print::format::{self, Locale};
use crate::print::{char_slice, Print, Printable, LINE_SEPARATOR};

/// A buffered text writer that never reports I/O errors from its write methods.
///
/// Failures set a sticky flag instead, which callers observe through
/// [`check_error`](Print::check_error). The only errors its methods return are
/// printf template errors.
pub struct PrintWriter<W: Write> {
    inner: Option<BufWriter<W>>,
    auto_flush: bool,
    trouble: bool,
}

impl<W: Write> PrintWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_auto_flush(inner, false)
    }

    /// With `auto_flush` set, `println*`, `printf` and `format` flush after writing.
    pub fn with_auto_flush(inner: W, auto_flush: bool) -> Self {
        Self {
            inner: Some(BufWriter::new(inner)),
            auto_flush,
            trouble: false,
        }
    }

    pub fn with_capacity(capacity: usize, inner: W, auto_flush: bool) -> Self {
        Self {
            inner: Some(BufWriter::with_capacity(capacity, inner)),
            auto_flush,
            trouble: false,
        }
    }

    pub fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn clear_error(&mut self) {
        self.trouble = false;
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref().map(BufWriter::get_ref)
    }

    /// Flushes and hands back the sink, `None` once closed.
    pub fn into_inner(mut self) -> Option<W> {
        self.flush_buffer();
        self.inner.take().map(|inner| inner.into_parts().0)
    }

    fn fail(&mut self, error: io::Error) {
        log::debug!("print writer failed: {}", error);
        self.trouble = true;
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        let result = match self.inner.as_mut() {
            Some(inner) => inner.write_fmt(args),
            None => Err(io::Error::new(io::ErrorKind::Other, "stream closed")),
        };

        if let Err(e) = result {
            self.fail(e);
        }
    }

    fn flush_buffer(&mut self) {
        if let Some(Err(e)) = self.inner.as_mut().map(BufWriter::flush) {
            self.fail(e);
        }
    }

    fn new_line(&mut self) {
        self.emit(format_args!("{}", LINE_SEPARATOR));

        if self.auto_flush {
            self.flush_buffer();
        }
    }

    fn emit_formatted(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<()> {
        let text = format::format(locale, template, args)?;
        self.emit(format_args!("{}", text));

        if self.auto_flush {
            self.flush_buffer();
        }

        Ok(())
    }
}

impl<W: Write> Print for PrintWriter<W> {
    fn write_char(&mut self, c: char) -> Result<()> {
        self.emit(format_args!("{}", c));
        Ok(())
    }

    fn write_chars_range(&mut self, buf: &[char], off: usize, len: usize) -> Result<()> {
        self.write_chars(&buf[off..off + len])
    }

    fn write_chars(&mut self, buf: &[char]) -> Result<()> {
        self.emit(format_args!("{}", Printable::Chars(buf)));
        Ok(())
    }

    fn write_str_range(&mut self, s: &str, off: usize, len: usize) -> Result<()> {
        self.write_str(char_slice(s, off, off + len))
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        self.emit(format_args!("{}", s));
        Ok(())
    }

    fn print<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        self.emit(format_args!("{}", value.into()));
        Ok(())
    }

    fn println(&mut self) -> Result<()> {
        self.new_line();
        Ok(())
    }

    fn println_value<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        self.print(value)?;
        self.new_line();
        Ok(())
    }

    fn printf(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
        self.emit_formatted(&Locale::ROOT, template, args)?;
        Ok(self)
    }

    fn printf_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self> {
        self.emit_formatted(locale, template, args)?;
        Ok(self)
    }

    fn append(&mut self, csq: &str) -> Result<&mut Self> {
        self.write_str(csq)?;
        Ok(self)
    }

    fn append_range(&mut self, csq: &str, start: usize, end: usize) -> Result<&mut Self> {
        self.write_str(char_slice(csq, start, end))?;
        Ok(self)
    }

    fn append_char(&mut self, c: char) -> Result<&mut Self> {
        self.write_char(c)?;
        Ok(self)
    }

    fn flush(&mut self) {
        if self.inner.is_none() {
            self.fail(io::Error::new(io::ErrorKind::Other, "stream closed"));
        }
        self.flush_buffer();
    }

    fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                self.fail(e);
            }
            log::debug!("print writer closed");
            // drop the sink without a second flush attempt
            let (sink, _) = inner.into_parts();
            drop(sink);
        }
    }

    fn check_error(&mut self) -> bool {
        self.flush_buffer();
        self.trouble
    }
}
