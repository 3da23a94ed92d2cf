//! Turns the silent failures of a [`Print`] writer into errors at write time.
//!
//! Asking the wrapped writer whether it has failed flushes it, so the check only
//! runs on every `flush_interval`-th write-style call (a *checkpoint*). A failure
//! that happens between checkpoints surfaces at the next one.
//!
//! Wrapping has to happen at the outermost boundary: a `CheckedWriter` used as
//! the sink of another [`PrintWriter`](crate::PrintWriter) gets its errors
//! swallowed by that outer writer, the same way the wrapped writer swallows its own.

use std::io;

use crate::error::{Error, Result};
use crate::print::{Locale, Print, Printable, Template};

pub const DEFAULT_FLUSH_INTERVAL: u64 = 100;
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "error on write %s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub flush_interval: u64,
    /// Error message with exactly one `%s` or `%d` slot for the write count.
    pub message_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval < 1 {
            return Err(Error::InvalidArgument(format!(
                "flush interval must be at least 1, got {}",
                self.flush_interval
            )));
        }

        let invalid_template = |reason: String| {
            Error::InvalidArgument(format!(
                "message template {:?} {}",
                self.message_template, reason
            ))
        };

        let template = Template::parse(&self.message_template)
            .map_err(|e| invalid_template(format!("is malformed: {}", e)))?;

        match template.conversions().as_slice() {
            ['s' | 'S' | 'd'] => {}
            slots => {
                return Err(invalid_template(format!(
                    "must have exactly one %s or %d slot, found {:?}",
                    slots
                )))
            }
        }

        // catches an explicit index other than 1
        template
            .render(&Locale::ROOT, &[Printable::Long(0)])
            .map_err(|e| invalid_template(format!("cannot render a count: {}", e)))?;

        Ok(())
    }
}

/// A pass-through [`Print`] writer that counts write-style calls and fails at a
/// checkpoint when the wrapped writer reports an error.
///
/// A failed call is not forwarded. There is no persistent failed state: later
/// calls follow the same schedule and fail again at the next checkpoint while
/// the wrapped writer stays in error.
///
/// `flush`, `close` and `check_error` are forwarded directly and are not counted.
pub struct CheckedWriter<P: Print> {
    inner: P,
    flush_interval: u64,
    message_template: String,
    write_count: u64,
    // tail of a UTF-8 sequence split across `io::Write::write` calls
    pending: Vec<u8>,
}

impl<P: Print> CheckedWriter<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            write_count: 0,
            pending: Vec::new(),
        }
    }

    pub fn with_flush_interval(inner: P, flush_interval: u64) -> Result<Self> {
        Self::with_config(
            inner,
            Config {
                flush_interval,
                ..Config::default()
            },
        )
    }

    pub fn with_config(inner: P, config: Config) -> Result<Self> {
        config.validate()?;

        log::debug!(
            "checking writer errors every {} writes",
            config.flush_interval
        );

        Ok(Self {
            inner,
            flush_interval: config.flush_interval,
            message_template: config.message_template,
            write_count: 0,
            pending: Vec::new(),
        })
    }

    pub fn flush_interval(&self) -> u64 {
        self.flush_interval
    }

    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Write-style calls made so far, including failed ones.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn error_message(&self) -> Result<String> {
        let count = i64::try_from(self.write_count).unwrap_or(i64::MAX);

        Ok(Template::parse(&self.message_template)?
            .render(&Locale::ROOT, &[Printable::Long(count)])?)
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.write_count += 1;

        if self.write_count % self.flush_interval != 0 {
            return Ok(());
        }

        log::trace!("checkpoint at write {}", self.write_count);

        if !self.inner.check_error() {
            return Ok(());
        }

        let message = self.error_message()?;
        log::warn!("{}", message);

        Err(Error::Write {
            count: self.write_count,
            message,
        })
    }
}

impl<P: Print> Print for CheckedWriter<P> {
    fn write_char(&mut self, c: char) -> Result<()> {
        self.checkpoint()?;
        self.inner.write_char(c)
    }

    fn write_chars_range(&mut self, buf: &[char], off: usize, len: usize) -> Result<()> {
        self.checkpoint()?;
        self.inner.write_chars_range(buf, off, len)
    }

    fn write_chars(&mut self, buf: &[char]) -> Result<()> {
        self.checkpoint()?;
        self.inner.write_chars(buf)
    }

    fn write_str_range(&mut self, s: &str, off: usize, len: usize) -> Result<()> {
        self.checkpoint()?;
        self.inner.write_str_range(s, off, len)
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        self.checkpoint()?;
        self.inner.write_str(s)
    }

    fn print<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        self.checkpoint()?;
        self.inner.print(value)
    }

    fn println(&mut self) -> Result<()> {
        self.checkpoint()?;
        self.inner.println()
    }

    fn println_value<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
        self.checkpoint()?;
        self.inner.println_value(value)
    }

    fn printf(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.printf(template, args)?;
        Ok(self)
    }

    fn printf_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.printf_locale(locale, template, args)?;
        Ok(self)
    }

    fn format(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.format(template, args)?;
        Ok(self)
    }

    fn format_locale(
        &mut self,
        locale: &Locale,
        template: &str,
        args: &[Printable<'_>],
    ) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.format_locale(locale, template, args)?;
        Ok(self)
    }

    fn append(&mut self, csq: &str) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.append(csq)?;
        Ok(self)
    }

    fn append_range(&mut self, csq: &str, start: usize, end: usize) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.append_range(csq, start, end)?;
        Ok(self)
    }

    fn append_char(&mut self, c: char) -> Result<&mut Self> {
        self.checkpoint()?;
        self.inner.append_char(c)?;
        Ok(self)
    }

    fn flush(&mut self) {
        self.inner.flush()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn check_error(&mut self) -> bool {
        self.inner.check_error()
    }
}

fn invalid_data(error: std::str::Utf8Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

/// Lets a `CheckedWriter` sit under byte-oriented code. The bytes must be UTF-8;
/// a char split across calls is held back until it is complete. Every `write`
/// that forwards at least one char is one write-style call.
impl<P: Print> io::Write for CheckedWriter<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = std::mem::take(&mut self.pending);
        let held = bytes.len();
        bytes.extend_from_slice(buf);

        let valid = match std::str::from_utf8(&bytes) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                bytes.truncate(held);
                self.pending = bytes;
                return Err(invalid_data(e));
            }
        };

        if valid > 0 {
            let text = std::str::from_utf8(&bytes[..valid]).map_err(invalid_data)?;
            if let Err(e) = Print::write_str(self, text) {
                bytes.truncate(held);
                self.pending = bytes;
                return Err(e.into());
            }
        }

        self.pending = bytes.split_off(valid);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Print::flush(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::print::{SharedSink, LINE_SEPARATOR};
    use crate::PrintWriter;

    /// Records every call and fails after a configurable number of accepted writes.
    #[derive(Default)]
    struct Recorder {
        writes: u64,
        checks: Vec<u64>,
        fail_after: Option<u64>,
        flushes: u32,
        closed: bool,
        out: String,
    }

    impl Recorder {
        fn failing_after(writes: u64) -> Self {
            Self {
                fail_after: Some(writes),
                ..Self::default()
            }
        }

        fn accept(&mut self, text: &str) {
            self.writes += 1;
            self.out.push_str(text);
        }

        fn in_error(&self) -> bool {
            matches!(self.fail_after, Some(n) if self.writes >= n)
        }
    }

    impl Print for Recorder {
        fn write_char(&mut self, c: char) -> Result<()> {
            self.accept(&c.to_string());
            Ok(())
        }

        fn write_chars_range(&mut self, buf: &[char], off: usize, len: usize) -> Result<()> {
            self.write_chars(&buf[off..off + len])
        }

        fn write_chars(&mut self, buf: &[char]) -> Result<()> {
            self.accept(&buf.iter().collect::<String>());
            Ok(())
        }

        fn write_str_range(&mut self, s: &str, off: usize, len: usize) -> Result<()> {
            self.write_str(crate::print::char_slice(s, off, off + len))
        }

        fn write_str(&mut self, s: &str) -> Result<()> {
            self.accept(s);
            Ok(())
        }

        fn print<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
            self.accept(&value.into().to_string());
            Ok(())
        }

        fn println(&mut self) -> Result<()> {
            self.accept("\n");
            Ok(())
        }

        fn println_value<'a, T: Into<Printable<'a>>>(&mut self, value: T) -> Result<()> {
            self.accept(&format!("{}\n", value.into()));
            Ok(())
        }

        fn printf(&mut self, template: &str, args: &[Printable<'_>]) -> Result<&mut Self> {
            self.printf_locale(&Locale::ROOT, template, args)
        }

        fn printf_locale(
            &mut self,
            locale: &Locale,
            template: &str,
            args: &[Printable<'_>],
        ) -> Result<&mut Self> {
            let text = Template::parse(template)?.render(locale, args)?;
            self.accept(&text);
            Ok(self)
        }

        fn append(&mut self, csq: &str) -> Result<&mut Self> {
            self.write_str(csq)?;
            Ok(self)
        }

        fn append_range(&mut self, csq: &str, start: usize, end: usize) -> Result<&mut Self> {
            self.write_str(crate::print::char_slice(csq, start, end))?;
            Ok(self)
        }

        fn append_char(&mut self, c: char) -> Result<&mut Self> {
            self.write_char(c)?;
            Ok(self)
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn check_error(&mut self) -> bool {
            self.checks.push(self.writes);
            self.in_error()
        }
    }

    fn checked(recorder: Recorder, flush_interval: u64) -> CheckedWriter<Recorder> {
        CheckedWriter::with_flush_interval(recorder, flush_interval).unwrap()
    }

    #[test]
    fn test_defaults() {
        let writer = CheckedWriter::new(Recorder::default());
        assert_eq!(writer.flush_interval(), 100);
        assert_eq!(writer.message_template(), "error on write %s");
        assert_eq!(writer.write_count(), 0);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = CheckedWriter::with_flush_interval(Recorder::default(), 0)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_rejects_bad_templates() {
        for template in ["no slot", "%s and %s", "%q", "%f", "%2$s", "%c",
            "%99999999999999999999999s",
        ] {
            let config = Config {
                message_template: template.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::InvalidArgument(_))),
                "accepted {:?}",
                template
            );
        }
    }

    #[test]
    fn test_accepts_templates() {
        for template in ["%s", "failed after %d writes", "%1$S!", "%5d%%"] {
            let config = Config {
                message_template: template.to_string(),
                ..Config::default()
            };
            assert!(config.validate().is_ok(), "rejected {:?}", template);
        }
    }

    #[test]
    fn test_error_on_sixth_write() {
        // the wrapped writer fails once it has accepted 5 writes
        let mut writer = checked(Recorder::failing_after(5), 3);

        for i in 1..=5 {
            writer.print(i).unwrap();
        }

        let err = writer.print(6).unwrap_err();
        match err {
            Error::Write { count, ref message } => {
                assert_eq!(count, 6);
                assert_eq!(message, "error on write 6");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(writer.get_ref().checks, vec![2, 5]);
        // the failed call was not forwarded
        assert_eq!(writer.get_ref().out, "12345");
    }

    #[test]
    fn test_interval_of_one_checks_every_call() {
        let mut writer = checked(Recorder::failing_after(2), 1);

        writer.write_str("a").unwrap();
        writer.write_str("b").unwrap();
        assert!(writer.write_str("c").is_err());
        assert_eq!(writer.get_ref().checks, vec![0, 1, 2]);
    }

    #[test]
    fn test_custom_template() {
        let config = Config {
            flush_interval: 2,
            message_template: "boom at %s".to_string(),
        };
        let mut writer = CheckedWriter::with_config(Recorder::failing_after(0), config).unwrap();

        writer.write_char('x').unwrap();
        assert_eq!(writer.write_char('y').unwrap_err().to_string(), "boom at 2");
    }

    #[test]
    fn test_no_persistent_failed_state() {
        let mut writer = checked(Recorder::failing_after(0), 2);

        writer.write_str("1").unwrap();
        assert!(writer.write_str("2").is_err());
        // ignoring the error skips the next interval - 1 checks
        writer.write_str("3").unwrap();
        assert!(writer.write_str("4").is_err());
        assert_eq!(writer.write_count(), 4);
        assert_eq!(writer.get_ref().out, "13");
    }

    #[test]
    fn test_every_operation_is_counted() {
        let mut writer = checked(Recorder::default(), 1000);
        let chars = ['a', 'b', 'c'];

        writer.write_char('a').unwrap();
        writer.write_chars_range(&chars, 1, 2).unwrap();
        writer.write_chars(&chars).unwrap();
        writer.write_str_range("abc", 0, 1).unwrap();
        writer.write_str("abc").unwrap();
        writer.print(1.5).unwrap();
        writer.println().unwrap();
        writer.println_value("line").unwrap();
        writer.printf("%d", &[1.into()]).unwrap();
        writer.printf_locale(&Locale::GERMANY, "%.1f", &[1.5.into()]).unwrap();
        writer.format("%s", &["x".into()]).unwrap();
        writer.format_locale(&Locale::ROOT, "%s", &["y".into()]).unwrap();
        writer
            .append("p")
            .unwrap()
            .append_range("xqx", 1, 2)
            .unwrap()
            .append_char('r')
            .unwrap();

        assert_eq!(writer.write_count(), 15);
        assert_eq!(writer.get_ref().writes, 15);
        assert_eq!(
            writer.get_ref().out,
            "abcabcaabc1.5\nline\n11,5xypqr"
        );
    }

    #[test]
    fn test_flush_close_and_query_are_not_counted() {
        let mut writer = checked(Recorder::failing_after(0), 1);

        writer.flush();
        assert!(writer.check_error());
        writer.close();

        assert_eq!(writer.write_count(), 0);
        let recorder = writer.into_inner();
        assert_eq!(recorder.flushes, 1);
        assert!(recorder.closed);
        // only the explicit query reached the recorder
        assert_eq!(recorder.checks, vec![0]);
    }

    #[test]
    fn test_check_error_ignores_schedule() {
        let mut writer = checked(Recorder::failing_after(1), 100);

        assert!(!writer.check_error());
        writer.write_str("a").unwrap();
        assert!(writer.check_error());
        assert_eq!(writer.write_count(), 1);
    }

    #[test]
    fn test_format_errors_pass_through() {
        let mut writer = checked(Recorder::default(), 10);

        let err = writer.printf("%d", &["nope".into()]).err();
        assert!(matches!(err, Some(Error::Format(_))));
        assert_eq!(writer.write_count(), 1);
    }

    #[test]
    fn test_byte_writes_join_split_chars() {
        let mut writer = checked(Recorder::default(), 100);
        let bytes = "é".as_bytes();

        assert_eq!(io::Write::write(&mut writer, &bytes[..1]).unwrap(), 1);
        assert_eq!(writer.write_count(), 0);
        assert_eq!(io::Write::write(&mut writer, &bytes[1..]).unwrap(), 1);
        assert_eq!(writer.write_count(), 1);

        let mut input = io::Read::chain(&b"h\xc3"[..], &b"\xa9llo"[..]);
        io::copy(&mut input, &mut writer).unwrap();

        assert_eq!(writer.get_ref().out, "éhéllo");
    }

    #[test]
    fn test_byte_writes_reject_invalid_utf8() {
        let mut writer = checked(Recorder::default(), 100);

        let err = io::Write::write(&mut writer, b"ok\xff").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(writer.write_count(), 0);

        // a held partial char followed by garbage is invalid too
        io::Write::write(&mut writer, b"\xc3").unwrap();
        assert!(io::Write::write(&mut writer, b"A").is_err());
        assert_eq!(writer.get_ref().out, "");
    }

    #[test]
    fn test_borrowed_writer() {
        let mut recorder = Recorder::default();
        {
            let mut writer = CheckedWriter::new(&mut recorder);
            writer.write_str("via borrow").unwrap();
        }
        assert_eq!(recorder.out, "via borrow");
    }

    #[test]
    fn test_detects_broken_print_writer() {
        let sink = SharedSink::default();
        let mut writer = CheckedWriter::with_flush_interval(PrintWriter::new(sink.clone()), 2)
            .unwrap();

        writer.println_value("one").unwrap();
        writer.println_value("two").unwrap();
        writer.flush();
        assert_eq!(sink.text(), format!("one{0}two{0}", LINE_SEPARATOR));

        sink.set_failing(true);
        writer.println_value("three").unwrap();
        let err = writer.println_value("four").unwrap_err();
        assert_eq!(err.to_string(), "error on write 4");
    }

    #[test]
    fn test_outer_print_writer_swallows_errors() {
        let sink = SharedSink::default();
        sink.set_failing(true);
        let checked = CheckedWriter::with_flush_interval(PrintWriter::new(sink), 1).unwrap();
        let mut outer = PrintWriter::with_auto_flush(checked, true);

        // the raised write error lands in the outer writer's flag
        outer.println_value("hidden").unwrap();
        assert!(outer.check_error());
    }

    proptest! {
        #[test]
        fn checks_happen_at_multiples_of_interval(writes in 0_u64..300, interval in 1_u64..40) {
            let mut writer = checked(Recorder::default(), interval);

            for _ in 0..writes {
                prop_assert!(writer.write_char('.').is_ok());
            }

            let expected: Vec<u64> = (1..=writes / interval).map(|k| k * interval - 1).collect();
            prop_assert_eq!(&writer.get_ref().checks, &expected);
        }

        #[test]
        fn first_failure_at_next_checkpoint(fail_at in 1_u64..200, interval in 1_u64..40) {
            // the wrapped writer is in error from the start of call `fail_at`
            let mut writer = checked(Recorder::failing_after(fail_at - 1), interval);
            let expected = (fail_at + interval - 1) / interval * interval;

            let mut call = 0;
            let failed_at = loop {
                call += 1;
                if writer.write_char('.').is_err() {
                    break call;
                }
                prop_assert!(call < expected);
            };

            prop_assert_eq!(failed_at, expected);
        }
    }
}
