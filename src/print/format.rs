//! A small printf-style formatter: `%[index$][flags][width][.precision]conversion`.
//!
//! Supported conversions are `s`, `S`, `d`, `f`, `c`, `b`, `B`, `n` and `%%`. Flags
//! are `-` (left-justify), `0` (zero-pad numbers) and `,` (locale grouping).

use crate::error::FormatError;
use crate::print::{Printable, LINE_SEPARATOR};

const DEFAULT_FLOAT_PRECISION: usize = 6;
const MAX_NUMBER: usize = 1 << 20;

/// Separators used when rendering numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    decimal_separator: char,
    grouping_separator: char,
}

impl Locale {
    pub const ROOT: Locale = Locale::new('.', ',');
    pub const US: Locale = Locale::new('.', ',');
    pub const GERMANY: Locale = Locale::new(',', '.');
    pub const FRANCE: Locale = Locale::new(',', '\u{202f}');

    pub const fn new(decimal_separator: char, grouping_separator: char) -> Self {
        Self {
            decimal_separator,
            grouping_separator,
        }
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    pub fn grouping_separator(&self) -> char {
        self.grouping_separator
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::ROOT
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Flags {
    left: bool,
    zero: bool,
    grouping: bool,
}

impl Flags {
    fn first(&self) -> Option<char> {
        [(self.left, '-'), (self.zero, '0'), (self.grouping, ',')]
            .iter()
            .find(|(set, _)| *set)
            .map(|(_, flag)| *flag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spec {
    offset: usize,
    index: Option<usize>,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Spec(Spec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

fn scan_digits(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
        + from
}

fn parse_number(
    template: &str,
    from: usize,
    to: usize,
    offset: usize,
) -> Result<usize, FormatError> {
    template[from..to]
        .parse()
        .ok()
        .filter(|n| *n <= MAX_NUMBER)
        .ok_or(FormatError::TooLarge(offset))
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let bytes = template.as_bytes();
        let mut pieces = vec![];
        let mut literal = String::new();
        let mut pos = 0;

        while let Some(found) = template[pos..].find('%') {
            let offset = pos + found;
            literal.push_str(&template[pos..offset]);

            let mut i = offset + 1;
            let mut index = None;

            let end = scan_digits(bytes, i);
            if end > i && bytes.get(end) == Some(&b'$') {
                match parse_number(template, i, end, offset)? {
                    0 => return Err(FormatError::Incomplete(offset)),
                    n => index = Some(n),
                }
                i = end + 1;
            }

            let mut flags = Flags::default();
            while let Some(b) = bytes.get(i) {
                match b {
                    b'-' => flags.left = true,
                    b'0' => flags.zero = true,
                    b',' => flags.grouping = true,
                    _ => break,
                }
                i += 1;
            }

            let end = scan_digits(bytes, i);
            let width = if end > i {
                Some(parse_number(template, i, end, offset)?)
            } else {
                None
            };
            i = end;

            let mut precision = None;
            if bytes.get(i) == Some(&b'.') {
                let end = scan_digits(bytes, i + 1);
                if end == i + 1 {
                    return Err(FormatError::Incomplete(offset));
                }
                precision = Some(parse_number(template, i + 1, end, offset)?);
                i = end;
            }

            let conversion = template[i..]
                .chars()
                .next()
                .ok_or(FormatError::Incomplete(offset))?;
            pos = i + conversion.len_utf8();

            match conversion {
                '%' => {
                    let illegal = Flags {
                        left: false,
                        ..flags
                    };
                    if let Some(flag) = illegal.first().or(precision.map(|_| '.')) {
                        return Err(FormatError::IllegalFlag { flag, conversion });
                    }
                    if flags.left && width.is_none() {
                        return Err(FormatError::MissingWidth('-'));
                    }

                    let fill = " ".repeat(width.map_or(0, |w| w.saturating_sub(1)));
                    if flags.left {
                        literal.push('%');
                        literal.push_str(&fill);
                    } else {
                        literal.push_str(&fill);
                        literal.push('%');
                    }
                }
                'n' => {
                    if width.is_some() {
                        return Err(FormatError::Width(offset));
                    }
                    if let Some(flag) = flags.first().or(precision.map(|_| '.')) {
                        return Err(FormatError::IllegalFlag { flag, conversion });
                    }
                    literal.push_str(LINE_SEPARATOR);
                }
                's' | 'S' | 'd' | 'f' | 'c' | 'b' | 'B' => {
                    let spec = Spec {
                        offset,
                        index,
                        flags,
                        width,
                        precision,
                        conversion,
                    };
                    spec.validate()?;

                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Spec(spec));
                }
                _ => return Err(FormatError::UnknownConversion { conversion, offset }),
            }
        }

        literal.push_str(&template[pos..]);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { pieces })
    }

    pub fn conversions(&self) -> Vec<char> {
        self.pieces
            .iter()
            .filter_map(|piece| match piece {
                Piece::Spec(spec) => Some(spec.conversion),
                Piece::Literal(_) => None,
            })
            .collect()
    }

    /// Expands the template. Surplus arguments are ignored.
    pub fn render(&self, locale: &Locale, args: &[Printable<'_>]) -> Result<String, FormatError> {
        let mut out = String::new();
        let mut ordinary = 0;

        for piece in &self.pieces {
            let spec = match piece {
                Piece::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Piece::Spec(spec) => spec,
            };

            let index = match spec.index {
                Some(n) => n - 1,
                None => {
                    ordinary += 1;
                    ordinary - 1
                }
            };
            let arg = args.get(index).ok_or(FormatError::MissingArgument {
                index: index + 1,
                offset: spec.offset,
            })?;

            let body = spec.convert(locale, arg)?;
            spec.pad_into(&mut out, body);
        }

        Ok(out)
    }
}

pub fn format(
    locale: &Locale,
    template: &str,
    args: &[Printable<'_>],
) -> Result<String, FormatError> {
    Template::parse(template)?.render(locale, args)
}

fn group(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }

    out
}

impl Spec {
    fn numeric(&self) -> bool {
        matches!(self.conversion, 'd' | 'f')
    }

    fn validate(&self) -> Result<(), FormatError> {
        let conversion = self.conversion;

        if self.flags.zero && !self.numeric() {
            return Err(FormatError::IllegalFlag {
                flag: '0',
                conversion,
            });
        }
        if self.flags.zero && self.flags.left {
            return Err(FormatError::IllegalFlag {
                flag: '-',
                conversion,
            });
        }
        if self.flags.grouping && !self.numeric() {
            return Err(FormatError::IllegalFlag {
                flag: ',',
                conversion,
            });
        }
        if self.precision.is_some() && matches!(conversion, 'd' | 'c') {
            return Err(FormatError::IllegalFlag {
                flag: '.',
                conversion,
            });
        }
        if self.width.is_none() {
            if self.flags.left {
                return Err(FormatError::MissingWidth('-'));
            }
            if self.flags.zero {
                return Err(FormatError::MissingWidth('0'));
            }
        }

        Ok(())
    }

    fn mismatch(&self, arg: &Printable<'_>) -> FormatError {
        FormatError::Mismatch {
            conversion: self.conversion,
            kind: arg.kind(),
        }
    }

    fn convert(&self, locale: &Locale, arg: &Printable<'_>) -> Result<String, FormatError> {
        Ok(match self.conversion {
            's' | 'S' => {
                let mut text = arg.to_string();
                if let Some(precision) = self.precision {
                    text = text.chars().take(precision).collect();
                }
                if self.conversion == 'S' {
                    text = text.to_uppercase();
                }
                text
            }
            'd' => {
                let value = match *arg {
                    Printable::Int(i) => i64::from(i),
                    Printable::Long(l) => l,
                    _ => return Err(self.mismatch(arg)),
                };
                self.sign_and_pad(locale, value < 0, value.unsigned_abs().to_string())
            }
            'f' => {
                let precision = self.precision.unwrap_or(DEFAULT_FLOAT_PRECISION);
                let (negative, magnitude) = match *arg {
                    Printable::Float(v) if v.is_finite() => {
                        (v.is_sign_negative(), format!("{:.*}", precision, v.abs()))
                    }
                    Printable::Double(v) if v.is_finite() => {
                        (v.is_sign_negative(), format!("{:.*}", precision, v.abs()))
                    }
                    Printable::Float(_) | Printable::Double(_) => return Ok(arg.to_string()),
                    _ => return Err(self.mismatch(arg)),
                };
                self.sign_and_pad(locale, negative, magnitude)
            }
            'c' => match *arg {
                Printable::Char(c) => c.to_string(),
                Printable::Int(i) => u32::try_from(i)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.mismatch(arg))?
                    .to_string(),
                _ => return Err(self.mismatch(arg)),
            },
            'b' | 'B' => {
                let text = match *arg {
                    Printable::Bool(b) => b.to_string(),
                    _ => "true".to_string(),
                };
                if self.conversion == 'B' {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            conversion => {
                return Err(FormatError::UnknownConversion {
                    conversion,
                    offset: self.offset,
                })
            }
        })
    }

    // `magnitude` is ASCII digits with an optional '.' fraction
    fn sign_and_pad(&self, locale: &Locale, negative: bool, magnitude: String) -> String {
        let (int_part, fraction) = match magnitude.split_once('.') {
            Some((int_part, fraction)) => (int_part, Some(fraction)),
            None => (magnitude.as_str(), None),
        };

        let mut digits = if self.flags.grouping {
            group(int_part, locale.grouping_separator)
        } else {
            int_part.to_string()
        };
        if let Some(fraction) = fraction {
            digits.push(locale.decimal_separator);
            digits.push_str(fraction);
        }

        let sign = if negative { "-" } else { "" };
        let zeros = match self.width {
            Some(width) if self.flags.zero => {
                width.saturating_sub(sign.len() + digits.chars().count())
            }
            _ => 0,
        };

        format!("{}{}{}", sign, "0".repeat(zeros), digits)
    }

    fn pad_into(&self, out: &mut String, body: String) {
        let fill = self
            .width
            .map_or(0, |width| width.saturating_sub(body.chars().count()));

        if self.flags.left {
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(fill));
        } else {
            out.extend(std::iter::repeat(' ').take(fill));
            out.push_str(&body);
        }
    }
}
