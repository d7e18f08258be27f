//! # Record Parser
//!
//! Splits delimited input into [`RawRecord`]s, one per non-blank line.
//!
//! ## Encoding
//!
//! Input is taken as bytes and decoded one line at a time. A line that is
//! not valid UTF-8 yields `ParseError::InvalidUtf8` for that line only; the
//! lines around it parse normally. A leading UTF-8 byte order mark is
//! dropped.
//!
//! ## Quoting
//!
//! A field that starts with `"` runs to the matching closing `"` and may
//! contain the delimiter literally. Inside such a field `""` is a literal
//! quote. A quote anywhere else is an ordinary character. A line that ends
//! inside an open quote is a `ParseError::UnterminatedQuote`; quoted fields
//! never span lines.
//!
//! Parsing is lazy and restartable: [`RecordParser::parse`] returns a fresh
//! iterator from the start of the input each time it is called.

use std::iter::{Enumerate, Peekable};
use std::str::Chars;

use lamp_core::{ParseError, RawRecord};

/// Column delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = ',';

const QUOTE: char = '"';

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Line splitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordParser {
    delimiter: char,
    skip_header: bool,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl RecordParser {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            skip_header: false,
        }
    }

    /// Drop the first non-blank line without producing a record.
    pub fn with_skip_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Iterate the records of `input` from the beginning.
    pub fn parse<'a, T: AsRef<[u8]> + ?Sized>(&self, input: &'a T) -> Records<'a> {
        let bytes = input.as_ref();
        Records {
            rest: Some(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)),
            line_no: 0,
            delimiter: self.delimiter,
            header_pending: self.skip_header,
        }
    }
}

/// Lazy sequence of parsed lines. Blank lines are skipped silently.
#[derive(Debug)]
pub struct Records<'a> {
    rest: Option<&'a [u8]>,
    line_no: usize,
    delimiter: char,
    header_pending: bool,
}

impl<'a> Records<'a> {
    /// Next physical line without its terminator (`\n` or `\r\n`).
    fn next_line(&mut self) -> Option<(usize, &'a [u8])> {
        let rest = self.rest.filter(|r| !r.is_empty())?;
        let (line, tail) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        self.rest = tail;
        self.line_no += 1;
        Some((self.line_no, line.strip_suffix(b"\r").unwrap_or(line)))
    }
}

impl Iterator for Records<'_> {
    type Item = Result<RawRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line_no, bytes) = self.next_line()?;
            let line = match std::str::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    if std::mem::take(&mut self.header_pending) {
                        continue;
                    }
                    return Some(Err(ParseError::InvalidUtf8 {
                        line: line_no,
                        byte: e.valid_up_to() + 1,
                    }));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if std::mem::take(&mut self.header_pending) {
                continue;
            }
            return Some(split_line(line, line_no, self.delimiter).map(|t| RawRecord::new(line_no, t)));
        }
    }
}

/// Split one line into tokens.
pub fn split_line(line: &str, line_no: usize, delimiter: char) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut field = String::new();
    let mut chars: Peekable<Enumerate<Chars<'_>>> = line.chars().enumerate().peekable();
    let mut at_field_start = true;
    let mut open_quote: Option<usize> = None;

    while let Some((col, c)) = chars.next() {
        if open_quote.is_some() {
            if c == QUOTE {
                if chars.next_if(|&(_, n)| n == QUOTE).is_some() {
                    field.push(QUOTE);
                } else {
                    open_quote = None;
                }
            } else {
                field.push(c);
            }
        } else if c == delimiter {
            tokens.push(std::mem::take(&mut field));
            at_field_start = true;
            continue;
        } else if c == QUOTE && at_field_start {
            open_quote = Some(col + 1);
        } else {
            field.push(c);
        }
        at_field_start = false;
    }

    if let Some(column) = open_quote {
        return Err(ParseError::UnterminatedQuote {
            line: line_no,
            column,
        });
    }
    tokens.push(field);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        split_line(line, 1, ',').unwrap()
    }

    #[test]
    fn splits_on_delimiter() {
        assert_eq!(tokens("a,b,c"), ["a", "b", "c"]);
    }

    #[test]
    fn keeps_empty_fields() {
        assert_eq!(tokens("a,,c,"), ["a", "", "c", ""]);
    }

    #[test]
    fn quoted_field_holds_delimiter() {
        assert_eq!(tokens(r#""37.7,-122.4",68"#), ["37.7,-122.4", "68"]);
    }

    #[test]
    fn doubled_quote_is_literal() {
        assert_eq!(tokens(r#""say ""hi""",x"#), [r#"say "hi""#, "x"]);
    }

    #[test]
    fn quote_mid_field_is_literal() {
        assert_eq!(tokens(r#"a"b,c"#), [r#"a"b"#, "c"]);
    }

    #[test]
    fn text_after_closing_quote_is_kept() {
        assert_eq!(tokens(r#""ab"cd,e"#), ["abcd", "e"]);
    }

    #[test]
    fn empty_quoted_field() {
        assert_eq!(tokens(r#""",x"#), ["", "x"]);
    }

    #[test]
    fn unterminated_quote_reports_line_and_column() {
        let err = split_line(r#"a,"open,b"#, 4, ',').unwrap_err();
        assert_eq!(err, ParseError::UnterminatedQuote { line: 4, column: 3 });
    }

    #[test]
    fn custom_delimiter() {
        assert_eq!(split_line("a;b,c;d", 1, ';').unwrap(), ["a", "b,c", "d"]);
        assert_eq!(split_line("a\tb", 1, '\t').unwrap(), ["a", "b"]);
    }

    #[test]
    fn blank_lines_yield_nothing() {
        let parser = RecordParser::default();
        let lines: Vec<usize> = parser
            .parse("a,b\n\n   \nc,d\n")
            .map(|r| r.unwrap().line())
            .collect();
        assert_eq!(lines, [1, 4]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(RecordParser::default().parse("").count(), 0);
    }

    #[test]
    fn crlf_line_endings() {
        let recs: Vec<RawRecord> = RecordParser::default()
            .parse("a,b\r\nc,d\r\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs[0].tokens(), ["a", "b"]);
        assert_eq!(recs[1].tokens(), ["c", "d"]);
    }

    #[test]
    fn error_does_not_stop_iteration() {
        let results: Vec<_> = RecordParser::default().parse("ok\n\"bad\nok2").collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(ParseError::UnterminatedQuote { line: 2, column: 1 })
        );
        assert_eq!(results[2].as_ref().unwrap().line(), 3);
    }

    #[test]
    fn skip_header_drops_first_non_blank_line() {
        let parser = RecordParser::default().with_skip_header(true);
        let recs: Vec<RawRecord> = parser
            .parse("\nname,value\na,1\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].line(), 3);
    }

    #[test]
    fn leading_bom_is_dropped() {
        let recs: Vec<RawRecord> = RecordParser::default()
            .parse("\u{feff}1,\"1,2\"\n3,\"3,4\"\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs[0].line(), 1);
        assert_eq!(recs[0].tokens(), ["1", "1,2"]);
        assert_eq!(recs[1].tokens(), ["3", "3,4"]);
    }

    #[test]
    fn bom_only_at_start_is_special() {
        let recs: Vec<RawRecord> = RecordParser::default()
            .parse("a\n\u{feff}b\n")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs[1].tokens(), ["\u{feff}b"]);
    }

    #[test]
    fn invalid_utf8_skips_only_its_line() {
        let input: &[u8] = b"1,\"1,2\"\n2,\"1,\xff\"\n3,\"3,4\"\n";
        let results: Vec<_> = RecordParser::default().parse(input).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().tokens(), ["1", "1,2"]);
        assert_eq!(results[1], Err(ParseError::InvalidUtf8 { line: 2, byte: 6 }));
        assert_eq!(results[2].as_ref().unwrap().tokens(), ["3", "3,4"]);
        assert_eq!(results[2].as_ref().unwrap().line(), 3);
    }

    #[test]
    fn invalid_utf8_header_is_still_the_header() {
        let input: &[u8] = b"\xffname\n1\n";
        let recs: Vec<RawRecord> = RecordParser::default()
            .with_skip_header(true)
            .parse(input)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].line(), 2);
    }

    #[test]
    fn parse_is_restartable() {
        let parser = RecordParser::default();
        let input = "a\nb\nc";
        let first: Vec<_> = parser.parse(input).collect();
        let mut partial = parser.parse(input);
        partial.next();
        let second: Vec<_> = parser.parse(input).collect();
        assert_eq!(first, second);
    }
}
