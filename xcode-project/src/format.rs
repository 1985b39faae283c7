// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading and writing the ASCII property list dialect of `project.pbxproj`.

Xcode persists projects using the legacy OpenStep property list syntax.
This syntax only knows about dictionaries, arrays, and strings. Numbers
are just unquoted strings. Parsed documents are represented as
[plist::Value] so dictionary key order is retained and callers can use
the same primitives they use for XML property lists.

Serialization mimics what Xcode writes: objects are grouped into
`/* Begin <isa> section */` blocks sorted by `isa` then object ID, and
`PBXBuildFile` and `PBXFileReference` objects are written on a single
line. Xcode's descriptive `/* ... */` annotations after object
references are not emitted. Xcode tolerates their absence and regenerates
them the next time it saves the project.
*/

use {
    crate::error::{Result, XcodeProjectError},
    plist::{Dictionary, Value},
    std::{borrow::Cow, io::Write},
};

/// First line of every `project.pbxproj` file.
pub const UTF8_HEADER: &str = "// !$*UTF8*$!";

/// Object types Xcode writes on a single line.
const SINGLE_LINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Characters accepted in unquoted strings when parsing.
fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-' | '+')
}

/// Whether a string must be quoted when serialized.
///
/// This is stricter than what the parser accepts, matching Xcode's behavior
/// of quoting values like `-ObjC`.
fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.contains("//")
        || s.contains("/*")
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.'))
}

fn quote(s: &str) -> Cow<'_, str> {
    if !needs_quotes(s) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');

    Cow::Owned(out)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }

        Some(c)
    }

    fn error(&self, message: impl ToString) -> XcodeProjectError {
        XcodeProjectError::Parse {
            line: self.line,
            message: message.to_string(),
        }
    }

    /// Advance past whitespace and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();

            if let Some(body) = rest.strip_prefix("/*") {
                let end = body
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                let comment = &rest[..end + 4];
                self.line += comment.matches('\n').count();
                self.pos += comment.len();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_trivia()?;

        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}'; found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}'; found end of input", expected))),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia()?;

        match self.peek() {
            Some('{') => Ok(Value::Dictionary(self.parse_dictionary()?)),
            Some('(') => Ok(Value::Array(self.parse_array()?)),
            Some(_) => Ok(Value::String(self.parse_string()?)),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_dictionary(&mut self) -> Result<Dictionary> {
        self.expect('{')?;
        let mut dict = Dictionary::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }

            let key = self.parse_string()?;
            self.expect('=')?;
            let value = self.parse_value()?;
            self.expect(';')?;

            dict.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>> {
        self.expect('(')?;
        let mut values = vec![];

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(values);
            }

            values.push(self.parse_value()?);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => {}
                Some(')') => return Ok(values),
                Some(c) => {
                    return Err(self.error(format!("expected ',' or ')' in array; found '{}'", c)))
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_trivia()?;

        match self.peek() {
            Some('"') => self.parse_quoted_string(),
            Some(c) if is_unquoted_char(c) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if is_unquoted_char(c)) {
                    self.bump();
                }

                Ok(self.text[start..self.pos].to_string())
            }
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_quoted_string(&mut self) -> Result<String> {
        // Opening quote.
        self.bump();
        let mut s = String::new();

        loop {
            match self.bump() {
                Some('"') => return Ok(s),
                Some('\\') => {
                    let c = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('U') => self.parse_unicode_escape()?,
                        Some(c) => c,
                        None => return Err(self.error("unterminated string")),
                    };
                    s.push(c);
                }
                Some(c) => s.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    /// Read 4 hex digits as a UTF-16 code unit.
    fn parse_code_unit(&mut self) -> Result<u32> {
        let digits = self
            .rest()
            .get(..4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid \\U escape"))?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| self.error(format!("invalid \\U escape: {}", digits)))?;
        self.pos += 4;

        Ok(code)
    }

    /// Parse the code unit following `\U`.
    ///
    /// A high surrogate must be followed by a `\U` escaped low surrogate.
    fn parse_unicode_escape(&mut self) -> Result<char> {
        let mut code = self.parse_code_unit()?;

        if (0xd800..=0xdbff).contains(&code) {
            if !self.rest().starts_with("\\U") {
                return Err(self.error(format!("unpaired surrogate {:04x}", code)));
            }
            self.pos += 2;

            let low = self.parse_code_unit()?;
            if !(0xdc00..=0xdfff).contains(&low) {
                return Err(self.error(format!("invalid low surrogate {:04x}", low)));
            }

            code = 0x10000 + ((code - 0xd800) << 10) + (low - 0xdc00);
        }

        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {:04x}", code)))
    }
}

/// Parse `project.pbxproj` content into a [Value].
pub fn parse(text: &str) -> Result<Value> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut parser = Parser {
        text,
        pos: 0,
        line: 1,
    };

    let value = parser.parse_value()?;

    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing content after root value"));
    }

    Ok(value)
}

fn write_indent<W: Write>(writer: &mut W, depth: usize) -> std::io::Result<()> {
    for _ in 0..depth {
        writer.write_all(b"\t")?;
    }

    Ok(())
}

fn write_scalar<W: Write>(value: &Value, writer: &mut W) -> std::io::Result<()> {
    match value {
        Value::String(s) => writer.write_all(quote(s).as_bytes()),
        Value::Integer(v) => match (v.as_signed(), v.as_unsigned()) {
            (Some(v), _) => write!(writer, "{}", v),
            (None, Some(v)) => write!(writer, "{}", v),
            (None, None) => Ok(()),
        },
        Value::Real(v) => write!(writer, "{}", v),
        Value::Boolean(true) => writer.write_all(b"YES"),
        Value::Boolean(false) => writer.write_all(b"NO"),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "value type cannot be represented in project.pbxproj",
        )),
    }
}

fn write_value<W: Write>(value: &Value, depth: usize, writer: &mut W) -> std::io::Result<()> {
    match value {
        Value::Dictionary(dict) => {
            writer.write_all(b"{\n")?;
            for (key, value) in dict {
                write_indent(writer, depth + 1)?;
                write!(writer, "{} = ", quote(key))?;
                write_value(value, depth + 1, writer)?;
                writer.write_all(b";\n")?;
            }
            write_indent(writer, depth)?;
            writer.write_all(b"}")
        }
        Value::Array(values) => {
            writer.write_all(b"(\n")?;
            for value in values {
                write_indent(writer, depth + 1)?;
                write_value(value, depth + 1, writer)?;
                writer.write_all(b",\n")?;
            }
            write_indent(writer, depth)?;
            writer.write_all(b")")
        }
        value => write_scalar(value, writer),
    }
}

fn write_inline<W: Write>(value: &Value, writer: &mut W) -> std::io::Result<()> {
    match value {
        Value::Dictionary(dict) => {
            writer.write_all(b"{")?;
            for (key, value) in dict {
                write!(writer, "{} = ", quote(key))?;
                write_inline(value, writer)?;
                writer.write_all(b"; ")?;
            }
            writer.write_all(b"}")
        }
        Value::Array(values) => {
            writer.write_all(b"(")?;
            for value in values {
                write_inline(value, writer)?;
                writer.write_all(b", ")?;
            }
            writer.write_all(b")")
        }
        value => write_scalar(value, writer),
    }
}

fn object_isa(value: &Value) -> &str {
    value
        .as_dictionary()
        .and_then(|d| d.get("isa"))
        .and_then(Value::as_string)
        .unwrap_or("")
}

fn write_objects<W: Write>(objects: &Dictionary, writer: &mut W) -> std::io::Result<()> {
    let mut entries = objects.iter().collect::<Vec<_>>();
    entries.sort_by(|(a_id, a), (b_id, b)| (object_isa(a), *a_id).cmp(&(object_isa(b), *b_id)));

    writer.write_all(b"{\n")?;

    let mut section: Option<&str> = None;
    for (id, value) in entries {
        let isa = object_isa(value);

        if section != Some(isa) {
            if let Some(previous) = section {
                writeln!(writer, "/* End {} section */", previous)?;
            }
            writeln!(writer, "\n/* Begin {} section */", isa)?;
            section = Some(isa);
        }

        write_indent(writer, 2)?;
        write!(writer, "{} = ", quote(id))?;
        if SINGLE_LINE_ISAS.contains(&isa) {
            write_inline(value, writer)?;
        } else {
            write_value(value, 2, writer)?;
        }
        writer.write_all(b";\n")?;
    }

    if let Some(previous) = section {
        writeln!(writer, "/* End {} section */", previous)?;
    }

    write_indent(writer, 1)?;
    writer.write_all(b"}")
}

/// Serialize a project root [Dictionary] as `project.pbxproj` content.
pub fn write_dictionary<W: Write>(root: &Dictionary, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "{}", UTF8_HEADER)?;
    writer.write_all(b"{\n")?;

    for (key, value) in root {
        write_indent(writer, 1)?;
        write!(writer, "{} = ", quote(key))?;

        match value {
            Value::Dictionary(objects) if key == "objects" => write_objects(objects, writer)?,
            value => write_value(value, 1, writer)?,
        }

        writer.write_all(b";\n")?;
    }

    writer.write_all(b"}\n")
}

/// Serialize a [Value] as `project.pbxproj` content.
///
/// Xcode projects always have a dictionary root. Other values are written
/// without the special handling of the `objects` key.
pub fn write<W: Write>(value: &Value, writer: &mut W) -> std::io::Result<()> {
    match value {
        Value::Dictionary(root) => write_dictionary(root, writer),
        value => {
            writeln!(writer, "{}", UTF8_HEADER)?;
            write_value(value, 0, writer)?;
            writer.write_all(b"\n")
        }
    }
}

/// Serialize a [Value] to a [String] of `project.pbxproj` content.
pub fn to_string(value: &Value) -> std::io::Result<String> {
    let mut buffer = vec![];
    write(value, &mut buffer)?;

    String::from_utf8(buffer)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
