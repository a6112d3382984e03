//! Wine text registry hives (system.reg, user.reg)
//!
//! Reads values the way wineserver writes them and edits a single value in
//! place, leaving every other byte of the hive as it was.

use std::fmt::Write as _;

use crate::error::StoreError;

/// REG_MULTI_SZ
const REG_MULTI_SZ: u32 = 7;
/// REG_EXPAND_SZ
const REG_EXPAND_SZ: u32 = 2;
/// REG_SZ
const REG_SZ: u32 = 1;

/// A decoded registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    Str(String),
    ExpandStr(String),
    MultiStr(Vec<String>),
    Dword(u32),
    Binary { kind: u32, data: Vec<u8> },
}

impl RegValue {
    /// String form for single-string and numeric values
    pub fn as_string(&self) -> Option<String> {
        match self {
            RegValue::Str(s) | RegValue::ExpandStr(s) => Some(s.clone()),
            RegValue::Dword(n) => Some(n.to_string()),
            RegValue::MultiStr(_) | RegValue::Binary { .. } => None,
        }
    }
}

/// Byte range of a value's lines, trailing newline included
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueSpan {
    /// Name as spelled in the hive
    name: String,
    start: usize,
    end: usize,
}

/// Byte ranges of a key section
#[derive(Debug, Clone, Copy)]
struct KeySection {
    /// First byte after the header line
    body_start: usize,
    /// Start of the next key header, or end of file
    body_end: usize,
}

/// A hive held as text
#[derive(Debug, Clone)]
pub struct RegFile {
    content: String,
}

impl RegFile {
    pub fn from_string(content: String) -> Self {
        Self { content }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Read and decode one value
    pub fn get(&self, key_path: &str, value_name: &str) -> Result<RegValue, StoreError> {
        let section = self
            .find_key(key_path)
            .ok_or_else(|| StoreError::KeyMissing(key_path.to_string()))?;
        let span = self
            .find_value(section, value_name)
            .ok_or_else(|| StoreError::ValueMissing(value_name.to_string()))?;

        let text = &self.content[span.start..span.end];
        let (_, data) = split_value_line(text.trim_start()).ok_or_else(|| StoreError::Undecodable {
            name: value_name.to_string(),
            reason: "missing '='".to_string(),
        })?;

        decode_value(&join_continuations(data)).map_err(|reason| StoreError::Undecodable {
            name: value_name.to_string(),
            reason,
        })
    }

    /// Replace (or add) a REG_MULTI_SZ value under an existing key
    pub fn set_multi_str(
        &mut self,
        key_path: &str,
        value_name: &str,
        values: &[String],
    ) -> Result<(), StoreError> {
        let section = self
            .find_key(key_path)
            .ok_or_else(|| StoreError::KeyMissing(key_path.to_string()))?;

        match self.find_value(section, value_name) {
            Some(span) => {
                let line = format_multi_str_line(&span.name, values);
                self.content.replace_range(span.start..span.end, &line);
            }
            None => {
                let line = format_multi_str_line(value_name, values);
                let mut at = self.insertion_point(section);
                if at == self.content.len() && !self.content.is_empty() && !self.content.ends_with('\n') {
                    self.content.push('\n');
                    at = self.content.len();
                }
                self.content.insert_str(at, &line);
            }
        }
        Ok(())
    }

    fn find_key(&self, key_path: &str) -> Option<KeySection> {
        let wanted = key_path.replace('\\', "\\\\");
        let mut body_start = None;

        for (offset, line) in lines_with_offsets(&self.content) {
            let Some(header) = parse_key_header(line) else {
                continue;
            };
            if let Some(start) = body_start {
                return Some(KeySection {
                    body_start: start,
                    body_end: offset,
                });
            }
            if header.eq_ignore_ascii_case(&wanted) {
                body_start = Some(offset + line.len());
            }
        }

        body_start.map(|start| KeySection {
            body_start: start,
            body_end: self.content.len(),
        })
    }

    fn find_value(&self, section: KeySection, value_name: &str) -> Option<ValueSpan> {
        let body = &self.content[section.body_start..section.body_end];
        let mut lines = lines_with_offsets(body);

        while let Some((offset, line)) = lines.next() {
            let trimmed = line.trim_start();
            let Some((name, data)) = split_value_line(trimmed) else {
                continue;
            };

            let start = section.body_start + offset;
            let mut end = start + line.len();

            // hex values wrap with a trailing backslash
            if data.trim_start().starts_with("hex") {
                let mut last = line;
                while last.trim_end().ends_with('\\') {
                    match lines.next() {
                        Some((next_offset, next)) => {
                            end = section.body_start + next_offset + next.len();
                            last = next;
                        }
                        None => break,
                    }
                }
            }

            if name.eq_ignore_ascii_case(value_name) {
                return Some(ValueSpan { name, start, end });
            }
        }
        None
    }

    /// After the key's `#time=`/`#class=` metadata lines
    fn insertion_point(&self, section: KeySection) -> usize {
        let body = &self.content[section.body_start..section.body_end];
        let mut at = section.body_start;
        for (offset, line) in lines_with_offsets(body) {
            if line.starts_with('#') {
                at = section.body_start + offset + line.len();
            } else {
                break;
            }
        }
        at
    }
}

fn lines_with_offsets(s: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    s.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

/// `[Software\\Wine] 1700000000` -> `Software\\Wine`
fn parse_key_header(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !trimmed.starts_with('[') {
        return None;
    }
    let close = trimmed.rfind(']')?;
    Some(&trimmed[1..close])
}

/// Split `"Name"=data` or `@=data` into the unescaped name and raw data
fn split_value_line(line: &str) -> Option<(String, &str)> {
    if let Some(rest) = line.strip_prefix("@=") {
        return Some(("@".to_string(), rest));
    }
    let rest = line.strip_prefix('"')?;
    let (name, consumed) = unescape(rest, '"').ok()?;
    let data = rest[consumed..].strip_prefix('=')?;
    Some((name, data))
}

/// Merge a wrapped hex value into one line of data
fn join_continuations(data: &str) -> String {
    let mut joined = String::new();
    for part in data.split('\n') {
        let part = part.trim();
        joined.push_str(part.strip_suffix('\\').unwrap_or(part));
    }
    joined
}

fn decode_value(data: &str) -> Result<RegValue, String> {
    let data = data.trim();

    if data.starts_with('"') {
        let (s, _) = unescape(&data[1..], '"')?;
        return Ok(RegValue::Str(s));
    }

    if let Some(hex) = data.strip_prefix("dword:") {
        return u32::from_str_radix(hex.trim(), 16)
            .map(RegValue::Dword)
            .map_err(|e| format!("bad dword: {}", e));
    }

    if let Some(rest) = data.strip_prefix("str(") {
        let (kind, rest) = parse_kind(rest)?;
        let quoted = rest
            .strip_prefix('"')
            .ok_or_else(|| "string data must be quoted".to_string())?;
        let (s, _) = unescape(quoted, '"')?;
        return Ok(match kind {
            REG_MULTI_SZ => {
                // wineserver drops the final terminator when writing str(7)
                let mut full = s;
                full.push('\0');
                RegValue::MultiStr(split_multi_sz(&full))
            }
            REG_EXPAND_SZ => RegValue::ExpandStr(s),
            _ => RegValue::Str(s),
        });
    }

    if let Some(rest) = data.strip_prefix("hex") {
        let (kind, bytes) = match rest.strip_prefix(':') {
            Some(bytes) => (3, bytes),
            None => {
                let rest = rest
                    .strip_prefix('(')
                    .ok_or_else(|| "bad hex value".to_string())?;
                parse_kind(rest)?
            }
        };
        let bytes = parse_hex_bytes(bytes)?;
        return Ok(match kind {
            REG_MULTI_SZ => RegValue::MultiStr(split_multi_sz(&utf16_from_le_bytes(&bytes)?)),
            REG_SZ | REG_EXPAND_SZ => {
                let s = utf16_from_le_bytes(&bytes)?;
                let s = s.trim_end_matches('\0').to_string();
                if kind == REG_SZ {
                    RegValue::Str(s)
                } else {
                    RegValue::ExpandStr(s)
                }
            }
            _ => RegValue::Binary { kind, data: bytes },
        });
    }

    Err(format!("unsupported value format: {}", truncate(data, 24)))
}

/// `7):rest` -> (7, rest)
fn parse_kind(s: &str) -> Result<(u32, &str), String> {
    let close = s.find("):").ok_or_else(|| "bad value type".to_string())?;
    let kind = u32::from_str_radix(&s[..close], 16).map_err(|e| format!("bad value type: {}", e))?;
    Ok((kind, &s[close + 2..]))
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(|b| u8::from_str_radix(b, 16).map_err(|e| format!("bad hex byte {:?}: {}", b, e)))
        .collect()
}

fn utf16_from_le_bytes(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("odd number of bytes in UTF-16 data".to_string());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}

/// `a\0b\0\0` -> [a, b]
fn split_multi_sz(data: &str) -> Vec<String> {
    let body = data
        .strip_suffix("\0\0")
        .or_else(|| data.strip_suffix('\0'))
        .unwrap_or(data);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\0').map(str::to_string).collect()
}

/// Unescape wineserver string syntax up to `terminator`.
///
/// Returns the string and the number of bytes consumed, terminator included.
fn unescape(s: &str, terminator: char) -> Result<(String, usize), String> {
    let mut units: Vec<u16> = Vec::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == terminator {
            let s = String::from_utf16(&units).map_err(|e| e.to_string())?;
            return Ok((s, idx + c.len_utf8()));
        }
        if c != '\\' {
            let mut buf = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }

        let (_, escaped) = chars.next().ok_or_else(|| "dangling escape".to_string())?;
        match escaped {
            'a' => units.push(0x07),
            'b' => units.push(0x08),
            'e' => units.push(0x1b),
            'f' => units.push(0x0c),
            'n' => units.push(0x0a),
            'r' => units.push(0x0d),
            't' => units.push(0x09),
            'v' => units.push(0x0b),
            'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 4 {
                    match chars.peek().and_then(|(_, d)| d.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            digits += 1;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    units.push('x' as u16);
                } else {
                    units.push(value as u16);
                }
            }
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                let mut digits = 1;
                while digits < 3 {
                    match chars.peek().and_then(|(_, d)| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            digits += 1;
                            chars.next();
                        }
                        None => break,
                    }
                }
                units.push(value as u16);
            }
            other => {
                let mut buf = [0u16; 2];
                units.extend_from_slice(other.encode_utf16(&mut buf));
            }
        }
    }

    Err("unterminated string".to_string())
}

/// Escape a string the way wineserver's `dump_strW` does
fn escape(s: &str, quote: char) -> String {
    const C_ESCAPES: &[u8; 32] = b".......abtnvfr.............e....";

    let units: Vec<u16> = s.encode_utf16().collect();
    let mut out = String::with_capacity(units.len());

    for (i, &unit) in units.iter().enumerate() {
        let next = units.get(i + 1).copied();
        if unit > 127 {
            let next_is_hex = matches!(next, Some(n) if n < 128 && (n as u8).is_ascii_hexdigit());
            if next_is_hex {
                let _ = write!(out, "\\x{:04x}", unit);
            } else {
                let _ = write!(out, "\\x{:x}", unit);
            }
        } else if unit < 32 {
            let c_escape = C_ESCAPES[unit as usize];
            let next_is_octal = matches!(next, Some(n) if (u16::from(b'0')..=u16::from(b'7')).contains(&n));
            if c_escape != b'.' {
                out.push('\\');
                out.push(c_escape as char);
            } else if next_is_octal {
                let _ = write!(out, "\\{:03o}", unit);
            } else {
                let _ = write!(out, "\\{:o}", unit);
            }
        } else {
            let c = unit as u8 as char;
            if c == '\\' || c == quote {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// `"Name"=str(7):"a\0b\0"` with trailing newline
fn format_multi_str_line(value_name: &str, values: &[String]) -> String {
    let mut data = String::new();
    for value in values {
        data.push_str(value);
        data.push('\0');
    }
    format!(
        "\"{}\"=str(7):\"{}\"\n",
        escape(value_name, '"'),
        escape(&data, '"')
    )
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
