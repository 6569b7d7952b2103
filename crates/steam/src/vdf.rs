//! Text KeyValues (VDF) parser for Steam configuration files.

use std::fs;
use std::path::Path;

use crate::SteamError;

/// A KeyValues value: a string or a nested section.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Section(KeyValues),
}

/// An ordered KeyValues section.
///
/// Key lookup is ASCII case-insensitive, like Steam's own reader. When a
/// key repeats, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues {
    entries: Vec<(String, Value)>,
}

impl KeyValues {
    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Returns the nested section for `key`.
    pub fn section(&self, key: &str) -> Option<&KeyValues> {
        match self.get(key)? {
            Value::Section(kv) => Some(kv),
            Value::String(_) => None,
        }
    }

    /// Returns the string value for `key`.
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Section(_) => None,
        }
    }

    /// Descends through nested sections.
    pub fn section_at(&self, path: &[&str]) -> Option<&KeyValues> {
        path.iter().try_fold(self, |kv, key| kv.section(key))
    }

    /// Iterates entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and parses a text VDF file.
pub fn load_vdf(path: &Path) -> Result<KeyValues, SteamError> {
    let text = fs::read_to_string(path)
        .map_err(|e| SteamError::Vdf(format!("failed to read {}: {e}", path.display())))?;
    parse_vdf(&text)
}

/// Parses text VDF data.
pub fn parse_vdf(text: &str) -> Result<KeyValues, SteamError> {
    let mut lexer = Lexer::new(text);
    parse_section(&mut lexer, false)
}

#[derive(Debug, PartialEq)]
enum Token {
    Str(String),
    Open,
    Close,
}

fn parse_section(lexer: &mut Lexer<'_>, nested: bool) -> Result<KeyValues, SteamError> {
    let mut kv = KeyValues::default();

    loop {
        let key = match lexer.next_token()? {
            None if nested => {
                return Err(SteamError::Vdf("unexpected end of data in section".into()));
            }
            None => return Ok(kv),
            Some(Token::Close) if nested => return Ok(kv),
            Some(Token::Close) => {
                return Err(SteamError::Vdf(format!(
                    "unbalanced '}}' at line {}",
                    lexer.line
                )));
            }
            Some(Token::Open) => {
                return Err(SteamError::Vdf(format!(
                    "expected key, got '{{' at line {}",
                    lexer.line
                )));
            }
            Some(Token::Str(key)) => key,
        };

        let value = match lexer.next_token()? {
            Some(Token::Str(s)) => Value::String(s),
            Some(Token::Open) => Value::Section(parse_section(lexer, true)?),
            Some(Token::Close) | None => {
                return Err(SteamError::Vdf(format!(
                    "missing value for key '{key}' at line {}",
                    lexer.line
                )));
            }
        };

        kv.entries.push((key, value));
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        // Skip a UTF-8 byte order mark.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn next_token(&mut self) -> Result<Option<Token>, SteamError> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };

            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' => {
                    self.bump();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_line();
                    } else {
                        return Ok(Some(Token::Str(self.read_unquoted(String::from('/')))));
                    }
                }
                // Platform conditionals such as [$WIN32] are ignored.
                '[' => {
                    while let Some(c) = self.bump() {
                        if c == ']' {
                            break;
                        }
                    }
                }
                '{' => {
                    self.bump();
                    return Ok(Some(Token::Open));
                }
                '}' => {
                    self.bump();
                    return Ok(Some(Token::Close));
                }
                '"' => {
                    self.bump();
                    return self.read_quoted().map(|s| Some(Token::Str(s)));
                }
                _ => return Ok(Some(Token::Str(self.read_unquoted(String::new())))),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn read_quoted(&mut self) -> Result<String, SteamError> {
        let start = self.line;
        let mut s = String::new();

        while let Some(c) = self.bump() {
            match c {
                '"' => return Ok(s),
                '\\' => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(other) => {
                        s.push('\\');
                        s.push(other);
                    }
                    None => break,
                },
                _ => s.push(c),
            }
        }

        Err(SteamError::Vdf(format!(
            "unterminated string starting at line {start}"
        )))
    }

    fn read_unquoted(&mut self, mut s: String) -> String {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '"') {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }
}
