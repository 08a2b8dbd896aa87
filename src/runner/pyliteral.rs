//! Reader for printed Python literals
//!
//! Python samples often `print()` a dict instead of dumping JSON, which
//! gives single-quoted strings and `True`/`False`/`None`. This reader turns
//! such output (and plain JSON) into a [`serde_json::Value`].

use logos::Logos;
use serde_json::{Map, Number, Value};

/// Python literal tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    /// Quoted string, either quote style
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    String,

    #[regex(r"[-+]?[0-9][0-9_]*(\.[0-9_]*)?([eE][-+]?[0-9]+)?")]
    Number,

    #[token("True")]
    #[token("true")]
    True,

    #[token("False")]
    #[token("false")]
    False,

    #[token("None")]
    #[token("null")]
    None,

    /// Any other identifier, e.g. a class name in a repr
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,
}

/// Parse a Python literal (dict, list, tuple, str, number, bool, None)
pub fn parse(input: &str) -> Result<Value, String> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let value = parser.value()?;
    if let Some((_, text)) = parser.peek() {
        return Err(format!("trailing input starting at '{}'", text));
    }
    Ok(value)
}

fn tokenize(input: &str) -> Result<Vec<(Token, &str)>, String> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.slice())),
            Err(()) => {
                return Err(format!(
                    "unexpected '{}' at offset {}",
                    lexer.slice(),
                    lexer.span().start
                ))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Token, &'a str)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<(Token, &'a str)> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<(Token, &'a str), String> {
        let next = self.peek().ok_or("unexpected end of input")?;
        self.pos += 1;
        Ok(next)
    }

    fn value(&mut self) -> Result<Value, String> {
        let (token, text) = self.bump()?;
        match token {
            Token::LeftBrace => self.dict(),
            Token::LeftBracket => self.sequence(Token::RightBracket),
            Token::LeftParen => self.sequence(Token::RightParen),
            Token::String => unquote(text).map(Value::String),
            Token::Number => number(text),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::None => Ok(Value::Null),
            Token::Name => Err(format!("unexpected name '{}'", text)),
            _ => Err(format!("unexpected '{}'", text)),
        }
    }

    fn dict(&mut self) -> Result<Value, String> {
        let mut map = Map::new();
        loop {
            if matches!(self.peek(), Some((Token::RightBrace, _))) {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => if b { "True" } else { "False" }.to_string(),
                Value::Null => "None".to_string(),
                other => return Err(format!("unhashable dict key: {}", other)),
            };
            match self.bump()? {
                (Token::Colon, _) => {}
                (_, text) => return Err(format!("expected ':', found '{}'", text)),
            }
            let value = self.value()?;
            map.insert(key, value);
            match self.bump()? {
                (Token::Comma, _) => continue,
                (Token::RightBrace, _) => return Ok(Value::Object(map)),
                (_, text) => return Err(format!("expected ',' or '}}', found '{}'", text)),
            }
        }
    }

    fn sequence(&mut self, close: Token) -> Result<Value, String> {
        let mut items = Vec::new();
        loop {
            if matches!(self.peek(), Some((token, _)) if token == close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            match self.bump()? {
                (Token::Comma, _) => continue,
                (token, _) if token == close => return Ok(Value::Array(items)),
                (_, text) => return Err(format!("expected ',' or {:?}, found '{}'", close, text)),
            }
        }
    }
}

/// Strip the quotes of a string token and resolve its escapes
fn unquote(text: &str) -> Result<String, String> {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('x') => out.push(hex_char(&mut chars, 2)?),
            Some('u') => out.push(hex_char(&mut chars, 4)?),
            Some(other) => out.push(other),
            None => return Err("unterminated escape".to_string()),
        }
    }
    Ok(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize) -> Result<char, String> {
    let digits: String = chars.by_ref().take(len).collect();
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape '{}'", digits))
}

fn number(text: &str) -> Result<Value, String> {
    let text: String = text.chars().filter(|c| *c != '_').collect();
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("invalid number '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_printed_dict() {
        let value = parse("{'raw_body': {'status': 'ok', 'ready': True}, 'code': 200}").unwrap();
        assert_eq!(
            value,
            json!({"raw_body": {"status": "ok", "ready": true}, "code": 200})
        );
    }

    #[test]
    fn test_json_is_accepted() {
        let value = parse(r#"{"keys": [{"key": "rsa"}], "n": -1.5, "x": null}"#).unwrap();
        assert_eq!(value, json!({"keys": [{"key": "rsa"}], "n": -1.5, "x": null}));
    }

    #[test]
    fn test_escapes_and_tuples() {
        let value = parse(r#"('it\'s', "a\nb", None,)"#).unwrap();
        assert_eq!(value, json!(["it's", "a\nb", null]));
    }

    #[test]
    fn test_token_stream() {
        let kinds: Vec<Token> = tokenize("{'a': [1, None]}")
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect();
        assert_eq!(
            kinds,
            vec![
                Token::LeftBrace,
                Token::String,
                Token::Colon,
                Token::LeftBracket,
                Token::Number,
                Token::Comma,
                Token::None,
                Token::RightBracket,
                Token::RightBrace,
            ]
        );
    }

    #[test]
    fn test_invalid_input() {
        assert!(parse("").is_err());
        assert!(parse("{'a': }").is_err());
        assert!(parse("<Response [200]>").is_err());
        assert!(parse("{'a': 1} trailing").is_err());
        assert!(parse("{'a': 1").is_err());
    }
}
