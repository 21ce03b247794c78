use crate::error::{EvalError, EvalResult};
use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Parses source text into value trees allocated in the heap.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    heap: &'a mut Heap,
    symbols: &'a mut SymbolTable,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, heap: &'a mut Heap, symbols: &'a mut SymbolTable) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            heap,
            symbols,
        }
    }

    /// Read one expression. Returns None at end of input.
    pub fn read(&mut self) -> EvalResult<Option<Value>> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        self.read_expr().map(Some)
    }

    /// Read every remaining top-level expression.
    pub fn read_all(&mut self) -> EvalResult<Vec<Value>> {
        let mut forms = Vec::new();
        while let Some(form) = self.read()? {
            forms.push(form);
        }
        Ok(forms)
    }

    fn error<T>(&self, message: impl Into<String>) -> EvalResult<T> {
        Err(EvalError::Read {
            pos: self.pos,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else if ch == b';' {
                while let Some(c) = self.advance() {
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_expr(&mut self) -> EvalResult<Value> {
        self.skip_whitespace_and_comments();
        match self.peek() {
            None => self.error("unexpected end of input"),
            Some(b'(') => self.read_list(),
            Some(b')') => self.error("unexpected ')'"),
            Some(b'"') => self.read_string(),
            Some(b'\'') => self.read_symbol(),
            Some(_) => self.read_word(),
        }
    }

    /// `(a b c)`, `(a . b)` or `(a b . c)`.
    fn read_list(&mut self) -> EvalResult<Value> {
        let start = self.pos;
        self.advance(); // '('

        let mut elements = Vec::new();
        let mut tail = Value::Null;
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => {
                    return Err(EvalError::Read {
                        pos: start,
                        message: "unterminated list".into(),
                    })
                }
                Some(b')') => {
                    self.advance();
                    break;
                }
                Some(b'.') if self.is_dot_separator() => {
                    if elements.is_empty() {
                        return self.error("dot with no preceding element");
                    }
                    self.advance();
                    tail = self.read_expr()?;
                    self.skip_whitespace_and_comments();
                    if self.peek() != Some(b')') {
                        return self.error("expected ')' after dotted tail");
                    }
                    self.advance();
                    break;
                }
                Some(_) => elements.push(self.read_expr()?),
            }
        }

        self.heap.list_with_tail(&elements, tail)
    }

    /// A lone `.` followed by a delimiter.
    fn is_dot_separator(&self) -> bool {
        match self.input.get(self.pos + 1) {
            None => true,
            Some(&next) => is_delimiter(next),
        }
    }

    /// Double-quoted text, no escapes.
    fn read_string(&mut self) -> EvalResult<Value> {
        let start = self.pos;
        self.advance(); // '"'
        let body_start = self.pos;
        loop {
            match self.advance() {
                None => {
                    return Err(EvalError::Read {
                        pos: start,
                        message: "unterminated string".into(),
                    })
                }
                Some(b'"') => break,
                Some(_) => {}
            }
        }
        let text = self.text(body_start, self.pos - 1)?;
        let id = self.symbols.intern(&text);
        Ok(Value::String(id))
    }

    /// `'abc`, ending at whitespace or a parenthesis.
    fn read_symbol(&mut self) -> EvalResult<Value> {
        self.advance(); // '\''
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() || ch == b'(' || ch == b')' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return self.error("empty quoted symbol");
        }
        let text = self.text(start, self.pos)?;
        let id = self.symbols.intern(&text);
        Ok(Value::Symbol(id))
    }

    /// A number, a boolean literal, or a name.
    fn read_word(&mut self) -> EvalResult<Value> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.pos += 1;
        }
        let word = self.text(start, self.pos)?;

        if let Some(num) = parse_number(&word) {
            return Ok(num);
        }
        match word.as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Ok(Value::Name(self.symbols.intern(&word))),
        }
    }

    fn text(&self, start: usize, end: usize) -> EvalResult<String> {
        match std::str::from_utf8(&self.input[start..end]) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(EvalError::Read {
                pos: start,
                message: "invalid utf-8".into(),
            }),
        }
    }
}

fn is_delimiter(ch: u8) -> bool {
    ch.is_ascii_whitespace() || matches!(ch, b'(' | b')' | b'"' | b';' | b'\'')
}

/// Decimal integers, then decimal floats. Words like `inf` or `-` stay names.
fn parse_number(word: &str) -> Option<Value> {
    let digits = word.strip_prefix(['+', '-']).unwrap_or(word);
    let starts_numeric = digits
        .bytes()
        .next()
        .map_or(false, |b| b.is_ascii_digit() || b == b'.');
    if !starts_numeric || !digits.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Ok(n) = word.parse::<i64>() {
        return Some(Value::Integer(n));
    }
    word.parse::<f64>().ok().map(Value::Float)
}
