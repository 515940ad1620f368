//! Reads a small text format byte by byte, with line-numbered errors.

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Lexer<'a> {
    buf: &'a [u8],
    pub ofs: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Lexer { buf, ofs: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.ofs >= self.buf.len()
    }

    /// The byte `n` past the cursor as a char, or '\0' past the end.
    pub fn peek_at(&self, n: usize) -> char {
        self.buf.get(self.ofs + n).map_or('\0', |&b| b as char)
    }
    pub fn peek(&self) -> char {
        self.peek_at(0)
    }
    pub fn peek_newline(&self) -> bool {
        self.peek() == '\n' || (self.peek() == '\r' && self.peek_at(1) == '\n')
    }

    pub fn next(&mut self) {
        if !self.at_end() {
            self.ofs += 1;
        }
    }
    pub fn read(&mut self) -> char {
        let c = self.peek();
        self.next();
        c
    }
    pub fn skip(&mut self, ch: char) -> bool {
        if !self.at_end() && self.peek() == ch {
            self.next();
            return true;
        }
        false
    }
    /// Skip a "\n" or "\r\n".
    pub fn skip_newline(&mut self) -> bool {
        if self.peek() == '\r' && self.peek_at(1) == '\n' {
            self.ofs += 2;
            return true;
        }
        self.skip('\n')
    }

    pub fn parse_error<T, S: Into<String>>(&self, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs: self.ofs,
        })
    }

    pub fn format_parse_error(&self, filename: &str, err: ParseError) -> String {
        let mut ofs = 0;
        for (line_number, line) in self.buf.split(|&c| c == b'\n').enumerate() {
            if ofs + line.len() >= err.ofs {
                let line = String::from_utf8_lossy(line);
                let line = line.trim_end_matches('\r');
                let prefix = format!("{}:{}: ", filename, line_number + 1);
                let col = (err.ofs - ofs).min(line.len());
                return format!(
                    "parse error: {}\n{}{}\n{}^\n",
                    err.msg,
                    prefix,
                    line,
                    " ".repeat(prefix.len() + col)
                );
            }
            ofs += line.len() + 1;
        }
        format!("{}: parse error: {}\n", filename, err.msg)
    }
}
