//! ISC dhclient lease-file reader.
//!
//! A lease file is a sequence of top-level statements, some of which open a
//! `{ ... }` block:
//!
//! ```text
//! default-duid "\000\001...";
//! lease {
//!   interface "eth0";
//!   fixed-address 10.0.0.9;
//!   option subnet-mask 255.255.255.0;
//!   renew 2 2024/01/02 03:04:05;
//! }
//! ```
//!
//! Only complete top-level `lease { ... }` blocks are considered; the last one
//! in the file is the most recent. Quoted strings and `#` comments are
//! skipped by the lexer, so braces inside them never change block depth.

/// A lexical token of the lease grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
    Open,
    Close,
    Semicolon,
}

/// Splits lease-file text into tokens, yielding each with its byte offset.
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_insignificant(&mut self) {
        let bytes = self.src.as_bytes();
        while let Some(&b) = bytes.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'#' {
                self.pos = self.src[self.pos..]
                    .find('\n')
                    .map_or(bytes.len(), |nl| self.pos + nl + 1);
            } else {
                break;
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_insignificant();
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let token = match *bytes.get(start)? {
            b'{' => {
                self.pos += 1;
                Token::Open
            }
            b'}' => {
                self.pos += 1;
                Token::Close
            }
            b';' => {
                self.pos += 1;
                Token::Semicolon
            }
            b'"' => {
                let mut end = start + 1;
                while let Some(&b) = bytes.get(end) {
                    match b {
                        b'\\' => end += 2,
                        b'"' => break,
                        _ => end += 1,
                    }
                }
                let end = end.min(bytes.len());
                self.pos = (end + 1).min(bytes.len());
                Token::Quoted(&self.src[start + 1..end])
            }
            _ => {
                let len = self.src[start..]
                    .find(|c: char| c.is_ascii_whitespace() || "{};\"#".contains(c))
                    .unwrap_or(self.src.len() - start);
                self.pos = start + len;
                Token::Word(&self.src[start..self.pos])
            }
        };
        Some((start, token))
    }
}

/// Iterator over the bodies of complete top-level `lease { ... }` blocks.
pub struct LeaseBlocks<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
}

impl<'a> Iterator for LeaseBlocks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let mut depth = 0usize;
        let mut after_lease_keyword = false;
        let mut body_start = None;

        while let Some((offset, token)) = self.lexer.next() {
            match token {
                Token::Open => {
                    if depth == 0 && after_lease_keyword {
                        body_start = Some(offset + 1);
                    }
                    depth += 1;
                }
                Token::Close if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = body_start.take() {
                            return Some(&self.src[start..offset]);
                        }
                    }
                }
                Token::Close | Token::Word(_) | Token::Quoted(_) | Token::Semicolon => {}
            }
            after_lease_keyword = depth == 0 && token == Token::Word("lease");
        }

        None
    }
}

/// Returns the bodies of all complete top-level `lease` blocks, in file order.
pub fn lease_blocks(contents: &str) -> LeaseBlocks<'_> {
    LeaseBlocks {
        src: contents,
        lexer: Lexer::new(contents),
    }
}

/// Returns the value of the first `fixed-address` or `fixed-address6`
/// statement directly inside a lease block body.
pub fn fixed_address(block: &str) -> Option<&str> {
    let mut lexer = Lexer::new(block);
    let mut depth = 0usize;

    while let Some((_, token)) = lexer.next() {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            Token::Word("fixed-address" | "fixed-address6") if depth == 0 => {
                let rest = &block[lexer.pos..];
                let value = rest[..rest.find(';')?].trim();
                return (!value.is_empty()).then_some(value);
            }
            Token::Word(_) | Token::Quoted(_) | Token::Semicolon => {}
        }
    }

    None
}

/// Returns the fixed address granted by the most recent complete lease.
pub fn latest_fixed_address(contents: &str) -> Option<&str> {
    lease_blocks(contents).last().and_then(fixed_address)
}
