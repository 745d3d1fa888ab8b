use crate::remove::{Comment, CommentKind};

/// The file could not be tokenized well enough to locate comments safely.
/// Callers should skip the file rather than rewrite it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedBlockComment { offset: usize },

    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("unterminated template literal starting at byte {offset}")]
    UnterminatedTemplate { offset: usize },

    #[error("unterminated regex literal starting at byte {offset}")]
    UnterminatedRegex { offset: usize },
}

/// Keywords after which a `/` starts a regex literal rather than division.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Locate every comment in JavaScript/TypeScript-family source.
///
/// Understands single- and double-quoted strings, template literals
/// (including nested `${}` substitutions, which re-enter code context), and
/// regex literals via the usual prefix heuristic. Returned spans are
/// ascending, non-overlapping, and cover the comment delimiters: `//`
/// through the end of the line (exclusive of the terminator), `/*` through
/// `*/`.
pub fn scan_comments(source: &str) -> Result<Vec<Comment>, ScanError> {
    let mut scanner = Scanner {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
        comments: Vec::new(),
        last_sig: None,
    };
    scanner.scan_code(false)?;
    Ok(scanner.comments)
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    comments: Vec<Comment>,
    /// Byte index of the last significant (non-whitespace, non-comment)
    /// code byte seen, for the regex-vs-division decision.
    last_sig: Option<usize>,
}

impl Scanner<'_> {
    /// Scan code until EOF, or — inside a `${}` substitution — until the
    /// matching `}` (left unconsumed for the caller).
    fn scan_code(&mut self, until_brace: bool) -> Result<(), ScanError> {
        let mut depth = 0usize;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];

            match b {
                b'}' if until_brace && depth == 0 => return Ok(()),
                b'{' => {
                    depth += 1;
                    self.last_sig = Some(self.pos);
                    self.pos += 1;
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    self.last_sig = Some(self.pos);
                    self.pos += 1;
                }
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'/' => {
                    if self.regex_can_start() {
                        self.regex()?;
                    } else {
                        self.last_sig = Some(self.pos);
                        self.pos += 1;
                    }
                }
                b'\'' | b'"' => self.string(b)?,
                b'`' => self.template()?,
                _ => {
                    if !b.is_ascii_whitespace() {
                        self.last_sig = Some(self.pos);
                    }
                    self.pos += 1;
                }
            }
        }

        Ok(())
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        let end = match self.src[start..].find('\n') {
            Some(n) => start + n,
            None => self.src.len(),
        };
        self.comments.push(Comment::new(CommentKind::Line, start..end));
        self.pos = end;
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        match self.src[start + 2..].find("*/") {
            Some(n) => {
                let end = start + 2 + n + 2;
                self.comments.push(Comment::new(CommentKind::Block, start..end));
                self.pos = end;
                Ok(())
            }
            None => Err(ScanError::UnterminatedBlockComment { offset: start }),
        }
    }

    fn string(&mut self, quote: u8) -> Result<(), ScanError> {
        let start = self.pos;
        let mut i = start + 1;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b == quote => {
                    self.pos = i + 1;
                    self.last_sig = Some(i);
                    return Ok(());
                }
                _ => i += 1,
            }
        }

        Err(ScanError::UnterminatedString { offset: start })
    }

    fn template(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.last_sig = Some(self.pos);
                    self.pos += 1;
                    return Ok(());
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    // Substitutions re-enter code context and may contain
                    // comments, strings, and nested templates.
                    self.scan_code(true)?;
                    if self.pos >= self.bytes.len() {
                        return Err(ScanError::UnterminatedTemplate { offset: start });
                    }
                    self.pos += 1; // the closing `}`
                }
                _ => self.pos += 1,
            }
        }

        Err(ScanError::UnterminatedTemplate { offset: start })
    }

    fn regex(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let mut i = start + 1;
        let mut in_class = false;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    self.pos = i + 1;
                    self.last_sig = Some(i);
                    return Ok(());
                }
                _ => i += 1,
            }
        }

        Err(ScanError::UnterminatedRegex { offset: start })
    }

    /// Decide whether a `/` at the current position starts a regex literal.
    ///
    /// The standard heuristic: a regex can start at the beginning of an
    /// expression — after an operator, an opening bracket, a statement
    /// boundary, or a keyword like `return`. After an identifier, a literal,
    /// or a closing bracket, `/` is division.
    fn regex_can_start(&self) -> bool {
        let Some(i) = self.last_sig else {
            return true;
        };

        match self.bytes[i] {
            b'=' | b'(' | b'[' | b'{' | b',' | b';' | b':' | b'!' | b'&' | b'|' | b'?' | b'+'
            | b'-' | b'*' | b'%' | b'<' | b'>' | b'^' | b'~' => true,
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                let word_start = self.src[..=i]
                    .rfind(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '$')
                    .map_or(0, |p| p + 1);
                REGEX_PREFIX_KEYWORDS.contains(&&self.src[word_start..=i])
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(source: &str) -> Vec<(CommentKind, usize, usize)> {
        scan_comments(source)
            .unwrap()
            .into_iter()
            .map(|c| (c.kind, c.span.start, c.span.end))
            .collect()
    }

    #[test]
    fn finds_line_and_block_comments() {
        let src = "let x = 1; // one\n/* two */ let y = 2;\n";
        assert_eq!(
            spans(src),
            vec![(CommentKind::Line, 11, 17), (CommentKind::Block, 18, 27)]
        );
    }

    #[test]
    fn no_comments_yields_empty_list() {
        assert!(spans("let x = 1;\n").is_empty());
    }

    #[test]
    fn markers_inside_strings_are_text() {
        let src = "const a = \"// not a comment\";\nconst b = '/* neither */';\n";
        assert!(spans(src).is_empty());
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let src = "const s = \"a\\\"b // still a string\";\n";
        assert!(spans(src).is_empty());
    }

    #[test]
    fn markers_inside_template_literals_are_text() {
        let src = "const t = `a // b /* c */ d`;\n";
        assert!(spans(src).is_empty());
    }

    #[test]
    fn template_substitution_reenters_code_context() {
        let src = "const t = `x ${ 1 /* inner */ + 2 } y`;\n";
        let start = src.find("/*").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Block, start, start + 11)]);
    }

    #[test]
    fn nested_template_in_substitution() {
        let src = "const t = `a ${ `b ${ c // tail\n } d` } e`;\n";
        let start = src.find("//").unwrap();
        let end = src[start..].find('\n').unwrap() + start;
        assert_eq!(spans(src), vec![(CommentKind::Line, start, end)]);
    }

    #[test]
    fn braces_in_substitution_are_balanced() {
        let src = "const t = `v ${ { a: 1 } } w`; // tail";
        let start = src.find("//").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Line, start, src.len())]);
    }

    #[test]
    fn regex_literal_hides_markers() {
        let src = "const re = /a\\/\\/b/; // real\n";
        let start = src.find("// real").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Line, start, src.len() - 1)]);
    }

    #[test]
    fn regex_character_class_may_contain_slash() {
        let src = "const re = /[/]/; /* ok */\n";
        let start = src.find("/*").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Block, start, start + 8)]);
    }

    #[test]
    fn division_is_not_a_regex() {
        let src = "const x = a / b / c; // tail\n";
        let start = src.find("//").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Line, start, src.len() - 1)]);
    }

    #[test]
    fn regex_after_return_keyword() {
        let src = "function f() { return /ab/.test(s); } // tail\n";
        let start = src.find("//").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Line, start, src.len() - 1)]);
    }

    #[test]
    fn line_comment_at_eof_without_newline() {
        let src = "let x = 1; // tail";
        assert_eq!(spans(src), vec![(CommentKind::Line, 11, src.len())]);
    }

    #[test]
    fn block_comment_spanning_lines() {
        let src = "a();\n/*\n * doc\n */\nb();\n";
        assert_eq!(spans(src), vec![(CommentKind::Block, 5, 18)]);
    }

    #[test]
    fn unterminated_block_comment_errors() {
        let err = scan_comments("let x = 1; /* oops\n").unwrap_err();
        assert_eq!(err, ScanError::UnterminatedBlockComment { offset: 11 });
    }

    #[test]
    fn unterminated_string_errors() {
        let err = scan_comments("const s = \"oops\n").unwrap_err();
        assert_eq!(err, ScanError::UnterminatedString { offset: 10 });
    }

    #[test]
    fn unterminated_template_errors() {
        let err = scan_comments("const t = `oops").unwrap_err();
        assert_eq!(err, ScanError::UnterminatedTemplate { offset: 10 });
    }

    #[test]
    fn unicode_content_is_handled() {
        let src = "const s = \"héllo wörld\"; // αβγ\n";
        let start = src.find("//").unwrap();
        assert_eq!(spans(src), vec![(CommentKind::Line, start, src.len() - 1)]);
    }
}
