use std::ops::Range;

/// How a comment terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// Runs to the end of its physical line.
    Line,
    /// Explicitly delimited; may span lines or sit inline with code.
    Block,
}

/// A single comment located in the original source text.
///
/// The span is a half-open byte range `[start, end)` into the text the
/// comment was scanned from. Offsets must fall on character boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub span: Range<usize>,
}

impl Comment {
    pub fn new(kind: CommentKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// Cleanup policy applied around excision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Classify every line's code/comment occupancy up front, excise all
    /// spans uniformly, then drop comment-only lines that ended up blank.
    /// Handles multi-line block comments without leaving orphan blank lines.
    #[default]
    LineContext,
    /// Per-comment trimming only: a line comment with nothing but whitespace
    /// before it takes its whole line, block comments are plain deletions.
    SimpleTrim,
}

/// Rejected comment descriptors. Spans are never clamped; a bad span means
/// the input is not trustworthy enough to rewrite.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoveError {
    #[error("comment span [{start},{end}) out of bounds for source of length {len}")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    #[error("invalid comment span: start {start} > end {end}")]
    InvalidSpan { start: usize, end: usize },

    #[error("comment span [{start},{end}) does not fall on character boundaries")]
    SpanNotOnCharBoundary { start: usize, end: usize },

    #[error("overlapping comment spans: [{a_start},{a_end}) overlaps [{b_start},{b_end})")]
    OverlappingSpans {
        a_start: usize,
        a_end: usize,
        b_start: usize,
        b_end: usize,
    },
}

/// Remove `comments` from `source` and tidy the result.
///
/// Spans are interpreted against the original, unmodified text and excised
/// back to front, so no unprocessed span is ever invalidated by an earlier
/// deletion. Regardless of policy, a final pass caps consecutive blank lines
/// at one; the cap applies to the whole result, including blank runs that
/// predate comment removal.
///
/// Lines are `\n`-terminated; a CR before the terminator is ordinary line
/// content (it counts as whitespace, so CRLF input behaves as expected).
pub fn remove_comments(
    source: &str,
    comments: &[Comment],
    policy: Policy,
) -> Result<String, RemoveError> {
    if comments.is_empty() {
        return Ok(source.to_string());
    }

    let mut sorted: Vec<&Comment> = comments.iter().collect();
    sorted.sort_by_key(|c| (c.span.start, c.span.end));
    validate_spans(source, &sorted)?;

    let text = match policy {
        Policy::LineContext => remove_line_context(source, &sorted),
        Policy::SimpleTrim => remove_simple_trim(source, &sorted),
    };

    Ok(collapse_blank_runs(&text))
}

/// Check bounds, boundaries and overlap. `sorted` must be in ascending
/// start order.
fn validate_spans(source: &str, sorted: &[&Comment]) -> Result<(), RemoveError> {
    let mut prev: Option<Range<usize>> = None;

    for c in sorted {
        let (start, end) = (c.span.start, c.span.end);

        if start > end {
            return Err(RemoveError::InvalidSpan { start, end });
        }
        if end > source.len() {
            return Err(RemoveError::SpanOutOfBounds {
                start,
                end,
                len: source.len(),
            });
        }
        if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
            return Err(RemoveError::SpanNotOnCharBoundary { start, end });
        }
        if let Some(p) = &prev
            && start < p.end
        {
            return Err(RemoveError::OverlappingSpans {
                a_start: p.start,
                a_end: p.end,
                b_start: start,
                b_end: end,
            });
        }

        if prev.as_ref().is_none_or(|p| end > p.end) {
            prev = Some(start..end);
        }
    }

    Ok(())
}

/// Per-line occupancy, computed over the original text before any excision.
#[derive(Debug, Clone, Copy, Default)]
struct LineCtx {
    has_comment: bool,
    has_code: bool,
}

fn remove_line_context(source: &str, sorted: &[&Comment]) -> String {
    let line_starts = line_starts(source);
    let (ctx, joined) = classify_lines(source, &line_starts, sorted);

    // Uniform excision for every kind; back to front keeps earlier offsets
    // stable.
    let mut text = source.to_string();
    for c in sorted.iter().rev() {
        text.replace_range(c.span.clone(), "");
    }

    // Lines whose terminator sat inside a removed span have merged with the
    // following line; fold their contexts the same way before matching them
    // up with the excised text.
    let merged = merge_joined(&ctx, &joined);

    let mut out = String::with_capacity(text.len());
    for (chunk, lc) in text.split_inclusive('\n').zip(&merged) {
        if lc.has_comment && !lc.has_code && chunk.trim().is_empty() {
            continue;
        }
        out.push_str(chunk);
    }
    out
}

/// Classify every physical line of `source`.
///
/// Returns one `LineCtx` per line plus, for each line, whether the
/// terminator of the *previous* line lies inside a comment span (meaning
/// excision will merge the two lines).
fn classify_lines(
    source: &str,
    line_starts: &[usize],
    sorted: &[&Comment],
) -> (Vec<LineCtx>, Vec<bool>) {
    let mut ctx = vec![LineCtx::default(); line_starts.len()];
    let mut joined = vec![false; line_starts.len()];

    let mut spans = sorted
        .iter()
        .map(|c| c.span.clone())
        .filter(|s| s.start < s.end)
        .peekable();

    let mut line = 0usize;
    for (i, ch) in source.char_indices() {
        while line + 1 < line_starts.len() && line_starts[line + 1] <= i {
            line += 1;
        }
        while spans.peek().is_some_and(|s| s.end <= i) {
            spans.next();
        }
        let in_comment = spans.peek().is_some_and(|s| s.start <= i);

        if in_comment {
            if ch == '\n' {
                joined[line + 1] = true;
            }
        } else if !ch.is_whitespace() {
            ctx[line].has_code = true;
        }
    }

    for c in sorted {
        if c.span.start >= c.span.end {
            continue;
        }
        let first = line_of(line_starts, c.span.start);
        let last = line_of(line_starts, c.span.end - 1);
        for lc in &mut ctx[first..=last] {
            lc.has_comment = true;
        }
    }

    (ctx, joined)
}

/// Fold line contexts together wherever excision merged two physical lines.
fn merge_joined(ctx: &[LineCtx], joined: &[bool]) -> Vec<LineCtx> {
    let mut out: Vec<LineCtx> = Vec::with_capacity(ctx.len());
    for (i, lc) in ctx.iter().enumerate() {
        if i > 0
            && joined[i]
            && let Some(last) = out.last_mut()
        {
            last.has_comment |= lc.has_comment;
            last.has_code |= lc.has_code;
        } else {
            out.push(*lc);
        }
    }
    out
}

fn remove_simple_trim(source: &str, sorted: &[&Comment]) -> String {
    let mut text = source.to_string();

    for c in sorted.iter().rev() {
        let (start, end) = (c.span.start, c.span.end);

        if c.kind == CommentKind::Block || start == end {
            text.replace_range(start..end, "");
            continue;
        }

        // Enclosing physical line. Text before `end` is still in original
        // coordinates; anything already excised lies strictly after it.
        let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);

        if text[line_start..start].trim().is_empty() {
            // The whole line is the comment: take one adjacent terminator
            // with it so no blank line is left behind.
            if line_start == 0 {
                let del_end = (line_end + 1).min(text.len());
                text.replace_range(0..del_end, "");
            } else {
                text.replace_range(line_start - 1..line_end, "");
            }
        } else {
            text.replace_range(start..end, "");
        }
    }

    text
}

/// Cap every run of consecutive `\n` at two (at most one blank line).
/// Idempotent.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;

    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                out.push(ch);
            }
        } else {
            run = 0;
            out.push(ch);
        }
    }

    out
}

/// Byte offsets where each line starts: `0`, then `i + 1` for every `\n`.
fn line_starts(s: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    for (i, b) in s.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Index of the line containing byte `offset`.
fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&s| s <= offset) - 1
}
