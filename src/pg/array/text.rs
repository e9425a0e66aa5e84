//! Text format of arrays.
//!
//! ```text
//! array      := [boundSpec+ '='] body
//! boundSpec  := '[' INTEGER [':' INTEGER] ']'
//! body       := '{' '}' | '{' itemOrBody (',' itemOrBody)* '}'
//! itemOrBody := body | item
//! item       := 'NULL' | quotedString | bareString
//! ```
//!
//! Only an unquoted `NULL` is an SQL NULL; `"NULL"` is the four-character string.
//! Reference: https://www.postgresql.org/docs/current/arrays.html#ARRAYS-IO

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use super::{check_shape, dim_elem_counts, element_count, ArrayDimension, DimVec, MAX_DIMENSIONS};
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{IsNull, Transcoder};

/// Result of parsing an array literal, before element decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntypedTextArray<'a> {
    /// Element texts in row-major order; `None` marks an unquoted `NULL`.
    pub elements: Vec<Option<Cow<'a, str>>>,
    pub dimensions: Vec<ArrayDimension>,
}

/// Parse an array literal such as `{{1,2},{3,4}}` or `[0:1]={a,b}`.
pub fn parse_text_array(src: &str) -> Result<UntypedTextArray<'_>> {
    TextArrayParser::new(src).parse()
}

/// Whitespace as the server's array parser defines it.
#[inline]
fn is_array_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn malformed(msg: String) -> CodecError {
    CodecError::MalformedArrayError(msg)
}

struct TextArrayParser<'a> {
    src: &'a str,
    pos: usize,
    elements: Vec<Option<Cow<'a, str>>>,
    /// Sub-array length seen at each nesting depth.
    shape: DimVec<Option<usize>>,
    /// Depth at which plain elements live, once known.
    leaf_depth: Option<usize>,
}

impl<'a> TextArrayParser<'a> {
    fn new(src: &'a str) -> Self {
        TextArrayParser {
            src,
            pos: 0,
            elements: Vec::new(),
            shape: DimVec::new(),
            leaf_depth: None,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_array_space) {
            self.bump();
        }
    }

    fn expect(&mut self, want: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == want => {
                self.bump();
                Ok(())
            }
            Some(b) => Err(malformed(format!(
                "expected '{}' at offset {}, found '{}'",
                want as char, self.pos, b as char
            ))),
            None => Err(malformed(format!(
                "expected '{}' at offset {}, found end of input",
                want as char, self.pos
            ))),
        }
    }

    fn parse(mut self) -> Result<UntypedTextArray<'a>> {
        self.skip_whitespace();
        let explicit = self.parse_bounds()?;
        self.skip_whitespace();
        self.parse_body(0)?;
        self.skip_whitespace();

        if self.pos < self.src.len() {
            return Err(malformed(format!(
                "unexpected trailing data at offset {}",
                self.pos
            )));
        }

        if self.elements.is_empty() {
            if !explicit.is_empty() {
                return Err(malformed(format!(
                    "{} dimension bounds given for an empty array",
                    explicit.len()
                )));
            }
            return Ok(UntypedTextArray {
                elements: Vec::new(),
                dimensions: Vec::new(),
            });
        }

        let mut inferred = Vec::with_capacity(self.shape.len());
        for len in &self.shape {
            let len = len.unwrap_or(0);
            let length = i32::try_from(len)
                .map_err(|_| malformed(format!("dimension length {} is too large", len)))?;
            inferred.push(ArrayDimension {
                length,
                lower_bound: 1,
            });
        }

        let dimensions = if explicit.is_empty() {
            inferred
        } else {
            if explicit.len() != inferred.len() {
                return Err(malformed(format!(
                    "{} dimension bounds given for {} dimensions",
                    explicit.len(),
                    inferred.len()
                )));
            }
            for (bound, dim) in explicit.iter().zip(&inferred) {
                if bound.length != dim.length {
                    return Err(malformed(format!(
                        "bounds [{}:{}] do not match a dimension of {} elements",
                        bound.lower_bound,
                        bound.upper_bound(),
                        dim.length
                    )));
                }
            }
            explicit.into_vec()
        };

        Ok(UntypedTextArray {
            elements: self.elements,
            dimensions,
        })
    }

    fn parse_bounds(&mut self) -> Result<DimVec<ArrayDimension>> {
        let mut bounds = DimVec::new();

        while self.peek() == Some(b'[') {
            if bounds.len() == MAX_DIMENSIONS {
                return Err(malformed(format!(
                    "more than {} dimension bounds",
                    MAX_DIMENSIONS
                )));
            }
            self.bump();
            let first = self.parse_integer()?;
            let (lower, upper) = if self.peek() == Some(b':') {
                self.bump();
                (first, self.parse_integer()?)
            } else {
                (1, first)
            };
            self.expect(b']')?;

            let length = i64::from(upper) - i64::from(lower) + 1;
            let length = i32::try_from(length)
                .ok()
                .filter(|l| *l >= 0)
                .ok_or_else(|| {
                    malformed(format!(
                        "upper bound {} is out of range for lower bound {}",
                        upper, lower
                    ))
                })?;
            bounds.push(ArrayDimension {
                length,
                lower_bound: lower,
            });
            self.skip_whitespace();
        }

        if !bounds.is_empty() {
            self.expect(b'=')?;
        }
        Ok(bounds)
    }

    fn parse_integer(&mut self) -> Result<i32> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.bump();
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
        let digits = &self.src[start..self.pos];
        digits.parse::<i32>().map_err(|_| {
            malformed(format!(
                "invalid dimension bound '{}' at offset {}",
                digits, start
            ))
        })
    }

    fn parse_body(&mut self, depth: usize) -> Result<()> {
        if depth == MAX_DIMENSIONS {
            return Err(malformed(format!(
                "more than {} nested dimensions",
                MAX_DIMENSIONS
            )));
        }
        self.expect(b'{')?;
        self.skip_whitespace();

        if self.peek() == Some(b'}') {
            self.bump();
            if depth > 0 {
                return Err(malformed(format!(
                    "empty sub-array at offset {}",
                    self.pos - 1
                )));
            }
            return Ok(());
        }

        let mut count = 0usize;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'{') => {
                    if self.leaf_depth.is_some_and(|leaf| depth >= leaf) {
                        return Err(malformed(format!(
                            "nesting depth varies at offset {}",
                            self.pos
                        )));
                    }
                    self.parse_body(depth + 1)?;
                }
                Some(_) => {
                    match self.leaf_depth {
                        None => self.leaf_depth = Some(depth),
                        Some(leaf) if leaf != depth => {
                            return Err(malformed(format!(
                                "nesting depth varies at offset {}",
                                self.pos
                            )));
                        }
                        Some(_) => {}
                    }
                    let item = self.parse_item()?;
                    self.elements.push(item);
                }
                None => return Err(malformed("unexpected end of input".to_string())),
            }
            count += 1;

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b'}') => {
                    self.bump();
                    break;
                }
                Some(b) => {
                    return Err(malformed(format!(
                        "expected ',' or '}}' at offset {}, found '{}'",
                        self.pos, b as char
                    )))
                }
                None => return Err(malformed("unexpected end of input".to_string())),
            }
        }

        if self.shape.len() <= depth {
            self.shape.resize(depth + 1, None);
        }
        match self.shape[depth] {
            None => self.shape[depth] = Some(count),
            Some(seen) if seen != count => {
                return Err(malformed(format!(
                    "sub-arrays at depth {} have lengths {} and {}",
                    depth + 1,
                    seen,
                    count
                )));
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn parse_item(&mut self) -> Result<Option<Cow<'a, str>>> {
        if self.peek() == Some(b'"') {
            return self.parse_quoted().map(Some);
        }
        self.parse_bare()
    }

    fn parse_quoted(&mut self) -> Result<Cow<'a, str>> {
        let open = self.pos;
        self.bump();

        // Backslash and quote are ASCII, so byte scanning never splits a
        // multi-byte character.
        let mut seg_start = self.pos;
        let mut owned: Option<String> = None;
        loop {
            match self.peek() {
                None => {
                    return Err(malformed(format!(
                        "unterminated quoted element starting at offset {}",
                        open
                    )))
                }
                Some(b'"') => {
                    let tail = &self.src[seg_start..self.pos];
                    self.bump();
                    return Ok(match owned {
                        Some(mut s) => {
                            s.push_str(tail);
                            Cow::Owned(s)
                        }
                        None => Cow::Borrowed(tail),
                    });
                }
                Some(b'\\') => {
                    owned
                        .get_or_insert_with(String::new)
                        .push_str(&self.src[seg_start..self.pos]);
                    self.bump();
                    if self.peek().is_none() {
                        return Err(malformed(format!(
                            "unterminated quoted element starting at offset {}",
                            open
                        )));
                    }
                    // the escaped byte opens the next segment
                    seg_start = self.pos;
                    self.bump();
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn parse_bare(&mut self) -> Result<Option<Cow<'a, str>>> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b',' | b'}' => break,
                b'"' | b'{' => {
                    return Err(malformed(format!(
                        "unexpected '{}' in unquoted element at offset {}",
                        b as char, self.pos
                    )))
                }
                _ => self.bump(),
            }
        }

        let raw = self.src[start..self.pos].trim_end_matches(|c: char| c.is_ascii() && is_array_space(c as u8));
        if raw.is_empty() {
            return Err(malformed(format!(
                "empty unquoted element at offset {}",
                start
            )));
        }
        if raw == "NULL" {
            return Ok(None);
        }
        Ok(Some(Cow::Borrowed(raw)))
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Whether an element's text must be quoted to survive the parser.
fn needs_quoting(src: &[u8]) -> bool {
    src.is_empty()
        || src.eq_ignore_ascii_case(b"NULL")
        || src
            .iter()
            .any(|&b| matches!(b, b',' | b'{' | b'}' | b'"' | b'\\') || is_array_space(b))
}

/// Append one element's text, quoting and escaping it when needed.
pub fn put_array_element(buf: &mut BytesMut, src: &[u8]) {
    if !needs_quoting(src) {
        buf.put_slice(src);
        return;
    }

    buf.reserve(src.len() + 2);
    buf.put_u8(b'"');
    for &b in src {
        if b == b'"' || b == b'\\' {
            buf.put_u8(b'\\');
        }
        buf.put_u8(b);
    }
    buf.put_u8(b'"');
}

/// Append the `[lo:hi]...=` prefix when any lower bound differs from 1.
pub fn put_dimension_bounds(buf: &mut BytesMut, dimensions: &[ArrayDimension]) {
    if dimensions.iter().all(|d| d.lower_bound == 1) {
        return;
    }

    for dim in dimensions {
        buf.put_slice(format!("[{}:{}]", dim.lower_bound, dim.upper_bound()).as_bytes());
    }
    buf.put_u8(b'=');
}

/// Append the text form of a flattened array.
pub fn encode_text_elements<E: Transcoder>(
    ci: &TypeRegistry,
    buf: &mut BytesMut,
    dimensions: &[ArrayDimension],
    elements: &[E],
) -> Result<()> {
    check_shape(dimensions, elements.len())?;
    if element_count(dimensions)? == 0 {
        buf.put_slice(b"{}");
        return Ok(());
    }

    put_dimension_bounds(buf, dimensions);
    let counts = dim_elem_counts(dimensions);

    let mut elem_buf = BytesMut::with_capacity(32);
    for (i, elem) in elements.iter().enumerate() {
        if i > 0 {
            buf.put_u8(b',');
        }
        for &m in &counts {
            if i % m == 0 {
                buf.put_u8(b'{');
            }
        }

        elem_buf.clear();
        match elem.encode_text(ci, &mut elem_buf)? {
            IsNull::Yes => buf.put_slice(b"NULL"),
            IsNull::No => put_array_element(buf, &elem_buf),
        }

        for &m in &counts {
            if (i + 1) % m == 0 {
                buf.put_u8(b'}');
            }
        }
    }
    Ok(())
}
