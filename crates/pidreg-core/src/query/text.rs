//! Free-text query syntax: tokenizer, parser, field alias rewrite, and
//! rendering back to the backend's query-string dialect.
//!
//! Dialect operators (ranges, comparisons, wildcards, fuzzy and proximity
//! modifiers, boosts) parse into typed nodes and render as operators. On
//! output only `/` and characters the caller escaped are escaped.

use thiserror::Error as ThisError;

// Longest accepted free-text query, in characters.
const MAX_QUERY_LEN: usize = 4 * 1024;

// Characters that end or reshape a bare word. Literal occurrences in a term
// can only come from an escape, so rendering escapes them again.
const WORD_SYNTAX: &[char] = &[
    '\\', '/', ':', '(', ')', '"', '*', '?', '~', '^', '[', ']', '{', '}',
];

// Characters that act as operators only at the start of a word.
const LEADING_SYNTAX: &[char] = &['-', '+', '!', '>', '<'];

// Largest edit distance the backend accepts on a fuzzy term.
const MAX_FUZZY_EDITS: u8 = 2;

/// Caller-facing field names rewritten to index field paths.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("publicationYear", "publication_year"),
    ("relatedIdentifiers", "related_identifiers"),
    ("relatedItems", "related_items"),
    ("rightsList", "rights_list"),
    ("fundingReferences", "funding_references"),
    ("geoLocations", "geo_locations"),
    ("version", "version_info"),
    ("landingPage", "landing_page"),
    ("contentUrl", "content_url"),
    ("citationCount", "citation_count"),
    ("viewCount", "view_count"),
    ("downloadCount", "download_count"),
];

///
/// QuerySyntaxError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QuerySyntaxError {
    #[error("query exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("unterminated quoted phrase starting at position {position}")]
    UnbalancedQuote { position: usize },

    #[error("unmatched parenthesis at position {position}")]
    UnbalancedParen { position: usize },

    #[error("operator {operator} at position {position} is missing an operand")]
    DanglingOperator { operator: String, position: usize },

    #[error("empty field name before ':' at position {position}")]
    EmptyField { position: usize },

    #[error("field {field} at position {position} is missing a value")]
    MissingFieldValue { field: String, position: usize },

    #[error("trailing escape character at position {position}")]
    TrailingEscape { position: usize },

    #[error("malformed range at position {position}, expected [from TO to]")]
    MalformedRange { position: usize },

    #[error("invalid modifier {modifier} at position {position}")]
    InvalidModifier { modifier: String, position: usize },
}

///
/// Comparison
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

///
/// RangeEnd
///
/// One side of a range. `value` is `None` for an open `*` end.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeEnd {
    pub value: Option<String>,
    pub inclusive: bool,
}

impl RangeEnd {
    fn render(&self) -> &str {
        self.value.as_deref().unwrap_or("*")
    }
}

///
/// TextQuery
///
/// Parsed free-text query. Bare sequences combine with AND.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TextQuery {
    Term(String),
    Prefix(String),
    /// Pattern in dialect form: unescaped `*` and `?` are wildcards.
    Wildcard(String),
    /// `None` edits lets the backend pick a distance from the term length.
    Fuzzy { term: String, edits: Option<u8> },
    Phrase(String),
    Proximity { phrase: String, slop: u32 },
    Range { lower: RangeEnd, upper: RangeEnd },
    Compare { op: Comparison, value: String },
    Exists(String),
    Field { field: String, query: Box<Self> },
    Boost { query: Box<Self>, factor: String },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl TextQuery {
    /// Rewrite caller-facing field aliases to index field paths.
    #[must_use]
    pub fn rewrite_fields(self) -> Self {
        match self {
            Self::Field { field, query } => Self::Field {
                field: alias_for(&field),
                query: Box::new(query.rewrite_fields()),
            },
            Self::Exists(field) => Self::Exists(alias_for(&field)),
            Self::Boost { query, factor } => Self::Boost {
                query: Box::new(query.rewrite_fields()),
                factor,
            },
            Self::And(items) => Self::And(items.into_iter().map(Self::rewrite_fields).collect()),
            Self::Or(items) => Self::Or(items.into_iter().map(Self::rewrite_fields).collect()),
            Self::Not(inner) => Self::Not(Box::new(inner.rewrite_fields())),
            other => other,
        }
    }

    /// Render in the backend query-string dialect.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Term(term) => escape(term),
            Self::Prefix(stem) => format!("{}*", escape(stem)),
            Self::Wildcard(pattern) => pattern.clone(),
            Self::Fuzzy { term, edits } => match edits {
                Some(edits) => format!("{}~{edits}", escape(term)),
                None => format!("{}~", escape(term)),
            },
            Self::Phrase(phrase) => quote(phrase),
            Self::Proximity { phrase, slop } => format!("{}~{slop}", quote(phrase)),
            Self::Range { lower, upper } => format!(
                "{}{} TO {}{}",
                if lower.inclusive { '[' } else { '{' },
                lower.render(),
                upper.render(),
                if upper.inclusive { ']' } else { '}' },
            ),
            Self::Compare { op, value } => format!("{}{}", op.as_str(), escape_from(value, false)),
            Self::Exists(field) => format!("{field}:*"),
            Self::Field { field, query } => format!("{field}:{}", grouped(query)),
            Self::Boost { query, factor } => format!("{}^{factor}", grouped(query)),
            Self::And(items) => join(items, " AND "),
            Self::Or(items) => join(items, " OR "),
            Self::Not(inner) => format!("NOT {}", inner.render()),
        }
    }
}

// Boolean operands need parentheses when nested under another operator.
fn grouped(query: &TextQuery) -> String {
    match query {
        TextQuery::And(_) | TextQuery::Or(_) => format!("({})", query.render()),
        other => other.render(),
    }
}

fn join(items: &[TextQuery], sep: &str) -> String {
    items.iter().map(grouped).collect::<Vec<_>>().join(sep)
}

fn quote(phrase: &str) -> String {
    format!("\"{}\"", phrase.replace('\\', "\\\\").replace('"', "\\\""))
}

fn escape(term: &str) -> String {
    // a literal operator word must not read back as the operator
    if matches!(term, "AND" | "OR" | "NOT" | "&&" | "||") {
        return format!("\\{term}");
    }
    escape_from(term, true)
}

fn escape_from(term: &str, leading: bool) -> String {
    let mut out = String::with_capacity(term.len() + 4);
    for (idx, ch) in term.chars().enumerate() {
        if needs_escape(ch, leading && idx == 0) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn needs_escape(ch: char, leading: bool) -> bool {
    ch.is_whitespace() || WORD_SYNTAX.contains(&ch) || (leading && LEADING_SYNTAX.contains(&ch))
}

fn alias_for(field: &str) -> String {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == field)
        .map_or_else(|| field.to_string(), |(_, path)| (*path).to_string())
}

/// Parse a free-text query. Blank input yields `None`.
pub fn parse(input: &str) -> Result<Option<TextQuery>, QuerySyntaxError> {
    let len = input.chars().count();
    if len > MAX_QUERY_LEN {
        return Err(QuerySyntaxError::TooLong {
            len,
            max: MAX_QUERY_LEN,
        });
    }

    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut parser = Parser { tokens, cursor: 0 };
    let query = parser.parse_or()?;

    match parser.peek() {
        None => Ok(Some(query)),
        Some(Spanned {
            token: Token::Close,
            position,
        }) => Err(QuerySyntaxError::UnbalancedParen {
            position: *position,
        }),
        // parse_or only stops at `)` or end of input
        Some(other) => Err(QuerySyntaxError::DanglingOperator {
            operator: other.token.label(),
            position: other.position,
        }),
    }
}

///
/// Tokens
///

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Word { text: String, prefix: bool },
    Wildcard(String),
    Phrase(String),
    Range { lower: RangeEnd, upper: RangeEnd },
    Compare { op: Comparison, value: String },
    Field(String),
    Tilde(String),
    Caret(String),
    Open,
    Close,
    And,
    Or,
    Not,
}

impl Token {
    fn label(&self) -> String {
        match self {
            Self::Word { text, .. } => text.clone(),
            Self::Wildcard(pattern) => pattern.clone(),
            Self::Phrase(text) => format!("\"{text}\""),
            Self::Range { lower, upper } => format!("[{} TO {}]", lower.render(), upper.render()),
            Self::Compare { op, value } => format!("{}{value}", op.as_str()),
            Self::Field(field) => format!("{field}:"),
            Self::Tilde(raw) => format!("~{raw}"),
            Self::Caret(raw) => format!("^{raw}"),
            Self::Open => "(".to_string(),
            Self::Close => ")".to_string(),
            Self::And => "AND".to_string(),
            Self::Or => "OR".to_string(),
            Self::Not => "NOT".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    position: usize,
}

// A word character and whether it was escaped.
type Piece = (char, bool);

fn tokenize(input: &str) -> Result<Vec<Spanned>, QuerySyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        let position = idx + 1;

        match ch {
            c if c.is_whitespace() => idx += 1,
            '(' => {
                tokens.push(Spanned { token: Token::Open, position });
                idx += 1;
            }
            ')' => {
                tokens.push(Spanned { token: Token::Close, position });
                idx += 1;
            }
            '"' => {
                let (phrase, next) = read_phrase(&chars, idx)?;
                tokens.push(Spanned { token: Token::Phrase(phrase), position });
                idx = next;
            }
            '[' | '{' => {
                let (token, next) = read_range(&chars, idx)?;
                tokens.push(Spanned { token, position });
                idx = next;
            }
            '~' | '^' => {
                let (raw, next) = read_number(&chars, idx + 1);
                let token = if ch == '~' { Token::Tilde(raw) } else { Token::Caret(raw) };
                tokens.push(Spanned { token, position });
                idx = next;
            }
            '+' if idx + 1 < chars.len() && !chars[idx + 1].is_whitespace() => idx += 1,
            '-' | '!' if idx + 1 < chars.len() && !chars[idx + 1].is_whitespace() => {
                tokens.push(Spanned { token: Token::Not, position });
                idx += 1;
            }
            _ => {
                let next = read_word(&chars, idx, &mut tokens)?;
                idx = next;
            }
        }
    }

    Ok(tokens)
}

fn read_phrase(chars: &[char], start: usize) -> Result<(String, usize), QuerySyntaxError> {
    let mut phrase = String::new();
    let mut idx = start + 1;

    while idx < chars.len() {
        match chars[idx] {
            '\\' if idx + 1 < chars.len() => {
                phrase.push(chars[idx + 1]);
                idx += 2;
            }
            '"' => return Ok((phrase, idx + 1)),
            other => {
                phrase.push(other);
                idx += 1;
            }
        }
    }

    Err(QuerySyntaxError::UnbalancedQuote {
        position: start + 1,
    })
}

// `[` and `]` are inclusive, `{` and `}` exclusive; the two ends may mix.
fn read_range(chars: &[char], start: usize) -> Result<(Token, usize), QuerySyntaxError> {
    let malformed = || QuerySyntaxError::MalformedRange {
        position: start + 1,
    };
    let Some(offset) = chars[start + 1..].iter().position(|c| matches!(c, ']' | '}')) else {
        return Err(malformed());
    };
    let close = start + 1 + offset;

    let body: String = chars[start + 1..close].iter().collect();
    let parts: Vec<&str> = body.split_whitespace().collect();
    let [from, "TO", to] = parts.as_slice() else {
        return Err(malformed());
    };

    let end = |raw: &str, inclusive: bool| RangeEnd {
        value: (raw != "*").then(|| raw.to_string()),
        inclusive,
    };
    let token = Token::Range {
        lower: end(*from, chars[start] == '['),
        upper: end(*to, chars[close] == ']'),
    };

    Ok((token, close + 1))
}

fn read_number(chars: &[char], start: usize) -> (String, usize) {
    let end = chars[start..]
        .iter()
        .position(|c| !(c.is_ascii_digit() || *c == '.'))
        .map_or(chars.len(), |offset| start + offset);

    (chars[start..end].iter().collect(), end)
}

// Reads one bare word, splitting off unescaped `field:` qualifiers and a
// leading comparison operator.
fn read_word(
    chars: &[char],
    start: usize,
    tokens: &mut Vec<Spanned>,
) -> Result<usize, QuerySyntaxError> {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut comparison = None;
    let mut idx = start;
    let mut word_start = start;

    while idx < chars.len() {
        let ch = chars[idx];
        if ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '~' | '^') {
            break;
        }
        let fresh = pieces.is_empty() && comparison.is_none();

        match ch {
            '[' | '{' if fresh => break,
            '>' | '<' if fresh => {
                let inclusive = chars.get(idx + 1) == Some(&'=');
                comparison = Some(match (ch, inclusive) {
                    ('>', false) => Comparison::Gt,
                    ('>', true) => Comparison::Gte,
                    ('<', false) => Comparison::Lt,
                    _ => Comparison::Lte,
                });
                idx += if inclusive { 2 } else { 1 };
            }
            '\\' => {
                let Some(escaped) = chars.get(idx + 1) else {
                    return Err(QuerySyntaxError::TrailingEscape { position: idx + 1 });
                };
                pieces.push((*escaped, true));
                idx += 2;
            }
            ':' if comparison.is_none() => {
                if pieces.is_empty() {
                    return Err(QuerySyntaxError::EmptyField { position: idx + 1 });
                }
                tokens.push(Spanned {
                    token: Token::Field(literal(&pieces)),
                    position: word_start + 1,
                });
                pieces.clear();
                idx += 1;
                word_start = idx;
            }
            other => {
                pieces.push((other, false));
                idx += 1;
            }
        }
    }

    let position = word_start + 1;
    if let Some(op) = comparison {
        if pieces.is_empty() {
            return Err(QuerySyntaxError::DanglingOperator {
                operator: op.as_str().to_string(),
                position,
            });
        }
        tokens.push(Spanned {
            token: Token::Compare {
                op,
                value: literal(&pieces),
            },
            position,
        });
    } else if !pieces.is_empty() {
        tokens.push(Spanned {
            token: classify(&pieces),
            position,
        });
    }

    Ok(idx)
}

fn classify(pieces: &[Piece]) -> Token {
    let text = literal(pieces);
    if pieces.iter().all(|(_, escaped)| !escaped) {
        match text.as_str() {
            "AND" | "&&" => return Token::And,
            "OR" | "||" => return Token::Or,
            "NOT" => return Token::Not,
            _ => {}
        }
    }

    let wildcards = pieces.iter().filter(|piece| is_wildcard(piece)).count();
    let trailing_star = pieces.last().is_some_and(|&(ch, escaped)| ch == '*' && !escaped);

    match wildcards {
        0 => Token::Word { text, prefix: false },
        1 if trailing_star && pieces.len() > 1 => Token::Word {
            text: literal(&pieces[..pieces.len() - 1]),
            prefix: true,
        },
        _ => Token::Wildcard(pattern(pieces)),
    }
}

const fn is_wildcard(piece: &Piece) -> bool {
    !piece.1 && matches!(piece.0, '*' | '?')
}

fn literal(pieces: &[Piece]) -> String {
    pieces.iter().map(|(ch, _)| *ch).collect()
}

fn pattern(pieces: &[Piece]) -> String {
    let mut out = String::with_capacity(pieces.len() + 4);
    for (idx, piece) in pieces.iter().enumerate() {
        if !is_wildcard(piece) && needs_escape(piece.0, idx == 0) {
            out.push('\\');
        }
        out.push(piece.0);
    }
    out
}

///
/// Parser
///
/// Recursive descent over the token stream. OR binds loosest, then AND
/// (explicit or implied by adjacency), then NOT, then postfix modifiers.
///

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.cursor).cloned();
        self.cursor += 1;
        token
    }

    fn parse_or(&mut self) -> Result<TextQuery, QuerySyntaxError> {
        let mut items = vec![self.parse_and()?];

        while let Some(Spanned {
            token: Token::Or,
            position,
        }) = self.peek().cloned()
        {
            self.cursor += 1;
            if self.at_operand_end() {
                return Err(QuerySyntaxError::DanglingOperator {
                    operator: "OR".to_string(),
                    position,
                });
            }
            items.push(self.parse_and()?);
        }

        Ok(collapse(items, TextQuery::Or))
    }

    fn parse_and(&mut self) -> Result<TextQuery, QuerySyntaxError> {
        let mut items = vec![self.parse_unary()?];

        loop {
            match self.peek().cloned() {
                Some(Spanned {
                    token: Token::And,
                    position,
                }) => {
                    self.cursor += 1;
                    if self.at_operand_end() {
                        return Err(QuerySyntaxError::DanglingOperator {
                            operator: "AND".to_string(),
                            position,
                        });
                    }
                    items.push(self.parse_unary()?);
                }
                Some(Spanned {
                    token: Token::Or | Token::Close,
                    ..
                })
                | None => break,
                Some(_) => items.push(self.parse_unary()?),
            }
        }

        Ok(collapse(items, TextQuery::And))
    }

    fn parse_unary(&mut self) -> Result<TextQuery, QuerySyntaxError> {
        match self.peek().cloned() {
            Some(Spanned {
                token: Token::Not,
                position,
            }) => {
                self.cursor += 1;
                if self.at_operand_end() {
                    return Err(QuerySyntaxError::DanglingOperator {
                        operator: "NOT".to_string(),
                        position,
                    });
                }
                Ok(TextQuery::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<TextQuery, QuerySyntaxError> {
        let mut query = self.parse_primary()?;

        loop {
            query = match self.peek().cloned() {
                Some(Spanned {
                    token: Token::Tilde(raw),
                    position,
                }) => {
                    self.cursor += 1;
                    with_tilde(query, &raw, position)?
                }
                Some(Spanned {
                    token: Token::Caret(raw),
                    position,
                }) => {
                    self.cursor += 1;
                    with_boost(query, raw, position)?
                }
                _ => return Ok(query),
            };
        }
    }

    fn parse_primary(&mut self) -> Result<TextQuery, QuerySyntaxError> {
        let Some(Spanned { token, position }) = self.advance() else {
            // callers check at_operand_end before descending
            return Err(QuerySyntaxError::DanglingOperator {
                operator: "end of query".to_string(),
                position: 0,
            });
        };

        match token {
            Token::Word { text, prefix: false } => Ok(TextQuery::Term(text)),
            Token::Word { text, prefix: true } => Ok(TextQuery::Prefix(text)),
            Token::Wildcard(pattern) => Ok(TextQuery::Wildcard(pattern)),
            Token::Phrase(text) => Ok(TextQuery::Phrase(text)),
            Token::Range { lower, upper } => Ok(TextQuery::Range { lower, upper }),
            Token::Compare { op, value } => Ok(TextQuery::Compare { op, value }),
            Token::Open => {
                if matches!(self.peek(), Some(Spanned { token: Token::Close, .. }) | None) {
                    return Err(QuerySyntaxError::UnbalancedParen { position });
                }
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Spanned {
                        token: Token::Close,
                        ..
                    }) => Ok(inner),
                    _ => Err(QuerySyntaxError::UnbalancedParen { position }),
                }
            }
            Token::Field(field) => self.parse_field(field, position),
            Token::Close => Err(QuerySyntaxError::UnbalancedParen { position }),
            Token::Tilde(_) | Token::Caret(_) => Err(QuerySyntaxError::InvalidModifier {
                modifier: token.label(),
                position,
            }),
            Token::And | Token::Or => Err(QuerySyntaxError::DanglingOperator {
                operator: token.label(),
                position,
            }),
            // parse_unary consumes NOT before reaching here
            Token::Not => Ok(TextQuery::Not(Box::new(self.parse_unary()?))),
        }
    }

    fn parse_field(&mut self, field: String, position: usize) -> Result<TextQuery, QuerySyntaxError> {
        let missing = || QuerySyntaxError::MissingFieldValue {
            field: field.clone(),
            position,
        };

        match self.peek() {
            Some(Spanned {
                token:
                    Token::Word { .. }
                    | Token::Wildcard(_)
                    | Token::Phrase(_)
                    | Token::Range { .. }
                    | Token::Compare { .. }
                    | Token::Open,
                ..
            }) => {}
            _ => return Err(missing()),
        }

        if field == "_exists_" {
            return match self.advance() {
                Some(Spanned {
                    token: Token::Word { text, prefix: false },
                    ..
                }) => Ok(TextQuery::Exists(text)),
                _ => Err(missing()),
            };
        }

        let query = self.parse_postfix()?;
        if matches!(&query, TextQuery::Wildcard(pattern) if pattern == "*") {
            return Ok(TextQuery::Exists(field));
        }

        Ok(TextQuery::Field {
            field,
            query: Box::new(query),
        })
    }

    fn at_operand_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Spanned {
                token: Token::And | Token::Or | Token::Close,
                ..
            })
        )
    }
}

// `~N` is an edit distance on a term and a slop on a phrase.
fn with_tilde(query: TextQuery, raw: &str, position: usize) -> Result<TextQuery, QuerySyntaxError> {
    let invalid = || QuerySyntaxError::InvalidModifier {
        modifier: format!("~{raw}"),
        position,
    };

    match query {
        TextQuery::Term(term) => {
            let edits = if raw.is_empty() {
                None
            } else {
                let edits = raw
                    .parse::<u8>()
                    .ok()
                    .filter(|edits| *edits <= MAX_FUZZY_EDITS)
                    .ok_or_else(invalid)?;
                Some(edits)
            };
            Ok(TextQuery::Fuzzy { term, edits })
        }
        TextQuery::Phrase(phrase) => {
            let slop = raw.parse::<u32>().map_err(|_| invalid())?;
            Ok(TextQuery::Proximity { phrase, slop })
        }
        _ => Err(invalid()),
    }
}

fn with_boost(query: TextQuery, raw: String, position: usize) -> Result<TextQuery, QuerySyntaxError> {
    let valid = raw
        .parse::<f32>()
        .is_ok_and(|factor| factor.is_finite() && factor >= 0.0);
    if !valid {
        return Err(QuerySyntaxError::InvalidModifier {
            modifier: format!("^{raw}"),
            position,
        });
    }

    Ok(TextQuery::Boost {
        query: Box::new(query),
        factor: raw,
    })
}

fn collapse(mut items: Vec<TextQuery>, wrap: fn(Vec<TextQuery>) -> TextQuery) -> TextQuery {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

///
/// TESTS
///
