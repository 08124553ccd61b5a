//! Clause parser for the SELECT dialect.
//!
//! Clauses are located by anchor keywords (`FROM`, `WHERE`, `ORDER BY`,
//! `LIMIT`) in that order; each clause runs until the next keyword found or
//! the end of input. Keywords inside quotes are ignored.

mod predicate;


use once_cell::sync::Lazy;
use regex::Regex;

use crate::alias;
use crate::ast::{Direction, FromPath, OrderBy, QueryPlan, SelectFunction, SelectItem};
use crate::error::{QueryError, QueryResult};
use crate::lexer;

pub use predicate::build as build_predicate;

static FUNCTION_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*(.*?)\s*\)$").expect("valid function pattern")
});

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_.]*|`[^`]+`)$").expect("valid field pattern")
});

/// Parse one query line into a validated, aliased [`QueryPlan`].
pub fn parse(query: &str) -> QueryResult<QueryPlan> {
    let plan = Parser::new(query).parse()?;
    tracing::debug!(?plan, "parsed query");
    Ok(plan)
}

/// Byte span of a keyword match.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

pub struct Parser<'a> {
    text: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(query: &'a str) -> Self {
        let text = query.trim();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        Self { text }
    }

    pub fn parse(&self) -> QueryResult<QueryPlan> {
        self.check_quotes()?;

        let select = self
            .find_keyword(0, &["SELECT"])
            .filter(|span| span.start == 0)
            .ok_or(QueryError::MissingSelect)?;
        let from = self
            .find_keyword(select.end, &["FROM"])
            .ok_or(QueryError::MissingFrom)?;
        let where_kw = self.find_keyword(from.end, &["WHERE"]);
        let after_where = where_kw.map_or(from.end, |s| s.end);
        let order_kw = self.find_keyword(after_where, &["ORDER", "BY"]);
        let after_order = order_kw.map_or(after_where, |s| s.end);
        let limit_kw = self.find_keyword(after_order, &["LIMIT"]);

        let clause_end = |candidates: &[Option<Span>]| {
            candidates
                .iter()
                .flatten()
                .map(|s| s.start)
                .next()
                .unwrap_or(self.text.len())
        };

        let select_text = &self.text[select.end..from.start];
        let from_text = &self.text[from.end..clause_end(&[where_kw, order_kw, limit_kw])];

        let mut plan = QueryPlan {
            select: parse_select_list(select_text)?,
            from: parse_from(from_text)?,
            filter: None,
            order_by: None,
            limit: None,
        };

        if let Some(kw) = where_kw {
            let where_text = &self.text[kw.end..clause_end(&[order_kw, limit_kw])];
            let tokens = lexer::tokenize(where_text);
            plan.filter = Some(predicate::build(&tokens)?);
        }

        if let Some(kw) = order_kw {
            let order_text = &self.text[kw.end..clause_end(&[limit_kw])];
            plan.order_by = Some(parse_order_by(order_text)?);
        }

        if let Some(kw) = limit_kw {
            plan.limit = Some(parse_limit(&self.text[kw.end..])?);
        }

        if plan.is_count() && plan.order_by.is_some() {
            return Err(QueryError::UnsupportedCombination(
                "COUNT(*) cannot be combined with ORDER BY".to_string(),
            ));
        }

        alias::apply(&mut plan);
        Ok(plan)
    }

    /// Every `'` or `"` opened outside another quote must be closed.
    fn check_quotes(&self) -> QueryResult<()> {
        let mut open: Option<(usize, char)> = None;
        for (i, ch) in self.text.char_indices() {
            match open {
                Some((_, q)) if ch == q => open = None,
                Some(_) => {}
                None if ch == '\'' || ch == '"' => open = Some((i, ch)),
                None => {}
            }
        }
        match open {
            Some((i, q)) => Err(QueryError::Syntax(format!(
                "unterminated quote {} starting at position {}",
                q, i
            ))),
            None => Ok(()),
        }
    }

    /// Find a keyword sequence (e.g. `ORDER BY`) at or after `from`, outside
    /// quotes, bounded by whitespace or the ends of the text. Words in the
    /// sequence may be separated by any run of whitespace.
    fn find_keyword(&self, from: usize, words: &[&str]) -> Option<Span> {
        let bytes = self.text.as_bytes();
        let mut quote: Option<u8> = None;
        let mut i = from;

        while i < bytes.len() {
            let b = bytes[i];
            if let Some(open) = quote {
                if b == open {
                    quote = None;
                }
                i += 1;
                continue;
            }
            if b == b'\'' || b == b'"' {
                quote = Some(b);
                i += 1;
                continue;
            }
            let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
            if at_boundary {
                if let Some(end) = self.match_words(i, words) {
                    return Some(Span { start: i, end });
                }
            }
            i += 1;
        }
        None
    }

    fn match_words(&self, start: usize, words: &[&str]) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut pos = start;
        for (n, word) in words.iter().enumerate() {
            if n > 0 {
                let ws = bytes[pos..]
                    .iter()
                    .take_while(|b| b.is_ascii_whitespace())
                    .count();
                if ws == 0 {
                    return None;
                }
                pos += ws;
            }
            let end = pos + word.len();
            let candidate = bytes.get(pos..end)?;
            if !candidate.eq_ignore_ascii_case(word.as_bytes()) {
                return None;
            }
            pos = end;
        }
        match bytes.get(pos) {
            None => Some(pos),
            Some(b) if b.is_ascii_whitespace() => Some(pos),
            Some(_) => None,
        }
    }
}

/// Split on commas that are outside parentheses and quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_select_list(text: &str) -> QueryResult<Vec<SelectItem>> {
    if text.trim().is_empty() {
        return Err(QueryError::Syntax("empty select list".to_string()));
    }

    let items = split_top_level(text)
        .into_iter()
        .map(|item| parse_select_item(item.trim()))
        .collect::<QueryResult<Vec<_>>>()?;

    if items.len() > 1 {
        if items.contains(&SelectItem::CountAll) {
            return Err(QueryError::Syntax(
                "COUNT(*) must be the only item in the select list".to_string(),
            ));
        }
        if items.contains(&SelectItem::Wildcard) {
            return Err(QueryError::Syntax(
                "* must be the only item in the select list".to_string(),
            ));
        }
    }
    Ok(items)
}

fn parse_select_item(item: &str) -> QueryResult<SelectItem> {
    if item.is_empty() {
        return Err(QueryError::Syntax("empty item in select list".to_string()));
    }
    if item == "*" {
        return Ok(SelectItem::Wildcard);
    }

    if let Some(caps) = FUNCTION_CALL.captures(item) {
        let name = &caps[1];
        let argument = &caps[2];

        if name.eq_ignore_ascii_case("COUNT") {
            return if argument == "*" {
                Ok(SelectItem::CountAll)
            } else {
                Err(QueryError::Syntax(format!(
                    "only COUNT(*) is supported, found '{}'",
                    item
                )))
            };
        }

        let function = SelectFunction::from_name(name)
            .ok_or_else(|| QueryError::Syntax(format!("unknown function '{}'", name)))?;
        let valid_argument = FIELD_NAME.is_match(argument)
            || (argument == "*" && function == SelectFunction::PrettyJson);
        if !valid_argument {
            return Err(QueryError::Syntax(format!(
                "invalid argument '{}' to {}",
                argument,
                function.name()
            )));
        }
        return Ok(SelectItem::Function {
            function,
            argument: unquote_identifier(argument),
        });
    }

    if FIELD_NAME.is_match(item) {
        return Ok(SelectItem::Field(unquote_identifier(item)));
    }

    Err(QueryError::Syntax(format!("invalid select item '{}'", item)))
}

fn unquote_identifier(name: &str) -> String {
    name.strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(name)
        .to_string()
}

fn parse_from(text: &str) -> QueryResult<FromPath> {
    let text = text.trim();
    let mut words = text.split_whitespace();

    let from = match (words.next(), words.next(), words.next()) {
        (Some(kw), Some(name), None) if kw.eq_ignore_ascii_case("GROUP") => {
            if name.contains('/') {
                return Err(QueryError::Syntax(format!(
                    "collection group '{}' must be a collection name, not a path",
                    name
                )));
            }
            FromPath::CollectionGroup(name.to_string())
        }
        (Some(path), None, None) => FromPath::Collection(path.to_string()),
        (None, _, _) => return Err(QueryError::Syntax("empty FROM path".to_string())),
        _ => {
            return Err(QueryError::Syntax(format!(
                "invalid FROM path '{}'",
                text
            )))
        }
    };
    Ok(from)
}

fn parse_order_by(text: &str) -> QueryResult<OrderBy> {
    if text.contains(',') {
        return Err(QueryError::Syntax(
            "ORDER BY supports a single field".to_string(),
        ));
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [field, direction] => {
            let direction = if direction.eq_ignore_ascii_case("ASC") {
                Direction::Ascending
            } else if direction.eq_ignore_ascii_case("DESC") {
                Direction::Descending
            } else {
                return Err(QueryError::Syntax(format!(
                    "ORDER BY direction must be ASC or DESC, found '{}'",
                    direction
                )));
            };
            if !FIELD_NAME.is_match(field) {
                return Err(QueryError::Syntax(format!(
                    "invalid ORDER BY field '{}'",
                    field
                )));
            }
            Ok(OrderBy {
                field: unquote_identifier(field),
                direction,
            })
        }
        [_] => Err(QueryError::Syntax(
            "ORDER BY requires an explicit ASC or DESC direction".to_string(),
        )),
        _ => Err(QueryError::Syntax(format!(
            "expected `ORDER BY field ASC|DESC`, found '{}'",
            text.trim()
        ))),
    }
}

fn parse_limit(text: &str) -> QueryResult<u64> {
    let text = text.trim();
    let n: i64 = text
        .parse()
        .map_err(|_| QueryError::InvalidLimit(format!("'{}' is not an integer", text)))?;
    u64::try_from(n).map_err(|_| QueryError::InvalidLimit(format!("{} is negative", n)))
}
