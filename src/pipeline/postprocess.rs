use crate::config::Replacement;

/// Applies literal replacements in configuration order.
pub fn apply_replacements(sql: &str, replacements: &[Replacement]) -> String {
    replacements
        .iter()
        .filter(|r| !r.from.is_empty())
        .fold(sql.to_string(), |text, r| text.replace(&r.from, &r.to))
}

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CAST",
    "COALESCE", "COUNT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIMESTAMP", "DATABASE",
    "DECLARE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXEC",
    "EXISTS", "FALSE", "FETCH", "FOR", "FROM", "FULL", "FUNCTION", "GROUP", "HAVING", "IF", "IN",
    "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT",
    "MERGE", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER", "PARTITION",
    "PROCEDURE", "QUALIFY", "REPLACE", "RETURN", "RIGHT", "ROWS", "SELECT", "SET", "TABLE",
    "THEN", "TOP", "TRUE", "TRUNCATE", "UNION", "UPDATE", "USING", "VALUES", "VIEW", "WHEN",
    "WHERE", "WITH",
];

const CLAUSE_STARTS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "QUALIFY", "LIMIT", "UNION",
    "INTERSECT", "EXCEPT", "INSERT", "UPDATE", "DELETE", "MERGE", "VALUES", "SET", "JOIN",
    "LEFT", "RIGHT", "INNER", "FULL", "CROSS",
];

const JOIN_MODIFIERS: &[&str] = &["LEFT", "RIGHT", "INNER", "FULL", "CROSS", "OUTER", "NATURAL"];

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Space(&'a str),
    /// Literals, quoted identifiers and comments; emitted untouched.
    Verbatim(&'a str),
    Symbol(&'a str),
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let end = if c.is_whitespace() {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !ch.is_whitespace() {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token::Space(&sql[start..end]));
            continue;
        } else if c.is_alphanumeric() || c == '_' || c == '@' || c == '#' {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_' || ch == '@' || ch == '#' || ch == '$') {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token::Word(&sql[start..end]));
            continue;
        } else if c == '-' && sql[start..].starts_with("--") {
            sql[start..].find('\n').map_or(sql.len(), |n| start + n)
        } else if c == '/' && sql[start..].starts_with("/*") {
            sql[start + 2..].find("*/").map_or(sql.len(), |n| start + 2 + n + 2)
        } else if let Some(close) = closing_quote(c) {
            quoted_end(sql, start, close)
        } else {
            start + c.len_utf8()
        };

        let text = &sql[start..end];
        if end - start == c.len_utf8() && closing_quote(c).is_none() {
            tokens.push(Token::Symbol(text));
        } else {
            tokens.push(Token::Verbatim(text));
        }
        while let Some(&(i, _)) = chars.peek() {
            if i >= end {
                break;
            }
            chars.next();
        }
    }

    tokens
}

fn closing_quote(open: char) -> Option<char> {
    match open {
        '\'' => Some('\''),
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    }
}

/// End offset of a quoted run starting at `start`; doubled closers are escapes.
fn quoted_end(sql: &str, start: usize, close: char) -> usize {
    let body = start + 1;
    let mut iter = sql[body..].char_indices().peekable();

    while let Some((i, ch)) = iter.next() {
        if ch == close {
            if close != ']' && iter.peek().map(|&(_, next)| next) == Some(close) {
                iter.next();
                continue;
            }
            return body + i + ch.len_utf8();
        }
    }

    sql.len()
}

fn next_word<'a>(tokens: &[Token<'a>], from: usize) -> Option<&'a str> {
    tokens[from..].iter().find_map(|t| match t {
        Token::Word(w) => Some(*w),
        Token::Space(_) => None,
        _ => Some(""),
    })
}

/// Upper-cases keywords and starts top-level clauses on their own line.
/// Clauses inside parentheses (subqueries, window specs) stay inline.
/// Literals, quoted identifiers and comments pass through unchanged.
pub fn format_sql(sql: &str) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len() + 16);
    let mut previous_word: Option<String> = None;
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Word(word) => {
                let upper = word.to_uppercase();
                let is_keyword = KEYWORDS.contains(&upper.as_str());

                if is_keyword
                    && depth == 0
                    && starts_clause(&upper, previous_word.as_deref(), &tokens, index)
                {
                    let trimmed_len = out.trim_end_matches([' ', '\t']).len();
                    if trimmed_len > 0 && !out[..trimmed_len].ends_with('\n') {
                        out.truncate(trimmed_len);
                        out.push('\n');
                    } else if out[..trimmed_len].ends_with('\n') {
                        out.truncate(trimmed_len);
                    }
                }

                if is_keyword {
                    out.push_str(&upper);
                } else {
                    out.push_str(word);
                }
                previous_word = Some(upper);
            }
            Token::Space(space) => out.push_str(space),
            Token::Verbatim(text) => {
                out.push_str(text);
                previous_word = None;
            }
            Token::Symbol(symbol) => {
                match *symbol {
                    "(" => depth += 1,
                    ")" => depth = depth.saturating_sub(1),
                    _ => {}
                }
                out.push_str(symbol);
                previous_word = None;
            }
        }
    }

    out
}

fn starts_clause(upper: &str, previous: Option<&str>, tokens: &[Token<'_>], index: usize) -> bool {
    if !CLAUSE_STARTS.contains(&upper) {
        return false;
    }

    match upper {
        // LEFT(...) and RIGHT(...) are string functions unless a join follows.
        "LEFT" | "RIGHT" | "FULL" | "INNER" | "CROSS" => matches!(
            next_word(tokens, index + 1).map(str::to_uppercase).as_deref(),
            Some("JOIN") | Some("OUTER")
        ),
        "JOIN" => !previous.is_some_and(|p| JOIN_MODIFIERS.contains(&p)),
        "FROM" => previous != Some("DELETE"),
        _ => true,
    }
}

/// Renders a Databricks Python notebook that runs `sql`.
pub fn render_notebook(source_name: &str, sql: &str) -> String {
    let escaped = sql.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");

    format!(
        "# Databricks notebook source\n\
         \"\"\"\nAuto-generated from {}\n\"\"\"\n\n\
         sql_query = \"\"\"\n{}\n\"\"\"\n\
         display(spark.sql(sql_query))\n",
        source_name, escaped
    )
}
