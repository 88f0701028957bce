use quire_domain::QueryKind;

const WRITE_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "create", "alter", "drop", "truncate", "replace", "merge",
    "grant", "revoke",
];

const READ_KEYWORDS: &[&str] = &["select", "show", "describe", "desc", "explain"];

/// Statements that change data when they appear inside a `WITH` body.
const DATA_MODIFYING: &[&str] = &["insert", "update", "delete", "merge", "replace"];

/// Skip whitespace, `--` line comments, `/* */` block comments and opening
/// parentheses in front of the first keyword.
fn skip_preamble(mut sql: &str) -> &str {
    loop {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(rest) = trimmed.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            return trimmed;
        }
    }
}

fn words(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

fn is_one_of(word: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Classify a statement by its leading keyword.
pub fn classify(sql: &str) -> QueryKind {
    let body = skip_preamble(sql);
    let mut tokens = words(body);
    let Some(first) = tokens.next() else {
        return QueryKind::Unknown;
    };

    if is_one_of(first, WRITE_KEYWORDS) {
        return QueryKind::Write;
    }

    if first.eq_ignore_ascii_case("with") {
        return classify_with(tokens);
    }

    if first.eq_ignore_ascii_case("explain") {
        // EXPLAIN ANALYZE executes the statement.
        let mut rest = tokens.peekable();
        if rest.next_if(|w| w.eq_ignore_ascii_case("analyze")).is_some()
            && rest.any(|w| is_one_of(w, DATA_MODIFYING))
        {
            return QueryKind::Write;
        }
        return QueryKind::Read;
    }

    if is_one_of(first, READ_KEYWORDS) {
        return QueryKind::Read;
    }

    QueryKind::Unknown
}

fn classify_with<'a>(tokens: impl Iterator<Item = &'a str>) -> QueryKind {
    let mut saw_select = false;
    for word in tokens {
        if is_one_of(word, DATA_MODIFYING) {
            return QueryKind::Write;
        }
        saw_select |= word.eq_ignore_ascii_case("select");
    }
    if saw_select {
        QueryKind::Read
    } else {
        QueryKind::Unknown
    }
}
