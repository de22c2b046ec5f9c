use crate::path::errors::PathError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// A compiled selection expression.
///
/// Queries starting with `$` are anchored at the document root; any other
/// query may match at any depth, as if it started with `$..`.
#[derive(Debug, Clone)]
pub struct PathQuery {
    source: String,
    anchored: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub enum Step {
    /// `.name` or `['name']`
    Child(String),
    /// `[3]`, `[-1]`
    Index(i64),
    /// `.*` or `[*]`
    Wildcard,
    /// `..`: zero or more levels
    Descendants,
    /// `[start:end]`, either bound optional
    Slice { start: Option<i64>, end: Option<i64> },
    /// `[?(@.key =~ 'regex' && ...)]`
    Filter(Vec<Condition>),
}

/// One comparison inside a filter, relative to the candidate node (`@`).
#[derive(Debug, Clone)]
pub struct Condition {
    pub keys: Vec<String>,
    pub test: Test,
}

#[derive(Debug, Clone)]
pub enum Test {
    Exists,
    Matches(Regex),
    Equals(String),
    NotEquals(String),
}

impl PathQuery {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input).parse()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl FromStr for PathQuery {
    type Err = PathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.trim().chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<PathQuery, PathError> {
        if self.chars.is_empty() {
            return Err(self.error("empty query"));
        }

        let anchored = self.eat('$');
        let mut steps = Vec::new();
        if !anchored {
            steps.push(Step::Descendants);
            if self.peek().is_some_and(is_name_start) {
                steps.push(self.name_or_wildcard()?);
            }
        }

        while let Some(ch) = self.peek() {
            match ch {
                '.' => {
                    self.bump();
                    if self.eat('.') {
                        if !matches!(steps.last(), Some(Step::Descendants)) {
                            steps.push(Step::Descendants);
                        }
                        if self.peek() == Some('[') {
                            steps.push(self.bracket()?);
                        } else {
                            steps.push(self.name_or_wildcard()?);
                        }
                    } else {
                        steps.push(self.name_or_wildcard()?);
                    }
                }
                '[' => steps.push(self.bracket()?),
                other => return Err(self.error(&format!("unexpected '{other}'"))),
            }
        }

        Ok(PathQuery {
            source: self.input.trim().to_string(),
            anchored,
            steps,
        })
    }

    fn name_or_wildcard(&mut self) -> Result<Step, PathError> {
        if self.eat('*') {
            return Ok(Step::Wildcard);
        }
        let name = self.name();
        if name.is_empty() {
            return Err(self.error("expected a key name"));
        }
        Ok(Step::Child(name))
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if !is_name_char(ch) {
                break;
            }
            name.push(ch);
            self.bump();
        }
        name
    }

    fn bracket(&mut self) -> Result<Step, PathError> {
        self.expect('[')?;
        self.skip_ws();
        let step = match self.peek() {
            Some('*') => {
                self.bump();
                Step::Wildcard
            }
            Some('\'') | Some('"') => Step::Child(self.quoted()?),
            Some('?') => return self.filter(),
            Some(ch) if ch == '-' || ch == ':' || ch.is_ascii_digit() => {
                let start = self.integer()?;
                self.skip_ws();
                if self.eat(':') {
                    self.skip_ws();
                    let end = self.integer()?;
                    Step::Slice { start, end }
                } else {
                    Step::Index(start.ok_or_else(|| self.error("expected an index"))?)
                }
            }
            _ => return Err(self.error("expected index, slice, quoted key, '*' or filter")),
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(step)
    }

    fn filter(&mut self) -> Result<Step, PathError> {
        self.expect('?')?;
        self.skip_ws();
        self.expect('(')?;
        let mut conditions = vec![self.condition()?];
        loop {
            self.skip_ws();
            if self.eat_str("&&") {
                conditions.push(self.condition()?);
            } else {
                break;
            }
        }
        self.expect(')')?;
        self.skip_ws();
        self.expect(']')?;
        Ok(Step::Filter(conditions))
    }

    fn condition(&mut self) -> Result<Condition, PathError> {
        self.skip_ws();
        self.expect('@')?;
        let mut keys = Vec::new();
        loop {
            if self.eat('.') {
                let name = self.name();
                if name.is_empty() {
                    return Err(self.error("expected a key name after '@.'"));
                }
                keys.push(name);
            } else if self.peek() == Some('[') {
                self.bump();
                self.skip_ws();
                keys.push(self.quoted()?);
                self.skip_ws();
                self.expect(']')?;
            } else {
                break;
            }
        }

        self.skip_ws();
        let test = if self.eat_str("=~") || self.eat_word("matches") {
            let pattern = self.literal()?;
            let regex = Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|source| PathError::Regex { pattern, source })?;
            Test::Matches(regex)
        } else if self.eat_str("==") {
            Test::Equals(self.literal()?)
        } else if self.eat_str("!=") {
            Test::NotEquals(self.literal()?)
        } else {
            Test::Exists
        };
        Ok(Condition { keys, test })
    }

    fn literal(&mut self) -> Result<String, PathError> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => self.quoted(),
            _ => {
                let mut token = String::new();
                while let Some(ch) = self.peek() {
                    if ch.is_whitespace() || ch == ')' || ch == '&' {
                        break;
                    }
                    token.push(ch);
                    self.bump();
                }
                if token.is_empty() {
                    return Err(self.error("expected a value"));
                }
                Ok(token)
            }
        }
    }

    /// A quoted string. A backslash only escapes the closing quote; every
    /// other backslash is kept so regex escapes pass through untouched.
    fn quoted(&mut self) -> Result<String, PathError> {
        let quote = self
            .peek()
            .ok_or_else(|| self.error("expected a quoted string"))?;
        self.bump();
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            self.bump();
            if ch == quote {
                return Ok(out);
            }
            if ch == '\\' && self.peek() == Some(quote) {
                out.push(quote);
                self.bump();
                continue;
            }
            out.push(ch);
        }
        Err(self.error("unterminated quoted string"))
    }

    fn integer(&mut self) -> Result<Option<i64>, PathError> {
        let mut digits = String::new();
        if self.peek() == Some('-') {
            digits.push('-');
            self.bump();
        }
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            digits.push(ch);
            self.bump();
        }
        match digits.as_str() {
            "" => Ok(None),
            "-" => Err(self.error("expected digits after '-'")),
            text => text
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.error("index out of range")),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let len = expected.chars().count();
        let matches = self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len]
                .iter()
                .copied()
                .eq(expected.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    /// Like `eat_str`, but the word must not run into a name character.
    fn eat_word(&mut self, word: &str) -> bool {
        let start = self.pos;
        if !self.eat_str(word) {
            return false;
        }
        if self.peek().is_some_and(is_name_char) {
            self.pos = start;
            return false;
        }
        true
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: &str) -> PathError {
        PathError::Syntax {
            query: self.input.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }
}

fn is_name_char(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            '.' | '[' | ']' | '(' | ')' | '\'' | '"' | '=' | '!' | '&' | '@' | '?' | '*' | '$'
        )
}

fn is_name_start(ch: char) -> bool {
    ch == '*' || is_name_char(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_kinds(query: &PathQuery) -> Vec<String> {
        query
            .steps()
            .iter()
            .map(|step| match step {
                Step::Child(name) => format!("child:{name}"),
                Step::Index(i) => format!("index:{i}"),
                Step::Wildcard => "*".to_string(),
                Step::Descendants => "..".to_string(),
                Step::Slice { start, end } => format!("slice:{start:?}:{end:?}"),
                Step::Filter(conds) => format!("filter:{}", conds.len()),
            })
            .collect()
    }

    #[test]
    fn parse_anchored_dotted_path() {
        let query = PathQuery::parse("$.on.workflow_dispatch.inputs").unwrap();
        assert!(query.is_anchored());
        assert_eq!(
            step_kinds(&query),
            ["child:on", "child:workflow_dispatch", "child:inputs"]
        );
    }

    #[test]
    fn parse_recursive_descent_with_filter() {
        let query =
            PathQuery::parse("..steps[?(@.uses =~ 'actions/setup-java@v[23].*')].with.distribution")
                .unwrap();
        assert!(!query.is_anchored());
        assert_eq!(
            step_kinds(&query),
            ["..", "child:steps", "filter:1", "child:with", "child:distribution"]
        );
    }

    #[test]
    fn parse_matches_keyword_and_conjunction() {
        let query =
            PathQuery::parse("$.updates[?(@.package-ecosystem matches 'maven' && @.directory)]")
                .unwrap();
        match &query.steps()[1] {
            Step::Filter(conditions) => {
                assert_eq!(conditions.len(), 2);
                assert_eq!(conditions[0].keys, ["package-ecosystem"]);
                assert!(matches!(conditions[1].test, Test::Exists));
            }
            other => panic!("expected filter, got {other:?}"),
        }
    }

    #[test]
    fn parse_slices_and_indices() {
        let query = PathQuery::parse("$.jobs.build.steps[:1].uses").unwrap();
        assert_eq!(
            step_kinds(&query),
            ["child:jobs", "child:build", "child:steps", "slice:None:Some(1)", "child:uses"]
        );
        let query = PathQuery::parse("$.items[-1]['odd.key'][*]").unwrap();
        assert_eq!(step_kinds(&query), ["child:items", "index:-1", "child:odd.key", "*"]);
    }

    #[test]
    fn bare_query_is_unanchored() {
        let query = PathQuery::parse("runs-on").unwrap();
        assert_eq!(step_kinds(&query), ["..", "child:runs-on"]);
    }

    #[test]
    fn quoted_backslash_only_escapes_quote() {
        let query = PathQuery::parse(r"$.a[?(@.b =~ 'it\'s\.here')]").unwrap();
        match &query.steps()[1] {
            Step::Filter(conditions) => match &conditions[0].test {
                Test::Matches(regex) => assert!(regex.is_match("it's.here")),
                other => panic!("unexpected test {other:?}"),
            },
            other => panic!("expected filter, got {other:?}"),
        }
    }

    #[test]
    fn malformed_queries_fail_fast() {
        for input in ["", "$.", "$..", "$.a[", "$.a[?(@.b == )]", "$.a['b", "$.a]"] {
            assert!(
                matches!(PathQuery::parse(input), Err(PathError::Syntax { .. })),
                "expected syntax error for {input:?}"
            );
        }
        assert!(matches!(
            PathQuery::parse("$.a[?(@.b =~ '(')]"),
            Err(PathError::Regex { .. })
        ));
    }
}
