//! Directory search filters
//!
//! Parses the string representation of search filters (RFC 4515 style) and
//! evaluates them against [`Record`]s.
//!
//! Supported syntax:
//! - `(&(a=1)(b=2))`, `(|(a=1)(b=2))`, `(!(a=1))`
//! - equality `(cn=alice)`, presence `(mail=*)`, substring `(cn=*ali*ce)`
//! - ordering `(uSNChanged>=100)`, `(uSNChanged<=200)`, approximate `(cn~=alice)`
//! - `\XX` hex escapes in values
//!
//! A filter without outer parentheses (`objectClass=user`) is accepted and
//! treated as if it were wrapped.

use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use std::fmt;
use std::str::FromStr;

/// A parsed search filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters match
    And(Vec<Filter>),
    /// Any sub-filter matches
    Or(Vec<Filter>),
    /// Sub-filter does not match
    Not(Box<Filter>),
    /// Attribute has at least one value
    Present(String),
    /// Attribute equals value (case-insensitive)
    Equal { attribute: String, value: String },
    /// Attribute matches a wildcard pattern
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
    /// Attribute is greater than or equal to value
    GreaterOrEqual { attribute: String, value: String },
    /// Attribute is less than or equal to value
    LessOrEqual { attribute: String, value: String },
    /// Attribute approximately equals value
    Approx { attribute: String, value: String },
}

/// Parse a filter string
pub fn parse(input: &str) -> Result<Filter> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Filter must not be empty"));
    }

    let owned;
    let source = if trimmed.starts_with('(') {
        trimmed
    } else {
        owned = format!("({trimmed})");
        owned.as_str()
    };

    let mut parser = Parser::new(source);
    let filter = parser.filter()?;
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(filter)
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

/// Operator between attribute and value in a simple item
#[derive(Clone, Copy)]
enum Op {
    Equal,
    Approx,
    GreaterOrEqual,
    LessOrEqual,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::validation(format!("Invalid filter at position {}: {message}", self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{expected}', found end of input"))),
        }
    }

    fn filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of input")),
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        while self.peek() == Some('(') {
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("expected at least one nested filter"));
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '>' | '<' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attribute: String = self.chars[start..self.pos].iter().collect();
        let attribute = attribute.trim().to_string();
        if attribute.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        if !attribute
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ';' | '.'))
        {
            return Err(self.error(&format!("invalid attribute name '{attribute}'")));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                Op::Equal
            }
            Some(c @ ('~' | '>' | '<')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '~' => Op::Approx,
                    '>' => Op::GreaterOrEqual,
                    _ => Op::LessOrEqual,
                }
            }
            _ => return Err(self.error("expected a comparison operator")),
        };

        let segments = self.value_segments()?;

        if let Op::Equal = op {
            return Ok(match segments.as_slice() {
                [value] => Filter::Equal {
                    attribute,
                    value: value.clone(),
                },
                [first, second] if first.is_empty() && second.is_empty() => {
                    Filter::Present(attribute)
                }
                [first, middle @ .., last] => Filter::Substring {
                    attribute,
                    initial: non_empty(first),
                    any: middle.iter().filter(|s| !s.is_empty()).cloned().collect(),
                    last: non_empty(last),
                },
                [] => unreachable!("value_segments always yields one segment"),
            });
        }

        let [value] = <[String; 1]>::try_from(segments)
            .map_err(|_| self.error("wildcards are only allowed in equality filters"))?;
        Ok(match op {
            Op::Approx => Filter::Approx { attribute, value },
            Op::GreaterOrEqual => Filter::GreaterOrEqual { attribute, value },
            Op::LessOrEqual => Filter::LessOrEqual { attribute, value },
            Op::Equal => unreachable!("handled above"),
        })
    }

    /// Read a value up to the closing parenthesis, split on unescaped `*`
    fn value_segments(&mut self) -> Result<Vec<String>> {
        let mut segments = Vec::new();
        let mut current: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('*') => {
                    self.pos += 1;
                    segments.push(self.decode(std::mem::take(&mut current))?);
                }
                Some('\\') => {
                    self.pos += 1;
                    let hex: String = self
                        .chars
                        .get(self.pos..self.pos + 2)
                        .map(|h| h.iter().collect())
                        .unwrap_or_default();
                    let byte = u8::from_str_radix(&hex, 16)
                        .map_err(|_| self.error("invalid escape sequence"))?;
                    self.pos += 2;
                    current.push(byte);
                }
                Some(c) => {
                    self.pos += 1;
                    let mut buf = [0u8; 4];
                    current.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        segments.push(self.decode(current)?);
        Ok(segments)
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        String::from_utf8(bytes).map_err(|_| self.error("value is not valid UTF-8"))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

// ============================================================================
// Evaluation
// ============================================================================

impl Filter {
    /// Evaluate this filter against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(record)),
            Self::Not(filter) => !filter.matches(record),
            Self::Present(attribute) => !attribute_values(record, attribute).is_empty(),
            Self::Equal { attribute, value } | Self::Approx { attribute, value } => {
                let expected = value.to_lowercase();
                attribute_values(record, attribute)
                    .iter()
                    .any(|v| v.to_lowercase() == expected)
            }
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                let initial = initial.as_deref().map(str::to_lowercase);
                let any: Vec<String> = any.iter().map(|s| s.to_lowercase()).collect();
                let last = last.as_deref().map(str::to_lowercase);
                attribute_values(record, attribute).iter().any(|v| {
                    substring_match(&v.to_lowercase(), initial.as_deref(), &any, last.as_deref())
                })
            }
            Self::GreaterOrEqual { attribute, value } => attribute_values(record, attribute)
                .iter()
                .any(|v| compare(v, value).is_ge()),
            Self::LessOrEqual { attribute, value } => attribute_values(record, attribute)
                .iter()
                .any(|v| compare(v, value).is_le()),
        }
    }
}

/// Scalar values of an attribute rendered as strings; multi-valued attributes flatten
fn attribute_values(record: &Record, attribute: &str) -> Vec<String> {
    fn push_scalar(value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::String(s) => out.push(s.clone()),
            JsonValue::Number(n) => out.push(n.to_string()),
            JsonValue::Bool(b) => out.push(b.to_string()),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {}
        }
    }

    let mut values = Vec::new();
    match record.get_ignore_case(attribute) {
        Some(JsonValue::Array(items)) => {
            for item in items {
                push_scalar(item, &mut values);
            }
        }
        Some(value) => push_scalar(value, &mut values),
        None => {}
    }
    values
}

fn substring_match(value: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let mut rest = value;
    if let Some(initial) = initial {
        match rest.strip_prefix(initial) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for part in any {
        match rest.find(part.as_str()) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    last.map_or(true, |last| rest.ends_with(last))
}

/// Numeric comparison when both sides parse as numbers, otherwise case-insensitive text
fn compare(actual: &str, expected: &str) -> std::cmp::Ordering {
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        _ => actual.to_lowercase().cmp(&expected.to_lowercase()),
    }
}

// ============================================================================
// Display
// ============================================================================

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) | Self::Or(filters) => {
                let op = if matches!(self, Self::And(_)) { '&' } else { '|' };
                write!(f, "({op}")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                f.write_str(")")
            }
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Present(attribute) => write!(f, "({attribute}=*)"),
            Self::Equal { attribute, value } => write!(f, "({attribute}={})", escape(value)),
            Self::Approx { attribute, value } => write!(f, "({attribute}~={})", escape(value)),
            Self::GreaterOrEqual { attribute, value } => {
                write!(f, "({attribute}>={})", escape(value))
            }
            Self::LessOrEqual { attribute, value } => {
                write!(f, "({attribute}<={})", escape(value))
            }
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    f.write_str(&escape(initial))?;
                }
                f.write_str("*")?;
                for part in any {
                    write!(f, "{}*", escape(part))?;
                }
                if let Some(last) = last {
                    f.write_str(&escape(last))?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn alice() -> Record {
        Record::new()
            .with("distinguishedName", "CN=Alice Smith,OU=Staff,DC=example,DC=com")
            .with("objectClass", json!(["top", "person", "user"]))
            .with("cn", "Alice Smith")
            .with("sAMAccountName", "asmith")
            .with("logonCount", 42)
            .with("mail", JsonValue::Null)
    }

    #[test_case("(cn=Alice Smith)", true ; "equality")]
    #[test_case("(CN=alice smith)", true ; "equality ignores case")]
    #[test_case("(objectClass=user)", true ; "multi valued")]
    #[test_case("(objectClass=computer)", false ; "multi valued miss")]
    #[test_case("(cn=*)", true ; "presence")]
    #[test_case("(mail=*)", false ; "null is absent")]
    #[test_case("(cn=*lic*)", true ; "substring any")]
    #[test_case("(cn=Ali*th)", true ; "substring initial and final")]
    #[test_case("(cn=*Bob*)", false ; "substring miss")]
    #[test_case("(cn=**)", true ; "empty wildcard term")]
    #[test_case("(logonCount>=40)", true ; "numeric greater")]
    #[test_case("(logonCount<=9)", false ; "numeric less")]
    #[test_case("(&(objectClass=user)(|(cn=*bob*)(sAMAccountName=*smi*)))", true ; "nested")]
    #[test_case("(!(cn=Alice Smith))", false ; "negation")]
    #[test_case("objectClass=person", true ; "bare filter")]
    fn test_matches(filter: &str, expected: bool) {
        let filter = parse(filter).unwrap();
        assert_eq!(filter.matches(&alice()), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("(cn=alice" ; "unterminated")]
    #[test_case("(&)" ; "empty and")]
    #[test_case("(=alice)" ; "missing attribute")]
    #[test_case("(cn alice)" ; "missing operator")]
    #[test_case("(cn>=a*)" ; "wildcard in ordering")]
    #[test_case("(cn=a\\zz)" ; "bad escape")]
    #[test_case("(cn=a)(sn=b)" ; "trailing input")]
    #[test_case("(c$n=a)" ; "bad attribute")]
    fn test_parse_errors(filter: &str) {
        let err = parse(filter).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{err}");
    }

    #[test]
    fn test_escaped_wildcard_is_literal() {
        let filter = parse("(cn=a\\2ab)").unwrap();
        assert_eq!(
            filter,
            Filter::Equal {
                attribute: "cn".to_string(),
                value: "a*b".to_string()
            }
        );
        assert!(filter.matches(&Record::new().with("cn", "a*b")));
        assert!(!filter.matches(&Record::new().with("cn", "axxb")));
    }

    #[test]
    fn test_display_round_trip() {
        let source = "(&(objectClass=user)(!(cn=a\\2ab))(sn=Sm*t*h)(mail=*))";
        let filter = parse(source).unwrap();
        assert_eq!(filter.to_string(), source);
        assert_eq!(parse(&filter.to_string()).unwrap(), filter);
    }
}
