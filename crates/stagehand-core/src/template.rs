//! # Format Template
//!
//! Encodes and decodes snapshot filenames from a small placeholder language.
//!
//! A template mixes literal text with `{token:pattern}` placeholders:
//!
//! ```text
//! {naming:%s}.{timestamp:%Y%m%d_%H%M%S}
//! {naming:%s}.{version:v%m.%n.%c}
//! ```
//!
//! ## Tokens and directives
//!
//! | Token       | Directives                                              |
//! |-------------|---------------------------------------------------------|
//! | `naming`    | `%s` the entry name                                     |
//! | `domain`    | `%s` the entry domain (may be empty)                    |
//! | `compress`  | `%s` any kind, or `%g` gzip `%-g` gz `%b` bz2 `%x` xz `%z` zip `%r` rar |
//! | `extension` | `%s` any kind, or `%j` json `%y` yaml `%e` env `%t` toml |
//! | `version`   | `%m` major `%n` minor `%c` patch                         |
//! | `timestamp` | `%Y` `%y` `%m` `%d` `%H` `%M` `%S`                       |
//!
//! `%%` is a literal percent sign inside any pattern. A placeholder without a
//! pattern (`{naming}`) uses the token's default pattern.
//!
//! Decoding compiles the template into an anchored regular expression; a
//! filename that does not match it fails with a typed [`TemplateError`], never
//! a panic, so directory listings can be filtered safely.

use crate::types::{Compression, Extension};
use crate::version::Version;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Failures while compiling a template or matching a filename against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown token {0:?} in format template")]
    UnknownToken(String),

    #[error("Unknown directive %{directive} for token {token}")]
    UnknownDirective { token: TokenKind, directive: String },

    #[error("Malformed format template {0:?}")]
    Malformed(String),

    #[error("Format template needs a value for the {0} token")]
    MissingToken(TokenKind),

    #[error("Value {value:?} of the {token} token does not fit the format template")]
    TokenMismatch { token: TokenKind, value: String },

    #[error("Filename {filename:?} does not match format {template:?}")]
    NoMatch { filename: String, template: String },

    #[error("Filename {filename:?} holds conflicting values for the {token} token")]
    Conflict { filename: String, token: TokenKind },

    #[error("Filename {0:?} holds an invalid timestamp")]
    InvalidTimestamp(String),

    #[error("Format template compiled to an invalid pattern: {0}")]
    Pattern(String),
}

// =============================================================================
// TOKENS
// =============================================================================

/// The named placeholders a template may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Naming,
    Domain,
    Compress,
    Extension,
    Version,
    Timestamp,
}

impl TokenKind {
    /// Get the token name as written in templates.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenKind::Naming => "naming",
            TokenKind::Domain => "domain",
            TokenKind::Compress => "compress",
            TokenKind::Extension => "extension",
            TokenKind::Version => "version",
            TokenKind::Timestamp => "timestamp",
        }
    }

    /// Pattern used when a placeholder carries none.
    const fn default_pattern(self) -> &'static str {
        match self {
            TokenKind::Naming | TokenKind::Domain | TokenKind::Compress | TokenKind::Extension => {
                "%s"
            }
            TokenKind::Version => "%m.%n.%c",
            TokenKind::Timestamp => "%Y%m%d%H%M%S",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naming" => Ok(TokenKind::Naming),
            "domain" => Ok(TokenKind::Domain),
            "compress" => Ok(TokenKind::Compress),
            "extension" => Ok(TokenKind::Extension),
            "version" => Ok(TokenKind::Version),
            "timestamp" => Ok(TokenKind::Timestamp),
            other => Err(TemplateError::UnknownToken(other.to_string())),
        }
    }
}

/// Values of every token that a snapshot filename can carry.
///
/// A decoded filename only fills the tokens its template mentions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens {
    pub naming: Option<String>,
    pub domain: Option<String>,
    pub compress: Option<Compression>,
    pub extension: Option<Extension>,
    pub version: Option<Version>,
    pub timestamp: Option<NaiveDateTime>,
}

impl Tokens {
    /// Key used to pick the latest snapshot: `(timestamp, version)`.
    #[must_use]
    pub fn sort_key(&self) -> (Option<NaiveDateTime>, Option<Version>) {
        (self.timestamp, self.version)
    }

    /// Keep only the tokens in `fields`.
    #[must_use]
    pub fn restricted_to(&self, fields: &BTreeSet<TokenKind>) -> Tokens {
        let keep = |kind: TokenKind| fields.contains(&kind);
        Tokens {
            naming: self.naming.clone().filter(|_| keep(TokenKind::Naming)),
            domain: self.domain.clone().filter(|_| keep(TokenKind::Domain)),
            compress: self.compress.filter(|_| keep(TokenKind::Compress)),
            extension: self.extension.filter(|_| keep(TokenKind::Extension)),
            version: self.version.filter(|_| keep(TokenKind::Version)),
            timestamp: self.timestamp.filter(|_| keep(TokenKind::Timestamp)),
        }
    }
}

// =============================================================================
// COMPILED TEMPLATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Text,
    Compress(Compression),
    Extension(Extension),
    Major,
    Minor,
    Patch,
    Year,
    ShortYear,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Directive {
    fn resolve(token: TokenKind, code: &str) -> Result<Self, TemplateError> {
        let directive = match (token, code) {
            (TokenKind::Naming | TokenKind::Domain, "s") => Directive::Text,
            (TokenKind::Compress | TokenKind::Extension, "s") => Directive::Text,
            (TokenKind::Compress, "g") => Directive::Compress(Compression::Gzip),
            (TokenKind::Compress, "-g") => Directive::Compress(Compression::Gz),
            (TokenKind::Compress, "b") => Directive::Compress(Compression::Bz2),
            (TokenKind::Compress, "x") => Directive::Compress(Compression::Xz),
            (TokenKind::Compress, "z") => Directive::Compress(Compression::Zip),
            (TokenKind::Compress, "r") => Directive::Compress(Compression::Rar),
            (TokenKind::Extension, "j") => Directive::Extension(Extension::Json),
            (TokenKind::Extension, "y") => Directive::Extension(Extension::Yaml),
            (TokenKind::Extension, "e") => Directive::Extension(Extension::Env),
            (TokenKind::Extension, "t") => Directive::Extension(Extension::Toml),
            (TokenKind::Version, "m") => Directive::Major,
            (TokenKind::Version, "n") => Directive::Minor,
            (TokenKind::Version, "c") => Directive::Patch,
            (TokenKind::Timestamp, "Y") => Directive::Year,
            (TokenKind::Timestamp, "y") => Directive::ShortYear,
            (TokenKind::Timestamp, "m") => Directive::Month,
            (TokenKind::Timestamp, "d") => Directive::Day,
            (TokenKind::Timestamp, "H") => Directive::Hour,
            (TokenKind::Timestamp, "M") => Directive::Minute,
            (TokenKind::Timestamp, "S") => Directive::Second,
            _ => {
                return Err(TemplateError::UnknownDirective {
                    token,
                    directive: code.to_string(),
                });
            }
        };
        Ok(directive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Directive(Directive),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { token: TokenKind, pieces: Vec<Piece> },
}

/// A parsed snapshot filename template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let malformed = || TemplateError::Malformed(source.to_string());
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(malformed());
            }
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(malformed)?;
            let body = &after[..close];
            if body.contains('{') {
                return Err(malformed());
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(parse_field(body)?);
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(malformed());
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template text this was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every token the template mentions.
    #[must_use]
    pub fn fields(&self) -> BTreeSet<TokenKind> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Field { token, .. } => Some(*token),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render a filename from token values.
    ///
    /// Every token the template mentions must be present in `tokens`.
    pub fn encode(&self, tokens: &Tokens) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { token, pieces } => {
                    for piece in pieces {
                        match piece {
                            Piece::Literal(text) => out.push_str(text),
                            Piece::Directive(directive) => {
                                render(&mut out, *token, *directive, tokens)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Parse a filename back into tokens.
    pub fn decode(&self, filename: &str) -> Result<Tokens, TemplateError> {
        self.matcher(&Tokens::default())?.decode(filename)
    }

    /// Compile a matcher with the `naming` and `domain` tokens pinned to the
    /// values in `pinned` (when present), so only one entry's files match.
    pub fn matcher(&self, pinned: &Tokens) -> Result<TemplateMatcher, TemplateError> {
        let mut pattern = String::from("^");
        let mut groups = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field { token, pieces } => {
                    for piece in pieces {
                        match piece {
                            Piece::Literal(text) => pattern.push_str(&regex::escape(text)),
                            Piece::Directive(directive) => {
                                let name = format!("g{}", groups.len());
                                let body = capture_pattern(*token, *directive, pinned);
                                let _ = write!(pattern, "(?P<{name}>{body})");
                                groups.push((name, *token, *directive));
                            }
                        }
                    }
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| TemplateError::Pattern(e.to_string()))?;
        Ok(TemplateMatcher {
            source: self.source.clone(),
            regex,
            groups,
        })
    }
}

impl FromStr for FormatTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_field(body: &str) -> Result<Segment, TemplateError> {
    let (name, pattern) = match body.split_once(':') {
        Some((name, pattern)) => (name.trim(), pattern),
        None => (body.trim(), ""),
    };
    let token: TokenKind = name.parse()?;
    let pattern = if pattern.is_empty() {
        token.default_pattern()
    } else {
        pattern
    };

    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        let mut code = String::new();
        match chars.next() {
            Some('%') => {
                literal.push('%');
                continue;
            }
            Some('-') => {
                code.push('-');
                let flagged = chars
                    .next()
                    .ok_or_else(|| TemplateError::Malformed(body.to_string()))?;
                code.push(flagged);
            }
            Some(other) => code.push(other),
            None => return Err(TemplateError::Malformed(body.to_string())),
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        pieces.push(Piece::Directive(Directive::resolve(token, &code)?));
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }

    Ok(Segment::Field { token, pieces })
}

fn render(
    out: &mut String,
    token: TokenKind,
    directive: Directive,
    tokens: &Tokens,
) -> Result<(), TemplateError> {
    let missing = || TemplateError::MissingToken(token);
    match directive {
        Directive::Text => {
            let text = match token {
                TokenKind::Naming => tokens.naming.clone().ok_or_else(missing)?,
                TokenKind::Domain => tokens.domain.clone().ok_or_else(missing)?,
                TokenKind::Compress => tokens.compress.ok_or_else(missing)?.to_string(),
                TokenKind::Extension => tokens.extension.ok_or_else(missing)?.to_string(),
                TokenKind::Version | TokenKind::Timestamp => return Err(missing()),
            };
            if token == TokenKind::Naming && text.is_empty() {
                return Err(missing());
            }
            out.push_str(&text);
        }
        Directive::Compress(kind) => {
            let value = tokens.compress.ok_or_else(missing)?;
            if value != kind {
                return Err(TemplateError::TokenMismatch {
                    token,
                    value: value.to_string(),
                });
            }
            out.push_str(kind.as_str());
        }
        Directive::Extension(kind) => {
            let value = tokens.extension.ok_or_else(missing)?;
            if value != kind {
                return Err(TemplateError::TokenMismatch {
                    token,
                    value: value.to_string(),
                });
            }
            out.push_str(kind.as_str());
        }
        Directive::Major | Directive::Minor | Directive::Patch => {
            let version = tokens.version.ok_or_else(missing)?;
            let component = match directive {
                Directive::Major => version.major,
                Directive::Minor => version.minor,
                _ => version.patch,
            };
            let _ = write!(out, "{component}");
        }
        Directive::Year => {
            let ts = tokens.timestamp.ok_or_else(missing)?;
            if !(0..=9999).contains(&ts.year()) {
                return Err(TemplateError::TokenMismatch {
                    token,
                    value: ts.to_string(),
                });
            }
            let _ = write!(out, "{:04}", ts.year());
        }
        Directive::ShortYear => {
            let ts = tokens.timestamp.ok_or_else(missing)?;
            if !(SHORT_YEAR_FIRST..SHORT_YEAR_FIRST + 100).contains(&ts.year()) {
                return Err(TemplateError::TokenMismatch {
                    token,
                    value: ts.to_string(),
                });
            }
            let _ = write!(out, "{:02}", ts.year().rem_euclid(100));
        }
        Directive::Month => two_digits(out, tokens, missing, |ts| ts.month())?,
        Directive::Day => two_digits(out, tokens, missing, |ts| ts.day())?,
        Directive::Hour => two_digits(out, tokens, missing, |ts| ts.hour())?,
        Directive::Minute => two_digits(out, tokens, missing, |ts| ts.minute())?,
        Directive::Second => two_digits(out, tokens, missing, |ts| ts.second())?,
    }
    Ok(())
}

/// First year `%y` can represent; decoding pivots two digits into
/// `1969..=2068`.
const SHORT_YEAR_FIRST: i32 = 1969;

fn two_digits(
    out: &mut String,
    tokens: &Tokens,
    missing: impl Fn() -> TemplateError,
    part: impl Fn(&NaiveDateTime) -> u32,
) -> Result<(), TemplateError> {
    let ts = tokens.timestamp.ok_or_else(missing)?;
    let _ = write!(out, "{:02}", part(&ts));
    Ok(())
}

fn capture_pattern(token: TokenKind, directive: Directive, pinned: &Tokens) -> String {
    match (token, directive) {
        (TokenKind::Naming, Directive::Text) => match &pinned.naming {
            Some(name) => regex::escape(name),
            None => "[^.,/]+".to_string(),
        },
        (TokenKind::Domain, Directive::Text) => match &pinned.domain {
            Some(domain) => regex::escape(domain),
            None => "[^.,/]*".to_string(),
        },
        (TokenKind::Compress, Directive::Text) => alternation(Compression::ALL.map(|c| c.as_str())),
        (TokenKind::Extension, Directive::Text) => alternation(Extension::ALL.map(|e| e.as_str())),
        (_, Directive::Compress(kind)) => regex::escape(kind.as_str()),
        (_, Directive::Extension(kind)) => regex::escape(kind.as_str()),
        (_, Directive::Major | Directive::Minor | Directive::Patch) => r"\d+".to_string(),
        (_, Directive::Year) => r"\d{4}".to_string(),
        (_, _) => r"\d{2}".to_string(),
    }
}

fn alternation<const N: usize>(options: [&str; N]) -> String {
    options
        .iter()
        .map(|option| regex::escape(option))
        .collect::<Vec<_>>()
        .join("|")
}

// =============================================================================
// MATCHER
// =============================================================================

/// A template compiled for decoding, optionally pinned to one entry.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    source: String,
    regex: Regex,
    groups: Vec<(String, TokenKind, Directive)>,
}

#[derive(Default)]
struct Assembly {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
}

impl TemplateMatcher {
    /// The template text this matcher was compiled from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.source
    }

    /// Check a filename without decoding it.
    #[must_use]
    pub fn is_match(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }

    /// Decode a filename into tokens.
    pub fn decode(&self, filename: &str) -> Result<Tokens, TemplateError> {
        let captures = self
            .regex
            .captures(filename)
            .ok_or_else(|| TemplateError::NoMatch {
                filename: filename.to_string(),
                template: self.source.clone(),
            })?;

        let mut tokens = Tokens::default();
        let mut parts = Assembly::default();
        let mut has_version = false;
        let mut has_timestamp = false;

        for (name, token, directive) in &self.groups {
            let Some(text) = captures.name(name).map(|m| m.as_str()) else {
                continue;
            };
            let conflict = || TemplateError::Conflict {
                filename: filename.to_string(),
                token: *token,
            };
            let number = |text: &str| -> Result<u64, TemplateError> {
                text.parse().map_err(|_| conflict())
            };

            match (token, directive) {
                (TokenKind::Naming, _) => set_once(&mut tokens.naming, text.to_string(), conflict)?,
                (TokenKind::Domain, _) => set_once(&mut tokens.domain, text.to_string(), conflict)?,
                (TokenKind::Compress, _) => {
                    let kind = text.parse::<Compression>().map_err(|_| conflict())?;
                    set_once(&mut tokens.compress, kind, conflict)?;
                }
                (TokenKind::Extension, _) => {
                    let kind = text.parse::<Extension>().map_err(|_| conflict())?;
                    set_once(&mut tokens.extension, kind, conflict)?;
                }
                (TokenKind::Version, Directive::Major) => {
                    has_version = true;
                    set_once(&mut parts.major, number(text)?, conflict)?;
                }
                (TokenKind::Version, Directive::Minor) => {
                    has_version = true;
                    set_once(&mut parts.minor, number(text)?, conflict)?;
                }
                (TokenKind::Version, _) => {
                    has_version = true;
                    set_once(&mut parts.patch, number(text)?, conflict)?;
                }
                (TokenKind::Timestamp, directive) => {
                    has_timestamp = true;
                    let value = number(text)? as u32;
                    match directive {
                        Directive::Year => set_once(&mut parts.year, value as i32, conflict)?,
                        Directive::ShortYear => {
                            // POSIX pivot: 69-99 -> 19xx, 00-68 -> 20xx
                            let century = if value >= 69 { 1900 } else { 2000 };
                            set_once(&mut parts.year, century + value as i32, conflict)?;
                        }
                        Directive::Month => set_once(&mut parts.month, value, conflict)?,
                        Directive::Day => set_once(&mut parts.day, value, conflict)?,
                        Directive::Hour => set_once(&mut parts.hour, value, conflict)?,
                        Directive::Minute => set_once(&mut parts.minute, value, conflict)?,
                        _ => set_once(&mut parts.second, value, conflict)?,
                    }
                }
            }
        }

        if has_version {
            tokens.version = Some(Version::new(
                parts.major.unwrap_or(0),
                parts.minor.unwrap_or(0),
                parts.patch.unwrap_or(0),
            ));
        }
        if has_timestamp {
            let ts = NaiveDate::from_ymd_opt(
                parts.year.unwrap_or(1900),
                parts.month.unwrap_or(1),
                parts.day.unwrap_or(1),
            )
            .and_then(|date| {
                date.and_hms_opt(
                    parts.hour.unwrap_or(0),
                    parts.minute.unwrap_or(0),
                    parts.second.unwrap_or(0),
                )
            })
            .ok_or_else(|| TemplateError::InvalidTimestamp(filename.to_string()))?;
            tokens.timestamp = Some(ts);
        }

        Ok(tokens)
    }
}

fn set_once<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    conflict: impl Fn() -> TemplateError,
) -> Result<(), TemplateError> {
    match slot {
        Some(existing) if *existing != value => Err(conflict()),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid timestamp")
    }

    fn tokens() -> Tokens {
        Tokens {
            naming: Some("conn_local".to_string()),
            domain: Some("demo".to_string()),
            compress: Some(Compression::Gzip),
            extension: Some(Extension::Json),
            version: Some(Version::new(1, 4, 2)),
            timestamp: Some(ts(2024, 2, 29, 7, 5, 9)),
        }
    }

    #[test]
    fn encode_timestamp_template() {
        let template = FormatTemplate::parse("{naming:%s}.{timestamp:%Y%m%d_%H%M%S}").expect("parse");
        let name = template.encode(&tokens()).expect("encode");
        assert_eq!(name, "conn_local.20240229_070509");
    }

    #[test]
    fn encode_version_template() {
        let template = FormatTemplate::parse("{naming:%s}.{version:v%m.%n.%c}.json").expect("parse");
        let name = template.encode(&tokens()).expect("encode");
        assert_eq!(name, "conn_local.v1.4.2.json");
    }

    #[test]
    fn decode_restores_only_mentioned_tokens() {
        let template = FormatTemplate::parse("{naming:%s}.{version:v%m.%n.%c}.json").expect("parse");
        let decoded = template.decode("conn_local.v1.4.2.json").expect("decode");

        assert_eq!(decoded.naming.as_deref(), Some("conn_local"));
        assert_eq!(decoded.version, Some(Version::new(1, 4, 2)));
        assert_eq!(decoded.timestamp, None);
        assert_eq!(decoded.domain, None);
    }

    #[test]
    fn round_trip_full_template() {
        let template = FormatTemplate::parse(
            "{domain:%s}.{naming:%s}.{version:v%m.%n.%c}.{timestamp:%Y-%m-%d %H%M%S}.{extension:%s}.{compress:%s}",
        )
        .expect("parse");
        let original = tokens();
        let name = template.encode(&original).expect("encode");
        assert_eq!(template.decode(&name).expect("decode"), original);
    }

    #[test]
    fn fixed_directives_only_accept_their_value() {
        let template = FormatTemplate::parse("{naming}.{extension:%j}.{compress:%-g}").expect("parse");

        let mut t = tokens();
        t.compress = Some(Compression::Gz);
        assert_eq!(template.encode(&t).expect("encode"), "conn_local.json.gz");

        t.compress = Some(Compression::Xz);
        assert!(matches!(
            template.encode(&t),
            Err(TemplateError::TokenMismatch {
                token: TokenKind::Compress,
                ..
            })
        ));
        assert!(template.decode("conn_local.json.xz").is_err());
    }

    #[test]
    fn missing_token_is_reported() {
        let template = FormatTemplate::parse("{naming:%s}.{version:v%m.%n.%c}").expect("parse");
        let mut t = tokens();
        t.version = None;
        assert_eq!(
            template.encode(&t),
            Err(TemplateError::MissingToken(TokenKind::Version))
        );
    }

    #[test]
    fn non_matching_filename_is_typed_error() {
        let template = FormatTemplate::parse("{naming:%s}.{timestamp:%Y%m%d_%H%M%S}").expect("parse");

        for bad in [
            "conn_local.2024022_070509",
            "conn_local.20240229_070509.json",
            "conn.local.20240229_070509",
            "",
        ] {
            assert!(
                matches!(template.decode(bad), Err(TemplateError::NoMatch { .. })),
                "{bad:?} should not match"
            );
        }
    }

    #[test]
    fn impossible_date_is_invalid_timestamp() {
        let template = FormatTemplate::parse("{naming:%s}.{timestamp:%Y%m%d}").expect("parse");
        assert!(matches!(
            template.decode("conn_local.20230230"),
            Err(TemplateError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn pinned_matcher_rejects_other_entries() {
        let template = FormatTemplate::parse("{naming:%s}.{timestamp:%Y%m%d_%H%M%S}").expect("parse");
        let pinned = Tokens {
            naming: Some("conn".to_string()),
            ..Tokens::default()
        };
        let matcher = template.matcher(&pinned).expect("matcher");

        assert!(matcher.is_match("conn.20240101_000000"));
        assert!(!matcher.is_match("conn_other.20240101_000000"));
    }

    #[test]
    fn repeated_directive_must_agree() {
        let template = FormatTemplate::parse("{version:v%m}-{version:%m}").expect("parse");
        assert!(template.decode("v3-3").is_ok());
        assert!(matches!(
            template.decode("v3-4"),
            Err(TemplateError::Conflict { .. })
        ));
    }

    #[test]
    fn short_year_uses_posix_pivot() {
        let template = FormatTemplate::parse("{timestamp:%y%m%d}").expect("parse");
        let early = template.decode("690101").expect("decode");
        let late = template.decode("680101").expect("decode");
        assert_eq!(early.timestamp, Some(ts(1969, 1, 1, 0, 0, 0)));
        assert_eq!(late.timestamp, Some(ts(2068, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn short_year_encode_rejects_years_outside_pivot() {
        let template = FormatTemplate::parse("{naming:%s}.{timestamp:%y%m%d}").expect("parse");
        let at = |year| Tokens {
            naming: Some("conn".to_string()),
            timestamp: Some(ts(year, 1, 1, 0, 0, 0)),
            ..Tokens::default()
        };

        assert!(matches!(
            template.encode(&at(1950)),
            Err(TemplateError::TokenMismatch {
                token: TokenKind::Timestamp,
                ..
            })
        ));
        assert!(template.encode(&at(2069)).is_err());

        for year in [1969, 2000, 2068] {
            let name = template.encode(&at(year)).expect("encode");
            assert_eq!(template.decode(&name).expect("decode"), at(year));
        }
    }

    #[test]
    fn percent_escape_is_literal() {
        let template = FormatTemplate::parse("{version:%m%%}").expect("parse");
        let t = Tokens {
            version: Some(Version::new(7, 0, 0)),
            ..Tokens::default()
        };
        assert_eq!(template.encode(&t).expect("encode"), "7%");
    }

    #[test]
    fn malformed_templates_rejected() {
        for bad in ["{naming:%s", "naming}", "{nam{ing}", "{naming:%}", "{naming:%-}"] {
            assert!(
                matches!(FormatTemplate::parse(bad), Err(TemplateError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
        assert!(matches!(
            FormatTemplate::parse("{owner:%s}"),
            Err(TemplateError::UnknownToken(_))
        ));
        assert!(matches!(
            FormatTemplate::parse("{version:%Y}"),
            Err(TemplateError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn fields_lists_mentioned_tokens() {
        let template = FormatTemplate::parse("{naming}.{version}").expect("parse");
        let fields: Vec<_> = template.fields().into_iter().collect();
        assert_eq!(fields, vec![TokenKind::Naming, TokenKind::Version]);
    }

    #[test]
    fn sort_key_orders_by_timestamp_then_version() {
        let mut older = tokens();
        older.timestamp = Some(ts(2024, 1, 1, 0, 0, 0));
        older.version = Some(Version::new(9, 9, 9));
        let newer = tokens();
        assert!(older.sort_key() < newer.sort_key());

        let mut same_time_higher = tokens();
        same_time_higher.version = Some(Version::new(1, 5, 0));
        assert!(newer.sort_key() < same_time_higher.sort_key());
    }
}
