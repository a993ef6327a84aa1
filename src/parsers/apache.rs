use crate::entry::{escape_control, LogEntry};
use crate::error::ConfigError;
use crate::parsers::EntryParser;
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

/// Piece of a LogFormat template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Directive(Directive),
}

/// One `%...` placeholder, e.g. `%>s` or `%{User-Agent}i`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    /// `<` or `>` status modifier
    modifier: Option<char>,
    param: Option<String>,
    kind: char,
}

impl Directive {
    fn is_byte_count(&self) -> bool {
        matches!(self.kind, 'b' | 'B' | 'I' | 'O' | 'S')
    }
}

/// Entry field a capture group feeds
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    RemoteHost,
    ClientIp,
    Time(TimeFormat),
    Request,
    Status,
    FinalStatus,
    Bytes,
    UserAgent,
    Referrer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimeFormat {
    /// `[10/Oct/2000:13:55:36 -0700]`
    Common,
    Strftime(String),
    Seconds,
    Millis,
    Micros,
}

/// Apache `LogFormat` template compiled into an anchored regex
#[derive(Debug, Clone)]
pub struct ApacheLogFormat {
    template: String,
    tokens: Vec<Token>,
    regex: Regex,
    fields: Vec<Field>,
}

impl ApacheLogFormat {
    pub fn new(template: &str) -> Result<Self, ConfigError> {
        let tokens = tokenize(template).map_err(|reason| ConfigError::InvalidLogFormat {
            format: template.to_string(),
            reason,
        })?;
        Self::compile(template.to_string(), tokens)
    }

    fn compile(template: String, tokens: Vec<Token>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidLogFormat {
            format: template.clone(),
            reason,
        };

        let mut pattern = String::from("^");
        let mut fields = Vec::new();
        for token in &tokens {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(text)),
                Token::Directive(directive) => {
                    let (sub_pattern, field) = directive_pattern(directive).map_err(invalid)?;
                    match field {
                        Some(field) => {
                            fields.push(field);
                            pattern.push('(');
                        }
                        None => pattern.push_str("(?:"),
                    }
                    pattern.push_str(sub_pattern);
                    pattern.push(')');
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            template,
            tokens,
            regex,
            fields,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn has_byte_counts(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Directive(d) if d.is_byte_count()))
    }

    /// Same grammar with `%b %B %I %O %S` and the whitespace before them
    /// removed. Requests served to local clients may lack those fields.
    pub fn without_byte_counts(&self) -> Result<Self, ConfigError> {
        let mut tokens: Vec<Token> = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match token {
                Token::Directive(d) if d.is_byte_count() => {
                    if let Some(Token::Literal(text)) = tokens.last_mut() {
                        let trimmed = text.trim_end().len();
                        text.truncate(trimmed);
                        if text.is_empty() {
                            tokens.pop();
                        }
                    }
                }
                Token::Literal(text) => match tokens.last_mut() {
                    Some(Token::Literal(prev)) => prev.push_str(text),
                    _ => tokens.push(token.clone()),
                },
                _ => tokens.push(token.clone()),
            }
        }
        Self::compile(self.template.clone(), tokens)
    }
}

fn tokenize(template: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        let mut modifier = None;
        let mut param = None;
        // Status modifiers and status conditions (`%400,501{User-agent}i`)
        // only affect what Apache writes, not the shape of the field.
        loop {
            match chars.peek().copied() {
                Some('<') | Some('>') => modifier = chars.next(),
                Some('!') | Some(',') => {
                    chars.next();
                }
                Some(d) if d.is_ascii_digit() => {
                    chars.next();
                }
                Some('{') => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => value.push(ch),
                            None => return Err("unterminated '{' in directive".to_string()),
                        }
                    }
                    param = Some(value);
                }
                _ => break,
            }
        }

        let kind = chars
            .next()
            .ok_or_else(|| "dangling '%' at end of format".to_string())?;
        if kind == '%' {
            literal.push('%');
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(Token::Directive(Directive {
            modifier,
            param,
            kind,
        }));
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn directive_pattern(directive: &Directive) -> Result<(&'static str, Option<Field>), String> {
    let pattern = match directive.kind {
        'h' => (r"\S+", Some(Field::RemoteHost)),
        'a' => (r"\S+", Some(Field::ClientIp)),
        'A' | 'f' | 'H' | 'l' | 'L' | 'm' | 'R' | 'u' | 'U' | 'v' | 'V' => (r"\S*", None),
        'q' => (r"\S*", None),
        'P' => (r"\S+", None),
        'r' => (r".*?", Some(Field::Request)),
        's' => {
            let field = if directive.modifier == Some('>') {
                Field::FinalStatus
            } else {
                Field::Status
            };
            (r"\d{3}|-", Some(field))
        }
        'b' | 'B' => (r"\d+|-", Some(Field::Bytes)),
        'I' | 'O' | 'S' | 'D' | 'T' | 'p' | 'k' => (r"\d+|-", None),
        'X' => (r"[X+\-]", None),
        't' => time_pattern(directive.param.as_deref()),
        'i' => {
            let name = directive
                .param
                .as_deref()
                .ok_or_else(|| "%i requires a header name".to_string())?;
            let field = match name.to_ascii_lowercase().as_str() {
                "user-agent" => Some(Field::UserAgent),
                "referer" | "referrer" => Some(Field::Referrer),
                _ => None,
            };
            (r".*?", field)
        }
        'o' | 'e' | 'n' | 'C' => {
            if directive.param.is_none() {
                return Err(format!("%{} requires a name", directive.kind));
            }
            (r".*?", None)
        }
        other => return Err(format!("unknown directive %{}", other)),
    };
    Ok(pattern)
}

fn time_pattern(param: Option<&str>) -> (&'static str, Option<Field>) {
    let Some(param) = param else {
        return (r"\[[^\]]+\]", Some(Field::Time(TimeFormat::Common)));
    };
    let param = param
        .strip_prefix("begin:")
        .or_else(|| param.strip_prefix("end:"))
        .unwrap_or(param);

    match param {
        "sec" => (r"\d+", Some(Field::Time(TimeFormat::Seconds))),
        "msec" => (r"\d+", Some(Field::Time(TimeFormat::Millis))),
        "usec" => (r"\d+", Some(Field::Time(TimeFormat::Micros))),
        "msec_frac" | "usec_frac" => (r"\d+", None),
        format => (
            r".+?",
            Some(Field::Time(TimeFormat::Strftime(format.to_string()))),
        ),
    }
}

fn parse_time(format: &TimeFormat, value: &str) -> Option<NaiveDateTime> {
    match format {
        TimeFormat::Common => {
            let value = value.trim_start_matches('[').trim_end_matches(']');
            DateTime::parse_from_str(value, "%d/%b/%Y:%H:%M:%S %z")
                .map(|dt| dt.naive_local())
                .or_else(|_| NaiveDateTime::parse_from_str(value, "%d/%b/%Y:%H:%M:%S"))
                .ok()
        }
        TimeFormat::Strftime(fmt) => DateTime::parse_from_str(value, fmt)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(value, fmt))
            .ok(),
        TimeFormat::Seconds => from_epoch(value, 1),
        TimeFormat::Millis => from_epoch(value, 1_000),
        TimeFormat::Micros => from_epoch(value, 1_000_000),
    }
}

fn from_epoch(value: &str, units_per_sec: i64) -> Option<NaiveDateTime> {
    let units = value.parse::<i64>().ok()?;
    let secs = units.div_euclid(units_per_sec);
    let nanos = units.rem_euclid(units_per_sec) * (1_000_000_000 / units_per_sec);
    DateTime::<Utc>::from_timestamp(secs, nanos as u32).map(|dt| dt.naive_utc())
}

fn not_dash(value: &str) -> Option<&str> {
    if value == "-" {
        None
    } else {
        Some(value)
    }
}

impl EntryParser for ApacheLogFormat {
    fn parse(&self, line: &str) -> Result<LogEntry> {
        let captures = self
            .regex
            .captures(line)
            .ok_or_else(|| anyhow!("Line doesn't match log format '{}'", self.template))?;

        let mut remote_host = None;
        let mut client_ip = None;
        let mut time = None;
        let mut status = None;
        let mut final_status = None;
        let mut request = None;
        let mut bytes = None;
        let mut user_agent = None;
        let mut referrer = None;

        for (i, field) in self.fields.iter().enumerate() {
            let Some(m) = captures.get(i + 1) else {
                continue;
            };
            let value = m.as_str();
            match field {
                Field::RemoteHost => remote_host = Some(value),
                Field::ClientIp => client_ip = Some(value),
                Field::Time(format) => {
                    if time.is_none() {
                        let parsed = parse_time(format, value)
                            .ok_or_else(|| anyhow!("Invalid timestamp '{}'", value))?;
                        time = Some(parsed);
                    }
                }
                Field::Request => request = Some(value),
                Field::Status => status = not_dash(value).and_then(|s| s.parse::<u16>().ok()),
                Field::FinalStatus => {
                    final_status = not_dash(value).and_then(|s| s.parse::<u16>().ok())
                }
                Field::Bytes => bytes = not_dash(value).and_then(|s| s.parse::<u64>().ok()),
                Field::UserAgent => user_agent = not_dash(value),
                Field::Referrer => referrer = not_dash(value),
            }
        }

        let time = time.ok_or_else(|| anyhow!("Log format has no timestamp"))?;

        Ok(LogEntry {
            time,
            remote_host: remote_host.or(client_ip).unwrap_or_default().to_string(),
            status: final_status.or(status).unwrap_or(0),
            user_agent: user_agent.unwrap_or("-").to_string(),
            request: escape_control(request.unwrap_or_default()),
            referrer: referrer.map(str::to_string),
            bytes,
        })
    }
}
