//! Directive lines (`name arg1 "arg two"`).
//!
//! A directive is one line of a route's `handle` list. Tokens are separated
//! by whitespace; double quotes group a token and `\"` escapes a quote
//! inside one. The first token is the directive name.

use crate::error::{ExtMetricsError, Result};

/// One tokenized directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
}

impl Directive {
    /// Tokenize a directive line.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = tokenize(line)?.into_iter();
        let name = tokens
            .next()
            .ok_or_else(|| ExtMetricsError::BadConfig("empty directive".into()))?;
        Ok(Self {
            name,
            args: tokens.collect(),
        })
    }

    /// Reject any argument. Used by directives that take none.
    pub fn expect_no_args(&self) -> Result<()> {
        match self.args.first() {
            None => Ok(()),
            Some(arg) => Err(self.arg_err(arg)),
        }
    }

    /// Reject more than `max` arguments.
    pub fn expect_at_most(&self, max: usize) -> Result<()> {
        match self.args.get(max) {
            None => Ok(()),
            Some(arg) => Err(self.arg_err(arg)),
        }
    }

    /// Required positional argument.
    pub fn arg(&self, idx: usize) -> Result<&str> {
        self.args
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| self.arg_err(""))
    }

    /// Build an argument error for this directive.
    pub fn arg_err(&self, arg: &str) -> ExtMetricsError {
        ExtMetricsError::ArgErr {
            directive: self.name.clone(),
            arg: arg.to_string(),
        }
    }
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                quoted = false;
            }
            '"' => {
                quoted = true;
                in_token = true;
            }
            '\\' if quoted => match chars.next() {
                Some(next) => cur.push(next),
                None => break,
            },
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    out.push(std::mem::take(&mut cur));
                    in_token = false;
                }
            }
            c => {
                cur.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ExtMetricsError::BadConfig(format!(
            "unterminated quote in directive: {line}"
        )));
    }
    if in_token {
        out.push(cur);
    }
    tracing::trace!(line, tokens = out.len(), "directive tokenized");
    Ok(out)
}
