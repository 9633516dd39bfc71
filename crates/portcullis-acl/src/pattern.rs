use crate::scope::Labels;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid regex pattern {raw:?}: {source}")]
    BadRegex {
        raw: String,
        #[source]
        source: regex::Error,
    },
}

/// Variables available to `${account}` / `${labels:KEY}` substitution.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionContext<'a> {
    pub account: &'a str,
    pub labels: &'a Labels,
}

/// A single match-condition pattern.
///
/// The grammar, in match order:
/// - `**` matches any value, including the empty string;
/// - `/re/` is an anchored regular expression;
/// - anything containing `*` or `?` is a glob;
/// - everything else is literal equality.
///
/// Patterns without substitution tokens are compiled when the ACL is
/// loaded. A pattern that does contain `${…}` has to be expanded against
/// the request before it can be compiled, so those are parsed per match.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    compiled: Option<Compiled>,
}

#[derive(Debug, Clone)]
enum Compiled {
    Any,
    Literal(String),
    Regex(Regex),
    Glob(String),
}

impl Pattern {
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        let compiled = if raw.contains("${") {
            None
        } else {
            Some(classify(raw)?)
        };
        Ok(Self {
            raw: raw.to_string(),
            compiled,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Match without substitution (account, type, service conditions).
    pub fn matches(&self, value: &str) -> bool {
        match &self.compiled {
            Some(compiled) => compiled.matches(value),
            // Substitution tokens outside the name condition are never
            // bound; fall back to treating the raw text literally.
            None => self.raw == value,
        }
    }

    /// Match with substitution applied first (the name condition).
    ///
    /// A pattern that expands to the empty string from a non-empty raw
    /// form consisted only of unbound substitutions and matches nothing.
    pub fn matches_with(&self, value: &str, ctx: &SubstitutionContext<'_>) -> bool {
        match &self.compiled {
            Some(compiled) => compiled.matches(value),
            None => expand(&self.raw, ctx).iter().any(|candidate| {
                if candidate.is_empty() && !self.raw.is_empty() {
                    return false;
                }
                match classify(candidate) {
                    Ok(compiled) => compiled.matches(value),
                    Err(_) => false,
                }
            }),
        }
    }
}

impl Compiled {
    fn matches(&self, value: &str) -> bool {
        match self {
            Compiled::Any => true,
            Compiled::Literal(literal) => literal == value,
            Compiled::Regex(re) => re.is_match(value),
            Compiled::Glob(glob) => glob_match(glob, value),
        }
    }
}

fn classify(raw: &str) -> Result<Compiled, PatternError> {
    if raw == "**" {
        return Ok(Compiled::Any);
    }
    if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
        let inner = &raw[1..raw.len() - 1];
        let re = Regex::new(&format!("^(?:{inner})$")).map_err(|source| PatternError::BadRegex {
            raw: raw.to_string(),
            source,
        })?;
        return Ok(Compiled::Regex(re));
    }
    if raw.contains('*') || raw.contains('?') {
        return Ok(Compiled::Glob(raw.to_string()));
    }
    Ok(Compiled::Literal(raw.to_string()))
}

/// Expand substitution tokens, producing one candidate per combination of
/// label values. `${account}` is always bound (possibly to the empty
/// string); a missing label key expands to empty. Unknown tokens are kept
/// verbatim.
fn expand(raw: &str, ctx: &SubstitutionContext<'_>) -> Vec<String> {
    let mut candidates = vec![String::new()];
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let end = start + end;
        let literal = &rest[..start];
        let token = &rest[start + 2..end];
        for candidate in &mut candidates {
            candidate.push_str(literal);
        }
        let values: Vec<&str> = if token == "account" {
            vec![ctx.account]
        } else if let Some(key) = token.strip_prefix("labels:") {
            match ctx.labels.get(key) {
                Some(values) if !values.is_empty() => {
                    values.iter().map(String::as_str).collect()
                }
                _ => vec![""],
            }
        } else {
            // Not a recognized token; keep the text as-is.
            for candidate in &mut candidates {
                candidate.push_str(&rest[start..=end]);
            }
            rest = &rest[end + 1..];
            continue;
        };
        candidates = candidates
            .iter()
            .flat_map(|candidate| {
                values.iter().map(move |value| {
                    let mut next = candidate.clone();
                    next.push_str(value);
                    next
                })
            })
            .collect();
        rest = &rest[end + 1..];
    }
    for candidate in &mut candidates {
        candidate.push_str(rest);
    }
    candidates
}

/// Iterative glob matcher: `*` matches any run (including empty), `?`
/// matches exactly one byte. Backtracks to the last `*` on mismatch.
pub(crate) fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let (mut p_idx, mut v_idx) = (0usize, 0usize);
    let (mut star_idx, mut match_idx) = (None, 0usize);
    let pattern_bytes = pattern.as_bytes();
    let value_bytes = value.as_bytes();

    while v_idx < value_bytes.len() {
        if p_idx < pattern_bytes.len() && pattern_bytes[p_idx] == b'*' {
            star_idx = Some(p_idx);
            match_idx = v_idx;
            p_idx += 1;
            continue;
        }

        if p_idx < pattern_bytes.len()
            && (pattern_bytes[p_idx] == b'?' || pattern_bytes[p_idx] == value_bytes[v_idx])
        {
            p_idx += 1;
            v_idx += 1;
            continue;
        }

        if let Some(star) = star_idx {
            p_idx = star + 1;
            match_idx += 1;
            v_idx = match_idx;
            continue;
        }

        return false;
    }

    while p_idx < pattern_bytes.len() && pattern_bytes[p_idx] == b'*' {
        p_idx += 1;
    }

    p_idx == pattern_bytes.len()
}
