//! Ordered path router.
//!
//! Patterns are matched in registration order and the first match wins.
//! Supported segments:
//!
//! - `/static` matches literally
//! - `/:name` captures one path segment (`[^/]+`)
//! - `/:name(<regex>)` captures with a custom pattern, which may span `/`
//!
//! The query string never takes part in matching.

use regex::Regex;

/// Errors raised while registering a route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid route pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Named parameters captured by a match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Value of a named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    pub params: Params,
}

struct Route<H> {
    pattern: String,
    regex: Regex,
    names: Vec<String>,
    handler: H,
}

/// Ordered route table.
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> std::fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| &r.pattern))
            .finish()
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Later registrations never shadow earlier ones.
    pub fn add(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        let (source, names) = compile_pattern(pattern)?;
        let regex = Regex::new(&source).map_err(|source| RouteError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;

        self.routes.push(Route {
            pattern: pattern.to_string(),
            regex,
            names,
            handler,
        });
        Ok(())
    }

    /// Builder-style [`add`](Self::add).
    pub fn route(mut self, pattern: &str, handler: H) -> Result<Self, RouteError> {
        self.add(pattern, handler)?;
        Ok(self)
    }

    /// Find the first route matching `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_, H>> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);

        self.routes.iter().find_map(|route| {
            let captures = route.regex.captures(path)?;
            let params = route
                .names
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect();
            Some(RouteMatch {
                handler: &route.handler,
                params: Params(params),
            })
        })
    }

    /// Registered patterns in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Translate a route pattern into an anchored regex and its parameter names.
fn compile_pattern(pattern: &str) -> Result<(String, Vec<String>), RouteError> {
    let invalid = |reason: &str| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if !pattern.starts_with('/') {
        return Err(invalid("patterns must start with '/'"));
    }

    let mut source = String::from("^");
    let mut names = Vec::new();
    let mut rest = pattern;

    while let Some(after_slash) = rest.strip_prefix('/') {
        source.push('/');

        let Some(param) = after_slash.strip_prefix(':') else {
            let end = after_slash.find('/').unwrap_or(after_slash.len());
            source.push_str(&regex::escape(&after_slash[..end]));
            rest = &after_slash[end..];
            continue;
        };

        let name_len = param
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(param.len());
        if name_len == 0 {
            return Err(invalid("parameter name is empty"));
        }
        let name = &param[..name_len];
        if names.iter().any(|existing| existing == name) {
            return Err(invalid("duplicate parameter name"));
        }

        let after_name = &param[name_len..];
        let (class, remaining) = match after_name.strip_prefix('(') {
            Some(group) => {
                let close = matching_paren(group).ok_or_else(|| invalid("unclosed '('"))?;
                (&group[..close], &group[close + 1..])
            }
            None => ("[^/]+", after_name),
        };

        if !remaining.is_empty() && !remaining.starts_with('/') {
            return Err(invalid("parameter must end its segment"));
        }

        source.push_str(&format!("(?P<{name}>{class})"));
        names.push(name.to_string());
        rest = remaining;
    }

    source.push('$');
    Ok((source, names))
}

/// Index of the `)` closing a group whose `(` was already consumed.
fn matching_paren(group: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut in_class = false;

    for (idx, c) in group.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class && depth == 0 => return Some(idx),
            ')' if !in_class => depth -= 1,
            _ => {}
        }
    }
    None
}
