//! Routing trie
//!
//! One [`Endpoint`] per path segment. Children are keyed by [`SegmentKey`]: a literal
//! segment, the trailing-slash index, a single named parameter or a single wildcard
//! that absorbs the rest of the path.
//!
//! A node holds at most one of {parameter, wildcard} child. A literal may not sit
//! next to a parameter, and a wildcard may not sit next to anything. Registration
//! checks these rules on the whole template before creating any node.

use super::error::RouteError;
use super::handle::{Handle, Params};
use hyper::Method;
use std::collections::HashMap;
use std::sync::Arc;

/// Key of a child edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKey {
    Literal(String),
    /// Empty final segment of a path ending in `/`
    Index,
    Param,
    Wildcard,
}

/// One segment of a route template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: SegmentKey,
    /// Bound name for `Param` and `Wildcard`, empty otherwise
    pub parameter: String,
}

/// Result of resolving a request against the trie
pub enum Lookup {
    Found { handle: Handle, parameters: Params },
    MethodNotAllowed,
    NotFound,
}

#[derive(Default)]
pub struct Endpoint {
    methods: HashMap<Method, Handle>,
    children: HashMap<SegmentKey, Endpoint>,
    parameter: String,
}

/// Split a route template into segments
///
/// The template must start with `/`. `:name` and `*name` are only dynamic when the
/// name is non-empty; a wildcard ends the template and anything after it is ignored.
pub fn parse_template(path: &str) -> Vec<Segment> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let parts: Vec<&str> = rest.split('/').collect();
    let last = parts.len() - 1;

    let mut segments = Vec::with_capacity(parts.len());
    for (i, part) in parts.into_iter().enumerate() {
        if i == last && part.is_empty() {
            segments.push(Segment {
                key: SegmentKey::Index,
                parameter: String::new(),
            });
            break;
        }
        if part.len() > 1 {
            if let Some(name) = part.strip_prefix('*') {
                segments.push(Segment {
                    key: SegmentKey::Wildcard,
                    parameter: name.to_string(),
                });
                break;
            }
            if let Some(name) = part.strip_prefix(':') {
                segments.push(Segment {
                    key: SegmentKey::Param,
                    parameter: name.to_string(),
                });
                continue;
            }
        }
        segments.push(Segment {
            key: SegmentKey::Literal(part.to_string()),
            parameter: String::new(),
        });
    }
    segments
}

impl Endpoint {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_parameter(parameter: String) -> Self {
        Self {
            parameter,
            ..Self::default()
        }
    }

    /// True when no route is registered below this node
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.children.is_empty()
    }

    /// Drop every route
    pub fn clear(&mut self) {
        self.methods.clear();
        self.children.clear();
    }

    /// Register `handle` for `method` on a template path
    ///
    /// Fails without touching the trie if the template collides with an existing
    /// route.
    pub fn insert(&mut self, method: Method, path: &str, handle: Handle) -> Result<(), RouteError> {
        let segments = parse_template(path);
        self.check(&method, path, &segments)?;

        let mut node = self;
        for segment in segments {
            node = node
                .children
                .entry(segment.key)
                .or_insert_with(|| Self::with_parameter(segment.parameter));
        }
        node.methods.insert(method, handle);
        Ok(())
    }

    /// Remove the handler for `method` on a template path
    ///
    /// Parameter names in the template are ignored. The leaf edge is pruned once it
    /// holds neither methods nor children; ancestors are left in place. Returns
    /// whether a handler was removed.
    pub fn remove(&mut self, method: &Method, path: &str) -> bool {
        let segments = parse_template(path);
        self.remove_segments(method, &segments)
    }

    /// Resolve a request path
    ///
    /// A wildcard directly under the root catches every path. Elsewhere a literal
    /// child wins over a wildcard, which wins over a parameter. A parameter never
    /// matches the trailing-slash index.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        if let Some(wildcard) = self.children.get(&SegmentKey::Wildcard) {
            let mut parameters = Params::new();
            parameters.insert(
                wildcard.parameter.clone(),
                path.strip_prefix('/').unwrap_or(path).to_string(),
            );
            return wildcard.resolve(method, parameters);
        }

        let Some(rest) = path.strip_prefix('/') else {
            return Lookup::NotFound;
        };
        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len() - 1;

        let mut parameters = Params::new();
        let mut node = self;
        for (i, part) in parts.iter().enumerate() {
            let key = if i == last && part.is_empty() {
                SegmentKey::Index
            } else {
                SegmentKey::Literal((*part).to_string())
            };

            if let Some(child) = node.children.get(&key) {
                node = child;
                continue;
            }

            if let Some(wildcard) = node.children.get(&SegmentKey::Wildcard) {
                let joined = parts[i..].join("/");
                let value = joined.strip_suffix('/').unwrap_or(&joined);
                parameters.insert(wildcard.parameter.clone(), value.to_string());
                return wildcard.resolve(method, parameters);
            }

            match (key, node.children.get(&SegmentKey::Param)) {
                (SegmentKey::Literal(value), Some(param)) => {
                    parameters.insert(param.parameter.clone(), value);
                    node = param;
                }
                _ => return Lookup::NotFound,
            }
        }

        node.resolve(method, parameters)
    }

    fn resolve(&self, method: &Method, parameters: Params) -> Lookup {
        match self.methods.get(method) {
            Some(handle) => Lookup::Found {
                handle: Arc::clone(handle),
                parameters,
            },
            None if self.methods.is_empty() => Lookup::NotFound,
            None => Lookup::MethodNotAllowed,
        }
    }

    fn check(&self, method: &Method, path: &str, segments: &[Segment]) -> Result<(), RouteError> {
        let mut node = self;
        for segment in segments {
            node.check_child(segment, path)?;
            match node.children.get(&segment.key) {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }

        if node.methods.contains_key(method) {
            return Err(RouteError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn check_child(&self, segment: &Segment, path: &str) -> Result<(), RouteError> {
        if let Some(wildcard) = self.children.get(&SegmentKey::Wildcard) {
            if segment.key != SegmentKey::Wildcard {
                return Err(RouteError::WildcardConflict {
                    path: path.to_string(),
                });
            }
            if wildcard.parameter != segment.parameter {
                return Err(RouteError::WildcardNameConflict {
                    path: path.to_string(),
                    existing: wildcard.parameter.clone(),
                    requested: segment.parameter.clone(),
                });
            }
            return Ok(());
        }

        match &segment.key {
            SegmentKey::Wildcard if !self.children.is_empty() => Err(RouteError::WildcardConflict {
                path: path.to_string(),
            }),
            SegmentKey::Param => {
                if let Some(param) = self.children.get(&SegmentKey::Param) {
                    if param.parameter != segment.parameter {
                        return Err(RouteError::ParameterNameConflict {
                            path: path.to_string(),
                            existing: param.parameter.clone(),
                            requested: segment.parameter.clone(),
                        });
                    }
                    return Ok(());
                }
                if self
                    .children
                    .keys()
                    .any(|key| matches!(key, SegmentKey::Literal(_)))
                {
                    return Err(RouteError::ParameterConflict {
                        path: path.to_string(),
                        segment: format!(":{}", segment.parameter),
                    });
                }
                Ok(())
            }
            SegmentKey::Literal(literal) if self.children.contains_key(&SegmentKey::Param) => {
                Err(RouteError::ParameterConflict {
                    path: path.to_string(),
                    segment: literal.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn remove_segments(&mut self, method: &Method, segments: &[Segment]) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            return false;
        };
        let Some(child) = self.children.get_mut(&first.key) else {
            return false;
        };

        if !rest.is_empty() {
            return child.remove_segments(method, rest);
        }

        let removed = child.methods.remove(method).is_some();
        if child.is_empty() {
            self.children.remove(&first.key);
        }
        removed
    }
}
