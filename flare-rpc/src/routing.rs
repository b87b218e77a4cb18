//! Maps service/method names to two-segment addresses.
//!
//! Addresses look like `/{service}/{method}`. Matching folds case unless the
//! router was built case-sensitive; generated addresses always keep the
//! registered casing.

use hashbrown::HashMap;

use crate::context::fold_case;
use crate::error::ConfigError;

pub fn address(service: &str, method: &str) -> String {
    format!("/{service}/{method}")
}

/// Canonical form of `path` if it has exactly two non-empty segments.
/// The leading `/` is optional.
fn normalize(path: &str) -> Option<String> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let mut segments = path.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(service), Some(method), None)
            if !service.is_empty() && !method.is_empty() =>
        {
            Some(address(service, method))
        }
        _ => None,
    }
}

/// Matches paths of exactly two non-empty segments against one address.
///
/// The leading `/` of a path is optional, so `calc/plus` and `/calc/plus`
/// are the same address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressPattern {
    literal: String,
    folded: Option<String>,
}

impl AddressPattern {
    pub fn new(service: &str, method: &str, case_sensitive: bool) -> Self {
        let literal = address(service, method);
        let folded = (!case_sensitive).then(|| fold_case(&literal));
        AddressPattern { literal, folded }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.folded.is_none()
    }

    pub fn matches(&self, path: &str) -> bool {
        let Some(path) = normalize(path) else {
            return false;
        };
        match &self.folded {
            Some(folded) => fold_case(&path) == *folded,
            None => path == self.literal,
        }
    }

    fn key(&self) -> &str {
        self.folded.as_deref().unwrap_or(&self.literal)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub service: String,
    pub method: String,
    pub pattern: AddressPattern,
}

#[derive(Clone, Debug)]
pub struct Router {
    case_sensitive: bool,
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl Router {
    pub fn new<I, S, M>(names: I, case_sensitive: bool) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, M)>,
        S: Into<String>,
        M: Into<String>,
    {
        let mut routes: Vec<Route> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (service, method) in names {
            let service = service.into();
            let method = method.into();
            let pattern = AddressPattern::new(&service, &method, case_sensitive);
            if let Some(&existing) = index.get(pattern.key()) {
                let existing: &Route = &routes[existing];
                return Err(ConfigError::RouteCollision {
                    address: pattern.literal,
                    existing: existing.pattern.literal.clone(),
                });
            }
            index.insert(pattern.key().to_string(), routes.len());
            routes.push(Route {
                service,
                method,
                pattern,
            });
        }
        Ok(Router {
            case_sensitive,
            routes,
            index,
        })
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route for `path`, with or without its leading `/`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize(path)?;
        let key = if self.case_sensitive {
            path
        } else {
            fold_case(&path)
        };
        self.index.get(&key).map(|&i| &self.routes[i])
    }
}
