use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::error::ConfigError;

/// Whether a method completes in place or returns a future.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Sync,
    Async,
}

/// One method of an [`Interface`].
#[derive(Clone, Debug)]
pub struct MethodDecl {
    name: String,
    wire_name: Option<String>,
    params: Vec<String>,
    shape: Shape,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        MethodDecl {
            name: name.into(),
            wire_name: None,
            params: Vec::new(),
            shape,
        }
    }

    pub fn sync(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Sync)
    }

    pub fn future(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Async)
    }

    /// Explicit wire name, used instead of the declared name.
    pub fn named(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn params<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// A declared service: its name and the methods it exposes.
///
/// Shared by the dispatcher and the client proxy so both sides derive
/// addresses from the same declaration.
#[derive(Clone, Debug)]
pub struct Interface {
    name: String,
    methods: Vec<MethodDecl>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Interface {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// Apply `overrides` and validate the resulting names.
    pub fn resolve(
        &self,
        overrides: &NamingOverrides,
    ) -> Result<ServiceNames, ConfigError> {
        let service = overrides
            .service
            .clone()
            .unwrap_or_else(|| self.name.clone());
        check_segment(&service)?;

        for declared in overrides.methods.keys() {
            self.find(declared).ok_or_else(|| ConfigError::UnknownMethod {
                service: service.clone(),
                method: declared.clone(),
            })?;
        }
        for (declared, param) in overrides.params.keys() {
            let known = self
                .find(declared)
                .map(|m| m.params.contains(param))
                .unwrap_or(false);
            if !known {
                return Err(ConfigError::UnknownParam {
                    service: service.clone(),
                    method: declared.clone(),
                    param: param.clone(),
                });
            }
        }

        let mut declared_seen = HashSet::new();
        let mut wire_seen = HashSet::new();
        let mut methods = Vec::with_capacity(self.methods.len());
        for decl in &self.methods {
            if !declared_seen.insert(decl.name.as_str()) {
                return Err(ConfigError::DuplicateMethod {
                    service,
                    method: decl.name.clone(),
                });
            }
            let name = overrides
                .methods
                .get(&decl.name)
                .or(decl.wire_name.as_ref())
                .unwrap_or(&decl.name)
                .clone();
            check_segment(&name)?;
            if !wire_seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateMethod {
                    service,
                    method: name,
                });
            }

            let mut params = Vec::with_capacity(decl.params.len());
            for (index, declared) in decl.params.iter().enumerate() {
                let param = overrides
                    .params
                    .get(&(decl.name.clone(), declared.clone()))
                    .unwrap_or(declared)
                    .clone();
                if param.trim().is_empty() {
                    return Err(ConfigError::MissingParamName {
                        service,
                        method: name,
                        index,
                    });
                }
                if params.contains(&param) {
                    return Err(ConfigError::DuplicateParam {
                        service,
                        method: name,
                        param,
                    });
                }
                params.push(param);
            }

            methods.push(MethodNames {
                declared: decl.name.clone(),
                name,
                params: params.into(),
                shape: decl.shape,
            });
        }

        Ok(ServiceNames { service, methods })
    }

    fn find(&self, declared: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == declared)
    }
}

/// Names must fit in one address segment.
fn check_segment(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "empty"
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "contains whitespace"
    } else if name.chars().any(|c| matches!(c, '/' | '*' | '$' | '?' | '#')) {
        "contains a reserved character"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Renames applied on top of an [`Interface`] when binding or proxying it.
#[derive(Clone, Debug, Default)]
pub struct NamingOverrides {
    service: Option<String>,
    methods: HashMap<String, String>,
    params: HashMap<(String, String), String>,
}

impl NamingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(name.into());
        self
    }

    pub fn method(
        mut self,
        declared: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.methods.insert(declared.into(), name.into());
        self
    }

    pub fn param(
        mut self,
        method: impl Into<String>,
        declared: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.params
            .insert((method.into(), declared.into()), name.into());
        self
    }
}

/// Resolved, validated names of a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceNames {
    pub service: String,
    pub methods: Vec<MethodNames>,
}

impl ServiceNames {
    /// Look up by declared method name.
    pub fn method(&self, declared: &str) -> Option<&MethodNames> {
        self.methods.iter().find(|m| m.declared == declared)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodNames {
    pub declared: String,
    /// Wire name.
    pub name: String,
    pub params: Arc<[String]>,
    pub shape: Shape,
}
