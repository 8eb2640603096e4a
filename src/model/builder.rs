use super::core::{Locator, LocatorFactory, LocatorId, ModelError, Resource, ResourceMethod, ResourceModel};
use crate::invoke::{Handler, HandlerError, Invocation, Outcome};
use crate::media::{MediaType, WILDCARD};
use crate::model::LocatorArgs;
use crate::params::{BinderTable, ParamBinding, ParamSource};
use crate::template::UriTemplate;
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Builder for one resource method.
///
/// The verb is mandatory at construction, which is what structurally
/// guarantees every resource method has exactly one HTTP-method designator;
/// locators are declared separately and have none.
pub struct MethodBuilder {
    verb: Method,
    name: String,
    consumes: Vec<String>,
    produces: Vec<String>,
    bindings: Vec<ParamBinding>,
    handler: Option<Handler>,
}

impl MethodBuilder {
    #[must_use]
    pub fn new(verb: Method, name: &str) -> Self {
        MethodBuilder {
            verb,
            name: name.to_string(),
            consumes: Vec::new(),
            produces: Vec::new(),
            bindings: Vec::new(),
            handler: None,
        }
    }

    /// Declare a consumed media type; call repeatedly for an ordered list.
    #[must_use]
    pub fn consumes(mut self, media_type: &str) -> Self {
        self.consumes.push(media_type.to_string());
        self
    }

    /// Declare a produced media type; call repeatedly for an ordered list.
    /// A `qs` parameter (e.g. `application/json;qs=0.5`) weights negotiation.
    #[must_use]
    pub fn produces(mut self, media_type: &str) -> Self {
        self.produces.push(media_type.to_string());
        self
    }

    /// Declare a parameter binding, in argument order.
    #[must_use]
    pub fn param(mut self, binding: ParamBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Attach the invocation handle.
    #[must_use]
    pub fn handles(
        mut self,
        handler: impl Fn(&mut Invocation) -> Result<Outcome, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    fn build(self, effective_path: &str) -> Result<ResourceMethod, ModelError> {
        let handler = self.handler.ok_or_else(|| ModelError::MissingHandler {
            path: effective_path.to_string(),
            name: self.name.clone(),
        })?;
        Ok(ResourceMethod {
            verb: self.verb,
            name: self.name,
            consumes: parse_media_types(&self.consumes)?,
            produces: parse_media_types(&self.produces)?,
            bindings: self.bindings,
            handler,
        })
    }
}

fn parse_media_types(raw: &[String]) -> Result<Vec<MediaType>, ModelError> {
    if raw.is_empty() {
        return Ok(vec![WILDCARD.clone()]);
    }
    raw.iter()
        .map(|s| MediaType::parse(s).map_err(ModelError::from))
        .collect()
}

/// Builder for one resource node and its subtree.
pub struct ResourceBuilder {
    path: String,
    methods: Vec<MethodBuilder>,
    children: Vec<ResourceBuilder>,
    locators: Vec<(String, String, LocatorFactory)>,
}

impl ResourceBuilder {
    #[must_use]
    pub fn new(path: &str) -> Self {
        ResourceBuilder {
            path: path.to_string(),
            methods: Vec::new(),
            children: Vec::new(),
            locators: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a sub-resource: a child node with its own template and methods.
    #[must_use]
    pub fn child(mut self, child: ResourceBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Add a sub-resource locator. The factory runs lazily, at most once per
    /// request, and its produced resource continues the matching chain.
    #[must_use]
    pub fn locator(
        mut self,
        path: &str,
        name: &str,
        factory: impl for<'a> Fn(&LocatorArgs<'a>) -> Result<Resource, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.locators
            .push((path.to_string(), name.to_string(), Arc::new(factory)));
        self
    }

    /// Build this subtree outside of a [`ModelBuilder`].
    ///
    /// This is what locator factories use to assemble their transient
    /// resources. Path bindings are validated against this subtree's own
    /// templates only; parameters captured upstream of the locator are still
    /// delivered at request time.
    pub fn build_standalone(self) -> Result<Resource, ModelError> {
        self.build("", &HashSet::new())
    }

    fn build(
        self,
        parent_path: &str,
        ancestor_params: &HashSet<String>,
    ) -> Result<Resource, ModelError> {
        let template = UriTemplate::compile(&self.path)?;
        let effective_path = join_path(parent_path, template.raw());

        let mut visible_params: HashSet<String> = ancestor_params.clone();
        for name in template.param_names() {
            visible_params.insert(name.to_string());
        }

        let mut methods = Vec::with_capacity(self.methods.len());
        for builder in self.methods {
            let method = builder.build(&effective_path)?;
            for binding in &method.bindings {
                if binding.source == ParamSource::Path
                    && !visible_params.contains(binding.name.as_ref())
                {
                    return Err(ModelError::UnknownPathParameter {
                        path: effective_path,
                        method: method.name.clone(),
                        param: binding.name.to_string(),
                    });
                }
            }
            methods.push(Arc::new(method));
        }
        check_ambiguity(&methods, &effective_path)?;

        let mut children = Vec::with_capacity(self.children.len());
        for child in self.children {
            children.push(Arc::new(child.build(&effective_path, &visible_params)?));
        }
        children.sort_by(|a, b| a.template.cmp(&b.template));
        check_sibling_ambiguity(&children, &effective_path)?;

        let mut locators = Vec::with_capacity(self.locators.len());
        for (path, name, factory) in self.locators {
            locators.push(Arc::new(Locator {
                id: LocatorId::next(),
                name,
                template: UriTemplate::compile(&path)?,
                factory,
            }));
        }
        locators.sort_by(|a, b| a.template.cmp(&b.template));

        Ok(Resource {
            template,
            methods,
            children,
            locators,
        })
    }
}

/// Reject sibling methods with identical (verb, consumes, produces) triples.
fn check_ambiguity(methods: &[Arc<ResourceMethod>], path: &str) -> Result<(), ModelError> {
    for (i, a) in methods.iter().enumerate() {
        for b in &methods[i + 1..] {
            if a.verb == b.verb && a.consumes == b.consumes && a.produces == b.produces {
                return Err(ModelError::AmbiguousMethod {
                    path: path.to_string(),
                    verb: a.verb.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Children with identical templates act as one effective path; their merged
/// method set must also be unambiguous.
fn check_sibling_ambiguity(children: &[Arc<Resource>], path: &str) -> Result<(), ModelError> {
    for (i, a) in children.iter().enumerate() {
        for b in &children[i + 1..] {
            if a.template != b.template {
                continue;
            }
            let merged: Vec<Arc<ResourceMethod>> = a
                .methods
                .iter()
                .chain(b.methods.iter())
                .map(Arc::clone)
                .collect();
            check_ambiguity(&merged, &join_path(path, a.template.raw()))?;
        }
    }
    Ok(())
}

fn join_path(parent: &str, child: &str) -> String {
    if child == "/" {
        parent.to_string()
    } else {
        format!("{parent}{child}")
    }
}

/// Top-level builder producing a locked [`ResourceModel`].
pub struct ModelBuilder {
    resources: Vec<ResourceBuilder>,
    binder: BinderTable,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        ModelBuilder {
            resources: Vec::new(),
            binder: BinderTable::standard(),
        }
    }

    #[must_use]
    pub fn resource(mut self, resource: ResourceBuilder) -> Self {
        self.resources.push(resource);
        self
    }

    /// Replace the parameter converter table used by every method binding.
    #[must_use]
    pub fn binder(mut self, binder: BinderTable) -> Self {
        self.binder = binder;
        self
    }

    /// Validate and lock the model. Building is a pure function of the
    /// declared resources; after it returns, routing results are
    /// deterministic for any (method, path, headers) triple.
    pub fn build(self) -> Result<ResourceModel, ModelError> {
        let mut roots = Vec::with_capacity(self.resources.len());
        for resource in self.resources {
            roots.push(Arc::new(resource.build("", &HashSet::new())?));
        }
        roots.sort_by(|a, b| a.template.cmp(&b.template));
        check_sibling_ambiguity(&roots, "")?;

        let endpoint_count: usize = roots.iter().map(|r| count_methods(r)).sum();
        info!(
            resources = roots.len(),
            endpoints = endpoint_count,
            "resource model locked"
        );
        Ok(ResourceModel::new(roots, self.binder))
    }
}

fn count_methods(resource: &Resource) -> usize {
    resource.methods.len()
        + resource
            .children
            .iter()
            .map(|c| count_methods(c))
            .sum::<usize>()
}
