use crate::error::{MarmotError, Result};
use crate::models::id::{format_id, ModelId};
use crate::models::model::Model;
use crate::models::spec::{EntryPoint, Kwargs, ModelSpec};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Default maximum edit distance for "did you mean" suggestions
pub const DEFAULT_SUGGESTION_DISTANCE: usize = 2;

/// Non-fatal diagnostic emitted during registration or resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A kwargs-supplied namespace lost to the current namespace override
    NamespaceOverridden { requested: String, current: String },
    /// An existing spec was replaced
    Overridden { id: String },
    /// An unversioned request resolved to the latest version
    SubstitutedLatest { requested: String, resolved: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamespaceOverridden { requested, current } => write!(
                f,
                "Custom namespace `{requested}` is being overridden by namespace `{current}`"
            ),
            Self::Overridden { id } => write!(f, "Overriding model {id} already in registry"),
            Self::SubstitutedLatest { requested, resolved } => write!(
                f,
                "Using the latest versioned model `{resolved}` instead of the unversioned model `{requested}`"
            ),
        }
    }
}

/// Outcome of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Catalog of model specs keyed by canonical id
///
/// For a given (namespace, name) the catalog holds either one unversioned spec
/// or a family of versioned specs, never both.
pub struct Registry {
    specs: BTreeMap<String, Arc<ModelSpec>>,
    current_namespace: Option<String>,
    suggestion_distance: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            specs: BTreeMap::new(),
            current_namespace: None,
            suggestion_distance: DEFAULT_SUGGESTION_DISTANCE,
        }
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum edit distance used for suggestions
    #[must_use]
    pub fn with_suggestion_distance(mut self, distance: usize) -> Self {
        self.suggestion_distance = distance;
        self
    }

    #[must_use]
    pub fn suggestion_distance(&self) -> usize {
        self.suggestion_distance
    }

    /// Register a spec under `id`
    ///
    /// The current namespace, when set, replaces the id's own namespace.
    ///
    /// # Errors
    /// - `MalformedIdentifier` if `id` does not parse
    /// - `VersionConflict` if the family already has the other shape
    pub fn register(&mut self, id: &str, entry_point: EntryPoint, kwargs: Kwargs) -> Result<Registration> {
        let parsed = ModelId::parse(id)?;
        let mut diagnostics = Vec::new();

        let namespace = if let Some(current) = &self.current_namespace {
            if let Some(requested) = kwargs.get("namespace").and_then(|v| v.as_str()) {
                if requested != current {
                    diagnostics.push(Diagnostic::NamespaceOverridden {
                        requested: requested.to_string(),
                        current: current.clone(),
                    });
                }
            }
            Some(current.clone())
        } else {
            parsed.namespace.clone()
        };

        let full_id = format_id(namespace.as_deref(), &parsed.name, parsed.version);
        let spec = ModelSpec::new(&full_id, entry_point, kwargs)?;
        self.check_conflict(&spec)?;

        if self.specs.contains_key(spec.id()) {
            diagnostics.push(Diagnostic::Overridden {
                id: spec.id().to_string(),
            });
        }

        for diagnostic in &diagnostics {
            tracing::warn!("{diagnostic}");
        }

        let id = spec.id().to_string();
        tracing::debug!("Registered model {id}");
        self.specs.insert(id.clone(), Arc::new(spec));

        Ok(Registration { id, diagnostics })
    }

    /// Register a model type constructed through `Default`
    ///
    /// The type is instantiated once up front so a model missing its dummy
    /// input or output is rejected before it reaches the catalog.
    ///
    /// # Errors
    /// `ContractViolation` plus everything `register` returns.
    pub fn register_model<M>(&mut self, id: &str) -> Result<Registration>
    where
        M: Model + Default + 'static,
    {
        let probe = M::default();
        let missing = missing_capabilities(&probe);
        if !missing.is_empty() {
            return Err(MarmotError::ContractViolation {
                id: id.to_string(),
                missing,
            });
        }

        self.register(
            id,
            EntryPoint::factory(|_| Ok(Box::new(M::default()) as Box<dyn Model>)),
            Kwargs::new(),
        )
    }

    /// Reject specs that would mix unversioned and versioned members of a family
    fn check_conflict(&self, spec: &ModelSpec) -> Result<()> {
        let family = self.family(spec.namespace(), spec.name());

        match spec.version() {
            Some(_) => {
                if let Some(unversioned) = family.iter().find(|s| s.version().is_none()) {
                    return Err(MarmotError::VersionConflict {
                        attempted: spec.id().to_string(),
                        existing: unversioned.id().to_string(),
                    });
                }
            }
            None => {
                if let Some(latest) = family.iter().filter(|s| s.version().is_some()).last() {
                    return Err(MarmotError::VersionConflict {
                        attempted: spec.id().to_string(),
                        existing: latest.id().to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Highest registered version for (namespace, name), if any member is versioned
    #[must_use]
    pub fn find_highest_version(&self, namespace: Option<&str>, name: &str) -> Option<u32> {
        self.specs
            .values()
            .filter(|s| s.same_family(namespace, name))
            .filter_map(|s| s.version())
            .max()
    }

    /// Direct lookup by canonical id
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<ModelSpec>> {
        self.specs.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// All registered ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Registered namespaces (unnamespaced specs excluded)
    #[must_use]
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.specs.values().filter_map(|s| s.namespace()).collect()
    }

    /// Names registered under `namespace`
    #[must_use]
    pub fn names_in(&self, namespace: Option<&str>) -> BTreeSet<&str> {
        self.specs
            .values()
            .filter(|s| s.namespace() == namespace)
            .map(|s| s.name())
            .collect()
    }

    /// Members of a (namespace, name) family, unversioned first then by version
    #[must_use]
    pub fn family(&self, namespace: Option<&str>, name: &str) -> Vec<&Arc<ModelSpec>> {
        let mut members: Vec<_> = self
            .specs
            .values()
            .filter(|s| s.same_family(namespace, name))
            .collect();
        members.sort_by_key(|s| s.version());
        members
    }

    #[must_use]
    pub fn current_namespace(&self) -> Option<&str> {
        self.current_namespace.as_deref()
    }

    pub fn set_current_namespace(&mut self, namespace: Option<String>) {
        self.current_namespace = namespace;
    }

    /// Run `f` with `namespace` as the current namespace, restoring the previous one after
    pub fn with_namespace<T>(&mut self, namespace: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.current_namespace.replace(namespace.to_string());
        let out = f(self);
        self.current_namespace = previous;
        out
    }

    /// Closest candidate to `target` within the suggestion distance
    pub(crate) fn suggest<'a>(
        &self,
        target: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Option<String> {
        closest_match(target, candidates, self.suggestion_distance)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for spec in self.specs.values() {
            by_namespace
                .entry(spec.namespace().unwrap_or(""))
                .or_default()
                .push(spec.id());
        }

        for (namespace, ids) in by_namespace {
            if namespace.is_empty() {
                writeln!(f, "===== (no namespace) =====")?;
            } else {
                writeln!(f, "===== {namespace} =====")?;
            }
            for id in ids {
                writeln!(f, "  {id}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.specs.keys().collect::<Vec<_>>())
            .field("current_namespace", &self.current_namespace)
            .finish()
    }
}

/// Capabilities a constructed model fails to provide
pub(crate) fn missing_capabilities(model: &dyn Model) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if model.dummy_input().is_none() {
        missing.push("dummy_input");
    }
    if model.dummy_output().is_none() {
        missing.push("dummy_output");
    }
    missing
}

/// Find closest match using Levenshtein distance
///
/// Ties are broken by the candidates' alphabetical order.
#[must_use]
pub fn closest_match<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Option<String> {
    if target.is_empty() {
        return None;
    }

    let mut scored: Vec<(&str, usize)> = candidates
        .into_iter()
        .map(|c| (c, levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance)
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    scored.first().map(|(candidate, _)| (*candidate).to_string())
}

/// Edit distance between two strings, counted in chars
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut current = Vec::with_capacity(b.len() + 1);
        current.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current.push(substitution.min(previous[j + 1] + 1).min(current[j] + 1));
        }
        previous = current;
    }

    previous[b.len()]
}
