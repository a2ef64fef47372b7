//! Name lookups and binding diffs
//!
//! Remote entities are matched to desired ones by name, never by id. Role
//! names compare case-insensitively; scope and resource names are exact.

use std::collections::{HashMap, HashSet};

use rbac_directory::{RemoteRole, RemoteScope};
use serde_json::Value;

use super::protection::ProtectionPolicy;

/// Index remote roles by lowercased name. The first of any duplicates wins.
pub fn roles_by_name(roles: &[RemoteRole]) -> HashMap<String, &RemoteRole> {
    let mut map = HashMap::with_capacity(roles.len());
    for role in roles {
        map.entry(role.name.to_lowercase()).or_insert(role);
    }
    map
}

/// The scopes a role binding may reference, keyed both ways.
#[derive(Debug, Clone, Default)]
pub struct ScopeCatalog {
    by_name: HashMap<String, String>,
    by_id: HashMap<String, String>,
}

impl ScopeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scopes<'a>(scopes: impl IntoIterator<Item = &'a RemoteScope>) -> Self {
        let mut catalog = Self::new();
        catalog.extend(scopes);
        catalog
    }

    pub fn extend<'a>(&mut self, scopes: impl IntoIterator<Item = &'a RemoteScope>) {
        for scope in scopes {
            self.insert(&scope.id, &scope.name);
        }
    }

    pub fn insert(&mut self, id: &str, name: &str) {
        self.by_name
            .entry(name.to_string())
            .or_insert_with(|| id.to_string());
        self.by_id.insert(id.to_string(), name.to_string());
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve scope names to ids in order, dropping duplicates.
    ///
    /// Returns the resolved ids and the names that did not resolve.
    pub fn resolve<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> (Vec<String>, Vec<&'a str>) {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for name in names {
            match self.id_of(name) {
                Some(id) => {
                    if seen.insert(id) {
                        resolved.push(id.to_string());
                    }
                }
                None => unresolved.push(name),
            }
        }
        (resolved, unresolved)
    }
}

/// What a role binding needs changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl BindingDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff desired scope ids against currently bound ones.
///
/// A bound scope is removed only when the catalog knows its name and the
/// policy does not reserve it. Output order follows the inputs.
pub fn diff_bindings(
    desired: &[String],
    current: &[String],
    catalog: &ScopeCatalog,
    reserved: &dyn ProtectionPolicy,
) -> BindingDiff {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let to_add = desired
        .iter()
        .filter(|id| !current_set.contains(id.as_str()))
        .cloned()
        .collect();

    let to_remove = current
        .iter()
        .filter(|id| !desired_set.contains(id.as_str()))
        .filter(|id| match catalog.name_of(id) {
            Some(name) => !reserved.is_reserved(name, ""),
            None => false,
        })
        .cloned()
        .collect();

    BindingDiff { to_add, to_remove }
}

/// Whether `actual` already carries everything in `wanted`.
///
/// Objects compare key by key, so `actual` may hold extra keys the
/// directory fills in itself. Arrays and scalars compare exactly.
pub(crate) fn json_contains(actual: &Value, wanted: &Value) -> bool {
    match (actual, wanted) {
        (Value::Object(actual), Value::Object(wanted)) => wanted.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|present| json_contains(present, value))
        }),
        _ => actual == wanted,
    }
}
