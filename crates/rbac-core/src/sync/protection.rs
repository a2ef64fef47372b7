//! System-entity protection
//!
//! The directory pre-provisions roles, scopes, resources, and applications
//! the desired state never declares. Cleanup consults a
//! [`ProtectionPolicy`] per entity category and leaves anything it reports
//! as reserved untouched.
//!
//! The default policies are a case-insensitive substring denylist over the
//! entity's name and description. They can both over- and under-protect;
//! callers needing something stricter supply their own policy through
//! [`Protections`].

use std::fmt;
use std::sync::Arc;

/// Decides whether an entity is reserved and must survive cleanup.
pub trait ProtectionPolicy: Send + Sync {
    /// `description` is whatever secondary text the category carries. For
    /// resources that is the indicator.
    fn is_reserved(&self, name: &str, description: &str) -> bool;
}

impl<F> ProtectionPolicy for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_reserved(&self, name: &str, description: &str) -> bool {
        self(name, description)
    }
}

/// Substring denylist over names and descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedPatterns {
    names: Vec<String>,
    descriptions: Vec<String>,
    /// Description patterns ignored on descriptions the engine stamped.
    owned: Option<OwnedDescriptions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OwnedDescriptions {
    prefix: String,
    exempt: Vec<String>,
}

const BASE_NAMES: &[&str] = &["logto", "admin", "machine-to-machine", "system", "default"];
const BASE_DESCRIPTIONS: &[&str] = &["system", "default", "logto"];

impl ReservedPatterns {
    pub fn new(names: &[&str], descriptions: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_lowercase()).collect(),
            descriptions: descriptions.iter().map(|s| s.to_lowercase()).collect(),
            owned: None,
        }
    }

    /// Protects nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// On descriptions starting with `prefix`, which the engine stamps
    /// itself, the `exempt` description patterns do not count. The other
    /// description patterns still apply.
    pub fn with_owned_descriptions(mut self, prefix: &str, exempt: &[&str]) -> Self {
        self.owned = Some(OwnedDescriptions {
            prefix: prefix.to_lowercase(),
            exempt: exempt.iter().map(|s| s.to_lowercase()).collect(),
        });
        self
    }

    /// User roles and applications.
    pub fn system_entities() -> Self {
        Self::new(BASE_NAMES, BASE_DESCRIPTIONS)
    }

    /// Organization roles: the base list plus the directory's built-in
    /// owner and member roles.
    pub fn organization_roles() -> Self {
        let names: Vec<&str> = BASE_NAMES.iter().copied().chain(["owner", "member"]).collect();
        Self::new(&names, BASE_DESCRIPTIONS)
    }

    pub fn organization_scopes() -> Self {
        Self::new(
            &["logto", "system", "default", "management", "api"],
            &["logto", "management", "system"],
        )
        .with_owned_descriptions("Organization scope:", &["system"])
    }

    /// The management API resource, by name or by its default indicator.
    pub fn resources() -> Self {
        Self::new(&["logto management api"], &["default.logto.app"])
    }

    pub fn resource_scopes() -> Self {
        Self::new(&["logto", "management"], &["logto"])
    }

    /// Scopes bound to a role that unbinding must leave alone.
    pub fn bound_scopes() -> Self {
        Self::new(&["management"], &[])
    }
}

impl ProtectionPolicy for ReservedPatterns {
    fn is_reserved(&self, name: &str, description: &str) -> bool {
        let name = name.to_lowercase();
        if self.names.iter().any(|p| name.contains(p.as_str())) {
            return true;
        }

        let description = description.to_lowercase();
        let exempt: &[String] = match &self.owned {
            Some(owned) if description.starts_with(owned.prefix.as_str()) => &owned.exempt,
            _ => &[],
        };
        self.descriptions
            .iter()
            .filter(|p| !exempt.contains(*p))
            .any(|p| description.contains(p.as_str()))
    }
}

/// One protection policy per entity category.
#[derive(Clone)]
pub struct Protections {
    pub resources: Arc<dyn ProtectionPolicy>,
    pub resource_scopes: Arc<dyn ProtectionPolicy>,
    pub organization_scopes: Arc<dyn ProtectionPolicy>,
    pub organization_roles: Arc<dyn ProtectionPolicy>,
    pub user_roles: Arc<dyn ProtectionPolicy>,
    pub applications: Arc<dyn ProtectionPolicy>,
    pub bound_scopes: Arc<dyn ProtectionPolicy>,
}

impl Default for Protections {
    fn default() -> Self {
        Self {
            resources: Arc::new(ReservedPatterns::resources()),
            resource_scopes: Arc::new(ReservedPatterns::resource_scopes()),
            organization_scopes: Arc::new(ReservedPatterns::organization_scopes()),
            organization_roles: Arc::new(ReservedPatterns::organization_roles()),
            user_roles: Arc::new(ReservedPatterns::system_entities()),
            applications: Arc::new(ReservedPatterns::system_entities()),
            bound_scopes: Arc::new(ReservedPatterns::bound_scopes()),
        }
    }
}

impl Protections {
    /// Protect nothing in any category.
    pub fn none() -> Self {
        let none: Arc<dyn ProtectionPolicy> = Arc::new(ReservedPatterns::none());
        Self {
            resources: none.clone(),
            resource_scopes: none.clone(),
            organization_scopes: none.clone(),
            organization_roles: none.clone(),
            user_roles: none.clone(),
            applications: none.clone(),
            bound_scopes: none,
        }
    }
}

impl fmt::Debug for Protections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protections").finish_non_exhaustive()
    }
}
