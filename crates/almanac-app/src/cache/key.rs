//! Cache keys and the entity contract.

use almanac_core::{Activity, ActivityId};
use std::collections::BTreeMap;
use std::fmt;

/// A value the cache stores once under `(TYPENAME, id)`.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Type name shared by every instance, e.g. `"Activity"`
    const TYPENAME: &'static str;

    /// Identity within the type
    fn entity_id(&self) -> String;

    fn entity_key(&self) -> EntityKey {
        EntityKey::new(Self::TYPENAME, self.entity_id())
    }
}

impl Entity for Activity {
    const TYPENAME: &'static str = "Activity";

    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Key of one normalised entity. Displays as `Activity:3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    typename: &'static str,
    id: String,
}

impl EntityKey {
    pub fn new(typename: &'static str, id: impl Into<String>) -> Self {
        Self {
            typename,
            id: id.into(),
        }
    }

    /// Key of the entity of type `E` with identity `id`
    pub fn of<E: Entity>(id: impl fmt::Display) -> Self {
        Self::new(E::TYPENAME, id.to_string())
    }

    /// Key of an activity
    pub fn activity(id: ActivityId) -> Self {
        Self::of::<Activity>(id)
    }

    pub fn typename(&self) -> &'static str {
        self.typename
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.typename, self.id)
    }
}

/// Key of one query result: a query shape plus its variables.
///
/// Variables are kept sorted, so the order they are added in does not
/// matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    shape: &'static str,
    variables: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(shape: &'static str) -> Self {
        Self {
            shape,
            variables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.variables.insert(name.into(), value.to_string());
        self
    }

    pub fn shape(&self) -> &'static str {
        self.shape
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shape)?;
        if !self.variables.is_empty() {
            f.write_str("(")?;
            for (i, (name, value)) in self.variables.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: {value}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
