//! Patch units and the registry that resolves identifiers to them.
//!
//! A unit is a small capability object: an optional `up`, an optional `down`,
//! a transaction preference and an optional connection override. Units are
//! produced by factories held in a [`UnitRegistry`], which an application (or
//! the SQL file loader in `dbpatch-engine`) fills once at startup.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use crate::error::PatchError;
use crate::executor::Executor;
use crate::types::PatchId;

/// Error type returned from unit actions.
pub type UnitError = Box<dyn StdError + Send + Sync>;

/// Result of running one unit action.
pub type UnitResult = Result<(), UnitError>;

/// A resolved, executable patch.
///
/// Both actions default to a no-op, which is a valid unit for that direction.
pub trait PatchUnit {
    /// Forward action.
    fn up(&self, _db: &mut dyn Executor) -> UnitResult {
        Ok(())
    }

    /// Backward action.
    fn down(&self, _db: &mut dyn Executor) -> UnitResult {
        Ok(())
    }

    /// Run the action inside a transaction on its connection.
    fn within_transaction(&self) -> bool {
        true
    }

    /// Named connection to run against instead of the invocation's.
    fn connection(&self) -> Option<&str> {
        None
    }
}

/// Builds a fresh unit instance. Resolution must not run any action.
pub type UnitFactory = Box<dyn Fn() -> Box<dyn PatchUnit>>;

/// Explicit identifier → unit mapping.
///
/// Lookup order: a factory registered for the exact identifier, then a factory
/// registered under the identifier's derived type name (see [`type_name`]).
#[derive(Default)]
pub struct UnitRegistry {
    by_id: HashMap<PatchId, UnitFactory>,
    by_type: HashMap<String, UnitFactory>,
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.by_id.keys().map(PatchId::as_str).collect();
        ids.sort_unstable();
        let mut types: Vec<_> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("UnitRegistry")
            .field("by_id", &ids)
            .field("by_type", &types)
            .finish()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit type under its type name, e.g. `CreateUsers` for
    /// `2019_05_29_000000_create_users`.
    pub fn register<F, U>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> U + 'static,
        U: PatchUnit + 'static,
    {
        self.by_type.insert(
            type_name.into(),
            Box::new(move || Box::new(factory()) as Box<dyn PatchUnit>),
        );
        self
    }

    /// Register a unit for one exact identifier.
    pub fn register_id(&mut self, id: impl Into<PatchId>, factory: UnitFactory) -> &mut Self {
        self.by_id.insert(id.into(), factory);
        self
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instantiate the unit for `id`.
    pub fn resolve(&self, id: &PatchId) -> Result<Box<dyn PatchUnit>, PatchError> {
        if let Some(factory) = self.by_id.get(id) {
            return Ok(factory());
        }

        let name = type_name(id).ok_or_else(|| PatchError::UnitResolution {
            id: id.clone(),
            reason: "identifier has no `<ordering-token>_<description>` form".to_string(),
        })?;

        match self.by_type.get(&name) {
            Some(factory) => Ok(factory()),
            None => Err(PatchError::UnitResolution {
                id: id.clone(),
                reason: format!("no unit registered as '{name}'"),
            }),
        }
    }
}

/// Derive the type name for an identifier.
///
/// Drops the leading all-digit `_` segments (the ordering token) and converts
/// the remainder to UpperCamelCase. Returns `None` when either part is absent.
///
/// ```
/// use dbpatch_core::unit::type_name;
/// use dbpatch_core::PatchId;
///
/// assert_eq!(type_name(&PatchId::from("001_create_users")).as_deref(), Some("CreateUsers"));
/// assert_eq!(
///     type_name(&PatchId::from("2019_05_29_000000_add_email_index")).as_deref(),
///     Some("AddEmailIndex"),
/// );
/// ```
pub fn type_name(id: &PatchId) -> Option<String> {
    let segments: Vec<&str> = id.as_str().split('_').collect();
    let token_len = segments
        .iter()
        .take_while(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .count();
    if token_len == 0 || token_len == segments.len() {
        return None;
    }

    let name: String = segments[token_len..]
        .iter()
        .copied()
        .flat_map(|s| s.split(['-', ' ']))
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PretendExecutor;
    use rstest::rstest;

    struct CreateUsers;

    impl PatchUnit for CreateUsers {
        fn up(&self, db: &mut dyn Executor) -> UnitResult {
            db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")?;
            Ok(())
        }
    }

    struct Analytics;

    impl PatchUnit for Analytics {
        fn within_transaction(&self) -> bool {
            false
        }

        fn connection(&self) -> Option<&str> {
            Some("analytics")
        }
    }

    #[rstest]
    #[case("001_create_users", Some("CreateUsers"))]
    #[case("2019_05_29_000000_create_users", Some("CreateUsers"))]
    #[case("20240101120000_add-email_index", Some("AddEmailIndex"))]
    #[case("001_x", Some("X"))]
    #[case("create_users", None)]
    #[case("001", None)]
    #[case("001_", None)]
    #[case("2019_05_29", None)]
    fn derives_type_names(#[case] id: &str, #[case] expected: Option<&str>) {
        assert_eq!(type_name(&PatchId::from(id)).as_deref(), expected);
    }

    #[test]
    fn resolves_by_type_name() {
        let mut registry = UnitRegistry::new();
        registry.register("CreateUsers", || CreateUsers);

        let unit = registry.resolve(&"001_create_users".into()).expect("resolve");
        let mut exec = PretendExecutor::new();
        unit.up(&mut exec).expect("up");
        assert_eq!(exec.statements().len(), 1);
        assert!(unit.within_transaction());
        assert!(unit.connection().is_none());
    }

    #[test]
    fn exact_identifier_wins_over_type_name() {
        let mut registry = UnitRegistry::new();
        registry.register("CreateUsers", || CreateUsers);
        registry.register_id(
            "001_create_users",
            Box::new(|| Box::new(Analytics) as Box<dyn PatchUnit>),
        );

        let unit = registry.resolve(&"001_create_users".into()).expect("resolve");
        assert_eq!(unit.connection(), Some("analytics"));
    }

    #[test]
    fn default_actions_are_noops() {
        let unit = Analytics;
        let mut exec = PretendExecutor::new();
        unit.up(&mut exec).expect("up");
        unit.down(&mut exec).expect("down");
        assert!(exec.statements().is_empty());
    }

    #[test]
    fn unknown_unit_is_a_resolution_error() {
        let registry = UnitRegistry::new();
        let err = registry.resolve(&"001_create_users".into()).err().expect("error");
        assert!(matches!(err, PatchError::UnitResolution { .. }));
        assert!(err.to_string().contains("CreateUsers"));
    }

    #[test]
    fn malformed_identifier_is_a_resolution_error() {
        let mut registry = UnitRegistry::new();
        registry.register("CreateUsers", || CreateUsers);
        let err = registry.resolve(&"create_users".into()).err().expect("error");
        assert!(matches!(err, PatchError::UnitResolution { .. }));
    }
}
