use std::collections::{BTreeMap, BTreeSet};

use crate::error::MigrateError;
use crate::syntax::unit::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandleKind {
    Object,
    Static,
    Construction,
}

impl HandleKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Object => "mockObj",
            Self::Static => "mockStatic",
            Self::Construction => "mockCons",
        }
    }
}

/// Per-file table of synthesized handle names, keyed by owner and handle kind.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    issued: BTreeMap<(String, HandleKind), String>,
    owners: BTreeMap<String, String>,
    reserved: BTreeSet<String>,
}

impl NameTable {
    /// `reserved` holds identifiers already spelled in the file.
    pub fn new(reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            issued: BTreeMap::new(),
            owners: BTreeMap::new(),
            reserved: reserved.into_iter().collect(),
        }
    }

    /// The name a handle would get with no collisions: prefix plus the owner's path.
    pub fn base_name(owner: &TypeRef, kind: HandleKind) -> String {
        format!("{}{}", kind.prefix(), stem(&owner.path))
    }

    pub fn lookup(&self, owner: &TypeRef, kind: HandleKind) -> Option<&str> {
        self.issued
            .get(&(owner.qualified.clone(), kind))
            .map(String::as_str)
    }

    /// Records `name`, already visible in the source, as the handle for `owner`.
    pub fn adopt(&mut self, owner: &TypeRef, kind: HandleKind, name: &str) {
        self.issued
            .insert((owner.qualified.clone(), kind), name.to_string());
        self.owners
            .entry(name.to_string())
            .or_insert_with(|| owner.qualified.clone());
    }

    /// Issues (or returns the previously issued) name for `owner` and `kind`.
    pub fn name(&mut self, owner: &TypeRef, kind: HandleKind) -> String {
        let key = (owner.qualified.clone(), kind);
        if let Some(existing) = self.issued.get(&key) {
            return existing.clone();
        }

        let mut candidate = Self::base_name(owner, kind);
        if self
            .owners
            .get(&candidate)
            .is_some_and(|other| *other != owner.qualified)
        {
            candidate = format!("{candidate}_{}", stem(&owner.qualified));
        }

        let mut name = candidate.clone();
        let mut suffix = 1usize;
        while self.reserved.contains(&name) || self.owners.contains_key(&name) {
            name = format!("{candidate}{suffix}");
            suffix += 1;
        }

        self.owners.insert(name.clone(), owner.qualified.clone());
        self.issued.insert(key, name.clone());
        name
    }

    /// Fails when two (owner, kind) keys ended up sharing one identifier.
    pub fn check_invariant(&self) -> Result<(), MigrateError> {
        let mut seen: BTreeMap<&str, &(String, HandleKind)> = BTreeMap::new();
        for (key, name) in &self.issued {
            if let Some(previous) = seen.insert(name.as_str(), key) {
                return Err(MigrateError::NameCollision {
                    name: name.clone(),
                    first: previous.0.clone(),
                    second: key.0.clone(),
                });
            }
        }
        Ok(())
    }
}

fn stem(path: &str) -> String {
    path.replace(['.', '$'], "_")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{HandleKind, NameTable};
    use crate::error::MigrateError;
    use crate::syntax::unit::TypeRef;

    fn owner(qualified: &str, path: &str) -> TypeRef {
        TypeRef {
            qualified: qualified.to_string(),
            path: path.to_string(),
            display: path.to_string(),
            declared: false,
        }
    }

    #[test]
    fn names_strip_package_and_join_nesting() {
        let mut names = NameTable::default();
        let clazz = owner("com.acme.MockUpTest.MyClazz", "MockUpTest.MyClazz");
        assert_eq!(
            names.name(&clazz, HandleKind::Static),
            "mockStaticMockUpTest_MyClazz"
        );
        assert_eq!(names.name(&clazz, HandleKind::Object), "mockObjMockUpTest_MyClazz");
        assert_eq!(
            names.name(&clazz, HandleKind::Construction),
            "mockConsMockUpTest_MyClazz"
        );
        assert_eq!(
            names.name(&clazz, HandleKind::Static),
            "mockStaticMockUpTest_MyClazz",
            "same owner and kind should reuse the issued name"
        );
    }

    #[test]
    fn distinct_owners_with_equal_stems_get_qualified_suffix() {
        let mut names = NameTable::default();
        let first = owner("a.Clock", "Clock");
        let second = owner("b.Clock", "Clock");
        assert_eq!(names.name(&first, HandleKind::Static), "mockStaticClock");
        assert_eq!(names.name(&second, HandleKind::Static), "mockStaticClock_b_Clock");
        assert!(names.check_invariant().is_ok());
    }

    #[test]
    fn reserved_identifiers_get_numeric_suffix() {
        let mut names = NameTable::new(["mockStaticClock".to_string()]);
        assert_eq!(
            names.name(&owner("a.Clock", "Clock"), HandleKind::Static),
            "mockStaticClock1"
        );
    }

    #[test]
    fn adopted_names_are_returned_for_their_owner() {
        let mut names = NameTable::new(["mockStaticClock".to_string()]);
        let clock = owner("a.Clock", "Clock");
        names.adopt(&clock, HandleKind::Static, "mockStaticClock");
        assert_eq!(names.lookup(&clock, HandleKind::Static), Some("mockStaticClock"));
        assert_eq!(names.name(&clock, HandleKind::Static), "mockStaticClock");
    }

    #[test]
    fn invariant_check_reports_shared_names() {
        let mut names = NameTable::default();
        names.adopt(&owner("a.Clock", "Clock"), HandleKind::Static, "shared");
        names.adopt(&owner("b.Timer", "Timer"), HandleKind::Static, "shared");
        let error = names
            .check_invariant()
            .expect_err("two owners sharing a name should be reported");
        assert!(matches!(error, MigrateError::NameCollision { name, .. } if name == "shared"));
    }

    proptest! {
        #[test]
        fn issued_names_never_collide(
            owners in proptest::collection::vec(
                (
                    prop::sample::select(vec!["a", "b", "a.b", "c.d"]),
                    prop::sample::select(vec!["Clock", "Outer.Inner", "Outer_Inner", "X"]),
                    prop::sample::select(vec![HandleKind::Object, HandleKind::Static, HandleKind::Construction]),
                ),
                1..24,
            ),
            reserved in proptest::collection::btree_set(
                prop::sample::select(vec!["mockStaticClock", "mockObjX", "mockConsOuter_Inner"]),
                0..3,
            ),
        ) {
            let mut names = NameTable::new(reserved.iter().map(|name| name.to_string()));
            let mut issued = std::collections::BTreeMap::new();
            for (package, path, kind) in owners {
                let clazz = owner(&format!("{package}.{path}"), path);
                let name = names.name(&clazz, kind);
                prop_assert!(!reserved.contains(name.as_str()));
                if let Some(previous) = issued.insert(name.clone(), (clazz.qualified.clone(), kind)) {
                    prop_assert_eq!(previous, (clazz.qualified.clone(), kind));
                }
                prop_assert_eq!(names.name(&clazz, kind), name);
            }
            prop_assert!(names.check_invariant().is_ok());
        }
    }
}
