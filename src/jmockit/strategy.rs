//! Groups verification entries by owner and picks how each group is intercepted.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::SkipReason;
use super::classify::{Classified, Receiver, Target};
use super::naming::{HandleKind, NameTable};
use crate::config::simple_name;
use crate::syntax::unit::{
    JavaUnit, MethodDecl, Param, TypeDecl, TypeKind, TypeRef, erase_type, visible_variable,
};

pub const MOCKED_STATIC: &str = "MockedStatic";
pub const MOCKED_CONSTRUCTION: &str = "MockedConstruction";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// `mockStatic(Owner.class)`; `open` is false when a visible handle is reused.
    Static { handle: String, open: bool },
    /// A calls-real-methods mock delegated to by a construction scope.
    Instance {
        object: String,
        scope: String,
        reuse: bool,
    },
    /// Stubs registered directly on a mock-role variable or spy.
    Variable { name: String, spy: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockGroup {
    pub owner: TypeRef,
    pub strategy: Strategy,
    /// Indices into [`Classified::entries`], in source order, constructor fake excluded.
    pub entries: Vec<usize>,
    pub constructor: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Static(String),
    Instance(String),
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Static,
    Instance,
}

pub struct Planner<'a, 't> {
    unit: &'a JavaUnit,
    source: &'a str,
    at: Node<'t>,
}

impl<'a, 't> Planner<'a, 't> {
    /// `at` is the construct statement; handle visibility is judged from there.
    pub fn new(unit: &'a JavaUnit, source: &'a str, at: Node<'t>) -> Self {
        Self { unit, source, at }
    }

    pub fn plan(
        &self,
        classified: &Classified,
        names: &mut NameTable,
    ) -> Result<Vec<MockGroup>, SkipReason> {
        let mut keyed: Vec<(GroupKey, MockGroup)> = Vec::new();
        let mut member_kinds: BTreeMap<(String, String), MemberKind> = BTreeMap::new();

        for (index, entry) in classified.entries.iter().enumerate() {
            let (key, owner, kind) = match &entry.target {
                Target::Recorded {
                    receiver,
                    method,
                    args,
                } => match receiver {
                    Receiver::Variable { text, ty, spy } => {
                        if self.only_static(ty, method, args.len()) {
                            return Err(SkipReason::AmbiguousStrategy(format!(
                                "static method {}.{method} recorded through instance {text}",
                                ty.display
                            )));
                        }
                        (
                            GroupKey::Variable(text.clone()),
                            ty.clone(),
                            Some((MemberKind::Instance, *spy)),
                        )
                    }
                    Receiver::Type { owner, .. } => {
                        self.recorded_static(owner, method, args.len())?;
                        (
                            GroupKey::Static(owner.qualified.clone()),
                            owner.clone(),
                            Some((MemberKind::Static, false)),
                        )
                    }
                    Receiver::Nested { text } => {
                        return Err(SkipReason::UnresolvedTarget(format!(
                            "call chained off a mock: {text}"
                        )));
                    }
                },
                Target::Faked {
                    owner,
                    method,
                    params,
                } => {
                    let kind = self.faked_kind(owner, method, params)?;
                    let key = match kind {
                        MemberKind::Static => GroupKey::Static(owner.qualified.clone()),
                        MemberKind::Instance => GroupKey::Instance(owner.qualified.clone()),
                    };
                    (key, owner.clone(), Some((kind, false)))
                }
                Target::Constructor { owner, .. } => {
                    self.constructible(owner)?;
                    (GroupKey::Instance(owner.qualified.clone()), owner.clone(), None)
                }
            };

            if let Some((kind, _)) = kind {
                let member = (owner.qualified.clone(), entry.target.method().to_string());
                if let Some(previous) = member_kinds.insert(member, kind)
                    && previous != kind
                {
                    return Err(SkipReason::AmbiguousStrategy(format!(
                        "{}.{} is faked both as static and as instance member",
                        owner.display,
                        entry.target.method()
                    )));
                }
            }

            let position = match keyed.iter().position(|(existing, _)| *existing == key) {
                Some(position) => position,
                None => {
                    let strategy = match (&key, kind) {
                        (GroupKey::Variable(name), Some((_, spy))) => Strategy::Variable {
                            name: name.clone(),
                            spy,
                        },
                        (GroupKey::Static(_), _) => Strategy::Static {
                            handle: String::new(),
                            open: true,
                        },
                        _ => Strategy::Instance {
                            object: String::new(),
                            scope: String::new(),
                            reuse: false,
                        },
                    };
                    keyed.push((
                        key,
                        MockGroup {
                            owner,
                            strategy,
                            entries: Vec::new(),
                            constructor: None,
                        },
                    ));
                    keyed.len() - 1
                }
            };

            let group = &mut keyed[position].1;
            if matches!(entry.target, Target::Constructor { .. }) {
                if group.constructor.is_some() {
                    return Err(SkipReason::AmbiguousStrategy(format!(
                        "{} has more than one constructor fake",
                        group.owner.display
                    )));
                }
                group.constructor = Some(index);
            } else {
                group.entries.push(index);
            }
        }

        keyed
            .into_iter()
            .map(|(_, group)| self.bind_handles(group, names))
            .collect()
    }

    fn bind_handles(&self, mut group: MockGroup, names: &mut NameTable) -> Result<MockGroup, SkipReason> {
        match &group.strategy {
            Strategy::Static { .. } => {
                let (handle, visible) = self.handle(&group.owner, HandleKind::Static, names);
                group.strategy = Strategy::Static {
                    handle,
                    open: !visible,
                };
            }
            Strategy::Instance { .. } => {
                let (scope, scope_visible) =
                    self.handle(&group.owner, HandleKind::Construction, names);
                let (object, object_visible) = self.handle(&group.owner, HandleKind::Object, names);
                if scope_visible && !object_visible {
                    return Err(SkipReason::UnresolvedTarget(format!(
                        "construction of {} is already intercepted by {scope} without a reachable mock",
                        group.owner.display
                    )));
                }
                if scope_visible && group.constructor.is_some() {
                    return Err(SkipReason::UnrecognizedStatement(format!(
                        "constructor fake for {} while {scope} is active",
                        group.owner.display
                    )));
                }
                group.strategy = Strategy::Instance {
                    object,
                    scope,
                    reuse: scope_visible,
                };
            }
            Strategy::Variable { .. } => {}
        }
        Ok(group)
    }

    /// The handle name for `owner`, and whether a variable of that name and the expected type
    /// is already visible at the construct.
    fn handle(&self, owner: &TypeRef, kind: HandleKind, names: &mut NameTable) -> (String, bool) {
        let candidate = names
            .lookup(owner, kind)
            .map_or_else(|| NameTable::base_name(owner, kind), ToString::to_string);
        let expected = match kind {
            HandleKind::Static => MOCKED_STATIC,
            HandleKind::Construction => MOCKED_CONSTRUCTION,
            HandleKind::Object => owner.simple(),
        };
        let visible = visible_variable(self.at, &candidate, self.source)
            .is_some_and(|variable| simple_name(&erase_type(&variable.ty)) == expected);
        if visible {
            names.adopt(owner, kind, &candidate);
            return (candidate, true);
        }
        (names.name(owner, kind), false)
    }

    fn declared(&self, owner: &TypeRef) -> Option<&'a TypeDecl> {
        if !owner.declared {
            return None;
        }
        self.unit.type_by_path(&owner.path)
    }

    fn faked_kind(&self, owner: &TypeRef, method: &str, params: &[Param]) -> Result<MemberKind, SkipReason> {
        let Some(decl) = self.declared(owner) else {
            return Ok(MemberKind::Instance);
        };
        if matches!(decl.kind, TypeKind::Interface | TypeKind::Annotation) {
            return Err(SkipReason::UnresolvedTarget(format!(
                "{} is an interface without a real implementation",
                owner.display
            )));
        }

        let found = decl.methods.iter().find(|candidate| {
            !candidate.is_constructor && candidate.name == method && same_parameters(&candidate.params, params)
        });
        match found {
            None if decl.has_superclass && !decl.is_abstract => Ok(MemberKind::Instance),
            None => Err(SkipReason::UnresolvedTarget(format!(
                "{} declares no method {method} with matching parameters",
                owner.display
            ))),
            Some(method_decl) if method_decl.is_abstract => Err(SkipReason::UnresolvedTarget(format!(
                "{}.{method} is abstract",
                owner.display
            ))),
            Some(method_decl) if method_decl.is_static => Ok(MemberKind::Static),
            Some(_) if decl.is_abstract => Err(SkipReason::UnresolvedTarget(format!(
                "{} is abstract and cannot be constructed",
                owner.display
            ))),
            Some(_) => Ok(MemberKind::Instance),
        }
    }

    fn constructible(&self, owner: &TypeRef) -> Result<(), SkipReason> {
        match self.declared(owner) {
            Some(decl) if decl.is_abstract || decl.kind != TypeKind::Class => {
                Err(SkipReason::UnresolvedTarget(format!(
                    "{} cannot be constructed",
                    owner.display
                )))
            }
            _ => Ok(()),
        }
    }

    fn recorded_static(&self, owner: &TypeRef, method: &str, arity: usize) -> Result<(), SkipReason> {
        let Some(decl) = self.declared(owner) else {
            return Ok(());
        };
        let candidates = methods_named(decl, method, arity);
        if candidates.is_empty() {
            if decl.has_superclass {
                return Ok(());
            }
            return Err(SkipReason::UnresolvedTarget(format!(
                "{} declares no method {method}",
                owner.display
            )));
        }
        if candidates.iter().any(|candidate| candidate.is_static) {
            Ok(())
        } else {
            Err(SkipReason::AmbiguousStrategy(format!(
                "instance method {}.{method} recorded through the type name",
                owner.display
            )))
        }
    }

    fn only_static(&self, owner: &TypeRef, method: &str, arity: usize) -> bool {
        self.declared(owner).is_some_and(|decl| {
            let candidates = methods_named(decl, method, arity);
            !candidates.is_empty() && candidates.iter().all(|candidate| candidate.is_static)
        })
    }
}

fn methods_named<'d>(decl: &'d TypeDecl, method: &str, arity: usize) -> Vec<&'d MethodDecl> {
    decl.methods
        .iter()
        .filter(|candidate| {
            !candidate.is_constructor
                && candidate.name == method
                && (candidate.params.len() == arity
                    || candidate
                        .params
                        .last()
                        .is_some_and(|last| last.ty.ends_with("...") && arity + 1 >= candidate.params.len()))
        })
        .collect()
}

fn same_parameters(declared: &[Param], faked: &[Param]) -> bool {
    declared.len() == faked.len()
        && declared.iter().zip(faked).all(|(left, right)| {
            simple_name(&erase_type(&left.ty)) == simple_name(&erase_type(&right.ty))
        })
}
