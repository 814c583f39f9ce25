//! Difference detector: aligns two symbol models and emits compatibility
//! problems.
//!
//! Three passes over the canonical method ids: added (v2-only), removed
//! (v1-only), and merge (both). Type merges are memoized on (t1, t2) id
//! pairs with an explicit visited stack guarding recursive type graphs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::descriptor;
use crate::ingest::PackageFilter;
use crate::intern::TypeId;
use crate::model::{Access, Api, MethodRecord, TypeKind};
use crate::problems::{ProblemDetail, ProblemKind, ProblemSet};

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub filter: PackageFilter,
    pub quick: bool,
    pub check_implementation: bool,
    /// Restrict analysis to these class names (client or class-list modes).
    pub class_restriction: Option<BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct DiffResult {
    pub problems: ProblemSet,
    /// Method ids (old and new) paired by a void -> T return change; the
    /// source report drops them from its Added/Removed sections.
    pub changed_return_from_void: BTreeSet<String>,
}

pub fn compare(old: &Api, new: &Api, opts: &DiffOptions) -> DiffResult {
    let mut differ = Differ {
        old,
        new,
        opts,
        problems: ProblemSet::default(),
        changed_return_from_void: BTreeSet::new(),
        added_abstract: BTreeMap::new(),
        removed_abstract: BTreeMap::new(),
        merged: HashMap::new(),
        stack: Vec::new(),
    };
    differ.pass_added();
    differ.pass_removed();
    differ.pass_merge();
    DiffResult {
        problems: differ.problems,
        changed_return_from_void: differ.changed_return_from_void,
    }
}

#[derive(Debug, Clone)]
struct TypeProblem {
    kind: ProblemKind,
    /// Dotted path relative to the merged type; empty for the type itself.
    location: String,
    detail: ProblemDetail,
}

struct Differ<'a> {
    old: &'a Api,
    new: &'a Api,
    opts: &'a DiffOptions,
    problems: ProblemSet,
    changed_return_from_void: BTreeSet<String>,
    /// v2 type name -> abstract method ids added in v2.
    added_abstract: BTreeMap<String, Vec<String>>,
    /// v1 type name -> abstract method ids removed in v2.
    removed_abstract: BTreeMap<String, Vec<String>>,
    merged: HashMap<(u32, u32), Vec<TypeProblem>>,
    stack: Vec<(u32, u32)>,
}

impl<'a> Differ<'a> {
    fn includes_class(&self, class_name: &str) -> bool {
        match &self.opts.class_restriction {
            Some(set) => set.contains(class_name),
            None => true,
        }
    }

    fn analyzable(&self, api: &Api, method: &MethodRecord) -> bool {
        let class = api.type_of(method.class_id);
        method.access != Access::Private
            && class.access != Access::Private
            && self.opts.filter.keeps_package(&class.package)
            && self.includes_class(&class.name)
    }

    // ---- Pass A: added methods ----

    fn pass_added(&mut self) {
        let new_api = self.new;
        for (id, method) in &new_api.methods {
            if self.old.methods.contains_key(id) {
                continue;
            }
            if !self.analyzable(new_api, method) {
                continue;
            }
            let class = new_api.type_of(method.class_id);
            let class_name = class.name.clone();

            if !method.constructor {
                self.check_return_from_void(id, method, &class_name);
                self.check_overriding(id, method);
            }

            if method.is_abstract {
                self.added_abstract
                    .entry(class_name.clone())
                    .or_default()
                    .push(id.clone());
            }

            self.problems.insert(
                id,
                ProblemKind::AddedMethod,
                "",
                ProblemDetail {
                    type_name: class_name,
                    target: id.clone(),
                    ..ProblemDetail::default()
                },
            );
        }
    }

    /// A v1 method with identical parameters returning void pairs with this
    /// one as a return-type change rather than an add/remove.
    fn check_return_from_void(&mut self, id: &str, method: &MethodRecord, class_name: &str) {
        let new_api = self.new;
        let returns_void = method
            .return_type
            .is_some_and(|r| new_api.type_of(r).name == "void");
        if returns_void {
            return;
        }
        let params = descriptor::parameter_part(method.descriptor());
        let void_id = descriptor::method_id(
            &descriptor::dotted_to_internal(class_name),
            &method.short_name,
            &format!("{params}V"),
        );
        if !self.old.methods.contains_key(&void_id) {
            return;
        }
        let new_return = method
            .return_type
            .map(|r| new_api.type_of(r).name.clone())
            .unwrap_or_default();
        self.problems.insert(
            &void_id,
            ProblemKind::ChangedMethodReturnFromVoid,
            "",
            ProblemDetail {
                type_name: class_name.to_string(),
                target: void_id.clone(),
                old_value: Some("void".to_string()),
                new_value: Some(new_return),
                ..ProblemDetail::default()
            },
        );
        self.changed_return_from_void.insert(void_id);
        self.changed_return_from_void.insert(id.to_string());
    }

    /// An added method overriding one declared on a supertype that already
    /// existed in v1 is flagged on the overridden method.
    fn check_overriding(&mut self, id: &str, method: &MethodRecord) {
        if method.is_static {
            return;
        }
        let new_api = self.new;
        let old_api = self.old;
        let params = descriptor::parameter_part(method.descriptor()).to_string();
        for sup in new_api.super_chain(method.class_id) {
            let sup_record = new_api.type_of(sup);
            if !sup_record.declared {
                continue;
            }
            let Some(overridden) = find_method_on(new_api, sup, &method.short_name, &params)
            else {
                continue;
            };
            let existed_in_v1 = old_api
                .type_by_name(&sup_record.name)
                .is_some_and(|t| t.declared);
            if existed_in_v1 {
                let overridden_id = overridden.id.clone();
                let sup_name = sup_record.name.clone();
                self.problems.insert(
                    &overridden_id,
                    ProblemKind::ClassOverriddenMethod,
                    "",
                    ProblemDetail {
                        type_name: sup_name,
                        target: overridden_id.clone(),
                        new_value: Some(id.to_string()),
                        ..ProblemDetail::default()
                    },
                );
            }
            return;
        }
    }

    // ---- Pass B: removed methods ----

    fn pass_removed(&mut self) {
        let old_api = self.old;
        for (id, method) in &old_api.methods {
            if self.new.methods.contains_key(id) {
                continue;
            }
            if !self.analyzable(old_api, method) {
                continue;
            }
            let class = old_api.type_of(method.class_id);
            let class_name = class.name.clone();

            if method.is_abstract {
                self.removed_abstract
                    .entry(class_name.clone())
                    .or_default()
                    .push(id.clone());
            }

            if !method.is_abstract
                && !method.constructor
                && class.kind == TypeKind::Class
                && let Some(moved_to) = self.moved_up_target(method, &class_name)
            {
                self.problems.insert(
                    id,
                    ProblemKind::ClassMethodMovedUpHierarchy,
                    "",
                    ProblemDetail {
                        type_name: class_name,
                        target: id.clone(),
                        new_value: Some(moved_to),
                        ..ProblemDetail::default()
                    },
                );
                continue;
            }

            self.problems.insert(
                id,
                ProblemKind::RemovedMethod,
                "",
                ProblemDetail {
                    type_name: class_name,
                    target: id.clone(),
                    ..ProblemDetail::default()
                },
            );
        }
    }

    /// Walks the *new* hierarchy of the same class with the *old* signature.
    fn moved_up_target(&self, method: &MethodRecord, class_name: &str) -> Option<String> {
        let new_class = self.new.names.id_of(class_name)?;
        if !self.new.type_of(new_class).declared {
            return None;
        }
        let params = descriptor::parameter_part(method.descriptor()).to_string();
        for sup in self.new.super_chain(new_class) {
            if self.new.type_of(sup).kind != TypeKind::Class {
                continue;
            }
            if let Some(found) = find_method_on(self.new, sup, &method.short_name, &params) {
                if found.is_abstract {
                    continue;
                }
                return Some(found.id.clone());
            }
        }
        None
    }

    // ---- Pass C: merge ----

    fn pass_merge(&mut self) {
        // Type-level sweep first: type problems must surface even when no
        // method survives into both versions.
        let mut common: Vec<(TypeId, TypeId, String)> = Vec::new();
        for (t1, name) in self.old.names.iter() {
            if !self.old.types[t1.index()].declared {
                continue;
            }
            let Some(t2) = self.new.names.id_of(name) else {
                continue;
            };
            if !self.new.type_of(t2).declared {
                continue;
            }
            common.push((t1, t2, name.to_string()));
        }
        common.sort_by(|a, b| a.2.cmp(&b.2));
        for (t1, t2, name) in common {
            let type_problems = self.merge_types(t1, t2);
            self.splice(&name, "", None, &type_problems);
        }

        let merged_ids: Vec<String> = self
            .new
            .methods
            .keys()
            .filter(|id| self.old.methods.contains_key(*id))
            .cloned()
            .collect();
        for id in merged_ids {
            self.merge_method(&id);
        }
    }

    fn merge_method(&mut self, id: &str) {
        let old_api = self.old;
        let new_api = self.new;
        let old_method = &old_api.methods[id];
        let new_method = &new_api.methods[id];
        if !matches!(old_method.access, Access::Public | Access::Protected) {
            return;
        }
        if !self.analyzable(old_api, old_method) {
            return;
        }
        let class1 = old_api.type_of(old_method.class_id);
        let class_name = class1.name.clone();

        // A non-static method of a class nobody can construct or extend is
        // unreachable to external clients.
        if !old_method.is_static
            && class1.kind == TypeKind::Class
            && !old_api.is_instance_accessible(old_method.class_id)
        {
            return;
        }

        self.merge_attributes(id, &class_name, old_method, new_method);
        self.merge_exceptions(id, &class_name, old_method, new_method);

        // Parameter, receiver, and return positions.
        let positions = method_positions(old_method, new_method);
        for position in positions {
            let sub = self.merge_types(position.old_type, position.new_type);
            self.splice(id, &position.prefix, position.param, &sub);
        }
    }

    fn merge_attributes(
        &mut self,
        id: &str,
        class_name: &str,
        old_method: &MethodRecord,
        new_method: &MethodRecord,
    ) {
        let mut emit = |kind: ProblemKind, old_value: &str, new_value: &str| {
            self.problems.insert(
                id,
                kind,
                "",
                ProblemDetail {
                    type_name: class_name.to_string(),
                    target: id.to_string(),
                    old_value: Some(old_value.to_string()),
                    new_value: Some(new_value.to_string()),
                    ..ProblemDetail::default()
                },
            );
        };

        if !old_method.is_static && new_method.is_static {
            emit(ProblemKind::MethodBecameStatic, "non-static", "static");
        }
        if old_method.is_static && !new_method.is_static {
            emit(ProblemKind::MethodBecameNonStatic, "static", "non-static");
        }
        if !old_method.is_synchronized && new_method.is_synchronized {
            emit(
                ProblemKind::MethodBecameSynchronized,
                "non-synchronized",
                "synchronized",
            );
        }
        if old_method.is_synchronized && !new_method.is_synchronized {
            emit(
                ProblemKind::MethodBecameNonSynchronized,
                "synchronized",
                "non-synchronized",
            );
        }
        if !old_method.is_final && new_method.is_final {
            let kind = if old_method.is_static {
                ProblemKind::StaticMethodBecameFinal
            } else {
                ProblemKind::MethodBecameFinal
            };
            emit(kind, "non-final", "final");
        }
        if new_method.access.narrower_than(old_method.access) {
            emit(
                ProblemKind::ChangedMethodAccess,
                old_method.access.as_str(),
                new_method.access.as_str(),
            );
        }

        let on_class = self.old.type_of(old_method.class_id).kind == TypeKind::Class;
        if on_class {
            if !old_method.is_abstract && new_method.is_abstract {
                emit(ProblemKind::MethodBecameAbstract, "concrete", "abstract");
            }
            if old_method.is_abstract && !new_method.is_abstract {
                emit(ProblemKind::MethodBecameNonAbstract, "abstract", "concrete");
            }
        }

        if self.opts.check_implementation
            && let (Some(d1), Some(d2)) = (&old_method.body_digest, &new_method.body_digest)
            && d1 != d2
        {
            emit(ProblemKind::ChangedMethodImplementation, d1, d2);
        }
    }

    fn merge_exceptions(
        &mut self,
        id: &str,
        class_name: &str,
        old_method: &MethodRecord,
        new_method: &MethodRecord,
    ) {
        let either_abstract = old_method.is_abstract || new_method.is_abstract;

        let old_names: BTreeMap<String, TypeId> = old_method
            .exceptions
            .iter()
            .map(|&e| (self.old.type_of(e).name.clone(), e))
            .collect();
        let new_names: BTreeMap<String, TypeId> = new_method
            .exceptions
            .iter()
            .map(|&e| (self.new.type_of(e).name.clone(), e))
            .collect();

        for (name, &ex) in &new_names {
            if old_names.contains_key(name) {
                continue;
            }
            let (kind, value_kind) = if self.new.is_unchecked_exception(ex) {
                if either_abstract {
                    continue;
                }
                (ProblemKind::AddedUncheckedException, "unchecked")
            } else if either_abstract {
                (ProblemKind::AbstractMethodAddedCheckedException, "checked")
            } else {
                (ProblemKind::NonAbstractMethodAddedCheckedException, "checked")
            };
            self.problems.insert(
                id,
                kind,
                "",
                ProblemDetail {
                    type_name: class_name.to_string(),
                    target: id.to_string(),
                    new_value: Some(name.clone()),
                    field_type: Some(value_kind.to_string()),
                    ..ProblemDetail::default()
                },
            );
        }

        for (name, &ex) in &old_names {
            if new_names.contains_key(name) {
                continue;
            }
            let (kind, value_kind) = if self.old.is_unchecked_exception(ex) {
                if either_abstract {
                    continue;
                }
                (ProblemKind::RemovedUncheckedException, "unchecked")
            } else if either_abstract {
                (ProblemKind::AbstractMethodRemovedCheckedException, "checked")
            } else {
                (ProblemKind::NonAbstractMethodRemovedCheckedException, "checked")
            };
            self.problems.insert(
                id,
                kind,
                "",
                ProblemDetail {
                    type_name: class_name.to_string(),
                    target: id.to_string(),
                    old_value: Some(name.clone()),
                    field_type: Some(value_kind.to_string()),
                    ..ProblemDetail::default()
                },
            );
        }
    }

    // ---- type merge ----

    fn merge_types(&mut self, t1: TypeId, t2: TypeId) -> Vec<TypeProblem> {
        let key = (t1.0, t2.0);
        if let Some(cached) = self.merged.get(&key) {
            return cached.clone();
        }
        if self.stack.contains(&key) {
            return Vec::new();
        }
        self.stack.push(key);
        let result = self.merge_types_inner(t1, t2);
        self.stack.pop();
        self.merged.insert(key, result.clone());
        result
    }

    fn merge_types_inner(&mut self, t1: TypeId, t2: TypeId) -> Vec<TypeProblem> {
        let old_api = self.old;
        let new_api = self.new;
        let r1 = old_api.type_of(t1);
        let r2 = new_api.type_of(t2);
        if r1.name != r2.name {
            return Vec::new();
        }
        if r1.kind == TypeKind::Array || r2.kind == TypeKind::Array {
            if let (Some(b1), Some(b2)) = (r1.base_type, r2.base_type) {
                return self.merge_types(b1, b2);
            }
            return Vec::new();
        }
        if r1.kind == TypeKind::Primitive || r2.kind == TypeKind::Primitive {
            return Vec::new();
        }
        // Referenced-only types carry no archive and nothing to compare.
        if r1.archive.is_empty() || r2.archive.is_empty() {
            return Vec::new();
        }
        if !self.opts.filter.keeps_package(&r1.package) || !self.includes_class(&r1.name) {
            return Vec::new();
        }
        if !old_api.is_instance_accessible(t1) {
            return Vec::new();
        }

        let name = r1.name.clone();
        let mut out = Vec::new();
        let type_problem = |kind: ProblemKind, detail: ProblemDetail| TypeProblem {
            kind,
            location: String::new(),
            detail,
        };
        let base_detail = |target: &str| ProblemDetail {
            type_name: name.clone(),
            target: target.to_string(),
            ..ProblemDetail::default()
        };

        match (r1.kind, r2.kind) {
            (TypeKind::Class, TypeKind::Interface) => {
                out.push(type_problem(ProblemKind::ClassBecameInterface, base_detail(&name)));
                return out;
            }
            (TypeKind::Interface, TypeKind::Class) => {
                out.push(type_problem(ProblemKind::InterfaceBecameClass, base_detail(&name)));
                return out;
            }
            _ => {}
        }
        let both_classes = r1.kind == TypeKind::Class && r2.kind == TypeKind::Class;

        if both_classes {
            if !r1.is_final && r2.is_final {
                let mut detail = base_detail(&name);
                detail.old_value = Some("non-final".to_string());
                detail.new_value = Some("final".to_string());
                out.push(type_problem(ProblemKind::ClassBecameFinal, detail));
            }
            if !r1.is_abstract && r2.is_abstract {
                let mut detail = base_detail(&name);
                detail.old_value = Some("concrete".to_string());
                detail.new_value = Some("abstract".to_string());
                out.push(type_problem(ProblemKind::ClassBecameAbstract, detail));
            }
        }

        self.merge_abstract_registries(&name, r1.kind, r1.is_abstract, &base_detail, &mut out);
        self.merge_supers(t1, t2, &name, &base_detail, &mut out);
        self.merge_fields(t1, t2, &name, &mut out);
        out
    }

    fn merge_abstract_registries(
        &self,
        name: &str,
        kind1: TypeKind,
        was_abstract: bool,
        base_detail: &dyn Fn(&str) -> ProblemDetail,
        out: &mut Vec<TypeProblem>,
    ) {
        if let Some(added) = self.added_abstract.get(name) {
            for method_id in added {
                let kind = if kind1 == TypeKind::Interface {
                    ProblemKind::InterfaceAddedAbstractMethod
                } else if was_abstract {
                    ProblemKind::AbstractClassAddedAbstractMethod
                } else {
                    ProblemKind::NonAbstractClassAddedAbstractMethod
                };
                let mut detail = base_detail(method_id);
                detail.add_effect = self.caller_of_added(name, method_id);
                out.push(TypeProblem {
                    kind,
                    location: String::new(),
                    detail,
                });
            }
        }
        if let Some(removed) = self.removed_abstract.get(name) {
            for method_id in removed {
                let kind = if kind1 == TypeKind::Interface {
                    ProblemKind::InterfaceRemovedAbstractMethod
                } else {
                    ProblemKind::ClassRemovedAbstractMethod
                };
                out.push(TypeProblem {
                    kind,
                    location: String::new(),
                    detail: base_detail(method_id),
                });
            }
        }
    }

    /// First v2 caller actually invoking the added method, if any.
    fn caller_of_added(&self, type_name: &str, method_id: &str) -> Option<String> {
        if let Some(callers) = self.new.usage.invoked_by.get(method_id) {
            return callers.iter().next().cloned();
        }
        let (_, short_name, desc) = descriptor::split_method_id(method_id)?;
        self.new
            .usage
            .first_caller_of(&format!("\"{short_name}\":{desc}"))
            .map(str::to_string)
            .or_else(|| {
                self.new
                    .usage
                    .class_caller(type_name, Some(&short_name))
                    .map(str::to_string)
            })
    }

    fn merge_supers(
        &self,
        t1: TypeId,
        t2: TypeId,
        name: &str,
        base_detail: &dyn Fn(&str) -> ProblemDetail,
        out: &mut Vec<TypeProblem>,
    ) {
        let r1 = self.old.type_of(t1);
        let r2 = self.new.type_of(t2);
        let both_classes = r1.kind == TypeKind::Class && r2.kind == TypeKind::Class;

        // The cutoff for "no super class" is the literal java.lang.Object.
        let s1 = r1
            .super_class
            .map(|s| self.old.type_of(s).name.clone())
            .filter(|n| n != "java.lang.Object");
        let s2 = r2
            .super_class
            .map(|s| self.new.type_of(s).name.clone())
            .filter(|n| n != "java.lang.Object");

        match (&s1, &s2) {
            (None, Some(added)) => {
                let added_abstract_class = self
                    .new
                    .type_by_name(added)
                    .is_some_and(|t| t.kind == TypeKind::Class && t.is_abstract);
                if both_classes && r1.is_abstract && added_abstract_class {
                    let mut detail = base_detail(name);
                    detail.new_value = Some(added.clone());
                    detail.add_effect = self.new.usage.class_caller(name, None).map(str::to_string);
                    out.push(TypeProblem {
                        kind: ProblemKind::AbstractClassAddedSuperAbstractClass,
                        location: String::new(),
                        detail,
                    });
                } else {
                    let mut detail = base_detail(name);
                    detail.new_value = Some(added.clone());
                    out.push(TypeProblem {
                        kind: ProblemKind::AddedSuperClass,
                        location: String::new(),
                        detail,
                    });
                }
            }
            (Some(removed), None) => {
                let mut detail = base_detail(name);
                detail.old_value = Some(removed.clone());
                out.push(TypeProblem {
                    kind: ProblemKind::RemovedSuperClass,
                    location: String::new(),
                    detail,
                });
            }
            (Some(a), Some(b)) if a != b => {
                let mut detail = base_detail(name);
                detail.old_value = Some(a.clone());
                detail.new_value = Some(b.clone());
                out.push(TypeProblem {
                    kind: ProblemKind::ChangedSuperClass,
                    location: String::new(),
                    detail,
                });
            }
            _ => {}
        }

        let i1: BTreeSet<String> = r1
            .super_interfaces
            .iter()
            .map(|&i| self.old.type_of(i).name.clone())
            .collect();
        let i2: BTreeSet<String> = r2
            .super_interfaces
            .iter()
            .map(|&i| self.new.type_of(i).name.clone())
            .collect();

        for added in i2.difference(&i1) {
            let constant_only = self
                .new
                .names
                .id_of(added)
                .is_some_and(|i| self.new.is_constant_only_interface(i));
            let kind = match (r1.kind, constant_only) {
                (TypeKind::Interface, true) => ProblemKind::InterfaceAddedSuperConstantInterface,
                (TypeKind::Interface, false) => ProblemKind::InterfaceAddedSuperInterface,
                (TypeKind::Class, _) if r1.is_abstract => {
                    ProblemKind::AbstractClassAddedSuperInterface
                }
                (TypeKind::Class, _) => ProblemKind::ClassAddedSuperInterface,
                _ => continue,
            };
            let mut detail = base_detail(name);
            detail.new_value = Some(added.clone());
            detail.add_effect = self.new.usage.class_caller(name, None).map(str::to_string);
            out.push(TypeProblem {
                kind,
                location: String::new(),
                detail,
            });
        }
        for removed in i1.difference(&i2) {
            let constant_only = self
                .old
                .names
                .id_of(removed)
                .is_some_and(|i| self.old.is_constant_only_interface(i));
            let kind = match (r1.kind, constant_only) {
                (TypeKind::Interface, true) => ProblemKind::InterfaceRemovedSuperConstantInterface,
                (TypeKind::Interface, false) => ProblemKind::InterfaceRemovedSuperInterface,
                (TypeKind::Class, _) => ProblemKind::ClassRemovedSuperInterface,
                _ => continue,
            };
            let mut detail = base_detail(name);
            detail.old_value = Some(removed.clone());
            out.push(TypeProblem {
                kind,
                location: String::new(),
                detail,
            });
        }
    }

    fn merge_fields(&mut self, t1: TypeId, t2: TypeId, name: &str, out: &mut Vec<TypeProblem>) {
        let old_api = self.old;
        let new_api = self.new;
        let r1 = old_api.type_of(t1);
        let r2 = new_api.type_of(t2);
        let iface2 = r2.kind == TypeKind::Interface;

        let mut rename_targets: BTreeSet<String> = BTreeSet::new();
        let mut recursions: Vec<(TypeId, TypeId, String)> = Vec::new();

        for f1 in &r1.fields {
            if !matches!(f1.access, Access::Public | Access::Protected) {
                continue;
            }
            let ty1 = old_api.type_of(f1.type_id).name.clone();
            let field_detail = |target: &str| ProblemDetail {
                type_name: name.to_string(),
                target: target.to_string(),
                field_type: Some(ty1.clone()),
                field_value: f1.value.clone(),
                ..ProblemDetail::default()
            };

            let Some(f2) = r2.field(&f1.name) else {
                // Same positional slot, same type, different name: a rename.
                if let Some(candidate) = r2.field_at(f1.position)
                    && new_api.type_of(candidate.type_id).name == ty1
                    && candidate.name != f1.name
                    && r1.field(&candidate.name).is_none()
                {
                    let kind = if f1.is_constant() {
                        ProblemKind::RenamedConstantField
                    } else {
                        ProblemKind::RenamedField
                    };
                    let mut detail = field_detail(&f1.name);
                    detail.old_value = Some(f1.name.clone());
                    detail.new_value = Some(candidate.name.clone());
                    rename_targets.insert(candidate.name.clone());
                    out.push(TypeProblem {
                        kind,
                        location: f1.name.clone(),
                        detail,
                    });
                } else {
                    let kind = if f1.is_constant() {
                        ProblemKind::RemovedConstantField
                    } else {
                        ProblemKind::RemovedNonConstantField
                    };
                    out.push(TypeProblem {
                        kind,
                        location: f1.name.clone(),
                        detail: field_detail(&f1.name),
                    });
                }
                continue;
            };

            let ty2 = new_api.type_of(f2.type_id).name.clone();
            if ty1 != ty2 {
                let mut detail = field_detail(&f1.name);
                detail.old_value = Some(ty1.clone());
                detail.new_value = Some(ty2.clone());
                out.push(TypeProblem {
                    kind: ProblemKind::ChangedFieldType,
                    location: f1.name.clone(),
                    detail,
                });
            }
            if f2.access.narrower_than(f1.access) {
                let mut detail = field_detail(&f1.name);
                detail.old_value = Some(f1.access.as_str().to_string());
                detail.new_value = Some(f2.access.as_str().to_string());
                out.push(TypeProblem {
                    kind: ProblemKind::ChangedFieldAccess,
                    location: f1.name.clone(),
                    detail,
                });
            }
            if f1.is_constant()
                && f2.is_constant()
                && f1.value != f2.value
            {
                let mut detail = field_detail(&f1.name);
                detail.old_value = f1.value.clone();
                detail.new_value = f2.value.clone();
                out.push(TypeProblem {
                    kind: ProblemKind::ChangedFinalFieldValue,
                    location: f1.name.clone(),
                    detail,
                });
            }
            if !f1.is_final && f2.is_final {
                out.push(TypeProblem {
                    kind: ProblemKind::FieldBecameFinal,
                    location: f1.name.clone(),
                    detail: field_detail(&f1.name),
                });
            }
            if f1.is_final && !f2.is_final {
                out.push(TypeProblem {
                    kind: ProblemKind::FieldBecameNonFinal,
                    location: f1.name.clone(),
                    detail: field_detail(&f1.name),
                });
            }
            if f1.is_static != f2.is_static {
                let kind = if f1.is_static {
                    if f1.is_constant() {
                        ProblemKind::ConstantFieldBecameNonStatic
                    } else {
                        ProblemKind::FieldBecameNonStatic
                    }
                } else if !f2.is_constant() {
                    ProblemKind::NonConstantFieldBecameStatic
                } else {
                    ProblemKind::FieldBecameStatic
                };
                out.push(TypeProblem {
                    kind,
                    location: f1.name.clone(),
                    detail: field_detail(&f1.name),
                });
            }
            if ty1 == ty2 {
                recursions.push((f1.type_id, f2.type_id, f1.name.clone()));
            }
        }

        for f2 in &r2.fields {
            if !matches!(f2.access, Access::Public | Access::Protected) {
                continue;
            }
            if r1.field(&f2.name).is_some() || rename_targets.contains(&f2.name) {
                continue;
            }
            let kind = if iface2 {
                ProblemKind::InterfaceAddedField
            } else {
                ProblemKind::ClassAddedField
            };
            out.push(TypeProblem {
                kind,
                location: f2.name.clone(),
                detail: ProblemDetail {
                    type_name: name.to_string(),
                    target: f2.name.clone(),
                    field_type: Some(new_api.type_of(f2.type_id).name.clone()),
                    field_value: f2.value.clone(),
                    ..ProblemDetail::default()
                },
            });
        }

        for (ft1, ft2, field_name) in recursions {
            let sub = self.merge_types(ft1, ft2);
            for problem in sub {
                let location = if problem.location.is_empty() {
                    field_name.clone()
                } else {
                    format!("{field_name}.{}", problem.location)
                };
                out.push(TypeProblem {
                    kind: problem.kind,
                    location,
                    detail: problem.detail,
                });
            }
        }
    }

    /// Attributes memoized type problems to a method (or type) context,
    /// prefixing locations with the touching position.
    fn splice(
        &mut self,
        method_key: &str,
        prefix: &str,
        param: Option<(u32, Option<String>)>,
        type_problems: &[TypeProblem],
    ) {
        for problem in type_problems {
            let location = match (prefix.is_empty(), problem.location.is_empty()) {
                (true, _) => problem.location.clone(),
                (false, true) => prefix.to_string(),
                (false, false) => format!("{prefix}.{}", problem.location),
            };
            let mut detail = problem.detail.clone();
            if let Some((position, ref name)) = param {
                detail.param_position = Some(position);
                detail.param_name = name.clone();
            }
            self.problems
                .insert(method_key, problem.kind, &location, detail);
        }
    }
}

struct MergePosition {
    prefix: String,
    old_type: TypeId,
    new_type: TypeId,
    param: Option<(u32, Option<String>)>,
}

fn method_positions(old_method: &MethodRecord, new_method: &MethodRecord) -> Vec<MergePosition> {
    let mut positions = vec![MergePosition {
        prefix: "this".to_string(),
        old_type: old_method.class_id,
        new_type: new_method.class_id,
        param: None,
    }];
    if let (Some(r1), Some(r2)) = (old_method.return_type, new_method.return_type) {
        positions.push(MergePosition {
            prefix: "RetVal".to_string(),
            old_type: r1,
            new_type: r2,
            param: None,
        });
    }
    for (pos, (p1, p2)) in old_method
        .params
        .iter()
        .zip(new_method.params.iter())
        .enumerate()
    {
        let name = p1.name.clone().or_else(|| p2.name.clone());
        let prefix = name
            .clone()
            .unwrap_or_else(|| format!("parameter{}", pos + 1));
        positions.push(MergePosition {
            prefix,
            old_type: p1.type_id,
            new_type: p2.type_id,
            param: Some((pos as u32, name)),
        });
    }
    positions
}

fn find_method_on<'m>(
    api: &'m Api,
    class_id: TypeId,
    short_name: &str,
    param_part: &str,
) -> Option<&'m MethodRecord> {
    api.methods_of(class_id)
        .iter()
        .map(|id| &api.methods[id])
        .find(|m| {
            m.short_name == short_name && descriptor::parameter_part(m.descriptor()) == param_part
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::{ParseOptions, parse_disassembly};
    use crate::problems::{Level, Severity, effective_severity};

    fn api_from(version: &str, text: &str) -> Api {
        let mut api = Api::new("lib", version);
        parse_disassembly(&mut api, "lib.jar", text, ParseOptions::default()).unwrap();
        crate::disasm::index_foreign_invocations(&mut api);
        api
    }

    fn run(old_text: &str, new_text: &str) -> DiffResult {
        let old = api_from("1.0", old_text);
        let new = api_from("2.0", new_text);
        compare(&old, &new, &DiffOptions::default())
    }

    fn kinds_of(result: &DiffResult) -> BTreeSet<ProblemKind> {
        result.problems.iter().map(|((_, k, _), _)| *k).collect()
    }

    #[test]
    fn reflexivity_compare_x_x_is_compatible() {
        let text = r#"public class org.sample.Widget extends org.sample.Base {
  public static final int LIMIT;
    descriptor: I
    ConstantValue: int 7
  public org.sample.Widget();
    descriptor: ()V
  public int measure(java.lang.String) throws org.sample.MeasureException;
    descriptor: (Ljava/lang/String;)I
}
public class org.sample.MeasureException extends java.lang.Exception {
  public org.sample.MeasureException();
    descriptor: ()V
}
"#;
        let result = run(text, text);
        for level in [Level::Binary, Level::Source] {
            let severities = result.problems.max_severities(level, false);
            assert!(
                severities.values().all(|&s| s == Severity::Safe),
                "{level:?}: {severities:?}"
            );
        }
    }

    // Scenario: removed public non-constant field.
    #[test]
    fn removed_nonconstant_field_is_high_high() {
        let v1 = r#"public class org.sample.Widget {
  public java.lang.Integer removedField;
    descriptor: Ljava/lang/Integer;
  public org.sample.Widget();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let found = result.problems.of_kind(ProblemKind::RemovedNonConstantField);
        assert!(!found.is_empty());
        let detail = found[0].1;
        assert_eq!(detail.target, "removedField");
        assert_eq!(detail.field_type.as_deref(), Some("java.lang.Integer"));
        for level in [Level::Binary, Level::Source] {
            assert_eq!(
                effective_severity(ProblemKind::RemovedNonConstantField, level, detail, false),
                Severity::High
            );
        }
    }

    // Scenario: constant field renamed in place.
    #[test]
    fn renamed_constant_field_by_position() {
        let v1 = r#"public class org.sample.Widget {
  public static final java.lang.String oldName;
    descriptor: Ljava/lang/String;
    ConstantValue: String "Value"
  public org.sample.Widget();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public static final java.lang.String newName;
    descriptor: Ljava/lang/String;
    ConstantValue: String "Value"
  public org.sample.Widget();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let renamed = result.problems.of_kind(ProblemKind::RenamedConstantField);
        assert_eq!(renamed.len(), 1);
        let detail = renamed[0].1;
        assert_eq!(detail.old_value.as_deref(), Some("oldName"));
        assert_eq!(detail.new_value.as_deref(), Some("newName"));
        assert_eq!(
            effective_severity(ProblemKind::RenamedConstantField, Level::Binary, detail, false),
            Severity::Low
        );
        assert_eq!(
            effective_severity(ProblemKind::RenamedConstantField, Level::Source, detail, false),
            Severity::High
        );
        // Not double-reported as removed+added.
        assert!(!result.problems.contains_kind(ProblemKind::RemovedConstantField));
        assert!(!result.problems.contains_kind(ProblemKind::ClassAddedField));
    }

    // Scenario: second checked exception added to a concrete method.
    #[test]
    fn added_checked_exception_on_concrete_method() {
        let v1 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public void changedMethod() throws org.sample.FirstCheckedException;
    descriptor: ()V
}
public class org.sample.FirstCheckedException extends java.lang.Exception {
  public org.sample.FirstCheckedException();
    descriptor: ()V
}
public class org.sample.SecondCheckedException extends java.lang.Exception {
  public org.sample.SecondCheckedException();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public void changedMethod() throws org.sample.FirstCheckedException, org.sample.SecondCheckedException;
    descriptor: ()V
}
public class org.sample.FirstCheckedException extends java.lang.Exception {
  public org.sample.FirstCheckedException();
    descriptor: ()V
}
public class org.sample.SecondCheckedException extends java.lang.Exception {
  public org.sample.SecondCheckedException();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let added = result
            .problems
            .of_kind(ProblemKind::NonAbstractMethodAddedCheckedException);
        assert_eq!(added.len(), 1);
        let detail = added[0].1;
        assert_eq!(
            detail.new_value.as_deref(),
            Some("org.sample.SecondCheckedException")
        );
        assert_eq!(
            effective_severity(
                ProblemKind::NonAbstractMethodAddedCheckedException,
                Level::Binary,
                detail,
                false
            ),
            Severity::Low
        );
        assert_eq!(
            effective_severity(
                ProblemKind::NonAbstractMethodAddedCheckedException,
                Level::Source,
                detail,
                false
            ),
            Severity::Medium
        );
    }

    // Scenario: abstract method added to an interface, with and without a
    // caller in the new version.
    #[test]
    fn interface_added_abstract_method_severity_depends_on_callers() {
        let v1 = r#"public interface org.sample.Service {
  public abstract void existing();
    descriptor: ()V
}
"#;
        let with_caller = r#"public interface org.sample.Service {
  public abstract void existing();
    descriptor: ()V
  public abstract void addedMethod();
    descriptor: ()V
}
public class org.sample.Client {
  public org.sample.Client();
    descriptor: ()V
  public void drive(org.sample.Service);
    descriptor: (Lorg/sample/Service;)V
    Code:
         0: invokeinterface #4,  1   // InterfaceMethod org/sample/Service."addedMethod":()V
         5: return
}
"#;
        let result = run(v1, with_caller);
        let added = result.problems.of_kind(ProblemKind::InterfaceAddedAbstractMethod);
        assert!(!added.is_empty());
        let detail = added[0].1;
        assert!(detail.add_effect.is_some());
        assert_eq!(
            effective_severity(
                ProblemKind::InterfaceAddedAbstractMethod,
                Level::Source,
                detail,
                false
            ),
            Severity::Medium
        );

        let without_caller = r#"public interface org.sample.Service {
  public abstract void existing();
    descriptor: ()V
  public abstract void addedMethod();
    descriptor: ()V
}
"#;
        let result = run(v1, without_caller);
        let added = result.problems.of_kind(ProblemKind::InterfaceAddedAbstractMethod);
        assert!(!added.is_empty());
        let detail = added[0].1;
        assert!(detail.add_effect.is_none());
        assert_eq!(
            effective_severity(
                ProblemKind::InterfaceAddedAbstractMethod,
                Level::Source,
                detail,
                false
            ),
            Severity::Safe
        );
        assert_eq!(
            effective_severity(
                ProblemKind::InterfaceAddedAbstractMethod,
                Level::Source,
                detail,
                true
            ),
            Severity::Low
        );
    }

    // Scenario: void return type becomes a value.
    #[test]
    fn changed_return_from_void_pairs_added_and_removed() {
        let v1 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public void changedMethod(java.lang.Integer, java.lang.String[]);
    descriptor: (Ljava/lang/Integer;[Ljava/lang/String;)V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public java.lang.Integer changedMethod(java.lang.Integer, java.lang.String[]);
    descriptor: (Ljava/lang/Integer;[Ljava/lang/String;)Ljava/lang/Integer;
}
"#;
        let result = run(v1, v2);
        let changed = result.problems.of_kind(ProblemKind::ChangedMethodReturnFromVoid);
        assert_eq!(changed.len(), 1);
        let detail = changed[0].1;
        assert_eq!(detail.old_value.as_deref(), Some("void"));
        assert_eq!(detail.new_value.as_deref(), Some("java.lang.Integer"));

        // Both sides are recorded for suppression in the source report.
        assert_eq!(result.changed_return_from_void.len(), 2);
        for id in &result.changed_return_from_void {
            assert!(id.contains("changedMethod"));
        }
    }

    // Scenario: class turned into an interface.
    #[test]
    fn class_became_interface_is_emitted_at_type_level() {
        let v1 = r#"public class org.sample.Shape extends org.sample.Base {
  public org.sample.Shape();
    descriptor: ()V
  public void draw();
    descriptor: ()V
}
"#;
        let v2 = r#"public interface org.sample.Shape extends org.sample.Drawable,org.sample.Sizable {
  public abstract void draw();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let became = result.problems.of_kind(ProblemKind::ClassBecameInterface);
        assert!(!became.is_empty());
        let detail = became[0].1;
        assert_eq!(detail.type_name, "org.sample.Shape");
        for level in [Level::Binary, Level::Source] {
            assert_eq!(
                effective_severity(ProblemKind::ClassBecameInterface, level, detail, false),
                Severity::High
            );
        }
    }

    #[test]
    fn attribute_transitions_emit_distinct_kinds() {
        let v1 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public void stays();
    descriptor: ()V
  public void locked();
    descriptor: ()V
  public static void util();
    descriptor: ()V
  public void hidden();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public static void stays();
    descriptor: ()V
  public final synchronized void locked();
    descriptor: ()V
  public static final void util();
    descriptor: ()V
  protected void hidden();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let kinds = kinds_of(&result);
        assert!(kinds.contains(&ProblemKind::MethodBecameStatic));
        assert!(kinds.contains(&ProblemKind::MethodBecameFinal));
        assert!(kinds.contains(&ProblemKind::StaticMethodBecameFinal));
        assert!(kinds.contains(&ProblemKind::MethodBecameSynchronized));
        assert!(kinds.contains(&ProblemKind::ChangedMethodAccess));

        let access = result.problems.of_kind(ProblemKind::ChangedMethodAccess);
        assert_eq!(access[0].1.old_value.as_deref(), Some("public"));
        assert_eq!(access[0].1.new_value.as_deref(), Some("protected"));
    }

    #[test]
    fn moved_up_hierarchy_replaces_removed_method() {
        let v1 = r#"public class org.sample.Base {
  public org.sample.Base();
    descriptor: ()V
}
public class org.sample.Child extends org.sample.Base {
  public org.sample.Child();
    descriptor: ()V
  public void helper();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Base {
  public org.sample.Base();
    descriptor: ()V
  public void helper();
    descriptor: ()V
}
public class org.sample.Child extends org.sample.Base {
  public org.sample.Child();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let moved = result.problems.of_kind(ProblemKind::ClassMethodMovedUpHierarchy);
        assert_eq!(moved.len(), 1);
        assert!(
            moved[0]
                .1
                .new_value
                .as_deref()
                .unwrap()
                .contains("org/sample/Base")
        );
        let removed: Vec<_> = result
            .problems
            .of_kind(ProblemKind::RemovedMethod)
            .into_iter()
            .filter(|((m, _, _), _)| m.contains("helper"))
            .collect();
        assert!(removed.is_empty());

        // The base method now being overridden-from-below in reverse: the
        // added method on Base overrides nothing, so no overridden problem.
        assert!(!result.problems.contains_kind(ProblemKind::ClassOverriddenMethod));
    }

    #[test]
    fn added_override_flags_the_overridden_method() {
        let v1 = r#"public class org.sample.Base {
  public org.sample.Base();
    descriptor: ()V
  public void render();
    descriptor: ()V
}
public class org.sample.Child extends org.sample.Base {
  public org.sample.Child();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Base {
  public org.sample.Base();
    descriptor: ()V
  public void render();
    descriptor: ()V
}
public class org.sample.Child extends org.sample.Base {
  public org.sample.Child();
    descriptor: ()V
  public void render();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let overridden = result.problems.of_kind(ProblemKind::ClassOverriddenMethod);
        assert_eq!(overridden.len(), 1);
        let ((method, _, _), detail) = &overridden[0];
        assert_eq!(method, "org/sample/Base.\"render\":()V");
        assert!(detail.new_value.as_deref().unwrap().contains("Child"));
    }

    #[test]
    fn super_class_and_interface_deltas() {
        let v1 = r#"public class org.sample.Widget extends org.sample.OldBase {
  public org.sample.Widget();
    descriptor: ()V
}
public interface org.sample.Api extends org.sample.OldIface {
  public abstract void run();
    descriptor: ()V
}
public interface org.sample.OldIface {
  public abstract void legacy();
    descriptor: ()V
}
public class org.sample.OldBase {
  public org.sample.OldBase();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget extends org.sample.NewBase {
  public org.sample.Widget();
    descriptor: ()V
}
public interface org.sample.Api extends org.sample.OldIface,org.sample.ExtraIface {
  public abstract void run();
    descriptor: ()V
}
public interface org.sample.OldIface {
  public abstract void legacy();
    descriptor: ()V
}
public interface org.sample.ExtraIface {
  public abstract void extra();
    descriptor: ()V
}
public class org.sample.NewBase {
  public org.sample.NewBase();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        let kinds = kinds_of(&result);
        assert!(kinds.contains(&ProblemKind::ChangedSuperClass));
        assert!(kinds.contains(&ProblemKind::InterfaceAddedSuperInterface));

        let changed = result.problems.of_kind(ProblemKind::ChangedSuperClass);
        assert_eq!(changed[0].1.old_value.as_deref(), Some("org.sample.OldBase"));
        assert_eq!(changed[0].1.new_value.as_deref(), Some("org.sample.NewBase"));
    }

    #[test]
    fn field_type_problems_propagate_through_method_positions() {
        let v1 = r#"public class org.sample.Holder {
  public org.sample.Payload data;
    descriptor: Lorg/sample/Payload;
  public org.sample.Holder();
    descriptor: ()V
}
public class org.sample.Payload {
  public java.lang.Integer gone;
    descriptor: Ljava/lang/Integer;
  public org.sample.Payload();
    descriptor: ()V
}
public class org.sample.Service {
  public org.sample.Service();
    descriptor: ()V
  public org.sample.Holder fetch(org.sample.Holder);
    descriptor: (Lorg/sample/Holder;)Lorg/sample/Holder;
    Code:
      stack=1, locals=2, args_size=2
         0: aload_1
         1: areturn
      LocalVariableTable:
        Start  Length  Slot  Name   Signature
            0       2     0  this   Lorg/sample/Service;
            0       2     1  input  Lorg/sample/Holder;
}
"#;
        let v2 = r#"public class org.sample.Holder {
  public org.sample.Payload data;
    descriptor: Lorg/sample/Payload;
  public org.sample.Holder();
    descriptor: ()V
}
public class org.sample.Payload {
  public org.sample.Payload();
    descriptor: ()V
}
public class org.sample.Service {
  public org.sample.Service();
    descriptor: ()V
  public org.sample.Holder fetch(org.sample.Holder);
    descriptor: (Lorg/sample/Holder;)Lorg/sample/Holder;
    Code:
      stack=1, locals=2, args_size=2
         0: aload_1
         1: areturn
      LocalVariableTable:
        Start  Length  Slot  Name   Signature
            0       2     0  this   Lorg/sample/Service;
            0       2     1  input  Lorg/sample/Holder;
}
"#;
        let result = run(v1, v2);
        let removed = result.problems.of_kind(ProblemKind::RemovedNonConstantField);
        let locations: BTreeSet<&str> = removed
            .iter()
            .map(|((_, _, loc), _)| loc.as_str())
            .collect();
        // Through the return value and the named parameter of fetch, plus
        // the type-level sweep of Payload itself.
        assert!(locations.contains("RetVal.data.gone"));
        assert!(locations.contains("input.data.gone"));
        assert!(locations.contains("gone"));

        // One underlying change, however many positions touch it.
        let severities = result.problems.max_severities(Level::Binary, false);
        let matching: Vec<_> = severities
            .keys()
            .filter(|(t, k, _)| t == "org.sample.Payload" && *k == ProblemKind::RemovedNonConstantField)
            .collect();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn recursive_type_graph_terminates() {
        let text = r#"public class org.sample.Node {
  public org.sample.Node next;
    descriptor: Lorg/sample/Node;
  public org.sample.Node();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Node {
  public org.sample.Node next;
    descriptor: Lorg/sample/Node;
  public java.lang.Integer weight;
    descriptor: Ljava/lang/Integer;
  public org.sample.Node();
    descriptor: ()V
}
"#;
        let result = run(text, v2);
        assert!(result.problems.contains_kind(ProblemKind::ClassAddedField));
    }

    #[test]
    fn private_and_filtered_members_are_skipped() {
        let v1 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  private void secret();
    descriptor: ()V
}
public class org.sample.internal.Helper {
  public org.sample.internal.Helper();
    descriptor: ()V
  public void gone();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
}
"#;
        let old = api_from("1.0", v1);
        let new = api_from("2.0", v2);
        let result = compare(&old, &new, &DiffOptions::default());
        let removed = result.problems.of_kind(ProblemKind::RemovedMethod);
        assert!(
            removed.iter().all(|((m, _, _), _)| !m.contains("secret")),
            "private methods never produce problems"
        );
        assert!(
            removed.iter().all(|((m, _, _), _)| !m.contains("internal")),
            "implicit-internal packages are filtered"
        );
    }

    #[test]
    fn unconstructible_class_skips_instance_method_merge() {
        let v1 = r#"public class org.sample.Util {
  private org.sample.Util();
    descriptor: ()V
  public void instanceMethod();
    descriptor: ()V
  public static void staticMethod();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Util {
  private org.sample.Util();
    descriptor: ()V
  public final void instanceMethod();
    descriptor: ()V
  public static final void staticMethod();
    descriptor: ()V
}
"#;
        let result = run(v1, v2);
        // instanceMethod is unreachable (no accessible constructor), the
        // static method is not.
        assert!(!result.problems.contains_kind(ProblemKind::MethodBecameFinal));
        assert!(result.problems.contains_kind(ProblemKind::StaticMethodBecameFinal));
    }

    #[test]
    fn class_restriction_limits_the_problem_set() {
        let v1 = r#"public class org.sample.Kept {
  public org.sample.Kept();
    descriptor: ()V
  public void gone();
    descriptor: ()V
}
public class org.sample.Ignored {
  public org.sample.Ignored();
    descriptor: ()V
  public void alsoGone();
    descriptor: ()V
}
"#;
        let v2 = r#"public class org.sample.Kept {
  public org.sample.Kept();
    descriptor: ()V
}
public class org.sample.Ignored {
  public org.sample.Ignored();
    descriptor: ()V
}
"#;
        let old = api_from("1.0", v1);
        let new = api_from("2.0", v2);
        let opts = DiffOptions {
            class_restriction: Some(["org.sample.Kept".to_string()].into_iter().collect()),
            ..DiffOptions::default()
        };
        let result = compare(&old, &new, &opts);
        let removed = result.problems.of_kind(ProblemKind::RemovedMethod);
        assert_eq!(removed.len(), 1);
        assert!(removed[0].0.0.contains("Kept"));
    }
}
