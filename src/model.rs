//! In-memory symbol model: types, fields, methods, and the per-version `Api`
//! bundle.
//!
//! Relationships are stored as `TypeId` handles into the version's type
//! table, never as pointers; the interner owns the canonical strings. One
//! `Api` is built per version during ingestion and is read-only during
//! diffing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor;
use crate::intern::{NameTable, TypeId};
use crate::usage::UsageTables;

/// Sentinel distinguishing a known zero-length string constant from an
/// unknown constant value.
pub const EMPTY_STRING: &str = "EMPTY_STRING";

/// Runtime exceptions and errors that never require a `throws` clause.
/// A thrown type is unchecked iff its name is in this list or its direct
/// super-class is `java.lang.RuntimeException` in the same version.
pub const UNCHECKED_EXCEPTIONS: [&str; 20] = [
    "java.lang.RuntimeException",
    "java.lang.ArithmeticException",
    "java.lang.ArrayIndexOutOfBoundsException",
    "java.lang.ArrayStoreException",
    "java.lang.ClassCastException",
    "java.lang.IllegalArgumentException",
    "java.lang.IllegalMonitorStateException",
    "java.lang.IllegalStateException",
    "java.lang.IndexOutOfBoundsException",
    "java.lang.NegativeArraySizeException",
    "java.lang.NullPointerException",
    "java.lang.NumberFormatException",
    "java.lang.SecurityException",
    "java.lang.StringIndexOutOfBoundsException",
    "java.lang.UnsupportedOperationException",
    "java.util.ConcurrentModificationException",
    "java.lang.Error",
    "java.lang.AssertionError",
    "java.lang.OutOfMemoryError",
    "java.lang.StackOverflowError",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Access {
    Public,
    Protected,
    PackagePrivate,
    Private,
}

impl Access {
    /// True when `self` is more restrictive than `other` (narrowing).
    pub fn narrower_than(self, other: Access) -> bool {
        self.rank() > other.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Access::Public => 0,
            Access::Protected => 1,
            Access::PackagePrivate => 2,
            Access::Private => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::PackagePrivate => "package-private",
            Access::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Primitive,
    Array,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub type_id: TypeId,
    pub access: Access,
    pub is_final: bool,
    pub is_static: bool,
    pub is_transient: bool,
    pub is_volatile: bool,
    /// Insertion index within the declaring type; positional identity is
    /// what detects renames.
    pub position: u32,
    /// Compile-time constant as verbatim token; `EMPTY_STRING` stands for
    /// the zero-length string literal.
    pub value: Option<String>,
    /// Canonical descriptor of the field type.
    pub mangled: String,
}

impl FieldRecord {
    /// A constant field: static, final, with a known compile-time value.
    pub fn is_constant(&self) -> bool {
        self.is_static && self.is_final && self.value.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRecord {
    pub name: String,
    pub kind: TypeKind,
    pub package: String,
    /// Filename of the source archive; empty for referenced-only types.
    pub archive: String,
    pub access: Access,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub is_annotation: bool,
    pub deprecated: bool,
    pub super_class: Option<TypeId>,
    pub super_interfaces: BTreeSet<TypeId>,
    pub fields: Vec<FieldRecord>,
    pub annotations: BTreeSet<TypeId>,
    /// Element type for arrays.
    pub base_type: Option<TypeId>,
    /// True once the type's declaration has been parsed (as opposed to a
    /// referenced-only stub). A declared type's kind is never mutated.
    pub declared: bool,
}

impl TypeRecord {
    fn stub(name: &str) -> Self {
        let kind = if name.ends_with("[]") {
            TypeKind::Array
        } else if descriptor::is_primitive(name) {
            TypeKind::Primitive
        } else {
            TypeKind::Class
        };
        TypeRecord {
            name: name.to_string(),
            kind,
            package: descriptor::package_of(name),
            archive: String::new(),
            access: Access::Public,
            is_abstract: false,
            is_final: false,
            is_static: false,
            is_annotation: false,
            deprecated: false,
            super_class: None,
            super_interfaces: BTreeSet::new(),
            fields: Vec::new(),
            annotations: BTreeSet::new(),
            base_type: None,
            declared: descriptor::is_primitive(name),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_at(&self, position: u32) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.position == position)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub type_id: TypeId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRecord {
    /// Canonical id: `[pkg/]Class."name":descriptor`.
    pub id: String,
    pub short_name: String,
    pub class_id: TypeId,
    /// Absent for constructors.
    pub return_type: Option<TypeId>,
    pub params: Vec<Param>,
    pub exceptions: BTreeSet<TypeId>,
    pub access: Access,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub is_native: bool,
    pub is_synchronized: bool,
    pub constructor: bool,
    pub deprecated: bool,
    pub annotations: BTreeSet<TypeId>,
    pub archive: String,
    /// sha256 of the canonicalized body text; only populated under
    /// implementation checking.
    pub body_digest: Option<String>,
}

impl MethodRecord {
    pub fn descriptor(&self) -> &str {
        match self.id.rfind("\":") {
            Some(pos) => &self.id[pos + 2..],
            None => "",
        }
    }
}

/// One version's complete symbol model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Api {
    pub library: String,
    pub version: String,
    pub names: NameTable,
    pub types: Vec<TypeRecord>,
    pub methods: BTreeMap<String, MethodRecord>,
    pub usage: UsageTables,
    #[serde(skip)]
    class_methods: BTreeMap<TypeId, Vec<String>>,
}

impl Api {
    pub fn new(library: &str, version: &str) -> Self {
        Api {
            library: library.to_string(),
            version: version.to_string(),
            ..Api::default()
        }
    }

    /// Interns `name`, creating a referenced-only stub record on first
    /// sight. Array names also intern their element chain so `base_type`
    /// resolves transitively to a non-array.
    pub fn intern_type(&mut self, name: &str) -> TypeId {
        let (id, new) = self.names.intern(name);
        if new {
            self.types.push(TypeRecord::stub(name));
            debug_assert_eq!(self.types.len(), self.names.len());
            if let Some(element) = name.strip_suffix("[]") {
                let base = self.intern_type(element);
                self.types[id.index()].base_type = Some(base);
            }
        }
        id
    }

    pub fn type_of(&self, id: TypeId) -> &TypeRecord {
        &self.types[id.index()]
    }

    pub fn type_of_mut(&mut self, id: TypeId) -> &mut TypeRecord {
        &mut self.types[id.index()]
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeRecord> {
        self.names.id_of(name).map(|id| self.type_of(id))
    }

    /// Resolves an array type to its non-array element type.
    pub fn element_base(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let Some(base) = self.type_of(current).base_type {
            current = base;
        }
        current
    }

    pub fn add_method(&mut self, method: MethodRecord) {
        self.class_methods
            .entry(method.class_id)
            .or_default()
            .push(method.id.clone());
        self.methods.insert(method.id.clone(), method);
    }

    pub fn methods_of(&self, class_id: TypeId) -> &[String] {
        self.class_methods
            .get(&class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reassembles a deserialized model; used by the dump reader.
    pub fn from_parts(
        library: String,
        version: String,
        names: NameTable,
        types: Vec<TypeRecord>,
        methods: BTreeMap<String, MethodRecord>,
        usage: UsageTables,
    ) -> Self {
        let mut api = Api {
            library,
            version,
            names,
            types,
            methods,
            usage,
            class_methods: BTreeMap::new(),
        };
        api.rebuild_indexes();
        api
    }

    /// Rebuilds the skipped per-class index after deserialization.
    pub fn rebuild_indexes(&mut self) {
        self.class_methods.clear();
        for (id, method) in &self.methods {
            self.class_methods
                .entry(method.class_id)
                .or_default()
                .push(id.clone());
        }
    }

    /// Walks the super-class chain starting above `id`.
    pub fn super_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = self.type_of(id).super_class;
        while let Some(sup) = current {
            if !seen.insert(sup) {
                break;
            }
            chain.push(sup);
            current = self.type_of(sup).super_class;
        }
        chain
    }

    /// A thrown type is unchecked iff it is whitelisted or its direct
    /// super-class is `java.lang.RuntimeException` in this version.
    pub fn is_unchecked_exception(&self, id: TypeId) -> bool {
        let record = self.type_of(id);
        if UNCHECKED_EXCEPTIONS.contains(&record.name.as_str()) {
            return true;
        }
        record
            .super_class
            .is_some_and(|sup| self.type_of(sup).name == "java.lang.RuntimeException")
    }

    /// True when external clients can obtain or extend an instance: the type
    /// is an interface, or some constructor is public/protected, or no
    /// constructor was recorded at all (referenced-only supertypes).
    pub fn is_instance_accessible(&self, id: TypeId) -> bool {
        let record = self.type_of(id);
        if record.kind == TypeKind::Interface {
            return true;
        }
        let mut saw_ctor = false;
        for method_id in self.methods_of(id) {
            let method = &self.methods[method_id];
            if method.constructor {
                saw_ctor = true;
                if matches!(method.access, Access::Public | Access::Protected) {
                    return true;
                }
            }
        }
        !saw_ctor
    }

    /// True when every declared member of the interface is a constant field
    /// (no abstract methods).
    pub fn is_constant_only_interface(&self, id: TypeId) -> bool {
        let record = self.type_of(id);
        if record.kind != TypeKind::Interface {
            return false;
        }
        let has_methods = self
            .methods_of(id)
            .iter()
            .any(|m| !self.methods[m].constructor);
        !has_methods && record.fields.iter().any(FieldRecord::is_constant)
    }

    /// Every class name this API observably depends on: receiver classes,
    /// parameter/return/exception types, field types, and invocation
    /// targets. Drives the client-restriction mode.
    pub fn referenced_classes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let add = |out: &mut BTreeSet<String>, id: TypeId| {
            let base = self.element_base(id);
            let record = &self.types[base.index()];
            if record.kind != TypeKind::Primitive {
                out.insert(record.name.clone());
            }
        };
        for method in self.methods.values() {
            add(&mut out, method.class_id);
            if let Some(ret) = method.return_type {
                add(&mut out, ret);
            }
            for param in &method.params {
                add(&mut out, param.type_id);
            }
            for &ex in &method.exceptions {
                add(&mut out, ex);
            }
        }
        for record in &self.types {
            if !record.declared {
                continue;
            }
            for field in &record.fields {
                add(&mut out, field.type_id);
            }
        }
        for target in self.usage.invoked_by.keys() {
            if let Some((class_name, _, _)) = crate::descriptor::split_method_id(target) {
                out.insert(class_name);
            }
        }
        out
    }

    /// Abstract methods declared directly on `id`.
    pub fn abstract_methods_of(&self, id: TypeId) -> Vec<&MethodRecord> {
        self.methods_of(id)
            .iter()
            .map(|m| &self.methods[m])
            .filter(|m| m.is_abstract)
            .collect()
    }
}
