//! Compatibility-problem taxonomy: the closed kind enum, the binary and
//! source severity tables, context-sensitive overrides, and the write-once
//! problem set.
//!
//! The tables are plain functions over the enum so a test can sweep
//! `ProblemKind::ALL` and assert invariants against them.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Safe,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Binary,
    Source,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Binary => "binary",
            Level::Source => "source",
        }
    }
}

macro_rules! problem_kinds {
    ($($variant:ident => $name:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ProblemKind {
            $($variant,)+
        }

        impl ProblemKind {
            pub const ALL: &'static [ProblemKind] = &[$(ProblemKind::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(ProblemKind::$variant => $name,)+
                }
            }
        }
    };
}

problem_kinds! {
    AddedMethod => "Added_Method",
    RemovedMethod => "Removed_Method",
    ChangedMethodReturnFromVoid => "Changed_Method_Return_From_Void",
    ClassOverriddenMethod => "Class_Overridden_Method",
    ClassMethodMovedUpHierarchy => "Class_Method_Moved_Up_Hierarchy",
    MethodBecameStatic => "Method_Became_Static",
    MethodBecameNonStatic => "Method_Became_NonStatic",
    MethodBecameSynchronized => "Method_Became_Synchronized",
    MethodBecameNonSynchronized => "Method_Became_NonSynchronized",
    MethodBecameFinal => "Method_Became_Final",
    StaticMethodBecameFinal => "Static_Method_Became_Final",
    ChangedMethodAccess => "Changed_Method_Access",
    MethodBecameAbstract => "Method_Became_Abstract",
    MethodBecameNonAbstract => "Method_Became_NonAbstract",
    AbstractMethodAddedCheckedException => "Abstract_Method_Added_Checked_Exception",
    NonAbstractMethodAddedCheckedException => "NonAbstract_Method_Added_Checked_Exception",
    AbstractMethodRemovedCheckedException => "Abstract_Method_Removed_Checked_Exception",
    NonAbstractMethodRemovedCheckedException => "NonAbstract_Method_Removed_Checked_Exception",
    AddedUncheckedException => "Added_Unchecked_Exception",
    RemovedUncheckedException => "Removed_Unchecked_Exception",
    ChangedMethodImplementation => "Changed_Method_Implementation",
    ClassBecameInterface => "Class_Became_Interface",
    InterfaceBecameClass => "Interface_Became_Class",
    ClassBecameFinal => "Class_Became_Final",
    ClassBecameAbstract => "Class_Became_Abstract",
    NonAbstractClassAddedAbstractMethod => "NonAbstract_Class_Added_Abstract_Method",
    AbstractClassAddedAbstractMethod => "Abstract_Class_Added_Abstract_Method",
    InterfaceAddedAbstractMethod => "Interface_Added_Abstract_Method",
    ClassRemovedAbstractMethod => "Class_Removed_Abstract_Method",
    InterfaceRemovedAbstractMethod => "Interface_Removed_Abstract_Method",
    AddedSuperClass => "Added_Super_Class",
    RemovedSuperClass => "Removed_Super_Class",
    ChangedSuperClass => "Changed_Super_Class",
    AbstractClassAddedSuperAbstractClass => "Abstract_Class_Added_Super_Abstract_Class",
    InterfaceAddedSuperInterface => "Interface_Added_Super_Interface",
    InterfaceAddedSuperConstantInterface => "Interface_Added_Super_Constant_Interface",
    InterfaceRemovedSuperInterface => "Interface_Removed_Super_Interface",
    InterfaceRemovedSuperConstantInterface => "Interface_Removed_Super_Constant_Interface",
    AbstractClassAddedSuperInterface => "Abstract_Class_Added_Super_Interface",
    ClassAddedSuperInterface => "Class_Added_Super_Interface",
    ClassRemovedSuperInterface => "Class_Removed_Super_Interface",
    RemovedConstantField => "Removed_Constant_Field",
    RemovedNonConstantField => "Removed_NonConstant_Field",
    RenamedField => "Renamed_Field",
    RenamedConstantField => "Renamed_Constant_Field",
    ChangedFieldType => "Changed_Field_Type",
    ChangedFieldAccess => "Changed_Field_Access",
    ChangedFinalFieldValue => "Changed_Final_Field_Value",
    FieldBecameFinal => "Field_Became_Final",
    FieldBecameNonFinal => "Field_Became_NonFinal",
    FieldBecameStatic => "Field_Became_Static",
    FieldBecameNonStatic => "Field_Became_NonStatic",
    ConstantFieldBecameNonStatic => "Constant_Field_Became_NonStatic",
    NonConstantFieldBecameStatic => "NonConstant_Field_Became_Static",
    ClassAddedField => "Class_Added_Field",
    InterfaceAddedField => "Interface_Added_Field",
}

impl Serialize for ProblemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Base severity before context overrides.
pub fn base_severity(kind: ProblemKind, level: Level) -> Severity {
    use ProblemKind::*;
    use Severity::*;
    match level {
        Level::Binary => match kind {
            AddedMethod => Safe,
            RemovedMethod => High,
            ChangedMethodReturnFromVoid => High,
            ClassOverriddenMethod => Low,
            ClassMethodMovedUpHierarchy => Safe,
            MethodBecameStatic => High,
            MethodBecameNonStatic => High,
            MethodBecameSynchronized => Safe,
            MethodBecameNonSynchronized => Safe,
            MethodBecameFinal => Safe,
            StaticMethodBecameFinal => Safe,
            ChangedMethodAccess => High,
            MethodBecameAbstract => High,
            MethodBecameNonAbstract => Safe,
            AbstractMethodAddedCheckedException => Safe,
            NonAbstractMethodAddedCheckedException => Low,
            AbstractMethodRemovedCheckedException => Safe,
            NonAbstractMethodRemovedCheckedException => Low,
            AddedUncheckedException => Low,
            RemovedUncheckedException => Low,
            ChangedMethodImplementation => Low,
            ClassBecameInterface => High,
            InterfaceBecameClass => High,
            ClassBecameFinal => High,
            ClassBecameAbstract => High,
            NonAbstractClassAddedAbstractMethod => High,
            AbstractClassAddedAbstractMethod => Medium,
            InterfaceAddedAbstractMethod => Medium,
            ClassRemovedAbstractMethod => High,
            InterfaceRemovedAbstractMethod => High,
            AddedSuperClass => Low,
            RemovedSuperClass => High,
            ChangedSuperClass => Medium,
            AbstractClassAddedSuperAbstractClass => Medium,
            InterfaceAddedSuperInterface => Medium,
            InterfaceAddedSuperConstantInterface => Low,
            InterfaceRemovedSuperInterface => High,
            InterfaceRemovedSuperConstantInterface => Low,
            AbstractClassAddedSuperInterface => Medium,
            ClassAddedSuperInterface => Safe,
            ClassRemovedSuperInterface => High,
            RemovedConstantField => Low,
            RemovedNonConstantField => High,
            RenamedField => High,
            RenamedConstantField => Low,
            ChangedFieldType => High,
            ChangedFieldAccess => High,
            ChangedFinalFieldValue => Medium,
            FieldBecameFinal => Medium,
            FieldBecameNonFinal => Low,
            FieldBecameStatic => High,
            FieldBecameNonStatic => High,
            ConstantFieldBecameNonStatic => High,
            NonConstantFieldBecameStatic => High,
            ClassAddedField => Safe,
            InterfaceAddedField => Safe,
        },
        Level::Source => match kind {
            AddedMethod => Safe,
            RemovedMethod => High,
            ChangedMethodReturnFromVoid => High,
            ClassOverriddenMethod => Safe,
            ClassMethodMovedUpHierarchy => Safe,
            MethodBecameStatic => Low,
            MethodBecameNonStatic => High,
            MethodBecameSynchronized => Safe,
            MethodBecameNonSynchronized => Safe,
            MethodBecameFinal => High,
            StaticMethodBecameFinal => Medium,
            ChangedMethodAccess => High,
            MethodBecameAbstract => High,
            MethodBecameNonAbstract => Safe,
            AbstractMethodAddedCheckedException => Medium,
            NonAbstractMethodAddedCheckedException => Medium,
            AbstractMethodRemovedCheckedException => Medium,
            NonAbstractMethodRemovedCheckedException => Medium,
            AddedUncheckedException => Safe,
            RemovedUncheckedException => Safe,
            ChangedMethodImplementation => Safe,
            ClassBecameInterface => High,
            InterfaceBecameClass => High,
            ClassBecameFinal => High,
            ClassBecameAbstract => High,
            NonAbstractClassAddedAbstractMethod => High,
            AbstractClassAddedAbstractMethod => Medium,
            InterfaceAddedAbstractMethod => Medium,
            ClassRemovedAbstractMethod => High,
            InterfaceRemovedAbstractMethod => High,
            AddedSuperClass => Low,
            RemovedSuperClass => High,
            ChangedSuperClass => Medium,
            AbstractClassAddedSuperAbstractClass => Medium,
            InterfaceAddedSuperInterface => Medium,
            InterfaceAddedSuperConstantInterface => Low,
            InterfaceRemovedSuperInterface => High,
            InterfaceRemovedSuperConstantInterface => High,
            AbstractClassAddedSuperInterface => Medium,
            ClassAddedSuperInterface => Safe,
            ClassRemovedSuperInterface => High,
            RemovedConstantField => High,
            RemovedNonConstantField => High,
            RenamedField => High,
            RenamedConstantField => High,
            ChangedFieldType => High,
            ChangedFieldAccess => High,
            ChangedFinalFieldValue => Low,
            FieldBecameFinal => Safe,
            FieldBecameNonFinal => Safe,
            FieldBecameStatic => Safe,
            FieldBecameNonStatic => High,
            ConstantFieldBecameNonStatic => High,
            NonConstantFieldBecameStatic => Safe,
            ClassAddedField => Safe,
            InterfaceAddedField => Safe,
        },
    }
}

/// Kinds whose severity drops when the target is never exercised in the new
/// version.
fn downgrades_without_caller(kind: ProblemKind) -> bool {
    matches!(
        kind,
        ProblemKind::InterfaceAddedAbstractMethod
            | ProblemKind::AbstractClassAddedAbstractMethod
            | ProblemKind::InterfaceAddedSuperInterface
            | ProblemKind::AbstractClassAddedSuperInterface
            | ProblemKind::AbstractClassAddedSuperAbstractClass
    )
}

/// Table lookup plus the context-sensitive refinements.
pub fn effective_severity(
    kind: ProblemKind,
    level: Level,
    detail: &ProblemDetail,
    quick: bool,
) -> Severity {
    let base = base_severity(kind, level);

    if downgrades_without_caller(kind) && detail.add_effect.is_none() {
        return if quick { Severity::Low } else { Severity::Safe };
    }

    if kind == ProblemKind::ChangedFinalFieldValue {
        let target = detail.target.rsplit('.').next().unwrap_or(&detail.target);
        if target.contains("VERSION") || target.contains("VERNUM") {
            return Severity::Low;
        }
    }

    base
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProblemDetail {
    /// The type the change belongs to.
    pub type_name: String,
    /// The member or type the change names (method id, field name, type).
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value: Option<String>,
    /// Narrative refinement, e.g. the first v2 caller of an added abstract
    /// method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_effect: Option<String>,
}

pub type ProblemKey = (String, ProblemKind, String);

/// Write-once problem store keyed by (method id, kind, location).
#[derive(Debug, Clone, Default)]
pub struct ProblemSet {
    problems: BTreeMap<ProblemKey, ProblemDetail>,
}

impl ProblemSet {
    /// First write wins; re-emissions of the same key are ignored.
    pub fn insert(&mut self, method: &str, kind: ProblemKind, location: &str, detail: ProblemDetail) {
        self.problems
            .entry((method.to_string(), kind, location.to_string()))
            .or_insert(detail);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProblemKey, &ProblemDetail)> {
        self.problems.iter()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn contains_kind(&self, kind: ProblemKind) -> bool {
        self.problems.keys().any(|(_, k, _)| *k == kind)
    }

    pub fn of_kind(&self, kind: ProblemKind) -> Vec<(&ProblemKey, &ProblemDetail)> {
        self.problems
            .iter()
            .filter(|((_, k, _), _)| *k == kind)
            .collect()
    }

    /// Maximum severity per (type-name, kind, target) across every emission,
    /// so one underlying type change is counted once no matter how many
    /// methods touch it.
    pub fn max_severities(
        &self,
        level: Level,
        quick: bool,
    ) -> BTreeMap<(String, ProblemKind, String), Severity> {
        let mut out: BTreeMap<(String, ProblemKind, String), Severity> = BTreeMap::new();
        for ((_, kind, _), detail) in &self.problems {
            let severity = effective_severity(*kind, level, detail, quick);
            let key = (detail.type_name.clone(), *kind, detail.target.clone());
            out.entry(key)
                .and_modify(|s| *s = (*s).max(severity))
                .or_insert(severity);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(type_name: &str, target: &str) -> ProblemDetail {
        ProblemDetail {
            type_name: type_name.to_string(),
            target: target.to_string(),
            ..ProblemDetail::default()
        }
    }

    #[test]
    fn every_kind_has_a_severity_at_both_levels() {
        for &kind in ProblemKind::ALL {
            let _ = base_severity(kind, Level::Binary);
            let _ = base_severity(kind, Level::Source);
            assert!(!kind.as_str().is_empty());
        }
        assert!(ProblemKind::ALL.len() > 50);
    }

    #[test]
    fn spec_fixed_severities_hold() {
        use Level::*;
        use ProblemKind::*;
        use Severity::*;
        let rows = [
            (RemovedNonConstantField, High, High),
            (RenamedConstantField, Low, High),
            (NonAbstractMethodAddedCheckedException, Low, Medium),
            (ChangedMethodReturnFromVoid, High, High),
            (ClassBecameInterface, High, High),
            (RemovedConstantField, Low, High),
            (AddedSuperClass, Low, Low),
        ];
        for (kind, binary, source) in rows {
            assert_eq!(base_severity(kind, Binary), binary, "{kind:?} binary");
            assert_eq!(base_severity(kind, Source), source, "{kind:?} source");
        }
    }

    #[test]
    fn constant_value_change_is_at_least_medium_binary_unless_version_stamp() {
        let plain = detail("org.x.A", "LIMIT");
        assert!(
            effective_severity(ProblemKind::ChangedFinalFieldValue, Level::Binary, &plain, false)
                >= Severity::Medium
        );

        for stamp in ["VERSION", "VERNUM", "LIB_VERSION"] {
            let versioned = detail("org.x.A", stamp);
            assert_eq!(
                effective_severity(
                    ProblemKind::ChangedFinalFieldValue,
                    Level::Binary,
                    &versioned,
                    false
                ),
                Severity::Low
            );
        }
    }

    #[test]
    fn added_abstract_method_downgrades_without_caller() {
        let uncalled = detail("org.x.Iface", "org/x/Iface.\"m\":()V");
        let called = ProblemDetail {
            add_effect: Some("org/x/Caller.\"run\":()V".to_string()),
            ..uncalled.clone()
        };

        for level in [Level::Binary, Level::Source] {
            assert_eq!(
                effective_severity(ProblemKind::InterfaceAddedAbstractMethod, level, &called, false),
                Severity::Medium
            );
            assert_eq!(
                effective_severity(
                    ProblemKind::InterfaceAddedAbstractMethod,
                    level,
                    &uncalled,
                    false
                ),
                Severity::Safe
            );
            assert_eq!(
                effective_severity(
                    ProblemKind::InterfaceAddedAbstractMethod,
                    level,
                    &uncalled,
                    true
                ),
                Severity::Low
            );
        }
    }

    #[test]
    fn max_severity_dedupes_per_type_kind_target() {
        let mut set = ProblemSet::default();
        let d = ProblemDetail {
            field_value: Some("42".to_string()),
            ..detail("org.x.A", "removedField")
        };
        set.insert("org/x/A.\"get\":()I", ProblemKind::RemovedNonConstantField, "this", d.clone());
        set.insert("org/x/A.\"set\":(I)V", ProblemKind::RemovedNonConstantField, "this", d.clone());
        set.insert("org.x.A", ProblemKind::RemovedNonConstantField, "", d);

        assert_eq!(set.len(), 3);
        let severities = set.max_severities(Level::Binary, false);
        assert_eq!(severities.len(), 1);
        assert_eq!(
            severities[&(
                "org.x.A".to_string(),
                ProblemKind::RemovedNonConstantField,
                "removedField".to_string()
            )],
            Severity::High
        );
    }

    #[test]
    fn insert_is_write_once() {
        let mut set = ProblemSet::default();
        let first = detail("org.x.A", "first");
        let second = detail("org.x.A", "second");
        set.insert("m", ProblemKind::RemovedMethod, "", first.clone());
        set.insert("m", ProblemKind::RemovedMethod, "", second);
        let stored: Vec<_> = set.iter().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.target, "first");
    }

    #[test]
    fn severity_is_pure_over_iteration_order() {
        // Same inputs in different insertion orders produce identical maps.
        let build = |reversed: bool| {
            let mut set = ProblemSet::default();
            let mut entries = vec![
                ("a", ProblemKind::RemovedMethod, detail("org.x.A", "a")),
                ("b", ProblemKind::AddedMethod, detail("org.x.B", "b")),
                ("c", ProblemKind::ChangedFieldType, detail("org.x.C", "f")),
            ];
            if reversed {
                entries.reverse();
            }
            for (m, k, d) in entries {
                set.insert(m, k, "", d);
            }
            set.max_severities(Level::Source, false)
        };
        assert_eq!(build(false), build(true));
    }
}
