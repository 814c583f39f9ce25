//! Per-version usage tables populated from bytecode `invoke*` and field
//! instructions.
//!
//! All maps are ordered so the diff never depends on hash iteration order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageTables {
    /// invoked-method descriptor -> callers (canonical method ids).
    pub invoked_by: BTreeMap<String, BTreeSet<String>>,
    /// target class name -> invoked method short name -> one caller.
    /// Only invocations resolving to a method not declared directly on the
    /// nominal target class; used to decide whether an added abstract method
    /// is actually exercised.
    pub added_invoked_by_class: BTreeMap<String, BTreeMap<String, String>>,
    /// field descriptor -> callers; populated only under implementation
    /// checking.
    pub field_used_by: BTreeMap<String, BTreeSet<String>>,
}

impl UsageTables {
    pub fn record_invocation(&mut self, target: &str, caller: &str) {
        self.invoked_by
            .entry(target.to_string())
            .or_default()
            .insert(caller.to_string());
    }

    pub fn record_class_invocation(&mut self, class_name: &str, method_name: &str, caller: &str) {
        self.added_invoked_by_class
            .entry(class_name.to_string())
            .or_default()
            .entry(method_name.to_string())
            .or_insert_with(|| caller.to_string());
    }

    pub fn record_field_use(&mut self, field: &str, caller: &str) {
        self.field_used_by
            .entry(field.to_string())
            .or_default()
            .insert(caller.to_string());
    }

    /// First recorded caller of a method matching `target` (a descriptor
    /// suffix such as `"name":(I)V` or a full id).
    pub fn first_caller_of(&self, target: &str) -> Option<&str> {
        if let Some(callers) = self.invoked_by.get(target) {
            return callers.iter().next().map(String::as_str);
        }
        self.invoked_by
            .iter()
            .find(|(invoked, _)| invoked.ends_with(target))
            .and_then(|(_, callers)| callers.iter().next().map(String::as_str))
    }

    /// First caller recorded against `class_name` for `method_name`, or for
    /// any method of the class when `method_name` is None.
    pub fn class_caller(&self, class_name: &str, method_name: Option<&str>) -> Option<&str> {
        let per_class = self.added_invoked_by_class.get(class_name)?;
        match method_name {
            Some(name) => per_class.get(name).map(String::as_str),
            None => per_class.values().next().map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_lookup_matches_descriptor_suffix() {
        let mut usage = UsageTables::default();
        usage.record_invocation(
            "org/x/Iface.\"addedMethod\":()V",
            "org/x/Caller.\"run\":()V",
        );

        assert_eq!(
            usage.first_caller_of("\"addedMethod\":()V"),
            Some("org/x/Caller.\"run\":()V")
        );
        assert!(usage.first_caller_of("\"missing\":()V").is_none());
    }

    #[test]
    fn class_invocation_keeps_first_caller() {
        let mut usage = UsageTables::default();
        usage.record_class_invocation("org.x.Iface", "m", "org/x/A.\"run\":()V");
        usage.record_class_invocation("org.x.Iface", "m", "org/x/B.\"run\":()V");

        assert_eq!(
            usage.class_caller("org.x.Iface", Some("m")),
            Some("org/x/A.\"run\":()V")
        );
        assert_eq!(
            usage.class_caller("org.x.Iface", None),
            Some("org/x/A.\"run\":()V")
        );
        assert!(usage.class_caller("org.x.Other", None).is_none());
    }
}
