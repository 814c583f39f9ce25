//! Affected-method propagator: given a changed type, enumerates the public
//! methods whose signatures observably touch it through the receiver, a
//! parameter, or the return value, possibly transitively through fields.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::intern::TypeId;
use crate::model::{Access, Api, TypeKind};

#[derive(Debug, Clone, Serialize)]
pub struct AffectedMethod {
    pub method: String,
    /// `this`, `RetVal`, or `<pos> parameter [name]`.
    pub role: String,
    /// Field path within the touched type, empty for a direct mention.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AffectedSection {
    pub methods: Vec<AffectedMethod>,
    /// Count behind the "and N others" marker once the cap is hit.
    #[serde(skip_serializing_if = "is_zero")]
    pub truncated: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Collects up to `limit` public methods touching `type_name`; the rest are
/// folded into the truncation count.
pub fn affected_methods(api: &Api, type_name: &str, limit: usize) -> AffectedSection {
    let mut section = AffectedSection::default();

    for (id, method) in &api.methods {
        if method.access != Access::Public {
            continue;
        }
        let class = api.type_of(method.class_id);
        if class.access != Access::Public {
            continue;
        }

        let mut roles: Vec<(String, String)> = Vec::new();
        if let Some(path) = touch_path(api, method.class_id, type_name) {
            roles.push(("this".to_string(), path));
        }
        if let Some(ret) = method.return_type
            && let Some(path) = touch_path(api, ret, type_name)
        {
            roles.push(("RetVal".to_string(), path));
        }
        for (pos, param) in method.params.iter().enumerate() {
            if let Some(path) = touch_path(api, param.type_id, type_name) {
                let role = match &param.name {
                    Some(name) => format!("{} parameter ({name})", pos + 1),
                    None => format!("{} parameter", pos + 1),
                };
                roles.push((role, path));
            }
        }

        for (role, path) in roles {
            if section.methods.len() < limit {
                section.methods.push(AffectedMethod {
                    method: id.clone(),
                    role,
                    path,
                });
            } else {
                section.truncated += 1;
            }
        }
    }
    section
}

/// Path of field names from `from` to the target type; empty when `from` is
/// the target itself, None when unreachable.
fn touch_path(api: &Api, from: TypeId, target: &str) -> Option<String> {
    let mut visited = BTreeSet::new();
    walk(api, from, target, &mut visited)
}

fn walk(api: &Api, from: TypeId, target: &str, visited: &mut BTreeSet<TypeId>) -> Option<String> {
    let base = api.element_base(from);
    if !visited.insert(base) {
        return None;
    }
    let record = api.type_of(base);
    if record.name == target {
        return Some(String::new());
    }
    if record.kind == TypeKind::Primitive {
        return None;
    }
    for field in &record.fields {
        if !matches!(field.access, Access::Public | Access::Protected) {
            continue;
        }
        if let Some(sub) = walk(api, field.type_id, target, visited) {
            return Some(if sub.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{sub}", field.name)
            });
        }
    }
    None
}
