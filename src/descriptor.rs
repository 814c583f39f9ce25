//! JVM type-descriptor utilities.
//!
//! Descriptors are the runtime identity of a method (`(ILjava/lang/String;)V`)
//! and the mangled form of a field type. Dotted names use `.` as the package
//! separator and a `[]` suffix per array dimension.

pub const PRIMITIVES: [&str; 9] = [
    "void", "boolean", "char", "byte", "short", "int", "float", "long", "double",
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

fn primitive_for_code(code: char) -> Option<&'static str> {
    Some(match code {
        'V' => "void",
        'Z' => "boolean",
        'C' => "char",
        'B' => "byte",
        'S' => "short",
        'I' => "int",
        'F' => "float",
        'J' => "long",
        'D' => "double",
        _ => return None,
    })
}

fn code_for_primitive(name: &str) -> Option<char> {
    Some(match name {
        "void" => 'V',
        "boolean" => 'Z',
        "char" => 'C',
        "byte" => 'B',
        "short" => 'S',
        "int" => 'I',
        "float" => 'F',
        "long" => 'J',
        "double" => 'D',
        _ => return None,
    })
}

/// `org/example/Foo` -> `org.example.Foo`.
pub fn internal_to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `org.example.Foo` -> `org/example/Foo`.
pub fn dotted_to_internal(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// Parses one field descriptor starting at `chars`, returning the dotted
/// type name (with `[]` suffixes) or None on malformed input.
fn read_field_type(chars: &mut std::str::Chars<'_>) -> Option<String> {
    let mut dims = 0usize;
    loop {
        let c = chars.next()?;
        match c {
            '[' => dims += 1,
            'L' => {
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == ';' {
                        return Some(format!("{}{}", internal_to_dotted(&name), "[]".repeat(dims)));
                    }
                    name.push(c);
                }
                return None;
            }
            other => {
                let prim = primitive_for_code(other)?;
                return Some(format!("{prim}{}", "[]".repeat(dims)));
            }
        }
    }
}

/// Decodes a full method descriptor into (parameter type names, return type
/// name). Returns None when the descriptor is malformed.
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<String>, String)> {
    let rest = desc.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (params_part, ret_part) = (&rest[..close], &rest[close + 1..]);

    let mut params = Vec::new();
    let mut chars = params_part.chars();
    loop {
        let probe = chars.clone();
        if probe.as_str().is_empty() {
            break;
        }
        params.push(read_field_type(&mut chars)?);
    }

    let mut ret_chars = ret_part.chars();
    let ret = read_field_type(&mut ret_chars)?;
    if !ret_chars.as_str().is_empty() {
        return None;
    }
    Some((params, ret))
}

/// Decodes a single field descriptor (`[Ljava/lang/String;` etc.) into a
/// dotted type name.
pub fn parse_field_descriptor(desc: &str) -> Option<String> {
    let mut chars = desc.chars();
    let name = read_field_type(&mut chars)?;
    if !chars.as_str().is_empty() {
        return None;
    }
    Some(name)
}

/// Encodes a dotted type name (with optional `[]` suffixes) back into a
/// descriptor; used for the mangled form of field types.
pub fn type_name_to_descriptor(name: &str) -> String {
    let mut base = name;
    let mut dims = 0usize;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dims += 1;
    }
    let mut out = "[".repeat(dims);
    match code_for_primitive(base) {
        Some(code) => out.push(code),
        None => {
            out.push('L');
            out.push_str(&dotted_to_internal(base));
            out.push(';');
        }
    }
    out
}

/// Canonical method id: `[pkg/]Class."name":descriptor`.
pub fn method_id(class_internal: &str, short_name: &str, descriptor: &str) -> String {
    format!("{class_internal}.\"{short_name}\":{descriptor}")
}

/// Splits a canonical method id back into (dotted class name, short name,
/// descriptor). Inverse of `method_id`.
pub fn split_method_id(id: &str) -> Option<(String, String, String)> {
    let quote = id.find(".\"")?;
    let class_internal = &id[..quote];
    let rest = &id[quote + 2..];
    let end_quote = rest.find("\":")?;
    let short_name = &rest[..end_quote];
    let descriptor = &rest[end_quote + 2..];
    Some((
        internal_to_dotted(class_internal),
        short_name.to_string(),
        descriptor.to_string(),
    ))
}

/// The parameter slice of a method descriptor, `(I)V` -> `(I)`. Used to pair
/// methods that differ only in return type.
pub fn parameter_part(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(close) => &descriptor[..=close],
        None => descriptor,
    }
}

/// Base package of a dotted type name; empty for the default package.
pub fn package_of(dotted: &str) -> String {
    match dotted.rfind('.') {
        Some(pos) => dotted[..pos].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_descriptor_with_objects_and_arrays() {
        let (params, ret) =
            parse_method_descriptor("(ILjava/lang/String;[[J)Ljava/util/List;").unwrap();
        assert_eq!(params, vec!["int", "java.lang.String", "long[][]"]);
        assert_eq!(ret, "java.util.List");
    }

    #[test]
    fn parses_empty_parameter_list() {
        let (params, ret) = parse_method_descriptor("()V").unwrap();
        assert!(params.is_empty());
        assert_eq!(ret, "void");
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert!(parse_method_descriptor("(Q)V").is_none());
        assert!(parse_method_descriptor("(I").is_none());
        assert!(parse_method_descriptor("(I)VV").is_none());
        assert!(parse_field_descriptor("Lunterminated").is_none());
    }

    #[test]
    fn field_descriptor_round_trips() {
        for name in ["int", "java.lang.String", "byte[]", "org.x.Y[][]"] {
            let desc = type_name_to_descriptor(name);
            assert_eq!(parse_field_descriptor(&desc).as_deref(), Some(name));
        }
    }

    #[test]
    fn method_id_round_trips() {
        let id = method_id("org/example/Foo", "bar", "(I)V");
        assert_eq!(id, "org/example/Foo.\"bar\":(I)V");
        let (class, name, desc) = split_method_id(&id).unwrap();
        assert_eq!(class, "org.example.Foo");
        assert_eq!(name, "bar");
        assert_eq!(desc, "(I)V");
    }

    #[test]
    fn parameter_part_strips_return() {
        assert_eq!(parameter_part("(ILjava/lang/String;)V"), "(ILjava/lang/String;)");
        assert_eq!(parameter_part("()I"), "()");
    }

    #[test]
    fn package_of_handles_default_package() {
        assert_eq!(package_of("org.example.Foo"), "org.example");
        assert_eq!(package_of("Foo"), "");
    }
}
