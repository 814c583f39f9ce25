//! Line-oriented parser for class-file disassembly.
//!
//! Consumes the textual output of the class-file disassembler (one or more
//! classes per invocation) and populates the symbol model and usage tables.
//! The parser is a state machine over {Top, InType, InMethod, InCode,
//! InParamTable, InAnnotations, InConstantPool}; each transition consumes one
//! line.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::descriptor;
use crate::error::CheckError;
use crate::intern::TypeId;
use crate::model::{Access, Api, EMPTY_STRING, FieldRecord, MethodRecord, Param, TypeKind};

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Extract parameter names from LocalVariableTable rows.
    pub parameter_names: bool,
    /// Capture compile-time constant values.
    pub constant_values: bool,
    /// Record invocation usage tables.
    pub usage: bool,
    /// Record field uses and canonicalized body digests.
    pub implementation: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            parameter_names: true,
            constant_values: true,
            usage: true,
            implementation: false,
        }
    }
}

impl ParseOptions {
    /// Quick mode: skip parameter-name, constant-value, and usage analysis.
    pub fn quick() -> Self {
        ParseOptions {
            parameter_names: false,
            constant_values: false,
            usage: false,
            implementation: false,
        }
    }
}

/// Parses one disassembly batch into `api`, attributing every declared type
/// and method to `archive`.
pub fn parse_disassembly(
    api: &mut Api,
    archive: &str,
    text: &str,
    opts: ParseOptions,
) -> Result<()> {
    let mut parser = Parser::new(api, archive, opts);
    for line in text.lines() {
        parser.feed(line)?;
    }
    parser.finish();
    Ok(())
}

/// Fills AddedInvokedByClass from the completed invocation table: every
/// invocation whose target class is declared here but does not itself
/// declare the invoked method.
pub fn index_foreign_invocations(api: &mut Api) {
    let mut foreign: Vec<(String, String, String)> = Vec::new();
    for (target, callers) in &api.usage.invoked_by {
        let Some((class_name, short_name, _)) = descriptor::split_method_id(target) else {
            continue;
        };
        let Some(record) = api.type_by_name(&class_name) else {
            continue;
        };
        if !record.declared {
            continue;
        }
        if api.methods.contains_key(target) {
            continue;
        }
        if let Some(caller) = callers.iter().next() {
            foreign.push((class_name, short_name, caller.clone()));
        }
    }
    for (class_name, short_name, caller) in foreign {
        api.usage
            .record_class_invocation(&class_name, &short_name, &caller);
    }
}

struct PendingMethod {
    record: MethodRecord,
    /// slot -> first name seen in LocalVariableTable.
    local_names: BTreeMap<u32, String>,
    body: Vec<String>,
}

struct PendingField {
    name: String,
    type_text: String,
    access: Access,
    is_final: bool,
    is_static: bool,
    is_transient: bool,
    is_volatile: bool,
    descriptor: Option<String>,
    value: Option<String>,
    synthetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AnnotationTarget {
    Type,
    Method,
}

struct Parser<'a> {
    api: &'a mut Api,
    archive: String,
    opts: ParseOptions,
    current_type: Option<TypeId>,
    current_method: Option<PendingMethod>,
    current_field: Option<PendingField>,
    /// Set after a member header until its descriptor line is consumed.
    expect_descriptor: bool,
    in_code: bool,
    in_param_table: bool,
    in_constant_pool: bool,
    annotations: Option<AnnotationTarget>,
    /// constant-pool index -> dotted type name, per class file.
    pool_types: HashMap<u32, String>,
}

impl<'a> Parser<'a> {
    fn new(api: &'a mut Api, archive: &str, opts: ParseOptions) -> Self {
        Parser {
            api,
            archive: archive.to_string(),
            opts,
            current_type: None,
            current_method: None,
            current_field: None,
            expect_descriptor: false,
            in_code: false,
            in_param_table: false,
            in_constant_pool: false,
            annotations: None,
            pool_types: HashMap::new(),
        }
    }

    fn feed(&mut self, raw: &str) -> Result<()> {
        let line = raw.trim_end();
        let trimmed = line.trim_start();

        if self.expect_descriptor {
            return self.consume_descriptor(trimmed);
        }

        if self.in_constant_pool {
            if self.consume_pool_line(trimmed) {
                return Ok(());
            }
            self.in_constant_pool = false;
        }

        if self.in_param_table {
            if self.consume_local_variable_row(trimmed) {
                return Ok(());
            }
            self.in_param_table = false;
        }

        if self.annotations.is_some() {
            if self.consume_annotation_line(trimmed) {
                return Ok(());
            }
            self.annotations = None;
        }

        if trimmed.is_empty() {
            return Ok(());
        }

        if trimmed == "Constant pool:" {
            self.in_constant_pool = true;
            return Ok(());
        }

        if trimmed.starts_with("Classfile") || trimmed.starts_with("Compiled from") {
            self.flush_member();
            return Ok(());
        }

        if trimmed == "LocalVariableTable:" {
            self.in_param_table = true;
            return Ok(());
        }

        if trimmed == "RuntimeVisibleAnnotations:" || trimmed == "RuntimeInvisibleAnnotations:" {
            self.annotations = Some(if self.current_method.is_some() {
                AnnotationTarget::Method
            } else {
                AnnotationTarget::Type
            });
            return Ok(());
        }

        if trimmed == "Code:" {
            self.in_code = true;
            return Ok(());
        }

        if let Some(value) = trimmed.strip_prefix("Deprecated:") {
            if value.trim() == "true" {
                self.mark_deprecated();
            }
            return Ok(());
        }

        if let Some(flags) = trimmed.strip_prefix("flags:") {
            self.apply_flags(flags);
            return Ok(());
        }

        // Field descriptors arrive on their own attribute line; method
        // descriptors are consumed through `expect_descriptor` above.
        if let Some(desc) = trimmed
            .strip_prefix("descriptor:")
            .or_else(|| trimmed.strip_prefix("Signature:"))
        {
            if let Some(field) = self.current_field.as_mut()
                && field.descriptor.is_none()
            {
                field.descriptor = Some(desc.trim().to_string());
            }
            return Ok(());
        }

        if let Some(rest) = constant_value_of(trimmed) {
            if self.opts.constant_values
                && let Some(field) = self.current_field.as_mut()
            {
                field.value = Some(parse_constant_literal(rest));
            }
            return Ok(());
        }

        if let Some(thrown) = trimmed.strip_prefix("throws ") {
            // Exceptions attribute body; the signature-line throws clause is
            // handled with the member header.
            self.add_exceptions(thrown);
            return Ok(());
        }

        if self.in_code {
            if self.consume_code_line(trimmed) {
                return Ok(());
            }
            self.in_code = false;
        }

        if let Some(header) = type_header(trimmed) {
            self.start_type(header);
            return Ok(());
        }

        // Closes a type body or a switch block; either way the pending
        // member is complete. The current type stays current so trailing
        // class-level attributes still attach to it.
        if trimmed == "}" {
            self.flush_member();
            return Ok(());
        }

        if self.current_type.is_some() && trimmed.ends_with(';') {
            return self.member_header(trimmed);
        }

        Ok(())
    }

    fn finish(&mut self) {
        self.flush_member();
    }

    // ---- type headers ----

    fn start_type(&mut self, header: TypeHeader) {
        self.flush_member();
        self.pool_types.clear();

        let type_id = self.api.intern_type(&header.name);
        let super_id = header
            .super_class
            .filter(|s| s != "java.lang.Object")
            .map(|s| self.api.intern_type(&s));
        let iface_ids: BTreeSet<TypeId> = header
            .interfaces
            .iter()
            .map(|i| self.api.intern_type(i))
            .collect();
        let is_annotation = header.annotation
            || header
                .interfaces
                .iter()
                .any(|i| i == "java.lang.annotation.Annotation");

        let record = self.api.type_of_mut(type_id);
        if record.declared && record.kind != TypeKind::Primitive {
            eprintln!(
                "[jcompat] duplicate declaration of {} ignored (archive {})",
                header.name, self.archive
            );
            self.current_type = Some(type_id);
            return;
        }
        record.kind = if header.interface {
            TypeKind::Interface
        } else {
            TypeKind::Class
        };
        record.declared = true;
        record.archive = self.archive.clone();
        record.access = header.access;
        record.is_abstract = header.is_abstract || header.interface;
        record.is_final = header.is_final;
        record.is_static = header.is_static;
        record.is_annotation = is_annotation;
        record.super_class = if header.interface { None } else { super_id };
        record.super_interfaces = iface_ids;

        self.current_type = Some(type_id);
    }

    // ---- member headers ----

    fn member_header(&mut self, line: &str) -> Result<()> {
        self.flush_member();
        self.in_code = false;

        let body = line.trim_end_matches(';').trim();
        if body == "static {}" || body.is_empty() {
            return Ok(());
        }
        // InnerClasses / BootstrapMethods rows also end with a semicolon but
        // reference pool entries; they are not member declarations.
        if body.contains('#') || body.contains('=') {
            return Ok(());
        }

        let normalized = strip_generics(body);
        let (decl, throws) = split_throws(&normalized);

        if let Some(paren) = decl.find('(') {
            self.method_header(&decl[..paren], throws)?;
        } else {
            self.field_header(&decl);
        }
        Ok(())
    }

    /// `decl_head` is the member text up to (excluding) the parameter list;
    /// parameter and return types come from the descriptor line.
    fn method_header(&mut self, decl_head: &str, throws: Vec<String>) -> Result<()> {
        let Some(type_id) = self.current_type else {
            return Ok(());
        };
        let tokens: Vec<&str> = decl_head.split_whitespace().collect();
        let Some(&name) = tokens.last() else {
            return Ok(());
        };

        let mods = &tokens[..tokens.len().saturating_sub(1)];
        let class_name = self.api.type_of(type_id).name.clone();
        let simple = class_name.rsplit('.').next().unwrap_or(&class_name);
        let constructor = name == class_name || name == simple;

        let short_name = if constructor {
            "<init>".to_string()
        } else {
            name.to_string()
        };

        let exceptions = throws
            .iter()
            .map(|t| self.api.intern_type(t))
            .collect::<BTreeSet<_>>();

        let record = MethodRecord {
            id: String::new(),
            short_name,
            class_id: type_id,
            return_type: None,
            params: Vec::new(),
            exceptions,
            access: access_of(mods),
            is_abstract: mods.contains(&"abstract"),
            is_final: mods.contains(&"final"),
            is_static: mods.contains(&"static"),
            is_native: mods.contains(&"native"),
            is_synchronized: mods.contains(&"synchronized"),
            constructor,
            deprecated: false,
            annotations: BTreeSet::new(),
            archive: self.archive.clone(),
            body_digest: None,
        };

        self.current_method = Some(PendingMethod {
            record,
            local_names: BTreeMap::new(),
            body: Vec::new(),
        });
        self.expect_descriptor = true;
        Ok(())
    }

    fn field_header(&mut self, decl: &str) {
        if self.current_type.is_none() {
            return;
        }
        let tokens: Vec<&str> = decl.split_whitespace().collect();
        if tokens.len() < 2 {
            return;
        }
        let name = tokens[tokens.len() - 1].to_string();
        let type_text = tokens[tokens.len() - 2].to_string();
        let mods = &tokens[..tokens.len() - 2];

        self.current_field = Some(PendingField {
            name,
            type_text,
            access: access_of(mods),
            is_final: mods.contains(&"final"),
            is_static: mods.contains(&"static"),
            is_transient: mods.contains(&"transient"),
            is_volatile: mods.contains(&"volatile"),
            descriptor: None,
            value: None,
            synthetic: false,
        });
    }

    /// The line immediately after a method header must carry the JVM
    /// descriptor; a missing descriptor is a disassembly contract violation.
    fn consume_descriptor(&mut self, trimmed: &str) -> Result<()> {
        self.expect_descriptor = false;
        let value = trimmed
            .strip_prefix("descriptor:")
            .or_else(|| trimmed.strip_prefix("Signature:"))
            .map(str::trim);
        let Some(desc) = value else {
            let method = self
                .current_method
                .take()
                .map(|m| m.record.short_name)
                .unwrap_or_default();
            return Err(CheckError::Internal(format!(
                "method signature line missing after `{method}` (got `{trimmed}`)"
            ))
            .into());
        };

        let Some((class_id, constructor, short_name)) = self
            .current_method
            .as_ref()
            .map(|m| (m.record.class_id, m.record.constructor, m.record.short_name.clone()))
        else {
            return Ok(());
        };
        let Some((param_types, return_type)) = descriptor::parse_method_descriptor(desc) else {
            return Err(CheckError::Internal(format!(
                "unparsable method descriptor `{desc}`"
            ))
            .into());
        };

        let class_internal = descriptor::dotted_to_internal(&self.api.type_of(class_id).name);
        let id = descriptor::method_id(&class_internal, &short_name, desc);
        let param_ids: Vec<TypeId> = param_types
            .iter()
            .map(|t| self.api.intern_type(t))
            .collect();
        let return_id = if constructor {
            None
        } else {
            Some(self.api.intern_type(&return_type))
        };

        let pending = self.current_method.as_mut().unwrap();
        pending.record.id = id;
        pending.record.params = param_ids
            .into_iter()
            .map(|type_id| Param { type_id, name: None })
            .collect();
        pending.record.return_type = return_id;
        Ok(())
    }

    // ---- attribute blocks ----

    fn consume_pool_line(&mut self, trimmed: &str) -> bool {
        let Some(rest) = trimmed.strip_prefix('#') else {
            return false;
        };
        let Some(eq) = rest.find('=') else {
            return false;
        };
        let Ok(index) = rest[..eq].trim().parse::<u32>() else {
            return false;
        };
        let value = rest[eq + 1..].trim();
        if let Some(utf8) = value.strip_prefix("Utf8") {
            let text = utf8.trim();
            if text.starts_with('L') && text.ends_with(';') {
                if let Some(name) = descriptor::parse_field_descriptor(text) {
                    self.pool_types.insert(index, name);
                }
            }
        }
        true
    }

    fn consume_local_variable_row(&mut self, trimmed: &str) -> bool {
        if trimmed.starts_with("Start") {
            return true;
        }
        let cols: Vec<&str> = trimmed.split_whitespace().collect();
        if cols.len() < 5 {
            return false;
        }
        let (Ok(_start), Ok(_len), Ok(slot)) = (
            cols[0].parse::<u32>(),
            cols[1].parse::<u32>(),
            cols[2].parse::<u32>(),
        ) else {
            return false;
        };
        if self.opts.parameter_names
            && let Some(pending) = self.current_method.as_mut()
        {
            pending
                .local_names
                .entry(slot)
                .or_insert_with(|| cols[3].to_string());
        }
        true
    }

    fn consume_annotation_line(&mut self, trimmed: &str) -> bool {
        // `0: #28()` entry lines; resolved names may follow on their own
        // line in newer disassembler versions.
        let entry = trimmed
            .split_once(':')
            .map(|(idx, rest)| (idx.trim(), rest.trim()));
        if let Some((idx, rest)) = entry
            && idx.chars().all(|c| c.is_ascii_digit())
            && rest.starts_with('#')
        {
            let pool_index: String = rest[1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(index) = pool_index.parse::<u32>()
                && let Some(name) = self.pool_types.get(&index).cloned()
            {
                self.add_annotation(&name);
            }
            return true;
        }
        // Resolved annotation type printed beneath the entry.
        if !trimmed.contains(' ') && trimmed.contains('.') && !trimmed.ends_with(':') {
            let name = trimmed.to_string();
            self.add_annotation(&name);
            return true;
        }
        false
    }

    fn consume_code_line(&mut self, trimmed: &str) -> bool {
        if trimmed.starts_with("stack=") || trimmed.starts_with("LineNumberTable") {
            return true;
        }
        let Some((offset, rest)) = trimmed.split_once(':') else {
            return false;
        };
        // `default:` rows appear inside tableswitch/lookupswitch blocks.
        if offset == "default" {
            return true;
        }
        if !offset.chars().all(|c| c.is_ascii_digit()) || offset.is_empty() {
            return false;
        }
        let instruction = rest.trim();

        if self.opts.implementation
            && let Some(pending) = self.current_method.as_mut()
        {
            pending.body.push(canonicalize_instruction(instruction));
        }

        if instruction.starts_with("invoke") {
            if self.opts.usage {
                self.record_invocation(instruction);
            }
        } else if self.opts.implementation
            && (instruction.starts_with("get") || instruction.starts_with("put"))
        {
            self.record_field_use(instruction);
        }
        true
    }

    fn record_invocation(&mut self, instruction: &str) {
        let target = match comment_target(instruction, "Method")
            .or_else(|| comment_target(instruction, "InterfaceMethod"))
        {
            Some(t) => t,
            None => return,
        };
        let Some(caller) = self
            .current_method
            .as_ref()
            .map(|m| m.record.id.clone())
            .filter(|id| !id.is_empty())
        else {
            return;
        };

        let canonical = self.canonical_invocation_target(&target);
        if canonical.starts_with("java/lang/")
            || canonical.starts_with("java/util/")
            || canonical.starts_with("java/io/")
            || canonical.contains("\"<init>\"")
        {
            return;
        }
        self.api.usage.record_invocation(&canonical, &caller);
    }

    /// Normalizes an invocation comment target to `cls."name":desc`. A
    /// target with no class part resolves to the current class.
    fn canonical_invocation_target(&self, target: &str) -> String {
        let (class_part, member) = match target.rfind('.') {
            Some(pos) if target[..pos].contains('/') || !target[pos..].starts_with(".\"") => {
                (Some(&target[..pos]), &target[pos + 1..])
            }
            _ => (None, target),
        };
        let class_internal = match class_part {
            Some(c) => c.to_string(),
            None => {
                let current = self
                    .current_type
                    .map(|t| self.api.type_of(t).name.clone())
                    .unwrap_or_default();
                descriptor::dotted_to_internal(&current)
            }
        };
        let (name, desc) = match member.split_once(':') {
            Some((n, d)) => (n.trim_matches('"'), d),
            None => (member.trim_matches('"'), ""),
        };
        descriptor::method_id(&class_internal, name, desc)
    }

    fn record_field_use(&mut self, instruction: &str) {
        let Some(target) = comment_target(instruction, "Field") else {
            return;
        };
        let Some(caller) = self
            .current_method
            .as_ref()
            .map(|m| m.record.id.clone())
            .filter(|id| !id.is_empty())
        else {
            return;
        };
        let qualified = if target.contains('.') {
            target
        } else {
            let current = self
                .current_type
                .map(|t| self.api.type_of(t).name.clone())
                .unwrap_or_default();
            format!("{}.{target}", descriptor::dotted_to_internal(&current))
        };
        self.api.usage.record_field_use(&qualified, &caller);
    }

    fn add_exceptions(&mut self, list: &str) {
        if self.current_method.is_none() {
            return;
        }
        let ids: Vec<TypeId> = list
            .split(',')
            .map(|t| strip_generics(t.trim()))
            .filter(|t| !t.is_empty())
            .map(|name| self.api.intern_type(&name))
            .collect();
        if let Some(pending) = self.current_method.as_mut() {
            pending.record.exceptions.extend(ids);
        }
    }

    fn add_annotation(&mut self, name: &str) {
        let id = self.api.intern_type(name);
        if let Some(pending) = self.current_method.as_mut() {
            pending.record.annotations.insert(id);
        } else if let Some(type_id) = self.current_type {
            self.api.type_of_mut(type_id).annotations.insert(id);
        }
    }

    fn mark_deprecated(&mut self) {
        if let Some(pending) = self.current_method.as_mut() {
            pending.record.deprecated = true;
        } else if self.current_field.is_some() {
            // Field deprecation is not part of the model.
        } else if let Some(type_id) = self.current_type {
            self.api.type_of_mut(type_id).deprecated = true;
        }
    }

    fn apply_flags(&mut self, flags: &str) {
        let synthetic = flags.contains("ACC_SYNTHETIC") || flags.contains("ACC_BRIDGE");
        if let Some(pending) = self.current_method.as_mut() {
            if synthetic {
                self.current_method = None;
                return;
            }
            if flags.contains("ACC_SYNCHRONIZED") {
                pending.record.is_synchronized = true;
            }
            if flags.contains("ACC_NATIVE") {
                pending.record.is_native = true;
            }
        } else if let Some(field) = self.current_field.as_mut() {
            if synthetic {
                field.synthetic = true;
            }
            if flags.contains("ACC_TRANSIENT") {
                field.is_transient = true;
            }
            if flags.contains("ACC_VOLATILE") {
                field.is_volatile = true;
            }
        }
    }

    // ---- member flushing ----

    fn flush_member(&mut self) {
        self.flush_field();
        self.flush_method();
        self.in_code = false;
        self.in_param_table = false;
        self.annotations = None;
    }

    fn flush_field(&mut self) {
        let Some(field) = self.current_field.take() else {
            return;
        };
        let Some(type_id) = self.current_type else {
            return;
        };
        if field.synthetic || synthetic_name(&field.name) {
            return;
        }

        let type_name = match field.descriptor.as_deref() {
            Some(desc) => descriptor::parse_field_descriptor(desc)
                .unwrap_or_else(|| field.type_text.clone()),
            None => field.type_text.clone(),
        };
        let mangled = field
            .descriptor
            .clone()
            .unwrap_or_else(|| descriptor::type_name_to_descriptor(&type_name));
        let field_type = self.api.intern_type(&type_name);

        let record = self.api.type_of_mut(type_id);
        if record.field(&field.name).is_some() {
            return;
        }
        let position = record.fields.len() as u32;
        record.fields.push(FieldRecord {
            name: field.name,
            type_id: field_type,
            access: field.access,
            is_final: field.is_final,
            is_static: field.is_static,
            is_transient: field.is_transient,
            is_volatile: field.is_volatile,
            position,
            value: field.value,
            mangled,
        });
    }

    fn flush_method(&mut self) {
        let Some(mut pending) = self.current_method.take() else {
            return;
        };
        if pending.record.id.is_empty() {
            return;
        }
        if synthetic_name(&pending.record.short_name) {
            return;
        }

        if self.opts.parameter_names {
            assign_parameter_names(self.api, &mut pending);
        }
        if self.opts.implementation && !pending.body.is_empty() {
            let mut hasher = Sha256::new();
            for line in &pending.body {
                hasher.update(line.as_bytes());
                hasher.update(b"\n");
            }
            pending.record.body_digest = Some(hex::encode(hasher.finalize()));
        }
        self.api.add_method(pending.record);
    }
}

fn assign_parameter_names(api: &Api, pending: &mut PendingMethod) {
    let mut slot = if pending.record.is_static { 0u32 } else { 1u32 };
    let mut missing = false;
    let param_widths: Vec<u32> = pending
        .record
        .params
        .iter()
        .map(|p| match api.type_of(p.type_id).name.as_str() {
            "long" | "double" => 2,
            _ => 1,
        })
        .collect();
    for (param, width) in pending.record.params.iter_mut().zip(param_widths) {
        match pending.local_names.get(&slot) {
            Some(name) if name != "this" => param.name = Some(name.clone()),
            _ => missing = true,
        }
        slot += width;
    }
    if missing && !pending.local_names.is_empty() {
        eprintln!(
            "[jcompat] incomplete parameter names for {}",
            pending.record.id
        );
    }
}

struct TypeHeader {
    name: String,
    interface: bool,
    annotation: bool,
    access: Access,
    is_abstract: bool,
    is_final: bool,
    is_static: bool,
    super_class: Option<String>,
    interfaces: Vec<String>,
}

/// Recognizes `[modifiers] (class|interface) NAME [extends …] [implements …]`.
fn type_header(line: &str) -> Option<TypeHeader> {
    let body = line.trim_end_matches('{').trim();
    let normalized = strip_generics(body);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let keyword_pos = tokens
        .iter()
        .position(|t| *t == "class" || *t == "interface" || *t == "@interface")?;
    // Member lines never contain the type keywords; attribute lines do not
    // reach here because they carry a leading keyword with a colon.
    if normalized.contains(':') {
        return None;
    }
    let name = (*tokens.get(keyword_pos + 1)?).to_string();
    if name.contains('(') {
        return None;
    }

    let mods = &tokens[..keyword_pos];
    let interface = tokens[keyword_pos] != "class";
    let annotation = tokens[keyword_pos] == "@interface";

    let mut super_class = None;
    let mut interfaces = Vec::new();
    let mut rest = tokens[keyword_pos + 2..].iter().peekable();
    while let Some(&token) = rest.next() {
        match token {
            "extends" => {
                let mut names = Vec::new();
                for &t in rest.by_ref() {
                    if t == "implements" {
                        collect_names(&mut interfaces, rest.by_ref());
                        break;
                    }
                    names.extend(split_name_list(t));
                }
                if interface {
                    interfaces.extend(names);
                } else {
                    super_class = names.into_iter().next();
                }
            }
            "implements" => collect_names(&mut interfaces, rest.by_ref()),
            _ => {}
        }
    }

    Some(TypeHeader {
        name,
        interface,
        annotation,
        access: access_of(mods),
        is_abstract: mods.contains(&"abstract"),
        is_final: mods.contains(&"final"),
        is_static: mods.contains(&"static"),
        super_class,
        interfaces,
    })
}

fn collect_names<'i>(out: &mut Vec<String>, rest: impl Iterator<Item = &'i &'i str>) {
    for &t in rest {
        out.extend(split_name_list(t));
    }
}

fn split_name_list(token: &str) -> Vec<String> {
    token
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn access_of(mods: &[&str]) -> Access {
    if mods.contains(&"public") {
        Access::Public
    } else if mods.contains(&"protected") {
        Access::Protected
    } else if mods.contains(&"private") {
        Access::Private
    } else {
        Access::PackagePrivate
    }
}

/// Splits a trailing `throws` clause off a member declaration.
fn split_throws(decl: &str) -> (String, Vec<String>) {
    // Only a `throws` outside the parameter list counts.
    let close = decl.rfind(')').map(|p| p + 1).unwrap_or(0);
    match decl[close..].find("throws ") {
        Some(pos) => {
            let head = decl[..close + pos].trim().to_string();
            let list = decl[close + pos + "throws ".len()..]
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            (head, list)
        }
        None => (decl.to_string(), Vec::new()),
    }
}

/// Removes balanced `<…>` generic segments, reducing `<T extends X>` and
/// `List<String>` alike to their raw erased spelling.
fn strip_generics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `ConstantValue: int 42` / `Constant value: String abc` -> `int 42`.
fn constant_value_of(line: &str) -> Option<&str> {
    line.strip_prefix("ConstantValue:")
        .or_else(|| line.strip_prefix("Constant value:"))
        .map(str::trim)
}

/// Retains the literal token verbatim; the zero-length string literal gets
/// the EMPTY_STRING sentinel so comparators can distinguish known-empty from
/// unknown.
fn parse_constant_literal(rest: &str) -> String {
    let literal = match rest.split_once(' ') {
        Some((_type_token, lit)) => lit.trim(),
        None => rest.trim(),
    };
    if literal.is_empty() {
        return EMPTY_STRING.to_string();
    }
    let unquoted = literal.trim_matches('"');
    if unquoted.is_empty() {
        EMPTY_STRING.to_string()
    } else {
        literal.to_string()
    }
}

/// Extracts `org/x/Foo."bar":(I)V` from
/// `invokevirtual #5 // Method org/x/Foo."bar":(I)V`.
fn comment_target(instruction: &str, kind: &str) -> Option<String> {
    let comment = instruction.find("//")?;
    let after = instruction[comment + 2..].trim_start();
    let target = after.strip_prefix(kind)?;
    if !target.starts_with(' ') {
        return None;
    }
    Some(target.trim().to_string())
}

/// Strips bytecode offsets and constant-pool indices so the digest tracks
/// instruction shape only.
fn canonicalize_instruction(instruction: &str) -> String {
    let mut out = String::with_capacity(instruction.len());
    let mut chars = instruction.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '#' {
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                chars.next();
            }
            out.push('#');
        } else {
            out.push(c);
        }
    }
    out
}

/// Compiler-generated member names that never belong to the API surface.
fn synthetic_name(name: &str) -> bool {
    if name == "<clinit>" || name.starts_with("class$") || name.starts_with("access$") {
        return true;
    }
    if let Some(pos) = name.find('$') {
        return name[pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
    }
    false
}
