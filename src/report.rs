//! Report model and emitters.
//!
//! One report per selected level (binary, source) with per-severity counters
//! in the header so downstream automation can consume the verdict without
//! parsing sections. Rendered as JSON or plain text.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::affected::{self, AffectedSection};
use crate::diff::DiffResult;
use crate::model::Api;
use crate::problems::{Level, ProblemDetail, ProblemKind, Severity, effective_severity};

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub short: bool,
    pub strict: bool,
    pub quick: bool,
    pub affected_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            short: false,
            strict: false,
            quick: false,
            affected_limit: 10,
        }
    }
}

impl ReportOptions {
    pub fn affected_cap(&self) -> usize {
        if self.short {
            self.affected_limit.min(4)
        } else {
            self.affected_limit
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub safe: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportProblem {
    pub method: String,
    pub kind: ProblemKind,
    pub location: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub detail: ProblemDetail,
}

#[derive(Debug, Serialize)]
pub struct LevelReport {
    pub level: &'static str,
    pub library: String,
    pub version1: String,
    pub version2: String,
    pub verdict: &'static str,
    pub counts: SeverityCounts,
    pub problems: Vec<ReportProblem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added_methods: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_methods: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub affected_types: BTreeMap<String, AffectedSection>,
}

impl LevelReport {
    pub fn compatible(&self) -> bool {
        self.verdict == "compatible"
    }
}

/// Kinds describing a type or field change, for which the affected-method
/// section is produced.
fn is_type_level(kind: ProblemKind) -> bool {
    use ProblemKind::*;
    matches!(
        kind,
        ClassBecameInterface
            | InterfaceBecameClass
            | ClassBecameFinal
            | ClassBecameAbstract
            | NonAbstractClassAddedAbstractMethod
            | AbstractClassAddedAbstractMethod
            | InterfaceAddedAbstractMethod
            | ClassRemovedAbstractMethod
            | InterfaceRemovedAbstractMethod
            | AddedSuperClass
            | RemovedSuperClass
            | ChangedSuperClass
            | AbstractClassAddedSuperAbstractClass
            | InterfaceAddedSuperInterface
            | InterfaceAddedSuperConstantInterface
            | InterfaceRemovedSuperInterface
            | InterfaceRemovedSuperConstantInterface
            | AbstractClassAddedSuperInterface
            | ClassAddedSuperInterface
            | ClassRemovedSuperInterface
            | RemovedConstantField
            | RemovedNonConstantField
            | RenamedField
            | RenamedConstantField
            | ChangedFieldType
            | ChangedFieldAccess
            | ChangedFinalFieldValue
            | FieldBecameFinal
            | FieldBecameNonFinal
            | FieldBecameStatic
            | FieldBecameNonStatic
            | ConstantFieldBecameNonStatic
            | NonConstantFieldBecameStatic
    )
}

pub fn build_level_report(
    old: &Api,
    new: &Api,
    diff: &DiffResult,
    level: Level,
    opts: &ReportOptions,
) -> LevelReport {
    // The source report hides add/remove pairs that are really one return
    // type change; the binary report keeps them since the descriptor is part
    // of runtime identity.
    let suppressed = |kind: ProblemKind, method: &str| {
        level == Level::Source
            && matches!(kind, ProblemKind::AddedMethod | ProblemKind::RemovedMethod)
            && diff.changed_return_from_void.contains(method)
    };

    let mut problems = Vec::new();
    let mut added_methods = Vec::new();
    let mut removed_methods = Vec::new();
    let mut deduped: BTreeMap<(String, ProblemKind, String), Severity> = BTreeMap::new();
    let mut affected_names: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for ((method, kind, location), detail) in diff.problems.iter() {
        if suppressed(*kind, method) {
            continue;
        }
        let severity = effective_severity(*kind, level, detail, opts.quick);
        deduped
            .entry((detail.type_name.clone(), *kind, detail.target.clone()))
            .and_modify(|s| *s = (*s).max(severity))
            .or_insert(severity);

        match kind {
            ProblemKind::AddedMethod => {
                added_methods.push(method.clone());
                continue;
            }
            ProblemKind::RemovedMethod => removed_methods.push(method.clone()),
            _ => {}
        }
        if severity == Severity::Safe && *kind != ProblemKind::RemovedMethod {
            continue;
        }
        if is_type_level(*kind) && severity > Severity::Safe {
            affected_names.insert(detail.type_name.clone());
        }
        problems.push(ReportProblem {
            method: method.clone(),
            kind: *kind,
            location: location.clone(),
            severity,
            detail: detail.clone(),
        });
    }

    problems.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.method.cmp(&b.method))
            .then_with(|| a.location.cmp(&b.location))
    });

    let mut counts = SeverityCounts::default();
    for severity in deduped.values() {
        match severity {
            Severity::High => counts.high += 1,
            Severity::Medium => counts.medium += 1,
            Severity::Low => counts.low += 1,
            Severity::Safe => counts.safe += 1,
        }
    }

    let incompatible =
        counts.high > 0 || counts.medium > 0 || (opts.strict && counts.low > 0);

    let mut affected_types = BTreeMap::new();
    for type_name in &affected_names {
        let section = affected::affected_methods(old, type_name, opts.affected_cap());
        if !section.methods.is_empty() {
            affected_types.insert(type_name.clone(), section);
        }
    }

    if opts.short {
        added_methods.clear();
    }
    added_methods.sort();
    removed_methods.sort();
    removed_methods.dedup();

    LevelReport {
        level: level.as_str(),
        library: old.library.clone(),
        version1: old.version.clone(),
        version2: new.version.clone(),
        verdict: if incompatible { "incompatible" } else { "compatible" },
        counts,
        problems,
        added_methods,
        removed_methods,
        affected_types,
    }
}

pub fn to_json(report: &LevelReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

pub fn render_text(report: &LevelReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} compatibility report for {} ({} -> {})\n",
        report.level, report.library, report.version1, report.version2
    ));
    out.push_str(&format!(
        "verdict: {} (high: {}, medium: {}, low: {}, safe: {})\n",
        report.verdict,
        report.counts.high,
        report.counts.medium,
        report.counts.low,
        report.counts.safe
    ));

    if !report.problems.is_empty() {
        out.push_str("\nproblems:\n");
        for problem in &report.problems {
            out.push_str(&format!(
                "  [{:?}] {} at {}{}{}\n",
                problem.severity,
                problem.kind.as_str(),
                problem.method,
                if problem.location.is_empty() { "" } else { " / " },
                problem.location
            ));
        }
    }
    if !report.removed_methods.is_empty() {
        out.push_str("\nremoved methods:\n");
        for method in &report.removed_methods {
            out.push_str(&format!("  {method}\n"));
        }
    }
    if !report.added_methods.is_empty() {
        out.push_str("\nadded methods:\n");
        for method in &report.added_methods {
            out.push_str(&format!("  {method}\n"));
        }
    }
    if !report.affected_types.is_empty() {
        out.push_str("\naffected methods:\n");
        for (type_name, section) in &report.affected_types {
            out.push_str(&format!("  {type_name}:\n"));
            for m in &section.methods {
                out.push_str(&format!("    {} as {}", m.method, m.role));
                if !m.path.is_empty() {
                    out.push_str(&format!(" via {}", m.path));
                }
                out.push('\n');
            }
            if section.truncated > 0 {
                out.push_str(&format!("    ... and {} others\n", section.truncated));
            }
        }
    }
    out
}

pub fn write_report(report: &LevelReport, path: &Path, json: bool) -> Result<()> {
    let content = if json {
        to_json(report)?
    } else {
        render_text(report)
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffOptions, compare};
    use crate::disasm::{ParseOptions, parse_disassembly};

    fn api_from(version: &str, text: &str) -> Api {
        let mut api = Api::new("widgets", version);
        parse_disassembly(&mut api, "widgets.jar", text, ParseOptions::default()).unwrap();
        api
    }

    const V1: &str = r#"public class org.sample.Widget {
  public java.lang.Integer removedField;
    descriptor: Ljava/lang/Integer;
  public org.sample.Widget();
    descriptor: ()V
  public void changedMethod(java.lang.Integer);
    descriptor: (Ljava/lang/Integer;)V
}
"#;

    const V2: &str = r#"public class org.sample.Widget {
  public org.sample.Widget();
    descriptor: ()V
  public java.lang.Integer changedMethod(java.lang.Integer);
    descriptor: (Ljava/lang/Integer;)Ljava/lang/Integer;
}
"#;

    fn reports() -> (LevelReport, LevelReport) {
        let old = api_from("1.0", V1);
        let new = api_from("2.0", V2);
        let diff = compare(&old, &new, &DiffOptions::default());
        let opts = ReportOptions::default();
        (
            build_level_report(&old, &new, &diff, Level::Binary, &opts),
            build_level_report(&old, &new, &diff, Level::Source, &opts),
        )
    }

    #[test]
    fn counters_and_verdict_reflect_deduped_severities() {
        let (binary, source) = reports();
        assert_eq!(binary.verdict, "incompatible");
        assert_eq!(source.verdict, "incompatible");
        assert!(binary.counts.high >= 2, "field removal + return change");
        assert!(!binary.compatible());
    }

    #[test]
    fn source_report_suppresses_return_change_pair_from_lists() {
        let (binary, source) = reports();
        assert!(
            binary
                .removed_methods
                .iter()
                .any(|m| m.contains("changedMethod")),
            "binary keeps the old-descriptor removal"
        );
        assert!(
            binary.added_methods.iter().any(|m| m.contains("changedMethod")),
            "binary keeps the new-descriptor addition"
        );
        assert!(
            !source
                .removed_methods
                .iter()
                .any(|m| m.contains("changedMethod")),
            "source hides the paired removal"
        );
        assert!(
            !source.added_methods.iter().any(|m| m.contains("changedMethod")),
            "source hides the paired addition"
        );
        // The return-type change itself is reported at both levels.
        for report in [&binary, &source] {
            assert!(
                report
                    .problems
                    .iter()
                    .any(|p| p.kind == ProblemKind::ChangedMethodReturnFromVoid)
            );
        }
    }

    #[test]
    fn affected_section_lists_touching_methods_for_field_removal() {
        let (binary, _) = reports();
        let section = binary
            .affected_types
            .get("org.sample.Widget")
            .expect("affected section for the changed type");
        assert!(
            section
                .methods
                .iter()
                .any(|m| m.method.contains("<init>") && m.role == "this")
        );
    }

    #[test]
    fn short_mode_drops_added_methods_and_caps_affected() {
        let old = api_from("1.0", V1);
        let new = api_from("2.0", V2);
        let diff = compare(&old, &new, &DiffOptions::default());
        let opts = ReportOptions {
            short: true,
            ..ReportOptions::default()
        };
        let report = build_level_report(&old, &new, &diff, Level::Binary, &opts);
        assert!(report.added_methods.is_empty());
        for section in report.affected_types.values() {
            assert!(section.methods.len() <= 4);
        }
    }

    #[test]
    fn strict_mode_promotes_low_to_incompatible() {
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
        let old = api_from("1.0", v1);
        let new = api_from("2.0", v2);
        let diff = compare(&old, &new, &DiffOptions::default());

        // A constant rename is Low at the binary level.
        let relaxed = build_level_report(&old, &new, &diff, Level::Binary, &ReportOptions::default());
        assert_eq!(relaxed.verdict, "compatible");
        assert!(relaxed.counts.low >= 1);

        let strict = build_level_report(
            &old,
            &new,
            &diff,
            Level::Binary,
            &ReportOptions {
                strict: true,
                ..ReportOptions::default()
            },
        );
        assert_eq!(strict.verdict, "incompatible");
    }

    #[test]
    fn json_and_text_renderings_carry_the_header_counters() {
        let (binary, _) = reports();
        let json = to_json(&binary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["level"], "binary");
        assert_eq!(value["library"], "widgets");
        assert!(value["counts"]["high"].as_u64().unwrap() >= 1);

        let text = render_text(&binary);
        assert!(text.contains("binary compatibility report for widgets (1.0 -> 2.0)"));
        assert!(text.contains("verdict: incompatible"));
    }

    #[test]
    fn identical_versions_produce_a_compatible_report() {
        let old = api_from("1.0", V1);
        let new = api_from("1.0", V1);
        let diff = compare(&old, &new, &DiffOptions::default());
        let report =
            build_level_report(&old, &new, &diff, Level::Binary, &ReportOptions::default());
        assert_eq!(report.verdict, "compatible");
        assert_eq!(report.counts.high, 0);
        assert_eq!(report.counts.medium, 0);
        assert!(report.problems.is_empty());
    }
}
