//! # jcompat
//!
//! A Java API compliance checker: compares two versions of a library's class
//! archives and classifies every API change with binary- and source-level
//! severities.
//!
//! ## Architecture
//!
//! - **scan**: input expansion into archive lists
//! - **ingest**: archive walking, package filters, disassembly batching
//! - **javap**: external disassembler seam (trait + JDK javap impl)
//! - **disasm**: line-oriented parser over disassembly text
//! - **descriptor**: JVM type-descriptor utilities
//! - **intern**: per-version name interner
//! - **model**: symbol model (types, fields, methods, usage bundle)
//! - **usage**: invocation and field-use tables
//! - **diff**: added/removed/merged difference passes
//! - **problems**: problem taxonomy and severity tables
//! - **affected**: affected-method propagation
//! - **dump**: serialized API dumps
//! - **report**: report model, JSON and text emitters
//! - **xml**: XML input descriptors
//! - **cli**, **config**, **error**: command surface and error taxonomy

pub mod affected;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod diff;
pub mod disasm;
pub mod dump;
pub mod error;
pub mod ingest;
pub mod intern;
pub mod javap;
pub mod model;
pub mod problems;
pub mod report;
pub mod scan;
pub mod usage;
pub mod xml;
