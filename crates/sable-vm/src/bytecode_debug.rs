//! Bytecode debugging utilities
//!
//! Textual listings of a compiled [`Program`]. Used by the CLI
//! `disassemble` command and by tests that look at generated code.

use crate::bytecode::{Function, Program};
use sable_types::Value;
use std::fmt::Write;

const SEPARATOR: &str = "\n===============================================================";
const SUBSEPARATOR: &str = "\n---------------------------------------------------------------";

/// Full listing: attributes, functions, classes, enums and constants.
pub fn dump_program(p: &Program) -> String {
    let mut out = String::new();

    if !p.attributes.is_empty() {
        out.push_str(SEPARATOR);
        out.push_str("\nAttributes");
        out.push_str(SEPARATOR);
        for a in &p.attributes {
            let _ = write!(out, "\n {}", a);
        }
        out.push('\n');
    }

    if !p.functions.is_empty() {
        out.push_str(SEPARATOR);
        out.push_str("\nFunctions");
        out.push_str(SEPARATOR);
        for f in p.functions.iter().filter(|f| !f.is_class) {
            out.push_str(&dump_function(p, f));
        }
    }

    if !p.classes.is_empty() {
        out.push_str(SEPARATOR);
        out.push_str("\nClasses");
        out.push_str(SEPARATOR);
        for (i, c) in p.classes.iter().enumerate() {
            let _ = write!(out, "\n{}A Class {}", i, c.name);
            for &f in &c.functions {
                out.push_str(&dump_function(p, &p.functions[f]));
            }
        }
    }

    if !p.enums.is_empty() {
        out.push_str(SEPARATOR);
        out.push_str("\nEnums");
        out.push_str(SEPARATOR);
        for (i, e) in p.enums.iter().enumerate() {
            let _ = write!(out, "\n{}E {}", i, e.name);
            for (j, v) in e.values.iter().enumerate() {
                let k = p.constants.get(v.k_index).cloned().unwrap_or_default();
                let _ = write!(out, "\n  {:<5} {}={}", j, v.name, k);
            }
        }
        out.push('\n');
    }

    if !p.constants.is_empty() {
        out.push_str(SEPARATOR);
        out.push_str("\nConstants");
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(&dump_constants(p));
    }

    out.push('\n');
    out
}

/// One function: header, instructions with source lines, then registers.
pub fn dump_function(p: &Program, f: &Function) -> String {
    let mut out = String::new();

    let name = match f.class.and_then(|c| p.classes.get(c)) {
        Some(c) if f.is_class => format!("{}.{}", c.name, f.name),
        _ => f.name.clone(),
    };
    let _ = write!(out, "\n{}F {}", f.index, name);
    out.push_str(SUBSEPARATOR);

    if !f.attributes.is_empty() {
        out.push_str("\nAttributes");
        out.push_str(SUBSEPARATOR);
        for a in &f.attributes {
            let _ = write!(out, "\n {}", a);
        }
        out.push_str(SUBSEPARATOR);
    }

    for (pc, instr) in f.instructions.iter().enumerate() {
        let _ = write!(out, "\n  {:<5} {}", pc, instr);
        if pc < f.positions.len() {
            let _ = write!(out, "   ;   {}", p.to_trace_line(f.index, pc));
        }
    }

    let kind = if f.is_global { "G" } else { "L" };
    out.push('\n');
    for (i, r) in f.registers.iter().enumerate() {
        let end = r.end_pc.map(|e| e.to_string()).unwrap_or_default();
        let _ = write!(out, "\n  {}{} {} {}-{}", i, kind, r.name, r.start_pc, end);
    }
    out.push('\n');
    out
}

pub fn dump_constants(p: &Program) -> String {
    let mut out = String::new();
    for (i, k) in p.constants.iter().enumerate() {
        match k {
            Value::String(s) => {
                let s: String = s.chars().take(50).collect();
                let _ = writeln!(out, "{}K string {}", i, s.replace('\n', "\\n"));
            }
            k => {
                let _ = writeln!(out, "{}K {} {}", i, k.value_type(), k);
            }
        }
    }
    out
}

/// Function names with their first source line and, optionally, the
/// registers each one declares.
pub fn dump_registers(p: &Program, registers: bool) -> String {
    let mut out = String::new();

    if !p.classes.is_empty() {
        for (i, c) in p.classes.iter().enumerate() {
            let _ = write!(out, "\n{}A {}", i, c.name);
            let methods: Vec<&Function> = c.functions.iter().map(|&f| &p.functions[f]).collect();
            dump_names(&mut out, p, &methods, 1, registers);
        }
        out.push('\n');
    }

    let functions: Vec<&Function> = p.functions.iter().filter(|f| !f.is_class).collect();
    dump_names(&mut out, p, &functions, 0, registers);
    out.push('\n');
    out
}

fn dump_names(out: &mut String, p: &Program, functions: &[&Function], indent: usize, registers: bool) {
    let tabs = "\t".repeat(indent);
    for f in functions {
        let _ = write!(
            out,
            "\n{}{}F {}    {}",
            tabs,
            f.index,
            f.name,
            p.to_trace_line(f.index, 0)
        );
        if registers {
            let kind = if f.is_global { "G" } else { "L" };
            for (j, r) in f.registers.iter().enumerate() {
                let _ = write!(out, "\n{}\t{}{} {}", tabs, j, kind, r.name);
            }
        }
    }
}
