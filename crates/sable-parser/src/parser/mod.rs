mod expressions;
mod primary;
mod statements;

use std::collections::BTreeMap;

use pest::iterators::Pair;

use crate::ast::{File, Pos, Stmt};
use crate::pest_parser::Rule;

/// Builds the AST from pest pairs.
pub struct AstParser {
    path: String,
    /// Attribute comments by line.
    attributes: BTreeMap<u32, String>,
}

impl AstParser {
    pub fn new(path: &str, source: &str) -> Self {
        AstParser {
            path: path.to_string(),
            attributes: scan_attributes(source),
        }
    }

    pub fn build_file(&mut self, pair: Pair<Rule>) -> Result<File, (Pos, String)> {
        let mut file = File {
            path: self.path.clone(),
            ..File::default()
        };

        for stmt_pair in pair.into_inner() {
            if stmt_pair.as_rule() != Rule::statement {
                continue;
            }
            let pos = pos_of(&stmt_pair);
            let inner = stmt_pair
                .into_inner()
                .next()
                .ok_or((pos, "Empty statement".to_string()))?;

            match inner.as_rule() {
                Rule::import_stmt => {
                    let import = self.build_import(inner).map_err(|e| (pos, e))?;
                    file.imports.push(import);
                }
                Rule::declare_global => {
                    for s in inner.into_inner() {
                        if let Some(stmt) = self.build_statement(s).map_err(|e| (pos, e))? {
                            file.global.push(stmt);
                        }
                    }
                }
                _ => {
                    if let Some(stmt) = self.build_statement_inner(inner).map_err(|e| (pos, e))? {
                        file.stmts.push(stmt);
                    }
                }
            }
        }

        // whatever was not claimed by a function belongs to the file
        file.attributes = std::mem::take(&mut self.attributes).into_values().collect();
        Ok(file)
    }

    // ===== Helper methods =====

    /// Takes the attribute comments written on the lines right above `line`.
    pub(super) fn take_attributes(&mut self, line: u32) -> Vec<String> {
        let mut found = Vec::new();
        let mut current = line;
        while current > 1 {
            current -= 1;
            match self.attributes.remove(&current) {
                Some(attr) => found.push(attr),
                None => break,
            }
        }
        found.reverse();
        found
    }
}

pub(super) fn pos_of(pair: &Pair<Rule>) -> Pos {
    let (line, column) = pair.line_col();
    Pos::new(line as u32, column as u32)
}

/// Skips type annotation pairs.
pub(super) fn is_type_rule(rule: Rule) -> bool {
    matches!(rule, Rule::type_ann | Rule::type_params | Rule::type_args)
}

/// Collects `// [text]` comments that are alone on their line.
fn scan_attributes(source: &str) -> BTreeMap<u32, String> {
    let mut attributes = BTreeMap::new();
    for (i, line) in source.lines().enumerate() {
        let Some(comment) = line.trim().strip_prefix("//") else {
            continue;
        };
        let comment = comment.trim();
        if let Some(text) = comment.strip_prefix('[').and_then(|c| c.strip_suffix(']')) {
            attributes.insert(i as u32 + 1, text.trim().to_string());
        }
    }
    attributes
}

impl AstParser {
    pub(super) fn build_statement(&mut self, pair: Pair<Rule>) -> Result<Option<Stmt>, String> {
        match pair.as_rule() {
            Rule::statement => {
                let inner = pair.into_inner().next().ok_or("Empty statement")?;
                self.build_statement_inner(inner)
            }
            _ => self.build_statement_inner(pair),
        }
    }
}
