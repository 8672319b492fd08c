use pest::error::LineColLocation;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::File;
use crate::error::ParseError;
use crate::parser::AstParser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SableParser;

/// Parse an anonymous snippet.
pub fn parse(source: &str) -> Result<File, ParseError> {
    parse_file("", source)
}

/// Parse `source`, tagging the result and its errors with `path`.
pub fn parse_file(path: &str, source: &str) -> Result<File, ParseError> {
    let mut pairs = SableParser::parse(Rule::program, source).map_err(|e| {
        let (line, column) = match e.line_col {
            LineColLocation::Pos((l, c)) => (l, c),
            LineColLocation::Span((l, c), _) => (l, c),
        };
        ParseError::syntax(path, line as u32, column as u32, e.variant.message().to_string())
    })?;

    let program = pairs
        .next()
        .ok_or_else(|| ParseError::syntax(path, 1, 1, "Empty program"))?;

    let mut parser = AstParser::new(path, source);
    parser
        .build_file(program)
        .map_err(|(pos, message)| ParseError::syntax(path, pos.line, pos.column, message))
}
