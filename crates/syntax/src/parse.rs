//! Parser setup and per-file parse results.

use std::path::PathBuf;

use thiserror::Error;
use tree_sitter::{Parser, Tree};

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("failed to load the C# grammar: {0}")]
    Language(String),

    #[error("the parser produced no tree for {path}")]
    NoTree { path: PathBuf },
}

/// Whether a file parsed cleanly enough to index declarations from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Ok,
    /// The tree contains syntax errors. The job layer surfaces a warning
    /// for the file and drops it from the compilation.
    Partial,
}

/// A parsed source file: original text plus its concrete syntax tree.
///
/// The text is kept verbatim; every downstream rewrite is expressed as byte
/// edits against it, so bytes the rewriter does not touch survive untouched.
pub struct ParsedFile {
    pub path: PathBuf,
    pub text: String,
    pub tree: Tree,
    pub outcome: ParseOutcome,
}

impl ParsedFile {
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Byte slice of a node, panicking never: malformed ranges yield "".
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &str {
        self.text.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }
}

fn csharp_parser() -> Result<Parser, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| SyntaxError::Language(e.to_string()))?;
    Ok(parser)
}

/// Parse a single C# source file.
pub fn parse_source(path: impl Into<PathBuf>, text: String) -> Result<ParsedFile, SyntaxError> {
    let path = path.into();
    let mut parser = csharp_parser()?;
    let tree = parser
        .parse(&text, None)
        .ok_or_else(|| SyntaxError::NoTree { path: path.clone() })?;
    let outcome = if tree.root_node().has_error() {
        tracing::debug!(path = %path.display(), "parse tree contains errors");
        ParseOutcome::Partial
    } else {
        ParseOutcome::Ok
    };
    Ok(ParsedFile {
        path,
        text,
        tree,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_class() {
        let src = "class C { void M() { } }";
        let file = parse_source("a.cs", src.to_string()).unwrap();
        assert_eq!(file.outcome, ParseOutcome::Ok);
        assert_eq!(file.root().kind(), "compilation_unit");
    }

    #[test]
    fn test_parse_damaged_source_is_partial() {
        let src = "class C { void M( { }";
        let file = parse_source("a.cs", src.to_string()).unwrap();
        assert_eq!(file.outcome, ParseOutcome::Partial);
    }

    #[test]
    fn test_node_text_roundtrip() {
        let src = "class C { }";
        let file = parse_source("a.cs", src.to_string()).unwrap();
        assert_eq!(file.node_text(file.root()), src);
    }
}
