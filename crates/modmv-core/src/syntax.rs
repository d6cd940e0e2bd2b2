//! Go syntax tree facade.
//!
//! Parsing goes through tree-sitter's Go grammar. The resulting [`GoFile`] keeps the original
//! bytes plus the byte ranges of every import spec; printing splices the (possibly rewritten)
//! literals back into those bytes, so comments and untouched code come out unchanged.

use std::ops::Range;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

use crate::quote::{self, UnquoteError};

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("failed to load the Go grammar: {0}")]
    Language(String),

    #[error("source is not valid UTF-8")]
    Encoding,

    #[error("syntax error at line {line}, column {column}")]
    Parse { line: usize, column: usize },

    #[error("invalid import literal {literal} at line {line}")]
    ImportLiteral {
        literal: String,
        line: usize,
        #[source]
        source: UnquoteError,
    },

    #[error("failed to print file: {0}")]
    Print(String),
}

/// Indentation policy for import specs inside a grouped `import ( ... )` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    /// Keep whatever whitespace the file already has.
    Preserve,
    /// Re-indent each spec line with tabs.
    Tabs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintConfig {
    pub indent: Indent,
    /// Visual width of a tab when measuring existing indentation.
    pub tab_width: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: Indent::Preserve,
            tab_width: 8,
        }
    }
}

impl PrintConfig {
    pub fn tab_indented(tab_width: usize) -> Self {
        Self {
            indent: Indent::Tabs,
            tab_width,
        }
    }
}

/// One import spec: `alias "path"` or just `"path"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    alias: Option<String>,
    path: String,
    literal: String,
    original_literal: String,
    literal_range: Range<usize>,
    line_start: usize,
    spec_start: usize,
    line: usize,
    grouped: bool,
}

impl ImportSpec {
    /// Unquoted import path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Local name, including `_` and `.`.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Quoted literal as it will be printed.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// 1-based line of the spec in the original source.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Whether the spec sits inside an `import ( ... )` block.
    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// Replace the import path. The literal is re-quoted with Go escaping.
    pub fn set_path(&mut self, path: &str) {
        self.literal = quote::quote(path);
        self.path = path.to_string();
    }

    /// True when the printed literal would differ from the original text.
    pub fn is_modified(&self) -> bool {
        self.literal != self.original_literal
    }
}

/// A parsed Go source file.
#[derive(Debug, Clone)]
pub struct GoFile {
    source: Vec<u8>,
    package: String,
    doc: Option<Range<usize>>,
    imports: Vec<ImportSpec>,
}

impl GoFile {
    pub fn parse(source: impl Into<Vec<u8>>) -> Result<Self, SyntaxError> {
        let source = source.into();
        let text = std::str::from_utf8(&source).map_err(|_| SyntaxError::Encoding)?;
        let tree = parse_tree(text.as_bytes())?;
        let root = tree.root_node();

        if let Some(bad) = first_error(root) {
            let pos = bad.start_position();
            return Err(SyntaxError::Parse {
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }

        let mut package = String::new();
        let mut imports = Vec::new();

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "package_clause" => package = package_name(node, text),
                "import_declaration" => collect_imports(node, text, &mut imports)?,
                _ => {}
            }
        }
        let doc = doc_range(root);

        Ok(Self {
            source,
            package,
            doc,
            imports,
        })
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn package_name(&self) -> &str {
        &self.package
    }

    /// The comment block directly above the `package` clause, if any.
    pub fn doc_comment(&self) -> Option<&str> {
        let range = self.doc.clone()?;
        std::str::from_utf8(&self.source[range]).ok()
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    pub fn imports_mut(&mut self) -> &mut [ImportSpec] {
        &mut self.imports
    }

    pub fn is_modified(&self) -> bool {
        self.imports.iter().any(ImportSpec::is_modified)
    }

    /// Serialize the file, applying rewritten literals and the indentation policy.
    ///
    /// The output is parsed again before it is returned; text that no longer parses as Go is
    /// reported as [`SyntaxError::Print`].
    pub fn print(&self, config: &PrintConfig) -> Result<Vec<u8>, SyntaxError> {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for spec in &self.imports {
            if config.indent == Indent::Tabs && spec.is_grouped() {
                let prefix = &self.source[spec.line_start..spec.spec_start];
                if let Some(indent) = tab_indent(prefix, config.tab_width) {
                    if indent.as_bytes() != prefix {
                        edits.push((spec.line_start..spec.spec_start, indent));
                    }
                }
            }
            if spec.is_modified() {
                edits.push((spec.literal_range.clone(), spec.literal.clone()));
            }
        }

        let out = apply_edits(&self.source, edits)?;

        let reparsed = parse_tree(&out)?;
        if let Some(bad) = first_error(reparsed.root_node()) {
            let pos = bad.start_position();
            return Err(SyntaxError::Print(format!(
                "output does not parse at line {}, column {}",
                pos.row + 1,
                pos.column + 1
            )));
        }

        let printed_doc = doc_range(reparsed.root_node())
            .and_then(|range| std::str::from_utf8(&out[range]).ok());
        if printed_doc != self.doc_comment() {
            return Err(SyntaxError::Print("package comment was not preserved".to_string()));
        }

        Ok(out)
    }
}

fn parse_tree(source: &[u8]) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| SyntaxError::Language(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| SyntaxError::Language("parser produced no tree".to_string()))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(bad) = first_error(child) {
            return Some(bad);
        }
    }
    Some(node)
}

fn node_text<'a>(node: Node<'_>, text: &'a str) -> &'a str {
    &text[node.byte_range()]
}

/// Byte range of the comment block directly above the `package` clause.
///
/// Comments separated from the clause (or from each other) by a blank line do not count.
fn doc_range(root: Node<'_>) -> Option<Range<usize>> {
    let mut group: Option<(Range<usize>, usize)> = None;
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "comment" => {
                let row = node.start_position().row;
                group = match group {
                    Some((range, end_row)) if row <= end_row + 1 => {
                        Some((range.start..node.end_byte(), node.end_position().row))
                    }
                    _ => Some((node.byte_range(), node.end_position().row)),
                };
            }
            "package_clause" => {
                let (range, end_row) = group?;
                return (end_row + 1 >= node.start_position().row).then_some(range);
            }
            _ => return None,
        }
    }
    None
}

fn package_name(clause: Node<'_>, text: &str) -> String {
    let mut cursor = clause.walk();
    let name = clause
        .named_children(&mut cursor)
        .find(|child| child.kind() == "package_identifier")
        .map(|child| node_text(child, text).to_string());
    name.unwrap_or_default()
}

fn collect_imports(
    decl: Node<'_>,
    text: &str,
    imports: &mut Vec<ImportSpec>,
) -> Result<(), SyntaxError> {
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => imports.push(import_spec(child, text, false)?),
            "import_spec_list" => {
                let mut list_cursor = child.walk();
                for spec in child.named_children(&mut list_cursor) {
                    if spec.kind() == "import_spec" {
                        imports.push(import_spec(spec, text, true)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn import_spec(spec: Node<'_>, text: &str, grouped: bool) -> Result<ImportSpec, SyntaxError> {
    let line = spec.start_position().row + 1;
    let literal_node = spec
        .child_by_field_name("path")
        .ok_or(SyntaxError::Parse {
            line,
            column: spec.start_position().column + 1,
        })?;
    let literal = node_text(literal_node, text).to_string();
    let path = quote::unquote(&literal).map_err(|source| SyntaxError::ImportLiteral {
        literal: literal.clone(),
        line,
        source,
    })?;
    let alias = spec
        .child_by_field_name("name")
        .map(|name| node_text(name, text).to_string());

    let spec_start = spec.start_byte();
    let line_start = text[..spec_start].rfind('\n').map_or(0, |i| i + 1);

    Ok(ImportSpec {
        alias,
        path,
        original_literal: literal.clone(),
        literal,
        literal_range: literal_node.byte_range(),
        line_start,
        spec_start,
        line,
        grouped,
    })
}

/// Tab indentation equivalent to `prefix`, or `None` when the prefix holds anything other
/// than blanks (e.g. another spec on the same line).
fn tab_indent(prefix: &[u8], tab_width: usize) -> Option<String> {
    let tab_width = tab_width.max(1);
    let mut column = 0;
    for &b in prefix {
        match b {
            b' ' => column += 1,
            b'\t' => column += tab_width - column % tab_width,
            _ => return None,
        }
    }
    let depth = column.div_ceil(tab_width).max(1);
    Some("\t".repeat(depth))
}

/// Apply byte-range replacements. Ranges must not overlap.
fn apply_edits(
    source: &[u8],
    mut edits: Vec<(Range<usize>, String)>,
) -> Result<Vec<u8>, SyntaxError> {
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = Vec::with_capacity(source.len());
    let mut pos = 0;
    for (range, replacement) in edits {
        if range.start < pos || range.end > source.len() {
            return Err(SyntaxError::Print(format!(
                "overlapping edit at byte {}",
                range.start
            )));
        }
        out.extend_from_slice(&source[pos..range.start]);
        out.extend_from_slice(replacement.as_bytes());
        pos = range.end;
    }
    out.extend_from_slice(&source[pos..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"// Package app wires things together.
// It has a two line doc comment.
package app

import (
	"fmt"

	util "example.com/old/util"
	_ "example.com/old/driver" // side effects
)

import "example.com/other"

func main() {
	fmt.Println(util.Name)
}
"#;

    #[test]
    fn test_parse_imports() {
        let file = GoFile::parse(SAMPLE).unwrap();
        assert_eq!(file.package_name(), "app");

        let paths: Vec<_> = file.imports().iter().map(|i| i.path()).collect();
        assert_eq!(
            paths,
            [
                "fmt",
                "example.com/old/util",
                "example.com/old/driver",
                "example.com/other"
            ]
        );

        let imports = file.imports();
        assert_eq!(imports[0].alias(), None);
        assert_eq!(imports[1].alias(), Some("util"));
        assert_eq!(imports[2].alias(), Some("_"));
        assert!(imports[2].is_grouped());
        assert!(!imports[3].is_grouped());
        assert_eq!(imports[3].line(), 12);
    }

    #[test]
    fn test_doc_comment() {
        let file = GoFile::parse(SAMPLE).unwrap();
        assert_eq!(
            file.doc_comment(),
            Some("// Package app wires things together.\n// It has a two line doc comment.")
        );

        let detached = "// Copyright header\n\npackage app\n";
        assert_eq!(GoFile::parse(detached).unwrap().doc_comment(), None);

        let block = "/* Package app\n   does things. */\npackage app\n";
        assert_eq!(
            GoFile::parse(block).unwrap().doc_comment(),
            Some("/* Package app\n   does things. */")
        );
    }

    #[test]
    fn test_print_unmodified_is_identical() {
        let file = GoFile::parse(SAMPLE).unwrap();
        assert!(!file.is_modified());
        assert_eq!(file.print(&PrintConfig::default()).unwrap(), SAMPLE.as_bytes());
    }

    #[test]
    fn test_print_rewritten_literal_keeps_comments() {
        let mut file = GoFile::parse(SAMPLE).unwrap();
        file.imports_mut()[2].set_path("example.com/new/driver");
        assert!(file.is_modified());

        let out = String::from_utf8(file.print(&PrintConfig::default()).unwrap()).unwrap();
        assert_eq!(
            out,
            SAMPLE.replace("\"example.com/old/driver\"", "\"example.com/new/driver\"")
        );
        assert!(out.contains("// side effects"));
        assert!(out.starts_with("// Package app wires things together."));
    }

    #[test]
    fn test_set_same_path_is_not_a_modification() {
        let mut file = GoFile::parse(SAMPLE).unwrap();
        file.imports_mut()[0].set_path("fmt");
        assert!(!file.is_modified());
    }

    #[test]
    fn test_raw_literal_is_requoted() {
        let src = "package p\n\nimport `example.com/old`\n";
        let mut file = GoFile::parse(src).unwrap();
        assert_eq!(file.imports()[0].path(), "example.com/old");

        file.imports_mut()[0].set_path("example.com/new");
        let out = file.print(&PrintConfig::default()).unwrap();
        assert_eq!(out, b"package p\n\nimport \"example.com/new\"\n");
    }

    #[test]
    fn test_tab_indent_normalizes_grouped_specs() {
        let src = "package p\n\nimport (\n    \"a/b\"\n  x \"c/d\"\n\t\"e/f\"\n)\n";
        let mut file = GoFile::parse(src).unwrap();
        file.imports_mut()[0].set_path("x/y");

        let out = file.print(&PrintConfig::tab_indented(6)).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
        package p

        import (
        	"x/y"
        	x "c/d"
        	"e/f"
        )
        "#);
    }

    #[test]
    fn test_parse_error_location() {
        let src = "package p\n\nimport (\n\t\"fmt\"\n\nfunc main() {}\n";
        let err = GoFile::parse(src).unwrap_err();
        assert!(matches!(err, SyntaxError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_invalid_encoding() {
        let err = GoFile::parse(vec![b'p', 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, SyntaxError::Encoding));
    }

    #[test]
    fn test_tab_indent_helper() {
        assert_eq!(tab_indent(b"", 6).as_deref(), Some("\t"));
        assert_eq!(tab_indent(b"\t", 6).as_deref(), Some("\t"));
        assert_eq!(tab_indent(b"      ", 6).as_deref(), Some("\t"));
        assert_eq!(tab_indent(b"       ", 6).as_deref(), Some("\t\t"));
        assert_eq!(tab_indent(b"\t\t", 6).as_deref(), Some("\t\t"));
        assert_eq!(tab_indent(b"import (", 6), None);
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let edits = vec![(0..4, "x".to_string()), (2..6, "y".to_string())];
        assert!(matches!(
            apply_edits(b"abcdefgh", edits),
            Err(SyntaxError::Print(_))
        ));
    }
}
