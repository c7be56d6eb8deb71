//! Per-language inheritance matchers
//!
//! Pure functions over file text. Given a type declared at a line, each
//! matcher extracts the base names that text names for it, with the line the
//! evidence sits on. Nothing here touches a language server.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{
    CommentStyle, depth, find_identifier, last_segment, split_top_level,
    strip_brackets, strip_comments, strip_nested, window_until,
};
use crate::infra::lsp::MatcherFamily;
use crate::models::hierarchy::{Evidence, EvidenceKind};

/// Bound on lines walked inside a struct body or above a declaration
const BODY_SCAN_LINES: usize = 400;
const ATTRIBUTE_SCAN_LINES: usize = 32;

const ACCESS_KEYWORDS: &[&str] = &["public", "protected", "private", "virtual", "final"];

static DERIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"derive\s*\(([^)]*)\)").expect("valid derive pattern"));

static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bimpl\s+(?:dyn\s+)?((?:[A-Za-z_]\w*::)*[A-Za-z_]\w*)\s+for\s+(?:&\s*(?:'\w+\s+)?(?:mut\s+)?)?((?:[A-Za-z_]\w*::)*[A-Za-z_]\w*)",
    )
    .expect("valid impl pattern")
});

/// A type declaration to inspect: its name and 0-indexed line
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub name: &'a str,
    pub line: u32,
}

/// A base type named by the source, with its evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub name: String,
    pub evidence: Evidence,
}

impl BaseRef {
    fn new(name: &str, kind: EvidenceKind, line: usize) -> Self {
        Self {
            name: last_segment(name).to_string(),
            evidence: Evidence::new(kind, line as u32),
        }
    }
}

/// `impl Trait for Type` found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplBlock {
    pub trait_name: String,
    pub self_type: String,
    pub line: u32,
}

pub fn comment_style(family: MatcherFamily) -> CommentStyle {
    match family {
        MatcherFamily::PythonBases => CommentStyle::Hash,
        MatcherFamily::JuliaSubtype => CommentStyle::Julia,
        _ => CommentStyle::CFamily,
    }
}

/// Every base `text` names for `decl`; empty when the line is out of range
pub fn extract_bases(
    family: MatcherFamily,
    text: &str,
    decl: Declaration<'_>,
    forward: usize,
) -> Vec<BaseRef> {
    let stripped = strip_comments(text, comment_style(family));
    let lines: Vec<&str> = stripped.lines().collect();
    let line = decl.line as usize;
    if line >= lines.len() {
        return Vec::new();
    }

    match family {
        MatcherFamily::ColonClause => colon_clause_bases(&lines, line, forward),
        MatcherFamily::Embedding => embedded_fields(&lines, line),
        MatcherFamily::Attribute => {
            let mut bases = derive_bases(&lines, line);
            bases.extend(
                rust_impl_blocks_stripped(&stripped)
                    .into_iter()
                    .filter(|b| b.self_type == decl.name)
                    .map(|b| BaseRef::new(&b.trait_name, EvidenceKind::ImplBlock, b.line as usize)),
            );
            bases
        }
        MatcherFamily::PythonBases => python_bases(&lines, line, forward),
        MatcherFamily::ScalaExtends => scala_bases(&lines, line, forward),
        MatcherFamily::JuliaSubtype => julia_supertype(&lines, line, forward),
    }
}

/// Evidence that `decl` derives from `target` (matched on its last segment)
pub fn find_evidence(
    family: MatcherFamily,
    text: &str,
    decl: Declaration<'_>,
    target: &str,
    forward: usize,
) -> Option<Evidence> {
    let target = last_segment(target);
    if target.is_empty() {
        return None;
    }
    extract_bases(family, text, decl, forward)
        .into_iter()
        .find(|base| base.name == target)
        .map(|base| base.evidence)
}

/// All `impl Trait for Type` blocks in a Rust file
pub fn rust_impl_blocks(text: &str) -> Vec<ImplBlock> {
    rust_impl_blocks_stripped(&strip_comments(text, CommentStyle::CFamily))
}

fn rust_impl_blocks_stripped(stripped: &str) -> Vec<ImplBlock> {
    let flattened = strip_brackets(stripped, '<', '>');
    IMPL_RE
        .captures_iter(&flattened)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ImplBlock {
                trait_name: last_segment(caps.get(1)?.as_str()).to_string(),
                self_type: last_segment(caps.get(2)?.as_str()).to_string(),
                line: line_of(&flattened, whole.start()) as u32,
            })
        })
        .collect()
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count()
}

// ============================================================================
// C++ / Java / PHP / TypeScript
// ============================================================================

fn colon_clause_bases(lines: &[&str], decl: usize, forward: usize) -> Vec<BaseRef> {
    let Some(window) = window_until(lines, decl, forward, |w| w.contains('{') || w.contains(';'))
    else {
        return Vec::new();
    };
    let head_end = window.find(['{', ';']).unwrap_or(window.len());
    let head = strip_brackets(&window[..head_end], '<', '>');

    let mut bases = Vec::new();
    let extends = find_identifier(&head, "extends", 0);
    let implements = find_identifier(&head, "implements", 0);

    if extends.is_some() || implements.is_some() {
        if let Some(at) = extends {
            let end = implements.filter(|&i| i > at).unwrap_or(head.len());
            collect_clause(&head, at + "extends".len(), end, EvidenceKind::ExtendsClause, decl, &mut bases);
        }
        if let Some(at) = implements {
            let end = extends.filter(|&e| e > at).unwrap_or(head.len());
            collect_clause(&head, at + "implements".len(), end, EvidenceKind::ImplementsClause, decl, &mut bases);
        }
        return bases;
    }

    if let Some(colon) = single_colon(&head) {
        collect_clause(&head, colon + 1, head.len(), EvidenceKind::ExtendsClause, decl, &mut bases);
    }
    bases
}

/// First `:` that is not half of `::`
fn single_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b':'
            && bytes.get(i + 1) != Some(&b':')
            && (i == 0 || bytes[i - 1] != b':')
    })
}

fn collect_clause(
    head: &str,
    start: usize,
    end: usize,
    kind: EvidenceKind,
    decl: usize,
    bases: &mut Vec<BaseRef>,
) {
    let Some(clause) = head.get(start..end) else {
        return;
    };
    let mut cursor = start;
    for entry in clause.split(',') {
        let name = entry
            .split_whitespace()
            .filter(|token| !ACCESS_KEYWORDS.contains(token))
            .next_back();
        if let Some(name) = name {
            let offset = head[cursor..]
                .find(name)
                .map_or(cursor, |o| cursor + o);
            bases.push(BaseRef::new(name, kind, decl + line_of(head, offset)));
        }
        cursor += entry.len() + 1;
    }
}

// ============================================================================
// Go
// ============================================================================

/// Anonymous fields of the struct (or interface) declared at `decl`.
/// Any other declaration (`type Alias int`, a function) has none.
fn embedded_fields(lines: &[&str], decl: usize) -> Vec<BaseRef> {
    let mut bases = Vec::new();
    let mut depth = 0usize;
    let mut opened = false;
    let mut header = String::new();

    for (index, line) in lines.iter().enumerate().skip(decl).take(BODY_SCAN_LINES) {
        let mut segment = String::new();
        let mut closed = false;
        for c in line.chars() {
            match c {
                '{' if !opened => {
                    if !opens_type_body(&header) {
                        return bases;
                    }
                    depth = 1;
                    opened = true;
                }
                ';' if !opened => return bases,
                '{' => depth += 1,
                '}' if opened => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        closed = true;
                        break;
                    }
                }
                _ if opened && depth == 1 => segment.push(c),
                _ if !opened => header.push(c),
                _ => {}
            }
        }
        if !opened && !opens_type_body(&header) {
            return bases;
        }
        header.push(' ');

        for entry in segment.split(';') {
            if let Some(name) = embedded_name(entry) {
                bases.push(BaseRef::new(name, EvidenceKind::StructEmbedding, index));
            }
        }
        if closed {
            break;
        }
    }
    bases
}

/// Declaration head names a `struct` or `interface` type
fn opens_type_body(header: &str) -> bool {
    header
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "struct" || word == "interface")
}

/// `Base`, `*Base`, `pkg.Base` or `Base[T]` standing alone as a field
fn embedded_name(entry: &str) -> Option<&str> {
    let field = entry.split('`').next().unwrap_or(entry).trim();
    let field = field.split('[').next().unwrap_or(field).trim();
    let mut tokens = field.split_whitespace();
    let token = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    let name = token.trim_start_matches('*');
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_');
    valid.then_some(name)
}

// ============================================================================
// Rust
// ============================================================================

/// `#[derive(...)]` entries on the attribute lines directly above `decl`
fn derive_bases(lines: &[&str], decl: usize) -> Vec<BaseRef> {
    let mut first = decl;
    let mut open = 0i32;

    for index in (decl.saturating_sub(ATTRIBUTE_SCAN_LINES)..decl).rev() {
        let trimmed = lines[index].trim();
        let inside = open > 0;
        let is_attribute = trimmed.starts_with("#[") || trimmed.ends_with(']');
        if !(inside || is_attribute || trimmed.is_empty()) {
            break;
        }
        open += depth(trimmed, ']', '[');
        first = index;
    }

    let block = lines[first..=decl].join("\n");
    let mut bases = Vec::new();
    for caps in DERIVE_RE.captures_iter(&block) {
        let Some(list) = caps.get(1) else {
            continue;
        };
        for entry in list.as_str().split(',') {
            let name = entry.trim();
            if name.is_empty() {
                continue;
            }
            let segment = last_segment(name);
            let offset = find_identifier(&block, segment, list.start()).unwrap_or(list.start());
            bases.push(BaseRef::new(name, EvidenceKind::DeriveAttribute, first + line_of(&block, offset)));
        }
    }
    bases
}

// ============================================================================
// Python
// ============================================================================

fn python_bases(lines: &[&str], decl: usize, forward: usize) -> Vec<BaseRef> {
    let Some(window) = window_until(lines, decl, forward, |w| {
        depth(w, '(', ')') <= 0 && w.trim_end().ends_with(':')
    }) else {
        return Vec::new();
    };
    let Some(class_at) = find_identifier(&window, "class", 0) else {
        return Vec::new();
    };
    let Some(open) = window[class_at..].find(['(', ':']).map(|o| class_at + o) else {
        return Vec::new();
    };
    if window[open..].starts_with(':') {
        return Vec::new();
    }

    let mut level = 0i32;
    let mut close = window.len();
    for (i, c) in window[open..].char_indices() {
        match c {
            '(' => level += 1,
            ')' => {
                level -= 1;
                if level == 0 {
                    close = open + i;
                    break;
                }
            }
            _ => {}
        }
    }

    let args = &window[open + 1..close];
    let mut bases = Vec::new();
    let mut cursor = open + 1;
    for entry in split_top_level(args, ',') {
        let trimmed = entry.trim();
        let is_keyword = trimmed.contains('=');
        let is_star = trimmed.starts_with('*');
        if !trimmed.is_empty() && !is_keyword && !is_star {
            let name = trimmed.split('[').next().unwrap_or(trimmed).trim();
            let offset = window[cursor..].find(name).map_or(cursor, |o| cursor + o);
            bases.push(BaseRef::new(name, EvidenceKind::ExtendsClause, decl + line_of(&window, offset)));
        }
        cursor += entry.len() + 1;
    }
    bases
}

// ============================================================================
// Scala
// ============================================================================

fn scala_bases(lines: &[&str], decl: usize, forward: usize) -> Vec<BaseRef> {
    let mut window = lines[decl].to_string();
    let mut last = decl;
    for (index, line) in lines.iter().enumerate().skip(decl + 1).take(forward) {
        if window.contains('{') {
            break;
        }
        let trimmed = line.trim_start();
        let unbalanced = depth(&window, '(', ')') > 0 || depth(&window, '[', ']') > 0;
        let continues = trimmed.starts_with("extends") || trimmed.starts_with("with");
        if !(unbalanced || continues) {
            break;
        }
        window.push('\n');
        window.push_str(line);
        last = index;
    }

    let head_end = window.find('{').unwrap_or(window.len());
    let head = strip_nested(&strip_nested(&window[..head_end], '(', ')'), '[', ']');
    let Some(extends) = find_identifier(&head, "extends", 0) else {
        return Vec::new();
    };

    let mut bases = Vec::new();
    let mut kind = EvidenceKind::ExtendsClause;
    let mut cursor = extends + "extends".len();
    loop {
        let next_with = find_identifier(&head, "with", cursor);
        let part = &head[cursor..next_with.unwrap_or(head.len())];
        for name in part.split(',').filter_map(|p| p.split_whitespace().next()) {
            let line = find_line(lines, decl, last, last_segment(name)).unwrap_or(decl);
            bases.push(BaseRef::new(name, kind, line));
        }
        match next_with {
            Some(at) => {
                kind = EvidenceKind::ImplementsClause;
                cursor = at + "with".len();
            }
            None => break,
        }
    }
    bases
}

/// First line in `from..=to` naming `name` as a whole identifier
fn find_line(lines: &[&str], from: usize, to: usize, name: &str) -> Option<usize> {
    (from..=to.min(lines.len().saturating_sub(1)))
        .find(|&i| find_identifier(lines[i], name, 0).is_some())
}

// ============================================================================
// Julia
// ============================================================================

fn julia_supertype(lines: &[&str], decl: usize, forward: usize) -> Vec<BaseRef> {
    let Some(window) = window_until(lines, decl, forward, |w| depth(w, '{', '}') <= 0) else {
        return Vec::new();
    };
    let head = strip_nested(&window, '{', '}');
    let Some(at) = head.find("<:") else {
        return Vec::new();
    };
    let Some(name) = head[at + 2..].split_whitespace().next() else {
        return Vec::new();
    };
    let name = name.trim_end_matches(';');
    let line = find_line(lines, decl, decl + forward, last_segment(name)).unwrap_or(decl);
    vec![BaseRef::new(name, EvidenceKind::SubtypeDeclaration, line)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, line: u32) -> Declaration<'_> {
        Declaration { name, line }
    }

    fn names(bases: &[BaseRef]) -> Vec<&str> {
        bases.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_cpp_public_base() {
        let src = "class Base {};\nclass Child : public Base {};\n";
        let ev = find_evidence(MatcherFamily::ColonClause, src, decl("Child", 1), "Base", 8).unwrap();
        assert_eq!(ev, Evidence::new(EvidenceKind::ExtendsClause, 1));
        assert!(find_evidence(MatcherFamily::ColonClause, src, decl("Base", 0), "Child", 8).is_none());
    }

    #[test]
    fn test_cpp_multiline_and_qualified() {
        let src = "template <typename T>\nclass Widget\n    : public ui::Base<T>,\n      private virtual Mixin\n{\n};";
        let bases = extract_bases(MatcherFamily::ColonClause, src, decl("Widget", 1), 8);
        assert_eq!(names(&bases), vec!["Base", "Mixin"]);
        assert_eq!(bases[0].evidence.line, 2);
        assert_eq!(bases[1].evidence.line, 3);
    }

    #[test]
    fn test_commented_base_ignored() {
        let src = "class Child /* : public Base */ {};";
        assert!(find_evidence(MatcherFamily::ColonClause, src, decl("Child", 0), "Base", 8).is_none());
    }

    #[test]
    fn test_java_extends_implements() {
        let src = "public class Repo<T extends Entity> extends BaseRepo implements Closeable, java.io.Serializable {\n}";
        let bases = extract_bases(MatcherFamily::ColonClause, src, decl("Repo", 0), 8);
        assert_eq!(names(&bases), vec!["BaseRepo", "Closeable", "Serializable"]);
        assert_eq!(bases[0].evidence.kind, EvidenceKind::ExtendsClause);
        assert_eq!(bases[2].evidence.kind, EvidenceKind::ImplementsClause);
        assert!(find_evidence(MatcherFamily::ColonClause, src, decl("Repo", 0), "Entity", 8).is_none());
    }

    #[test]
    fn test_go_embedding_vs_named_field() {
        let embedded = "type Child struct { Base; X int }";
        assert_eq!(
            find_evidence(MatcherFamily::Embedding, embedded, decl("Child", 0), "Base", 8),
            Some(Evidence::new(EvidenceKind::StructEmbedding, 0))
        );

        let named = "type Child struct { base Base }";
        assert!(find_evidence(MatcherFamily::Embedding, named, decl("Child", 0), "Base", 8).is_none());
    }

    #[test]
    fn test_go_non_struct_does_not_borrow_next_body() {
        let src = "type Alias int\ntype Child struct { Base }\n";
        assert!(find_evidence(MatcherFamily::Embedding, src, decl("Alias", 0), "Base", 8).is_none());
        assert_eq!(
            find_evidence(MatcherFamily::Embedding, src, decl("Child", 1), "Base", 8),
            Some(Evidence::new(EvidenceKind::StructEmbedding, 1))
        );

        let group = "type (\n\tID string\n\tNode struct {\n\t\tBase\n\t}\n)\n";
        assert!(find_evidence(MatcherFamily::Embedding, group, decl("ID", 1), "Base", 8).is_none());
        assert!(find_evidence(MatcherFamily::Embedding, group, decl("Node", 2), "Base", 8).is_some());

        let func = "func New() *Server {\n\tBase\n}\n";
        assert!(find_evidence(MatcherFamily::Embedding, func, decl("New", 0), "Base", 8).is_none());
    }

    #[test]
    fn test_go_multiline_pointer_and_package() {
        let src = "type Server struct {\n\t*sync.Mutex\n\tio.Reader `json:\"-\"`\n\tname string\n\tinner struct {\n\t\tHidden\n\t}\n}\n";
        let bases = extract_bases(MatcherFamily::Embedding, src, decl("Server", 0), 8);
        assert_eq!(names(&bases), vec!["Mutex", "Reader"]);
        assert_eq!(bases[0].evidence.line, 1);
        assert_eq!(bases[1].evidence.line, 2);
    }

    #[test]
    fn test_rust_derive_above_struct() {
        let src = "/// Docs\n#[derive(Debug,\n    Clone, serde::Serialize)]\n#[serde(rename_all = \"camelCase\")]\npub struct Point { x: i32 }\n";
        let bases = extract_bases(MatcherFamily::Attribute, src, decl("Point", 4), 8);
        assert_eq!(names(&bases), vec!["Debug", "Clone", "Serialize"]);
        assert_eq!(bases[0].evidence, Evidence::new(EvidenceKind::DeriveAttribute, 1));
        assert_eq!(bases[1].evidence.line, 2);
    }

    #[test]
    fn test_rust_derive_does_not_leak_from_previous_item() {
        let src = "#[derive(Base)]\nstruct A;\nstruct B;\n";
        assert!(find_evidence(MatcherFamily::Attribute, src, decl("A", 1), "Base", 8).is_some());
        assert!(find_evidence(MatcherFamily::Attribute, src, decl("B", 2), "Base", 8).is_none());
    }

    #[test]
    fn test_rust_impl_blocks() {
        let src = "struct S<T>(T);\nimpl<T: Clone> fmt::Display for S<T> {}\nimpl<'a> Iterator for &'a mut S<u8> {}\n// impl Hidden for S {}\nimpl S {}\n";
        let blocks = rust_impl_blocks(src);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].trait_name, "Display");
        assert_eq!(blocks[0].self_type, "S");
        assert_eq!(blocks[0].line, 1);
        assert_eq!(blocks[1].trait_name, "Iterator");

        let ev = find_evidence(MatcherFamily::Attribute, src, decl("S", 0), "std::fmt::Display", 8).unwrap();
        assert_eq!(ev, Evidence::new(EvidenceKind::ImplBlock, 1));
    }

    #[test]
    fn test_python_bases() {
        let src = "class Model(base.Base, Generic[T],\n            metaclass=Meta):\n    pass\n";
        let bases = extract_bases(MatcherFamily::PythonBases, src, decl("Model", 0), 8);
        assert_eq!(names(&bases), vec!["Base", "Generic"]);
        assert!(find_evidence(MatcherFamily::PythonBases, src, decl("Model", 0), "Meta", 8).is_none());
        assert!(extract_bases(MatcherFamily::PythonBases, "class Plain:\n    pass", decl("Plain", 0), 8).is_empty());
    }

    #[test]
    fn test_scala_extends_with() {
        let src = "case class Circle(r: Double)\n  extends Shape(r)\n  with Serializable\n  with Ordered[Circle] {\n}";
        let bases = extract_bases(MatcherFamily::ScalaExtends, src, decl("Circle", 0), 8);
        assert_eq!(names(&bases), vec!["Shape", "Serializable", "Ordered"]);
        assert_eq!(bases[0].evidence, Evidence::new(EvidenceKind::ExtendsClause, 1));
        assert_eq!(bases[2].evidence, Evidence::new(EvidenceKind::ImplementsClause, 3));
    }

    #[test]
    fn test_julia_subtype() {
        let src = "struct Point{T<:Real} <: Geometry.AbstractPoint\n    x::T\nend\n";
        let bases = extract_bases(MatcherFamily::JuliaSubtype, src, decl("Point", 0), 8);
        assert_eq!(names(&bases), vec!["AbstractPoint"]);
        assert_eq!(bases[0].evidence.kind, EvidenceKind::SubtypeDeclaration);
        assert!(find_evidence(MatcherFamily::JuliaSubtype, src, decl("Point", 0), "Real", 8).is_none());
    }

    #[test]
    fn test_out_of_range_line_is_empty() {
        assert!(extract_bases(MatcherFamily::ColonClause, "class A : B {};", decl("A", 5), 8).is_empty());
    }
}
