//! Symbol model definitions
//!
//! Core types for representing code symbols from LSP.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lsp::Range;

/// A positioned code entity with its nested children in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    /// Full extent of the declaration (attributes and body included)
    pub range: Range,
    /// Extent of the identifier itself
    pub selection_range: Range,
    #[serde(default)]
    pub name_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overload_idx: Option<u32>,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range) -> Self {
        let name = name.into();
        Self {
            name_path: name.clone(),
            name,
            kind,
            range,
            selection_range: range,
            detail: None,
            signature: None,
            docstring: None,
            children: Vec::new(),
            overload_idx: None,
        }
    }

    pub fn with_selection_range(mut self, selection_range: Range) -> Self {
        self.selection_range = selection_range;
        self
    }

    pub fn with_children(mut self, children: Vec<SymbolInfo>) -> Self {
        self.children = children;
        self
    }

    fn compute_paths(&mut self, parent_path: Option<&str>) {
        let base_path = match parent_path {
            Some(parent) => format!("{}/{}", parent, self.name),
            None => self.name.clone(),
        };

        self.name_path = match self.overload_idx {
            Some(idx) => format!("{}[{}]", base_path, idx),
            None => base_path.clone(),
        };

        for child in &mut self.children {
            child.compute_paths(Some(&base_path));
        }
    }

    /// Compute `Parent/child` paths for a tree, suffixing duplicate siblings with `[i]`
    pub fn compute_paths_for_all(symbols: &mut [SymbolInfo]) {
        Self::assign_overload_indices(symbols);
        for symbol in symbols {
            symbol.compute_paths(None);
        }
    }

    fn assign_overload_indices(symbols: &mut [SymbolInfo]) {
        let mut name_counts: HashMap<String, u32> = HashMap::new();
        for symbol in symbols.iter() {
            *name_counts.entry(symbol.name.clone()).or_insert(0) += 1;
        }

        let mut name_indices: HashMap<String, u32> = HashMap::new();
        for symbol in symbols.iter_mut() {
            let count = name_counts.get(&symbol.name).copied().unwrap_or(1);
            if count > 1 {
                let idx = name_indices.entry(symbol.name.clone()).or_insert(0);
                symbol.overload_idx = Some(*idx);
                *idx += 1;
            }

            if !symbol.children.is_empty() {
                Self::assign_overload_indices(&mut symbol.children);
            }
        }
    }

    /// Check if this symbol matches a path pattern
    ///
    /// - Simple name: "method"
    /// - Relative path: "Class/method" (matches as suffix)
    /// - Absolute path: "/Class/method"
    /// - Wildcards: "*/method", "Class/*"
    /// - Overload index: "method[0]"
    pub fn matches_path(&self, pattern: &str) -> bool {
        if let Some(abs_pattern) = pattern.strip_prefix('/') {
            return Self::matches_pattern(&self.name_path, abs_pattern, true);
        }
        Self::matches_pattern(&self.name_path, pattern, false)
    }

    fn matches_pattern(path: &str, pattern: &str, exact: bool) -> bool {
        let (pattern, pattern_idx) = Self::parse_overload_index(pattern);
        let (path, path_idx) = Self::parse_overload_index(path);

        if let Some(pidx) = pattern_idx
            && path_idx != Some(pidx)
        {
            return false;
        }

        if pattern.contains('*') {
            Self::matches_wildcard(path, pattern, exact)
        } else if exact {
            path == pattern
        } else if pattern.contains('/') {
            path == pattern || path.ends_with(&format!("/{}", pattern))
        } else {
            path.rsplit('/').next().unwrap_or(path) == pattern
        }
    }

    fn parse_overload_index(s: &str) -> (&str, Option<u32>) {
        if let Some(bracket_pos) = s.rfind('[')
            && s.ends_with(']')
            && let Ok(idx) = s[bracket_pos + 1..s.len() - 1].parse::<u32>()
        {
            return (&s[..bracket_pos], Some(idx));
        }
        (s, None)
    }

    fn matches_wildcard(path: &str, pattern: &str, exact: bool) -> bool {
        let parts: Vec<&str> = pattern.split('/').collect();
        let path_parts: Vec<&str> = path.split('/').collect();

        if (exact && parts.len() != path_parts.len()) || parts.len() > path_parts.len() {
            return false;
        }

        let offset = path_parts.len() - parts.len();
        parts
            .iter()
            .zip(&path_parts[offset..])
            .all(|(part, value)| Self::matches_glob_part(value, part))
    }

    fn matches_glob_part(value: &str, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            return value.starts_with(prefix);
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return value.ends_with(suffix);
        }
        if let Some((prefix, suffix)) = pattern.split_once('*') {
            return value.starts_with(prefix) && value.ends_with(suffix);
        }
        value == pattern
    }

    /// Collect matching symbols, searching recursively in pre-order
    pub fn filter_by_path(symbols: &[SymbolInfo], pattern: &str) -> Vec<SymbolInfo> {
        let mut results = Vec::new();
        Self::collect_matching(symbols, pattern, &mut results);
        results
    }

    fn collect_matching(symbols: &[SymbolInfo], pattern: &str, results: &mut Vec<SymbolInfo>) {
        for symbol in symbols {
            if symbol.matches_path(pattern) {
                results.push(symbol.clone());
            }
            Self::collect_matching(&symbol.children, pattern, results);
        }
    }

    /// Flatten a tree in pre-order
    pub fn flatten(symbols: &[SymbolInfo]) -> Vec<&SymbolInfo> {
        let mut out = Vec::new();
        let mut stack: Vec<&SymbolInfo> = symbols.iter().rev().collect();
        while let Some(symbol) = stack.pop() {
            out.push(symbol);
            stack.extend(symbol.children.iter().rev());
        }
        out
    }

    /// Strip parameter lists and generic parameters from server-provided names
    /// (`myMethod(int, String) <T>` becomes `myMethod`)
    pub fn strip_type_parameters(name: &str) -> String {
        let name = name.trim();
        let name = name.find('(').map_or(name, |pos| &name[..pos]);
        let name = name.find('<').map_or(name, |pos| &name[..pos]);
        name.trim().to_string()
    }
}

/// Symbol classification (aligned with LSP SymbolKind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Key,
    Null,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
}

impl SymbolKind {
    /// Convert from LSP SymbolKind number
    pub fn from_lsp(kind: u64) -> Self {
        match kind {
            1 => Self::File,
            2 => Self::Module,
            3 => Self::Namespace,
            4 => Self::Package,
            5 => Self::Class,
            6 => Self::Method,
            7 => Self::Property,
            8 => Self::Field,
            9 => Self::Constructor,
            10 => Self::Enum,
            11 => Self::Interface,
            12 => Self::Function,
            13 => Self::Variable,
            14 => Self::Constant,
            15 => Self::String,
            16 => Self::Number,
            17 => Self::Boolean,
            18 => Self::Array,
            19 => Self::Object,
            20 => Self::Key,
            21 => Self::Null,
            22 => Self::EnumMember,
            23 => Self::Struct,
            24 => Self::Event,
            25 => Self::Operator,
            26 => Self::TypeParameter,
            _ => Self::Variable,
        }
    }

    /// Kinds that can take part in a type hierarchy
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Struct | Self::Enum
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Package => "package",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Key => "key",
            Self::Null => "null",
            Self::EnumMember => "enum_member",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Operator => "operator",
            Self::TypeParameter => "type_parameter",
        };
        write!(f, "{}", s)
    }
}

/// Source languages with a backend or a structural matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Cpp,
    Go,
    Python,
    Scala,
    Julia,
    Java,
    TypeScript,
    PHP,
    #[default]
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "c" | "cpp" | "cc" | "cxx" | "h" | "hpp" | "hxx" => Self::Cpp,
            "go" => Self::Go,
            "py" | "pyi" => Self::Python,
            "scala" | "sc" => Self::Scala,
            "jl" => Self::Julia,
            "java" => Self::Java,
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "php" => Self::PHP,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["rs"],
            Self::Cpp => &["c", "cpp", "cc", "cxx", "h", "hpp", "hxx"],
            Self::Go => &["go"],
            Self::Python => &["py", "pyi"],
            Self::Scala => &["scala", "sc"],
            Self::Julia => &["jl"],
            Self::Java => &["java"],
            Self::TypeScript => &["ts", "tsx", "mts", "cts"],
            Self::PHP => &["php"],
            Self::Unknown => &[],
        }
    }

    /// LSP language id used in `didOpen`
    pub fn lsp_id(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Cpp => "cpp",
            Self::Go => "go",
            Self::Python => "python",
            Self::Scala => "scala",
            Self::Julia => "julia",
            Self::Java => "java",
            Self::TypeScript => "typescript",
            Self::PHP => "php",
            Self::Unknown => "plaintext",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lsp_id())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rust" | "rs" => Ok(Self::Rust),
            "cpp" | "c++" | "c" => Ok(Self::Cpp),
            "go" | "golang" => Ok(Self::Go),
            "python" | "py" => Ok(Self::Python),
            "scala" => Ok(Self::Scala),
            "julia" | "jl" => Ok(Self::Julia),
            "java" => Ok(Self::Java),
            "typescript" | "ts" => Ok(Self::TypeScript),
            "php" => Ok(Self::PHP),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}
