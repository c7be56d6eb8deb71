//! LSP Common Types
//!
//! Positions, ranges and locations shared by the transport, the query
//! facades and the heuristic engine. All coordinates are 0-indexed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::symbol::SymbolKind;

// ============================================================================
// Core LSP Types
// ============================================================================

/// Position within a document (0-indexed, LSP standard)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Convert 1-indexed CLI input to 0-indexed LSP position
    pub fn from_cli(line: u32, column: u32) -> Self {
        Self {
            line: line.saturating_sub(1),
            character: column.saturating_sub(1),
        }
    }

    /// Convert 0-indexed LSP position to 1-indexed display position
    pub fn to_display(&self) -> (u32, u32) {
        (self.line + 1, self.character + 1)
    }
}

/// Range within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Convert a single position to a range
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Inclusive containment check
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }
}

/// Location in a document (LSP wire format)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    /// Range is required by LSP but some servers omit it
    #[serde(default)]
    pub range: Range,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }

    pub fn path(&self) -> PathBuf {
        uri_to_path(&self.uri)
    }

    /// Stable identity used when merging result sets
    pub fn key(&self) -> (&str, Range) {
        (&self.uri, self.range)
    }
}

// ============================================================================
// Hover / Signature Types
// ============================================================================

/// Hover information flattened to markdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverInfo {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Parameter information for function signatures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Function/method signature information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Full signature label
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_parameter: Option<u32>,
}

/// Signature help result
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SignatureHelp {
    pub signatures: Vec<SignatureInfo>,
    /// Currently active signature (0-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_signature: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_parameter: Option<u32>,
}

impl SignatureHelp {
    /// The signature the server marked active, falling back to the first one
    pub fn active(&self) -> Option<&SignatureInfo> {
        let idx = self.active_signature.unwrap_or(0) as usize;
        self.signatures.get(idx).or_else(|| self.signatures.first())
    }
}

// ============================================================================
// Type Hierarchy Types
// ============================================================================

/// Type hierarchy item (for supertypes/subtypes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHierarchyItem {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    /// Detail string (e.g., fully qualified name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn from_lsp(value: Option<u64>) -> Self {
        match value {
            Some(1) => Self::Error,
            Some(2) => Self::Warning,
            Some(4) => Self::Hint,
            _ => Self::Information,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// ============================================================================
// File Events
// ============================================================================

/// `workspace/didChangeWatchedFiles` change type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeType {
    Created,
    Changed,
    Deleted,
}

impl FileChangeType {
    pub fn to_lsp(self) -> u8 {
        match self {
            Self::Created => 1,
            Self::Changed => 2,
            Self::Deleted => 3,
        }
    }

    /// Net effect of two events on the same path inside one debounce window
    pub fn merge(self, later: Self) -> Self {
        match (self, later) {
            (_, Self::Deleted) => Self::Deleted,
            (Self::Created, _) => Self::Created,
            (Self::Deleted, Self::Created) => Self::Changed,
            _ => Self::Changed,
        }
    }
}

// ============================================================================
// URI Utilities
// ============================================================================

/// Convert file path to RFC 3986 compliant file:// URI
pub fn path_to_uri(path: &Path) -> String {
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let path_str = abs_path.to_string_lossy();
    let encoded: String = path_str
        .chars()
        .map(|c| match c {
            '/' | '.' | '-' | '_' | '~' => c.to_string(),
            c if c.is_ascii_alphanumeric() => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect();

    format!("file://{encoded}")
}

/// Convert file:// URI to PathBuf with full percent-decoding
pub fn uri_to_path(uri: &str) -> PathBuf {
    let path = match uri.strip_prefix("file://") {
        Some(p) => p,
        None => {
            tracing::warn!("Invalid file URI (missing file:// prefix): {}", uri);
            return PathBuf::from(uri);
        }
    };

    #[cfg(windows)]
    let path = path.strip_prefix('/').unwrap_or(path);

    PathBuf::from(percent_decode(path))
}

fn percent_decode(input: &str) -> String {
    let mut result = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();

    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let high = bytes.next();
            let low = bytes.next();
            if let (Some(h), Some(l)) = (high.and_then(hex_value), low.and_then(hex_value)) {
                result.push((h << 4) | l);
                continue;
            }
            result.push(byte);
            result.extend(high);
            result.extend(low);
            continue;
        }
        result.push(byte);
    }

    String::from_utf8_lossy(&result).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_cli() {
        let pos = Position::from_cli(10, 5);
        assert_eq!(pos.line, 9);
        assert_eq!(pos.character, 4);
        assert_eq!(pos.to_display(), (10, 5));
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(Position::new(2, 4), Position::new(5, 1));
        assert!(range.contains(Position::new(2, 4)));
        assert!(range.contains(Position::new(3, 0)));
        assert!(range.contains(Position::new(5, 1)));
        assert!(!range.contains(Position::new(2, 3)));
        assert!(!range.contains(Position::new(5, 2)));
    }

    #[test]
    fn test_uri_with_spaces() {
        let path = PathBuf::from("/path with spaces/file.rs");
        let uri = path_to_uri(&path);
        assert!(uri.contains("%20"));
        assert_eq!(uri_to_path(&uri), path);
    }

    #[test]
    fn test_uri_with_unicode() {
        let path = PathBuf::from("/tmp/한글_테스트.rs");
        assert_eq!(uri_to_path(&path_to_uri(&path)), path);
    }

    #[test]
    fn test_percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("100%zz"), "100%zz");
    }

    #[test]
    fn test_file_change_merge() {
        use FileChangeType::*;
        assert_eq!(Created.merge(Changed), Created);
        assert_eq!(Changed.merge(Deleted), Deleted);
        assert_eq!(Deleted.merge(Created), Changed);
        assert_eq!(Changed.merge(Changed), Changed);
    }

    #[test]
    fn test_signature_help_active_falls_back_to_first() {
        let help = SignatureHelp {
            signatures: vec![SignatureInfo {
                label: "fn a()".into(),
                documentation: None,
                parameters: vec![],
                active_parameter: None,
            }],
            active_signature: Some(3),
            active_parameter: None,
        };
        assert_eq!(help.active().map(|s| s.label.as_str()), Some("fn a()"));
    }
}
