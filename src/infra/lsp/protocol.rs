//! JSON-RPC 2.0 Protocol Implementation for LSP
//!
//! Defines the core message types for Language Server Protocol communication.
//! Domain types (Position, Range, Location) are in models/lsp.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

pub use crate::models::lsp::{Position, Range};

// ============================================================================
// JSON-RPC 2.0 Core Types
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Reply to a server-initiated request
    pub fn reply(id: RequestId, outcome: Result<Value, ResponseError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 Notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Request ID - can be number or string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl RequestId {
    /// Numeric form used for pending-request correlation; numeric strings are coerced
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.parse().ok(),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        RequestId::Number(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Unhandled method {}", method),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INTERNAL_ERROR: i32 = -32603;

    // LSP-specific error codes
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const CONTENT_MODIFIED: i32 = -32801;
}

/// Any message travelling in either direction
#[derive(Debug, Clone)]
pub enum Message {
    Response(Response),
    Request(Request),
    Notification(Notification),
}

impl Message {
    /// Parse a JSON string into a Message
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        use serde::de::Error;

        if !value.is_object() {
            return Err(serde_json::Error::custom("LSP message is not an object"));
        }
        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let has_method = value.get("method").is_some();
        let has_outcome = value.get("result").is_some() || value.get("error").is_some();

        match (has_id, has_method) {
            (true, true) => Ok(Message::Request(serde_json::from_value(value)?)),
            (_, false) if has_outcome => Ok(Message::Response(serde_json::from_value(value)?)),
            (false, true) => Ok(Message::Notification(serde_json::from_value(value)?)),
            _ => Err(serde_json::Error::custom("Invalid LSP message")),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Message::Response(r) => serde_json::to_string(r),
            Message::Request(r) => serde_json::to_string(r),
            Message::Notification(n) => serde_json::to_string(n),
        }
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Message::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Message::Response(r)
    }
}

impl From<Notification> for Message {
    fn from(n: Notification) -> Self {
        Message::Notification(n)
    }
}

// ============================================================================
// LSP Request Params
// ============================================================================

/// Text document identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

impl TextDocumentIdentifier {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Text document position params
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

impl TextDocumentPositionParams {
    pub fn new(uri: impl Into<String>, position: Position) -> Self {
        Self {
            text_document: TextDocumentIdentifier::new(uri),
            position,
        }
    }
}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Kept untyped: capability assertions walk it by JSON path
    #[serde(default)]
    pub capabilities: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// LSP Symbol Types
// ============================================================================

/// Symbol kind (LSP standard - integer values)
#[derive(Debug, Clone, Copy, Serialize_repr, Deserialize_repr, PartialEq, Eq)]
#[repr(u8)]
pub enum LspSymbolKind {
    File = 1,
    Module = 2,
    Namespace = 3,
    Package = 4,
    Class = 5,
    Method = 6,
    Property = 7,
    Field = 8,
    Constructor = 9,
    Enum = 10,
    Interface = 11,
    Function = 12,
    Variable = 13,
    Constant = 14,
    String = 15,
    Number = 16,
    Boolean = 17,
    Array = 18,
    Object = 19,
    Key = 20,
    Null = 21,
    EnumMember = 22,
    Struct = 23,
    Event = 24,
    Operator = 25,
    TypeParameter = 26,
}

/// Location in a document (LSP wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspLocation {
    pub uri: String,
    /// Range is required by LSP but some servers omit it
    #[serde(default)]
    pub range: Range,
}

/// LocationLink - used by some servers (rust-analyzer) for definition responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLink {
    pub target_uri: String,
    pub target_range: Range,
    /// The span of the symbol at the target
    pub target_selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_selection_range: Option<Range>,
}

impl LocationLink {
    pub fn to_location(&self) -> LspLocation {
        LspLocation {
            uri: self.target_uri.clone(),
            range: self.target_selection_range,
        }
    }
}

/// `textDocument/definition` result shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefinitionResponse {
    Scalar(LspLocation),
    Array(Vec<LspLocation>),
    Links(Vec<LocationLink>),
}

impl DefinitionResponse {
    pub fn into_locations(self) -> Vec<LspLocation> {
        match self {
            Self::Scalar(loc) => vec![loc],
            Self::Array(locs) => locs,
            Self::Links(links) => links.iter().map(LocationLink::to_location).collect(),
        }
    }
}

/// Document symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub kind: LspSymbolKind,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DocumentSymbol>>,
}

/// Flat symbol information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: LspSymbolKind,
    pub location: LspLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

/// `textDocument/documentSymbol` result shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentSymbolResponse {
    Nested(Vec<DocumentSymbol>),
    Flat(Vec<SymbolInformation>),
}

// ============================================================================
// LSP Hover / Signature Types
// ============================================================================

/// Hover result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hover {
    pub contents: HoverContents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Hover contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HoverContents {
    MarkupContent(MarkupContent),
    Scalar(MarkedString),
    Array(Vec<MarkedString>),
}

/// Markup content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: String,
    pub value: String,
}

/// Marked string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkedString {
    String(String),
    LanguageString { language: String, value: String },
}

// ============================================================================
// LSP Diagnostic Types
// ============================================================================

/// LSP Diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspDiagnostic {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

/// `textDocument/publishDiagnostics` params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    #[serde(default)]
    pub diagnostics: Vec<LspDiagnostic>,
}

// ============================================================================
// LSP Type Hierarchy Types
// ============================================================================

/// Type hierarchy item; `data` must be echoed back to the server untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspTypeHierarchyItem {
    pub name: String,
    pub kind: LspSymbolKind,
    pub uri: String,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::new(1, "initialize", Some(serde_json::json!({})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;
        match Message::parse(json).unwrap() {
            Message::Response(resp) => {
                assert!(resp.is_success());
                assert_eq!(resp.id, Some(RequestId::Number(1)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_response() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: Response = serde_json::from_str(json).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.into_result().unwrap_err().code, -32601);
    }

    #[test]
    fn test_message_classification() {
        let req = r#"{"jsonrpc":"2.0","id":"7","method":"workspace/configuration","params":{}}"#;
        assert!(matches!(Message::parse(req).unwrap(), Message::Request(_)));

        let note = r#"{"jsonrpc":"2.0","method":"$/progress","params":{}}"#;
        assert!(matches!(Message::parse(note).unwrap(), Message::Notification(_)));

        assert!(Message::parse(r#"{"jsonrpc":"2.0"}"#).is_err());
        assert!(Message::parse("[1,2]").is_err());
    }

    #[test]
    fn test_request_id_coercion() {
        assert_eq!(RequestId::String("42".into()).as_number(), Some(42));
        assert_eq!(RequestId::String("abc".into()).as_number(), None);
        assert_eq!(RequestId::Number(3).as_number(), Some(3));
    }

    #[test]
    fn test_definition_response_shapes() {
        let links = serde_json::json!([{
            "targetUri": "file:///a.rs",
            "targetRange": {"start": {"line": 1, "character": 0}, "end": {"line": 5, "character": 1}},
            "targetSelectionRange": {"start": {"line": 1, "character": 4}, "end": {"line": 1, "character": 8}}
        }]);
        let parsed: DefinitionResponse = serde_json::from_value(links).unwrap();
        let locs = parsed.into_locations();
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].range.start, Position::new(1, 4));

        let scalar = serde_json::json!({"uri": "file:///b.rs"});
        let parsed: DefinitionResponse = serde_json::from_value(scalar).unwrap();
        assert_eq!(parsed.into_locations()[0].uri, "file:///b.rs");
    }

    #[test]
    fn test_hover_contents_shapes() {
        let markup: Hover = serde_json::from_value(serde_json::json!({
            "contents": {"kind": "markdown", "value": "```rust\nfn a()\n```"}
        }))
        .unwrap();
        assert!(matches!(markup.contents, HoverContents::MarkupContent(_)));

        let list: Hover = serde_json::from_value(serde_json::json!({
            "contents": [{"language": "python", "value": "def f()"}, "Docs"]
        }))
        .unwrap();
        assert!(matches!(list.contents, HoverContents::Array(ref a) if a.len() == 2));
    }
}
