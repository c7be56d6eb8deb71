//! Conversions from LSP wire types to the crate's models

use serde_json::Value;

use super::protocol::{
    DocumentSymbol, DocumentSymbolResponse, Hover, HoverContents, LspDiagnostic, LspLocation,
    LspSymbolKind, LspTypeHierarchyItem, MarkedString, SymbolInformation,
};
use crate::models::lsp::{
    Diagnostic, HoverInfo, Location, ParameterInfo, Severity, SignatureHelp, SignatureInfo,
    TypeHierarchyItem,
};
use crate::models::symbol::{SymbolInfo, SymbolKind};

pub fn convert_symbol_kind(kind: LspSymbolKind) -> SymbolKind {
    SymbolKind::from_lsp(kind as u64)
}

pub fn convert_location(loc: LspLocation) -> Location {
    Location::new(loc.uri, loc.range)
}

/// Flatten hover contents to markdown; language-tagged strings become fenced blocks
pub fn extract_hover_content(contents: &HoverContents) -> String {
    fn marked(ms: &MarkedString) -> String {
        match ms {
            MarkedString::String(s) => s.clone(),
            MarkedString::LanguageString { language, value } => {
                format!("```{}\n{}\n```", language, value)
            }
        }
    }

    match contents {
        HoverContents::MarkupContent(mc) => mc.value.clone(),
        HoverContents::Scalar(ms) => marked(ms),
        HoverContents::Array(arr) => arr
            .iter()
            .map(marked)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

pub fn convert_hover(hover: Hover) -> Option<HoverInfo> {
    let content = extract_hover_content(&hover.contents);
    if content.trim().is_empty() {
        return None;
    }
    Some(HoverInfo {
        content,
        range: hover.range,
    })
}

/// Unified symbol tree for one document, in source order with name paths computed
pub fn convert_document_symbols(response: DocumentSymbolResponse) -> Vec<SymbolInfo> {
    let mut symbols = match response {
        DocumentSymbolResponse::Nested(items) => items.into_iter().map(convert_nested).collect(),
        DocumentSymbolResponse::Flat(items) => nest_by_containment(items),
    };
    SymbolInfo::compute_paths_for_all(&mut symbols);
    symbols
}

fn convert_nested(doc: DocumentSymbol) -> SymbolInfo {
    let mut children: Vec<SymbolInfo> = doc
        .children
        .unwrap_or_default()
        .into_iter()
        .map(convert_nested)
        .collect();
    children.sort_by_key(|c| c.range.start);

    let mut symbol = SymbolInfo::new(doc.name, convert_symbol_kind(doc.kind), doc.range)
        .with_selection_range(doc.selection_range)
        .with_children(children);
    symbol.detail = doc.detail;
    symbol
}

/// Build a tree from flat `SymbolInformation[]` using range containment
fn nest_by_containment(mut items: Vec<SymbolInformation>) -> Vec<SymbolInfo> {
    // Outer ranges first when two symbols start at the same position
    items.sort_by(|a, b| {
        a.location
            .range
            .start
            .cmp(&b.location.range.start)
            .then(b.location.range.end.cmp(&a.location.range.end))
    });

    fn attach(done: SymbolInfo, stack: &mut [SymbolInfo], roots: &mut Vec<SymbolInfo>) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<SymbolInfo> = Vec::new();

    for item in items {
        let range = item.location.range;
        let symbol = SymbolInfo::new(item.name, convert_symbol_kind(item.kind), range);

        while let Some(top) = stack.last() {
            if top.range.contains_range(&range) {
                break;
            }
            if let Some(done) = stack.pop() {
                attach(done, &mut stack, &mut roots);
            }
        }
        stack.push(symbol);
    }

    while let Some(done) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }

    roots
}

pub fn convert_diagnostic(diag: LspDiagnostic) -> Diagnostic {
    Diagnostic {
        range: diag.range,
        severity: Severity::from_lsp(diag.severity),
        message: diag.message,
        source: diag.source,
        code: diag.code.map(|c| match c {
            Value::String(s) => s,
            other => other.to_string(),
        }),
    }
}

pub fn convert_type_hierarchy_item(item: &LspTypeHierarchyItem) -> TypeHierarchyItem {
    TypeHierarchyItem {
        name: item.name.clone(),
        kind: convert_symbol_kind(item.kind),
        location: Location::new(item.uri.clone(), item.selection_range),
        detail: item.detail.clone(),
    }
}

fn documentation_text(value: Option<&Value>) -> Option<String> {
    let d = value?;
    d.as_str()
        .or_else(|| d.get("value").and_then(Value::as_str))
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
}

pub fn parse_signature_help(value: &Value) -> Option<SignatureHelp> {
    let signatures = value.get("signatures")?.as_array()?;

    let parsed_signatures: Vec<SignatureInfo> = signatures
        .iter()
        .filter_map(|sig| {
            let label = sig.get("label")?.as_str()?.to_string();
            let documentation = documentation_text(sig.get("documentation"));

            let parameters = sig
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter_map(|param| {
                            let param_label = param.get("label").and_then(|l| {
                                if let Some(s) = l.as_str() {
                                    Some(s.to_string())
                                } else {
                                    // [start, end] offsets into the signature label
                                    let arr = l.as_array()?;
                                    let start = arr.first()?.as_u64()? as usize;
                                    let end = arr.get(1)?.as_u64()? as usize;
                                    label.get(start..end).map(str::to_string)
                                }
                            })?;

                            Some(ParameterInfo {
                                label: param_label,
                                documentation: documentation_text(param.get("documentation")),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(SignatureInfo {
                label,
                documentation,
                parameters,
                active_parameter: sig
                    .get("activeParameter")
                    .and_then(Value::as_u64)
                    .map(|a| a as u32),
            })
        })
        .collect();

    if parsed_signatures.is_empty() {
        return None;
    }

    Some(SignatureHelp {
        signatures: parsed_signatures,
        active_signature: value
            .get("activeSignature")
            .and_then(Value::as_u64)
            .map(|a| a as u32),
        active_parameter: value
            .get("activeParameter")
            .and_then(Value::as_u64)
            .map(|a| a as u32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Value {
        json!({"start": {"line": sl, "character": sc}, "end": {"line": el, "character": ec}})
    }

    #[test]
    fn test_nested_symbols_keep_order_and_paths() {
        let response: DocumentSymbolResponse = serde_json::from_value(json!([{
            "name": "Shape",
            "kind": 5,
            "range": range(0, 0, 10, 1),
            "selectionRange": range(0, 6, 0, 11),
            "children": [
                {"name": "area", "kind": 6, "range": range(5, 2, 6, 3), "selectionRange": range(5, 6, 5, 10)},
                {"name": "new", "kind": 9, "range": range(1, 2, 3, 3), "selectionRange": range(1, 6, 1, 9)}
            ]
        }]))
        .unwrap();

        let symbols = convert_document_symbols(response);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKind::Class);
        let names: Vec<_> = symbols[0].children.iter().map(|c| c.name_path.as_str()).collect();
        assert_eq!(names, vec!["Shape/new", "Shape/area"]);
    }

    #[test]
    fn test_flat_symbols_nested_by_containment() {
        let response: DocumentSymbolResponse = serde_json::from_value(json!([
            {"name": "helper", "kind": 12, "location": {"uri": "file:///a.py", "range": range(12, 0, 14, 0)}},
            {"name": "method", "kind": 6, "location": {"uri": "file:///a.py", "range": range(2, 4, 4, 0)}, "containerName": "A"},
            {"name": "A", "kind": 5, "location": {"uri": "file:///a.py", "range": range(0, 0, 10, 0)}}
        ]))
        .unwrap();

        let symbols = convert_document_symbols(response);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "A");
        assert_eq!(symbols[0].children[0].name_path, "A/method");
        assert_eq!(symbols[1].name, "helper");
    }

    #[test]
    fn test_hover_markdown_from_language_strings() {
        let contents = HoverContents::Array(vec![
            MarkedString::LanguageString {
                language: "python".into(),
                value: "def f(x)".into(),
            },
            MarkedString::String("Compute f.".into()),
        ]);
        assert_eq!(
            extract_hover_content(&contents),
            "```python\ndef f(x)\n```\n\nCompute f."
        );
    }

    #[test]
    fn test_parse_signature_help_offsets() {
        let value = json!({
            "signatures": [{
                "label": "fn add(a: i32, b: i32) -> i32",
                "documentation": {"kind": "markdown", "value": "Adds."},
                "parameters": [{"label": [7, 13]}, {"label": "b: i32"}]
            }],
            "activeSignature": 0
        });
        let help = parse_signature_help(&value).unwrap();
        let active = help.active().unwrap();
        assert_eq!(active.documentation.as_deref(), Some("Adds."));
        assert_eq!(active.parameters[0].label, "a: i32");
        assert!(parse_signature_help(&json!({"signatures": []})).is_none());
    }

    #[test]
    fn test_convert_diagnostic_code() {
        let diag: LspDiagnostic = serde_json::from_value(json!({
            "range": range(1, 0, 1, 4),
            "severity": 1,
            "code": 404,
            "message": "unresolved"
        }))
        .unwrap();
        let converted = convert_diagnostic(diag);
        assert_eq!(converted.severity, Severity::Error);
        assert_eq!(converted.code.as_deref(), Some("404"));
    }
}
