//! Initialize-params templates per backend
//!
//! Each template is static JSON with `$rootPath`, `$rootUri` and `$name`
//! placeholders; [`initialize_params`] fills them for a concrete workspace.

use std::path::Path;

use serde_json::{Map, Value, json};

use super::capabilities::Backend;
use crate::models::lsp::path_to_uri;

const ROOT_PATH: &str = "$rootPath";
const ROOT_URI: &str = "$rootUri";
const NAME: &str = "$name";

/// Complete `initialize` params for `backend` rooted at `root`
pub fn initialize_params(backend: Backend, root: &Path, process_id: Option<u32>) -> Value {
    let mut template = base_template();
    if let Some(options) = initialization_options(backend)
        && let Some(obj) = template.as_object_mut()
    {
        obj.insert("initializationOptions".to_string(), options);
    }

    let root_path = root.display().to_string();
    let root_uri = path_to_uri(root);
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root_path.clone());

    let mut params = substitute(template, &root_path, &root_uri, &name);
    if let Some(obj) = params.as_object_mut() {
        obj.insert(
            "processId".to_string(),
            process_id.map_or(Value::Null, Value::from),
        );
    }
    params
}

/// Replace placeholders in every string of `value`
fn substitute(value: Value, root_path: &str, root_uri: &str, name: &str) -> Value {
    match value {
        Value::String(s) => Value::String(
            s.replace(ROOT_URI, root_uri)
                .replace(ROOT_PATH, root_path)
                .replace(NAME, name),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| substitute(v, root_path, root_uri, name))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, root_path, root_uri, name)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

fn base_template() -> Value {
    let symbol_kinds: Vec<u8> = (1..=26).collect();
    json!({
        "clientInfo": {"name": "polylsp", "version": env!("CARGO_PKG_VERSION")},
        "locale": "en",
        "rootPath": ROOT_PATH,
        "rootUri": ROOT_URI,
        "workspaceFolders": [{"uri": ROOT_URI, "name": NAME}],
        "capabilities": {
            "workspace": {
                "workspaceFolders": true,
                "configuration": true,
                "didChangeWatchedFiles": {"dynamicRegistration": true},
                "symbol": {"symbolKind": {"valueSet": symbol_kinds}},
                "executeCommand": {"dynamicRegistration": true}
            },
            "textDocument": {
                "synchronization": {"dynamicRegistration": true, "didSave": true},
                "hover": {"contentFormat": ["markdown", "plaintext"]},
                "signatureHelp": {
                    "signatureInformation": {
                        "documentationFormat": ["markdown", "plaintext"],
                        "parameterInformation": {"labelOffsetSupport": true}
                    }
                },
                "definition": {"linkSupport": true},
                "references": {},
                "documentSymbol": {
                    "hierarchicalDocumentSymbolSupport": true,
                    "symbolKind": {"valueSet": symbol_kinds}
                },
                "typeHierarchy": {"dynamicRegistration": true},
                "publishDiagnostics": {"relatedInformation": true}
            },
            "window": {
                "workDoneProgress": true,
                "showMessage": {"messageActionItem": {"additionalPropertiesSupport": true}}
            },
            "general": {"positionEncodings": ["utf-16"]}
        },
        "trace": "off"
    })
}

fn initialization_options(backend: Backend) -> Option<Value> {
    match backend {
        // clangd is configured through command-line flags
        Backend::Clangd => None,
        Backend::Gopls => Some(json!({
            "completeUnimported": true,
            "directoryFilters": ["-**/vendor", "-**/node_modules", "-**/.git"],
            "semanticTokens": false,
            "hints": {}
        })),
        Backend::RustAnalyzer => Some(json!({
            "cargo": {"buildScripts": {"enable": true}, "features": "all"},
            "procMacro": {"enable": true},
            "checkOnSave": false,
            "files": {"excludeDirs": ["target"]},
            "linkedProjects": []
        })),
        Backend::Jedi => Some(json!({
            "workspace": {"extraPaths": [], "symbols": {"ignoreFolders": ["__pycache__", ".venv", "venv"]}},
            "diagnostics": {"enable": true}
        })),
        Backend::Metals => Some(json!({
            "isExitOnShutdown": true,
            "statusBarProvider": "false",
            "isHttpEnabled": false,
            "compilerOptions": {
                "completionCommand": null,
                "isCompletionItemDetailEnabled": true,
                "isCompletionItemDocumentationEnabled": true,
                "isCompletionItemResolve": true,
                "isHoverDocumentationEnabled": true,
                "isSignatureHelpDocumentationEnabled": true,
                "overrideDefFormat": "ascii",
                "snippetAutoIndent": false
            }
        })),
        Backend::Julia => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_placeholders_substituted() {
        let root = PathBuf::from("/work/demo");
        let params = initialize_params(Backend::Gopls, &root, Some(42));

        assert_eq!(params["processId"], 42);
        assert_eq!(params["rootPath"], "/work/demo");
        assert_eq!(params["rootUri"], "file:///work/demo");
        assert_eq!(params["workspaceFolders"][0]["uri"], "file:///work/demo");
        assert_eq!(params["workspaceFolders"][0]["name"], "demo");
        assert!(!params.to_string().contains('$'));
    }

    #[test]
    fn test_capabilities_block() {
        let params = initialize_params(Backend::Clangd, Path::new("/w"), None);
        assert!(params["processId"].is_null());
        assert!(params.get("initializationOptions").is_none());
        let doc_symbol = &params["capabilities"]["textDocument"]["documentSymbol"];
        assert_eq!(doc_symbol["hierarchicalDocumentSymbolSupport"], true);
        assert_eq!(doc_symbol["symbolKind"]["valueSet"].as_array().map(Vec::len), Some(26));
    }

    #[test]
    fn test_metals_options() {
        let params = initialize_params(Backend::Metals, Path::new("/w"), None);
        let options = &params["initializationOptions"];
        assert_eq!(options["isExitOnShutdown"], true);
        assert_eq!(options["statusBarProvider"], "false");
        assert!(options["compilerOptions"].is_object());
    }
}
