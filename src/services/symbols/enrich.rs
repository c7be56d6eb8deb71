//! Signature and docstring retrieval

use std::path::Path;

use crate::models::lsp::{HoverInfo, Position, SignatureHelp};
use crate::services::source::SemanticSource;

/// `(signature, docstring)`; either half may be missing
pub type SignatureDoc = (Option<String>, Option<String>);

/// signatureHelp first, hover second; any failure gives `(None, None)`
///
/// In hover markdown the last fenced block is the signature. rust-analyzer
/// leads with the module path and clangd ends with the declaration.
pub async fn signature_and_docstring(
    source: &dyn SemanticSource,
    path: &Path,
    position: Position,
) -> SignatureDoc {
    match source.signature_help(path, position).await {
        Ok(Some(help)) => {
            if let Some(found) = from_signature_help(&help) {
                return found;
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(
                "signatureHelp failed at {}:{}: {}",
                path.display(),
                position.line + 1,
                e
            );
            return (None, None);
        }
    }

    match source.hover(path, position).await {
        Ok(Some(hover)) => from_hover(&hover),
        Ok(None) => (None, None),
        Err(e) => {
            tracing::debug!(
                "hover failed at {}:{}: {}",
                path.display(),
                position.line + 1,
                e
            );
            (None, None)
        }
    }
}

/// Only a documented active signature counts
fn from_signature_help(help: &SignatureHelp) -> Option<SignatureDoc> {
    let active = help.active()?;
    let doc = non_empty(active.documentation.as_deref()?)?;
    Some((non_empty(&active.label), Some(doc)))
}

fn from_hover(hover: &HoverInfo) -> SignatureDoc {
    let (code, prose) = split_markdown(&hover.content);
    (code.into_iter().next_back(), non_empty(&prose.join("\n\n")))
}

/// Fenced blocks and the prose between them
///
/// Horizontal rules are dropped from prose. An unterminated fence runs to
/// the end of the text.
pub fn split_markdown(markdown: &str) -> (Vec<String>, Vec<String>) {
    let mut code = Vec::new();
    let mut prose = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let mut flush = |lines: &mut Vec<&str>, fenced: bool| {
        if let Some(text) = non_empty(&lines.join("\n")) {
            if fenced { code.push(text) } else { prose.push(text) }
        }
        lines.clear();
    };

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            flush(&mut current, in_fence);
            in_fence = !in_fence;
        } else if !in_fence && is_rule(trimmed) {
            flush(&mut current, false);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, in_fence);

    (code, prose)
}

fn is_rule(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3 && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '*'))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::SignatureInfo;

    #[test]
    fn test_split_markdown_rust_analyzer_layout() {
        let md = "```rust\ncrate::math\n```\n\n```rust\npub fn add(a: i32, b: i32) -> i32\n```\n\n---\n\nAdds two numbers.";
        let (code, prose) = split_markdown(md);
        assert_eq!(code, vec!["crate::math", "pub fn add(a: i32, b: i32) -> i32"]);
        assert_eq!(prose, vec!["Adds two numbers."]);
    }

    #[test]
    fn test_split_markdown_without_fence() {
        let (code, prose) = split_markdown("Just words.\n\nMore words.");
        assert!(code.is_empty());
        assert_eq!(prose, vec!["Just words.\n\nMore words."]);
    }

    #[test]
    fn test_split_markdown_unterminated_fence() {
        let (code, prose) = split_markdown("Intro\n```go\nfunc F()");
        assert_eq!(code, vec!["func F()"]);
        assert_eq!(prose, vec!["Intro"]);
    }

    #[test]
    fn test_undocumented_signature_is_ignored() {
        let help = SignatureHelp {
            signatures: vec![SignatureInfo {
                label: "f(x)".into(),
                documentation: None,
                parameters: vec![],
                active_parameter: None,
            }],
            active_signature: Some(0),
            active_parameter: None,
        };
        assert!(from_signature_help(&help).is_none());
    }

    #[test]
    fn test_hover_last_block_is_signature() {
        let hover = HoverInfo {
            content: "```python\ndef create_user(self, id: str) -> User\n```\nCreate a new user.".into(),
            range: None,
        };
        assert_eq!(
            from_hover(&hover),
            (
                Some("def create_user(self, id: str) -> User".to_string()),
                Some("Create a new user.".to_string())
            )
        );
    }
}
