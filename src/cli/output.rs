//! JSON printing for CLI commands
//!
//! Every command prints exactly one JSON object with a `success` flag.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct OutputContext {
    root: PathBuf,
}

impl OutputContext {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative to the project root when inside it
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }

    /// Data fields at top level next to `"success": true`
    pub fn print_success<T: Serialize>(&self, data: T) {
        print_json(&success_value(data));
    }

    pub fn print_error(&self, message: &str) {
        print_json(&error_value(message));
    }
}

fn success_value<T: Serialize>(data: T) -> Value {
    let mut value = serde_json::to_value(data).unwrap_or_else(|_| json!({}));
    match value.as_object_mut() {
        Some(obj) => {
            obj.insert("success".to_string(), json!(true));
            value
        }
        None => json!({ "success": true, "data": value }),
    }
}

pub fn error_value(message: &str) -> Value {
    json!({
        "success": false,
        "error": message
    })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let ctx = OutputContext::new(PathBuf::from("/project"));
        assert_eq!(ctx.relative_path(Path::new("/project/src/main.rs")), "src/main.rs");
        assert_eq!(ctx.relative_path(Path::new("/other/file.rs")), "/other/file.rs");
    }

    #[test]
    fn test_success_value_flattens_objects() {
        #[derive(Serialize)]
        struct Count {
            count: usize,
        }
        assert_eq!(success_value(Count { count: 2 }), json!({ "success": true, "count": 2 }));
        assert_eq!(success_value(vec![1, 2]), json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn test_error_value() {
        assert_eq!(error_value("boom"), json!({ "success": false, "error": "boom" }));
    }
}
