#![allow(dead_code)]

use std::path::Path;

use oxide_optimize::prelude::*;
use tempfile::TempDir;

pub const APP_MANIFEST: &str = r#"{
    "routes": [
        {"method": "GET", "path": "/", "handler": "index"},
        {"method": "GET", "path": "/users/:id", "handler": "showUser"},
        {"method": "POST", "path": "/users", "handler": "createUser"}
    ]
}"#;

pub const TARGET_SOURCE: &str = "export class App {\n  constructor(options = {}) {\n    this.router = options.router ?? new SmartRouter({ routers: [new RegExpRouter(), new TrieRouter()] })\n    this.getPath = options.getPath\n  }\n}\n";

/// Creates a project directory holding the given files.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
    dir
}

/// Default settings rooted at `root`.
pub fn config(root: &Path) -> OptimizeConfig {
    OptimizeConfig {
        root: root.to_path_buf(),
        ..OptimizeConfig::default()
    }
}

/// Extracts the embedded literal from a generated file.
pub fn embedded_literal(contents: &str) -> &str {
    contents
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("const routerParams = "))
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or_else(|| panic!("No literal in:\n{contents}"))
}
