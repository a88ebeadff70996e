//! Build artifact generation
//!
//! Turns a fragment and its deployment config into the set of files a provider
//! needs to build and serve it. Generation is pure: the same inputs always
//! produce the same files, byte for byte.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use deploy_models::{DeploymentConfig, DeploymentProvider, Fragment, Language, ProviderKind, TemplateId};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::deploy::deps::extract_dependencies;
use crate::errors::EngineError;
use crate::filesys::dir::Dir;
use crate::utils::slugify;

/// Python version pinned in `runtime.txt` and container images
pub const PYTHON_VERSION: &str = "3.11";

/// Ordered `path -> content` map of generated files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: BTreeMap<String, String>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of the content sizes in bytes
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|c| c.len() as u64).sum()
    }

    /// SHA-256 over every path and content, in path order
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update([0]);
            hasher.update(content.as_bytes());
            hasher.update([0]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Write every file below `dir`
    pub async fn write_to(&self, dir: &Dir) -> Result<(), EngineError> {
        dir.create().await?;
        for (path, content) in &self.files {
            dir.file(path).write_string(content).await?;
        }
        Ok(())
    }
}

/// Generate the build files of `fragment` for `provider`
pub fn generate(
    fragment: &Fragment,
    config: &DeploymentConfig,
    provider: &DeploymentProvider,
) -> ArtifactSet {
    let mut artifacts = ArtifactSet::new();
    let template = fragment.template;

    match template {
        TemplateId::Nextjs => {
            artifacts.insert("package.json", nextjs_package_json(fragment, config));
            artifacts.insert("next.config.js", nextjs_config(config));
            artifacts.insert(template.entrypoint(), nextjs_page(&fragment.code));
        }
        TemplateId::Vue => {
            artifacts.insert("package.json", vue_package_json(fragment, config));
            artifacts.insert("vue.config.js", vue_config(config));
            artifacts.insert(template.entrypoint(), vue_component(&fragment.code));
        }
        TemplateId::Streamlit => {
            artifacts.insert(".streamlit/config.toml", streamlit_config(config));
            artifacts.insert(template.entrypoint(), fragment.code.clone());
        }
        TemplateId::Gradio => {
            artifacts.insert(template.entrypoint(), gradio_app(&fragment.code));
        }
        TemplateId::CodeInterpreter => {
            artifacts.insert(template.entrypoint(), fragment.code.clone());
        }
    }

    if template.language() == Language::Python {
        artifacts.insert("requirements.txt", requirements(fragment));
        artifacts.insert("runtime.txt", format!("python-{}\n", PYTHON_VERSION));
    }

    if provider.kind == ProviderKind::Container {
        artifacts.insert("Dockerfile", dockerfile(template, config));
    }

    if !config.environment_variables.is_empty() {
        artifacts.insert(".env", env_file(config));
    }

    for (path, content) in &fragment.files {
        if !is_relative_path(path) {
            warn!("Skipping fragment file with unsafe path: {}", path);
            continue;
        }
        if !artifacts.contains(path) {
            artifacts.insert(path.clone(), content.clone());
        }
    }

    artifacts
}

/// Commands run by the build runner, in order
pub fn build_commands(template: TemplateId, config: &DeploymentConfig) -> Vec<String> {
    match template.language() {
        Language::Javascript => vec![
            "npm install".to_string(),
            config
                .build_command
                .clone()
                .unwrap_or_else(|| "npm run build".to_string()),
        ],
        Language::Python => vec!["pip install -r requirements.txt".to_string()],
    }
}

fn is_relative_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn node_major(config: &DeploymentConfig) -> String {
    config
        .node_version_or_default()
        .trim_end_matches(".x")
        .to_string()
}

fn to_pretty_json(value: serde_json::Value) -> String {
    // Serializing a `Value` cannot fail
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn nextjs_package_json(fragment: &Fragment, config: &DeploymentConfig) -> String {
    to_pretty_json(json!({
        "name": slugify(&fragment.title),
        "version": "1.0.0",
        "private": true,
        "scripts": {
            "build": "next build",
            "start": "next start",
            "dev": "next dev",
        },
        "dependencies": {
            "next": "^14.0.0",
            "react": "^18.0.0",
            "react-dom": "^18.0.0",
        },
        "engines": {
            "node": config.node_version_or_default(),
        },
    }))
}

fn nextjs_config(config: &DeploymentConfig) -> String {
    let mut next_config = json!({
        "trailingSlash": true,
        "images": { "unoptimized": true },
    });
    if config.output_directory.is_some() {
        next_config["output"] = json!("export");
    }
    format!("module.exports = {}\n", to_pretty_json(next_config))
}

fn nextjs_page(code: &str) -> String {
    if code.contains("export default") {
        return code.to_string();
    }

    let (imports, body): (Vec<&str>, Vec<&str>) = code
        .lines()
        .partition(|line| line.trim_start().starts_with("import "));

    let mut page = String::new();
    if !imports.iter().any(|line| line.contains("'react'") || line.contains("\"react\"")) {
        page.push_str("import React from 'react'\n");
    }
    for line in imports {
        page.push_str(line);
        page.push('\n');
    }

    page.push_str("\nexport default function App() {\n  return (\n    <div>\n");
    for line in body.iter().filter(|l| !l.trim().is_empty()) {
        page.push_str("      ");
        page.push_str(line);
        page.push('\n');
    }
    page.push_str("    </div>\n  )\n}\n");
    page
}

fn vue_package_json(fragment: &Fragment, config: &DeploymentConfig) -> String {
    to_pretty_json(json!({
        "name": slugify(&fragment.title),
        "version": "1.0.0",
        "private": true,
        "scripts": {
            "serve": "vue-cli-service serve",
            "build": "vue-cli-service build",
            "start": "vue-cli-service serve --host 0.0.0.0 --port $PORT",
        },
        "dependencies": {
            "vue": "^3.0.0",
            "@vue/cli-service": "^5.0.0",
        },
        "engines": {
            "node": config.node_version_or_default(),
        },
    }))
}

fn vue_config(config: &DeploymentConfig) -> String {
    format!(
        "module.exports = {{\n  publicPath: '/',\n  outputDir: '{}',\n  assetsDir: 'static',\n  lintOnSave: false,\n  productionSourceMap: false\n}}\n",
        config.output_directory.as_deref().unwrap_or("dist")
    )
}

fn vue_component(code: &str) -> String {
    if code.contains("<template>") {
        return code.to_string();
    }

    let mut component = String::from("<template>\n  <div id=\"app\">\n");
    for line in code.lines() {
        component.push_str("    ");
        component.push_str(line);
        component.push('\n');
    }
    component.push_str("  </div>\n</template>\n\n<script>\nexport default {\n  name: 'App'\n}\n</script>\n");
    component
}

fn streamlit_config(config: &DeploymentConfig) -> String {
    let port = if config.custom_domain.is_some() { 80 } else { 8501 };
    format!(
        "[server]\nport = {}\naddress = \"0.0.0.0\"\nenableCORS = false\nenableXsrfProtection = false\n\n[browser]\ngatherUsageStats = false\n",
        port
    )
}

fn gradio_app(code: &str) -> String {
    let mut app = String::new();
    if !code.contains("import gradio") {
        app.push_str("import gradio as gr\n\n");
    }
    app.push_str(code);
    if !code.ends_with('\n') {
        app.push('\n');
    }

    // Code that launches on its own is bound through GRADIO_SERVER_* instead
    if !code.contains(".launch(") {
        app.push_str(
            "\nif __name__ == \"__main__\":\n    demo.launch(server_name=\"0.0.0.0\", server_port=7860)\n",
        );
    }
    app
}

fn requirement_name(line: &str) -> &str {
    line.split(|c: char| matches!(c, '<' | '>' | '=' | '~' | '!' | '[' | ' '))
        .next()
        .unwrap_or(line)
}

fn requirements(fragment: &Fragment) -> String {
    let seed = match fragment.template {
        TemplateId::Streamlit => Some("streamlit>=1.28.0"),
        TemplateId::Gradio => Some("gradio>=4.0.0"),
        _ => None,
    };

    let mut lines: Vec<String> = seed.iter().map(|s| s.to_string()).collect();
    let seeded = seed.map(requirement_name);

    // `extract_dependencies` already yields a sorted set
    for dep in extract_dependencies(&fragment.code, fragment.template) {
        if seeded.is_some_and(|name| name.eq_ignore_ascii_case(&dep)) {
            continue;
        }
        lines.push(dep);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn dockerfile(template: TemplateId, config: &DeploymentConfig) -> String {
    let port = template.internal_port();
    match template {
        TemplateId::Nextjs | TemplateId::Vue => format!(
            "FROM node:{}-alpine\n\nWORKDIR /app\n\nCOPY package*.json ./\nRUN npm install\n\nCOPY . .\nRUN npm run build\n\nENV PORT={port}\nEXPOSE {port}\n\nCMD [\"npm\", \"start\"]\n",
            node_major(config)
        ),
        TemplateId::Streamlit => python_dockerfile(
            port,
            "",
            "CMD [\"streamlit\", \"run\", \"app.py\", \"--server.port=8501\", \"--server.address=0.0.0.0\"]",
        ),
        TemplateId::Gradio => python_dockerfile(
            port,
            "ENV GRADIO_SERVER_NAME=0.0.0.0\nENV GRADIO_SERVER_PORT=7860\n",
            "CMD [\"python\", \"app.py\"]",
        ),
        TemplateId::CodeInterpreter => {
            python_dockerfile(port, "", "CMD [\"python\", \"main.py\"]")
        }
    }
}

fn python_dockerfile(port: u16, env: &str, cmd: &str) -> String {
    format!(
        "FROM python:{}-slim\n\nWORKDIR /app\n\nCOPY requirements.txt .\nRUN pip install -r requirements.txt\n\nCOPY . .\n\n{}EXPOSE {}\n\n{}\n",
        PYTHON_VERSION, env, port, cmd
    )
}

fn env_file(config: &DeploymentConfig) -> String {
    config
        .environment_variables
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}
