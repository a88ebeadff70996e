//! Dependency extraction and registry availability checks

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use deploy_models::{Language, TemplateId};
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::EngineError;

pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";
pub const DEFAULT_PYPI_REGISTRY: &str = "https://pypi.org";

static JS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:type\s+)?(?:[\w*\s{},$]+\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("valid import regex")
});

static JS_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:require|import)\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid require regex")
});

static PY_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Python modules shipped with the interpreter
const PYTHON_STDLIB: &[&str] = &[
    "__future__", "abc", "argparse", "array", "ast", "asyncio", "base64", "binascii",
    "bisect", "builtins", "bz2", "calendar", "cmath", "collections", "colorsys",
    "concurrent", "configparser", "contextlib", "copy", "csv", "ctypes", "dataclasses",
    "datetime", "decimal", "difflib", "email", "enum", "errno", "fnmatch", "fractions",
    "functools", "gc", "getpass", "glob", "gzip", "hashlib", "heapq", "hmac", "html",
    "http", "importlib", "inspect", "io", "ipaddress", "itertools", "json", "logging",
    "lzma", "math", "mimetypes", "multiprocessing", "numbers", "operator", "os",
    "pathlib", "pickle", "platform", "pprint", "queue", "random", "re", "secrets",
    "select", "shlex", "shutil", "signal", "socket", "sqlite3", "ssl", "stat",
    "statistics", "string", "struct", "subprocess", "sys", "tempfile", "textwrap",
    "threading", "time", "timeit", "tkinter", "traceback", "types", "typing",
    "unicodedata", "unittest", "urllib", "uuid", "warnings", "weakref", "xml",
    "zipfile", "zlib", "zoneinfo",
];

/// Import names whose distribution is published under another name
const PYTHON_DISTRIBUTIONS: &[(&str, &str)] = &[
    ("PIL", "Pillow"),
    ("attr", "attrs"),
    ("bs4", "beautifulsoup4"),
    ("cv2", "opencv-python"),
    ("dateutil", "python-dateutil"),
    ("docx", "python-docx"),
    ("dotenv", "python-dotenv"),
    ("google", "google-api-python-client"),
    ("skimage", "scikit-image"),
    ("sklearn", "scikit-learn"),
    ("yaml", "PyYAML"),
];

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "events",
    "fs", "http", "http2", "https", "net", "os", "path", "perf_hooks", "process",
    "querystring", "readline", "stream", "string_decoder", "timers", "tls", "tty",
    "url", "util", "v8", "vm", "worker_threads", "zlib",
];

/// Extract the third-party packages `code` imports
pub fn extract_dependencies(code: &str, template: TemplateId) -> BTreeSet<String> {
    match template.language() {
        Language::Python => extract_python(code),
        Language::Javascript => extract_javascript(code),
    }
}

fn extract_python(code: &str) -> BTreeSet<String> {
    let mut modules = Vec::new();

    for line in code.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("import ") {
            for item in rest.split(',') {
                if let Some(name) = item.split_whitespace().next() {
                    modules.push(name);
                }
            }
        } else if let Some(rest) = line.strip_prefix("from ") {
            if let Some(name) = rest.split_whitespace().next() {
                modules.push(name);
            }
        }
    }

    modules
        .into_iter()
        .filter(|m| !m.starts_with('.'))
        .filter_map(|m| m.split('.').next())
        .filter(|top| PY_IDENT.is_match(top) && !PYTHON_STDLIB.contains(top))
        .map(python_distribution)
        .collect()
}

fn python_distribution(module: &str) -> String {
    PYTHON_DISTRIBUTIONS
        .iter()
        .find(|(import, _)| *import == module)
        .map(|(_, dist)| dist.to_string())
        .unwrap_or_else(|| module.to_string())
}

fn extract_javascript(code: &str) -> BTreeSet<String> {
    JS_IMPORT
        .captures_iter(code)
        .chain(JS_CALL.captures_iter(code))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| npm_package_name(m.as_str()))
        .collect()
}

/// Package name of an import specifier, `None` for local or built-in modules
fn npm_package_name(specifier: &str) -> Option<String> {
    if specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with("node:")
        || specifier.contains("://")
    {
        return None;
    }

    let mut parts = specifier.split('/');
    let name = if specifier.starts_with('@') {
        let scope = parts.next()?;
        let package = parts.next()?;
        format!("{}/{}", scope, package)
    } else {
        parts.next()?.to_string()
    };

    if name.is_empty() || NODE_BUILTINS.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}

/// Public package registry lookups
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// Whether `package` is published for `language`
    async fn exists(&self, language: Language, package: &str) -> Result<bool, EngineError>;
}

/// npm / PyPI lookups over HTTP
pub struct HttpPackageIndex {
    client: Client,
    npm_url: String,
    pypi_url: String,
}

impl HttpPackageIndex {
    pub fn new(npm_url: &str, pypi_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            npm_url: npm_url.trim_end_matches('/').to_string(),
            pypi_url: pypi_url.trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, language: Language, package: &str) -> String {
        match language {
            Language::Javascript => {
                format!("{}/{}", self.npm_url, package.replace('/', "%2F"))
            }
            Language::Python => format!("{}/pypi/{}/json", self.pypi_url, package),
        }
    }
}

#[async_trait]
impl PackageIndex for HttpPackageIndex {
    async fn exists(&self, language: Language, package: &str) -> Result<bool, EngineError> {
        let url = self.lookup_url(language, package);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

/// Registry name used in error messages
pub fn registry_name(language: Language) -> &'static str {
    match language {
        Language::Javascript => "npm",
        Language::Python => "PyPI",
    }
}

/// Checks that every dependency of a fragment can be installed
pub struct DependencyResolver {
    index: Arc<dyn PackageIndex>,
}

impl DependencyResolver {
    pub fn new(index: Arc<dyn PackageIndex>) -> Self {
        Self { index }
    }

    /// One lookup per dependency, in order; the first missing one aborts
    pub async fn validate_availability(
        &self,
        deps: &BTreeSet<String>,
        template: TemplateId,
    ) -> Result<(), EngineError> {
        let language = template.language();

        for dep in deps {
            let available = match self.index.exists(language, dep).await {
                Ok(available) => available,
                Err(e) => {
                    warn!("Registry lookup for {} failed: {}", dep, e);
                    false
                }
            };

            if !available {
                return Err(EngineError::Dependency {
                    package: dep.clone(),
                    registry: registry_name(language).to_string(),
                });
            }
        }

        Ok(())
    }
}
