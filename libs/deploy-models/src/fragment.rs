//! Fragment models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application stack a fragment is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemplateId {
    #[serde(rename = "nextjs-developer")]
    Nextjs,
    #[serde(rename = "vue-developer")]
    Vue,
    #[serde(rename = "streamlit-developer")]
    Streamlit,
    #[serde(rename = "gradio-developer")]
    Gradio,
    #[serde(rename = "code-interpreter-v1")]
    CodeInterpreter,
}

/// Language family of a template, which decides the package registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Python,
}

impl TemplateId {
    pub const ALL: [TemplateId; 5] = [
        TemplateId::Nextjs,
        TemplateId::Vue,
        TemplateId::Streamlit,
        TemplateId::Gradio,
        TemplateId::CodeInterpreter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Nextjs => "nextjs-developer",
            TemplateId::Vue => "vue-developer",
            TemplateId::Streamlit => "streamlit-developer",
            TemplateId::Gradio => "gradio-developer",
            TemplateId::CodeInterpreter => "code-interpreter-v1",
        }
    }

    pub fn language(&self) -> Language {
        match self {
            TemplateId::Nextjs | TemplateId::Vue => Language::Javascript,
            TemplateId::Streamlit | TemplateId::Gradio | TemplateId::CodeInterpreter => {
                Language::Python
            }
        }
    }

    /// File the fragment code ends up in
    pub fn entrypoint(&self) -> &'static str {
        match self {
            TemplateId::Nextjs => "pages/index.js",
            TemplateId::Vue => "src/App.vue",
            TemplateId::Streamlit | TemplateId::Gradio => "app.py",
            TemplateId::CodeInterpreter => "main.py",
        }
    }

    /// Port the running application listens on
    pub fn internal_port(&self) -> u16 {
        match self {
            TemplateId::Nextjs => 3000,
            TemplateId::Vue => 8080,
            TemplateId::Streamlit => 8501,
            TemplateId::Gradio => 7860,
            TemplateId::CodeInterpreter => 8000,
        }
    }

    pub fn start_command(&self) -> &'static str {
        match self {
            TemplateId::Nextjs => "npm start",
            TemplateId::Vue => "npm run serve",
            TemplateId::Streamlit => {
                "streamlit run app.py --server.port=$PORT --server.address=0.0.0.0"
            }
            TemplateId::Gradio => "python app.py",
            TemplateId::CodeInterpreter => "python main.py",
        }
    }

    /// Framework slug understood by Vercel's project settings
    pub fn vercel_framework(&self) -> &'static str {
        match self {
            TemplateId::Nextjs => "nextjs",
            TemplateId::Vue => "vue",
            _ => "other",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown template: {}", s))
    }
}

/// A generated code artifact handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub template: TemplateId,

    #[serde(default)]
    pub code: String,

    /// Additional files shipped alongside the code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
}

impl Fragment {
    pub fn new(title: impl Into<String>, template: TemplateId, code: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            template,
            code: code.into(),
            files: BTreeMap::new(),
        }
    }

    /// Key under which deployments of this fragment are grouped
    pub fn history_key(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}
