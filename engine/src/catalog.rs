//! Provider catalog
//!
//! Static capability data for every provider the engine has a driver for.
//! Built once at startup and shared read-only between deployments.

use deploy_models::{
    BuildSettings, DeploymentProvider, PaidPlan, Pricing, ProviderKind, TemplateId,
};

const MB: u64 = 1024 * 1024;
const MINUTE_MS: u64 = 60 * 1000;

/// Read-only registry of deployment providers
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: Vec<DeploymentProvider>,
}

impl ProviderCatalog {
    pub fn new(providers: Vec<DeploymentProvider>) -> Self {
        Self { providers }
    }

    /// Catalog of the built-in providers
    pub fn builtin() -> Self {
        Self::new(vec![vercel(), netlify(), railway(), render(), fly_io()])
    }

    pub fn get(&self, id: &str) -> Option<&DeploymentProvider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[DeploymentProvider] {
        &self.providers
    }

    /// Providers able to host `template`
    pub fn supporting(&self, template: TemplateId) -> Vec<&DeploymentProvider> {
        self.providers.iter().filter(|p| p.supports(template)).collect()
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn plan(name: &str, price: u32, features: &[&str]) -> PaidPlan {
    PaidPlan {
        name: name.to_string(),
        price,
        features: strings(features),
    }
}

const WEB_TEMPLATES: [TemplateId; 3] = [TemplateId::Nextjs, TemplateId::Vue, TemplateId::Streamlit];

const CONTAINER_TEMPLATES: [TemplateId; 5] = TemplateId::ALL;

fn vercel() -> DeploymentProvider {
    DeploymentProvider {
        id: "vercel".to_string(),
        name: "Vercel".to_string(),
        kind: ProviderKind::Serverless,
        supported_templates: WEB_TEMPLATES.to_vec(),
        features: strings(&[
            "Zero-config deployments",
            "Automatic HTTPS",
            "Global CDN",
            "Serverless functions",
            "Preview deployments",
            "Custom domains",
            "Environment variables",
            "Build optimization",
            "Real-time collaboration",
            "Git integration",
        ]),
        pricing: Pricing {
            free: true,
            paid_plans: vec![
                plan("Pro", 20, &["Custom domains", "Team collaboration", "Analytics", "Password protection"]),
                plan("Enterprise", 150, &["Advanced security", "SAML SSO", "Priority support", "SLA guarantee"]),
            ],
        },
        regions: strings(&["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"]),
        build_settings: BuildSettings {
            supported_node_versions: strings(&["18.x", "20.x", "22.x"]),
            supported_frameworks: strings(&["next.js", "react", "vue", "svelte", "nuxt"]),
            max_build_time_ms: 45 * MINUTE_MS,
            max_deployment_size: 250 * MB,
        },
    }
}

fn netlify() -> DeploymentProvider {
    DeploymentProvider {
        id: "netlify".to_string(),
        name: "Netlify".to_string(),
        kind: ProviderKind::Static,
        supported_templates: WEB_TEMPLATES.to_vec(),
        features: strings(&[
            "Continuous deployment",
            "Form handling",
            "Identity management",
            "Edge functions",
            "Split testing",
            "Analytics",
            "Large media",
            "Build hooks",
        ]),
        pricing: Pricing {
            free: true,
            paid_plans: vec![
                plan("Pro", 19, &["Form submissions", "Identity", "Analytics", "Split testing"]),
                plan("Business", 99, &["Role-based access", "Audit log", "SAML SSO", "Advanced security"]),
            ],
        },
        regions: strings(&["us-east-1", "us-west-2", "eu-west-1"]),
        build_settings: BuildSettings {
            supported_node_versions: strings(&["16.x", "18.x", "20.x"]),
            supported_frameworks: strings(&["react", "vue", "angular", "gatsby", "hugo"]),
            max_build_time_ms: 30 * MINUTE_MS,
            max_deployment_size: 200 * MB,
        },
    }
}

fn railway() -> DeploymentProvider {
    DeploymentProvider {
        id: "railway".to_string(),
        name: "Railway".to_string(),
        kind: ProviderKind::Container,
        supported_templates: CONTAINER_TEMPLATES.to_vec(),
        features: strings(&[
            "Docker deployments",
            "Database hosting",
            "Environment variables",
            "Custom domains",
            "GitHub integration",
            "Metrics & logs",
            "Rollback support",
            "Team collaboration",
        ]),
        pricing: Pricing {
            free: true,
            paid_plans: vec![
                plan("Developer", 10, &["Unlimited projects", "Custom domains", "Priority support"]),
                plan("Team", 50, &["Team collaboration", "Advanced metrics", "Resource scaling"]),
            ],
        },
        regions: strings(&["us-west-1", "eu-west-1"]),
        build_settings: BuildSettings {
            supported_node_versions: strings(&["16.x", "18.x", "20.x"]),
            supported_frameworks: strings(&["any"]),
            max_build_time_ms: 60 * MINUTE_MS,
            max_deployment_size: 500 * MB,
        },
    }
}

fn render() -> DeploymentProvider {
    DeploymentProvider {
        id: "render".to_string(),
        name: "Render".to_string(),
        kind: ProviderKind::Container,
        supported_templates: CONTAINER_TEMPLATES.to_vec(),
        features: strings(&[
            "Auto-deploy from Git",
            "Custom domains",
            "Free SSL",
            "Database hosting",
            "Static sites",
            "Background jobs",
            "Health checks",
            "Rollback support",
        ]),
        pricing: Pricing {
            free: true,
            paid_plans: vec![
                plan("Starter", 7, &["Always on", "Custom domains", "SSL certificates"]),
                plan("Standard", 25, &["Faster builds", "Priority support", "Advanced metrics"]),
            ],
        },
        regions: strings(&["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"]),
        build_settings: BuildSettings {
            supported_node_versions: strings(&["16.x", "18.x", "20.x"]),
            supported_frameworks: strings(&["any"]),
            max_build_time_ms: 45 * MINUTE_MS,
            max_deployment_size: 300 * MB,
        },
    }
}

fn fly_io() -> DeploymentProvider {
    DeploymentProvider {
        id: "fly-io".to_string(),
        name: "Fly.io".to_string(),
        kind: ProviderKind::Container,
        supported_templates: CONTAINER_TEMPLATES.to_vec(),
        features: strings(&[
            "Global edge deployment",
            "Docker support",
            "Database hosting",
            "Custom domains",
            "Load balancing",
            "Health checks",
            "Volume storage",
            "Secrets management",
        ]),
        pricing: Pricing {
            free: true,
            paid_plans: vec![plan("Pay as you go", 0, &["Resource usage", "Data transfer", "Storage"])],
        },
        regions: strings(&["global"]),
        build_settings: BuildSettings {
            supported_node_versions: strings(&["16.x", "18.x", "20.x"]),
            supported_frameworks: strings(&["any"]),
            max_build_time_ms: 45 * MINUTE_MS,
            max_deployment_size: 512 * MB,
        },
    }
}
