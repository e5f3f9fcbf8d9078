// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::path::Path;
use serde::{Serialize, Deserialize};
use figment::{Figment, Error, providers::{Format, Json, Toml, Yaml, Env, Serialized}};

use crate::constant::ENV_PREFIX;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[allow(unused)]
#[derive(Default)]
pub struct AppConfig {
    #[serde(default)]
    pub builder: BuilderConfig,
}


#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[allow(unused)]
pub struct BuilderConfig {
    /// Image used for the agent when the NodeAgent does not name one
    #[serde(default)]
    pub default_image_name: String,
    /// Tag used for the agent image when the NodeAgent does not pin one
    #[serde(default)]
    pub default_image_tag: String,
    /// DNS suffix of the cluster, used to build in-cluster service addresses
    #[serde(default)]
    pub cluster_domain: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            default_image_name: "containers.nodeagent.dev/node-agent/agent".to_string(),
            default_image_tag: "latest".to_string(),
            cluster_domain: "cluster.local".to_string(),
        }
    }
}

pub struct AppConfigBuilder {
    figment: Figment,
}

impl AppConfigBuilder {
    pub fn with_file(&mut self, path: &str) -> &mut Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.figment = match extension {
            "json" => self.figment.clone().merge(Json::file(path)),
            "yaml" | "yml" => self.figment.clone().merge(Yaml::file(path)),
            "toml" => self.figment.clone().merge(Toml::file(path)),
            _ => self.figment.clone(),
        };
        self
    }

    pub fn with_env(&mut self) -> &mut Self {
        self.figment = self.figment.clone().merge(Env::prefixed(&format!("{}__", ENV_PREFIX)).split("__"));
        self
    }

    pub fn with_override_option(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.figment = self.figment.clone().merge(Serialized::default(key, value));
        }
        self
    }

    pub fn build(&self) -> Result<AppConfig, Error> {
        self.figment.extract()
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        AppConfigBuilder {
            figment: Figment::from(Serialized::defaults(AppConfig::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_sources() {
        let config = AppConfigBuilder::default().build().unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.builder.cluster_domain, "cluster.local");
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("operator.yaml", r#"
                builder:
                  default_image_tag: "1.2.3"
            "#)?;

            let config = AppConfigBuilder::default()
                .with_file("operator.yaml")
                .build()?;

            assert_eq!(config.builder.default_image_tag, "1.2.3");
            assert_eq!(config.builder.default_image_name, BuilderConfig::default().default_image_name);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("operator.json", r#"{"builder": {"cluster_domain": "from.file"}}"#)?;
            jail.set_env("NODE_AGENT_OPERATOR__BUILDER__CLUSTER_DOMAIN", "from.env");

            let config = AppConfigBuilder::default()
                .with_file("operator.json")
                .with_env()
                .build()?;

            assert_eq!(config.builder.cluster_domain, "from.env");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("operator.toml", "[builder]\ndefault_image_name = \"mirror.example.com/agent\"\n")?;

            let config = AppConfigBuilder::default()
                .with_file("operator.toml")
                .build()?;

            assert_eq!(config.builder.default_image_name, "mirror.example.com/agent");
            Ok(())
        });
    }

    #[test]
    fn test_unknown_extension_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file("operator.ini", "builder = nonsense")?;

            let config = AppConfigBuilder::default()
                .with_file("operator.ini")
                .build()?;

            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_override_option() {
        let config = AppConfigBuilder::default()
            .with_override_option("builder.default_image_tag", Some("nightly"))
            .with_override_option("builder.cluster_domain", None)
            .build()
            .unwrap();

        assert_eq!(config.builder.default_image_tag, "nightly");
        assert_eq!(config.builder.cluster_domain, "cluster.local");
    }
}
