use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::QuestionExample;

/// Contents of an `import-examples` seed file.
///
/// ```toml
/// [[questions]]
/// label = "窓辺の猫"
/// text = "窓辺で眠る猫の水彩画"
///
/// [categories]
/// "場所" = ["海辺", "森の中"]
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ExampleSeed {
    pub questions: Vec<QuestionExample>,
    pub categories: BTreeMap<String, Vec<String>>,
}

impl ExampleSeed {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
