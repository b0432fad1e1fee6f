//! JSON schema for blockstate and block model files.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum BlockstateJson {
    Variants { variants: HashMap<String, VariantEntry> },
    Multipart { multipart: Vec<MultipartCase> },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum VariantEntry {
    Single(ModelRef),
    Weighted(Vec<ModelRef>),
}

impl VariantEntry {
    pub fn options(&self) -> &[ModelRef] {
        match self {
            VariantEntry::Single(m) => std::slice::from_ref(m),
            VariantEntry::Weighted(v) => v,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ModelRef {
    pub model: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub uvlock: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Deserialize, Debug, Clone)]
pub struct MultipartCase {
    pub when: Option<WhenClause>,
    pub apply: VariantEntry,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum WhenClause {
    Or { #[serde(rename = "OR")] or: Vec<HashMap<String, String>> },
    And { #[serde(rename = "AND")] and: Vec<HashMap<String, String>> },
    Simple(HashMap<String, String>),
}

impl WhenClause {
    /// Matches vanilla's clause semantics: a simple clause's comma-joined
    /// value list (`east=true|false`) is itself an OR; AND/OR group whole
    /// clauses, each of which is matched as a simple clause.
    pub fn matches(&self, props: &BTreeMap<&str, &str>) -> bool {
        match self {
            WhenClause::Simple(m) => matches_map(props, m),
            WhenClause::Or { or } => or.iter().any(|m| matches_map(props, m)),
            WhenClause::And { and } => and.iter().all(|m| matches_map(props, m)),
        }
    }
}

fn matches_map(props: &BTreeMap<&str, &str>, clause: &HashMap<String, String>) -> bool {
    clause.iter().all(|(k, v)| match_any(props, k, v))
}

fn match_any(props: &BTreeMap<&str, &str>, key: &str, expected: &str) -> bool {
    let actual = match props.get(key) {
        Some(v) => *v,
        None => return false,
    };
    expected.split('|').any(|alt| alt == actual)
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlockModelJson {
    pub parent: Option<String>,
    #[serde(default)]
    pub textures: HashMap<String, String>,
    pub elements: Option<Vec<ElementJson>>,
    #[serde(default = "default_ao")]
    pub ambientocclusion: bool,
}

fn default_ao() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
pub struct ElementJson {
    pub from: [f64; 3],
    pub to: [f64; 3],
    pub rotation: Option<RotationJson>,
    pub faces: HashMap<String, FaceJson>,
    #[serde(default = "default_ao")]
    pub shade: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RotationJson {
    pub origin: [f64; 3],
    pub axis: String,
    pub angle: f64,
    #[serde(default)]
    pub rescale: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FaceJson {
    pub uv: Option<[f64; 4]>,
    pub texture: String,
    pub cullface: Option<String>,
    #[serde(default)]
    pub rotation: i32,
    pub tintindex: Option<i32>,
}
