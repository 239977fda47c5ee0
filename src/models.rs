use serde::Deserialize;

use crate::catalog::QuestionKind;

/// Seed document loaded by `scentquiz seed`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub question_groups: Vec<SeedGroup>,
    #[serde(default)]
    pub fragrance_categories: Vec<SeedFragranceCategory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedGroup {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<SeedQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedQuestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub image_range: Option<serde_json::Value>,
    pub images_path: Option<String>,
    #[serde(default = "default_selection")]
    pub min_selection: i64,
    #[serde(default = "default_selection")]
    pub max_selection: i64,
    pub show_text_when: Option<String>,
    #[serde(default)]
    pub options: Vec<SeedOption>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOption {
    pub label: String,
    pub value: String,
    pub emoji: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFragranceCategory {
    pub id: String,
    pub name: String,
    pub english_name: String,
    pub core_trait_1: Option<String>,
    pub core_trait_2: Option<String>,
    pub intensity: Option<i64>,
    pub style_keywords: Option<String>,
    pub image_url: String,
    pub category_type: String,
}

fn default_selection() -> i64 {
    1
}
