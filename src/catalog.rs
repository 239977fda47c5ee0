//! In-memory question catalog.
//!
//! The catalog is read from the database once at startup and never mutated
//! while requests are served. Questions and options are indexed so that the
//! stage controller and the report builder can resolve ids in constant time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::names;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "multiple")]
    Multiple,
    #[serde(rename = "single-with-text")]
    SingleWithText,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "image-single")]
    ImageSingle,
    #[serde(rename = "image-multiple")]
    ImageMultiple,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multiple => "multiple",
            QuestionKind::SingleWithText => "single-with-text",
            QuestionKind::Text => "text",
            QuestionKind::ImageSingle => "image-single",
            QuestionKind::ImageMultiple => "image-multiple",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, QuestionKind::ImageSingle | QuestionKind::ImageMultiple)
    }

    pub fn is_multiple(self) -> bool {
        matches!(self, QuestionKind::Multiple | QuestionKind::ImageMultiple)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownQuestionKind(pub String);

impl fmt::Display for UnknownQuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown question type '{}'", self.0)
    }
}

impl std::error::Error for UnknownQuestionKind {}

impl FromStr for QuestionKind {
    type Err = UnknownQuestionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(QuestionKind::Single),
            "multiple" => Ok(QuestionKind::Multiple),
            "single-with-text" => Ok(QuestionKind::SingleWithText),
            "text" => Ok(QuestionKind::Text),
            "image-single" => Ok(QuestionKind::ImageSingle),
            "image-multiple" => Ok(QuestionKind::ImageMultiple),
            other => Err(UnknownQuestionKind(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionOption {
    pub label: String,
    pub value: String,
    pub emoji: Option<String>,
    pub image: Option<String>,
    #[serde(skip)]
    pub sort_order: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Question {
    pub id: String,
    pub group_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub image_range: Option<serde_json::Value>,
    pub images_path: Option<String>,
    pub min_selection: i64,
    pub max_selection: i64,
    pub show_text_when: Option<String>,
    #[serde(skip)]
    pub sort_order: i64,
    pub options: Vec<QuestionOption>,
}

impl Question {
    /// Questions whose options are produced per session from the scored
    /// categories instead of being read from the catalog.
    pub fn is_generated(&self) -> bool {
        self.kind.is_image() && self.images_path.is_some()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionGroup {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Default)]
pub struct Catalog {
    groups: Vec<QuestionGroup>,
    questions: HashMap<String, (usize, usize)>,
    options: HashMap<(String, String), (usize, usize, usize)>,
}

impl Catalog {
    pub fn new(mut groups: Vec<QuestionGroup>) -> Self {
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        for group in &mut groups {
            group.questions.sort_by_key(|q| q.sort_order);
            for question in &mut group.questions {
                question.options.sort_by_key(|o| o.sort_order);
            }
        }

        let mut questions = HashMap::new();
        let mut options = HashMap::new();
        for (gi, group) in groups.iter().enumerate() {
            for (qi, question) in group.questions.iter().enumerate() {
                questions.insert(question.id.clone(), (gi, qi));
                for (oi, option) in question.options.iter().enumerate() {
                    options.insert((question.id.clone(), option.value.clone()), (gi, qi, oi));
                }
            }
        }

        Self {
            groups,
            questions,
            options,
        }
    }

    pub fn groups(&self) -> &[QuestionGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&QuestionGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn stage_group(&self, stage: i64) -> Option<&QuestionGroup> {
        self.group(&names::stage_group_id(stage))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        let &(gi, qi) = self.questions.get(id)?;
        Some(&self.groups[gi].questions[qi])
    }

    pub fn option(&self, question_id: &str, value: &str) -> Option<&QuestionOption> {
        let &(gi, qi, oi) = self
            .options
            .get(&(question_id.to_string(), value.to_string()))?;
        Some(&self.groups[gi].questions[qi].options[oi])
    }

    pub fn contains_question(&self, id: &str) -> bool {
        self.questions.contains_key(id)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Every question, in group then question order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.groups.iter().flat_map(|g| g.questions.iter())
    }

    /// Catalog-wide ordering key: group position, then question position.
    pub fn position(&self, question_id: &str) -> Option<(usize, usize)> {
        self.questions.get(question_id).copied()
    }
}

/// A question as presented for a stage: either straight from the catalog or
/// with its option set generated for one session.
#[derive(Clone, Debug)]
pub enum StageQuestion {
    Static(Question),
    Generated(GeneratedQuestion),
}

#[derive(Clone, Debug)]
pub struct GeneratedQuestion {
    pub base: Question,
    pub generated_options: Vec<QuestionOption>,
}

impl GeneratedQuestion {
    pub fn base_question_id(&self) -> &str {
        &self.base.id
    }
}

impl StageQuestion {
    pub fn id(&self) -> &str {
        match self {
            StageQuestion::Static(q) => &q.id,
            StageQuestion::Generated(g) => g.base_question_id(),
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match self {
            StageQuestion::Static(q) => &q.options,
            StageQuestion::Generated(g) => &g.generated_options,
        }
    }
}

#[derive(Serialize)]
struct QuestionView<'a> {
    id: &'a str,
    group_id: &'a str,
    text: &'a str,
    #[serde(rename = "type")]
    kind: QuestionKind,
    image_range: &'a Option<serde_json::Value>,
    images_path: &'a Option<String>,
    min_selection: i64,
    max_selection: i64,
    show_text_when: &'a Option<String>,
    generated: bool,
    options: &'a [QuestionOption],
}

impl<'a> QuestionView<'a> {
    fn new(question: &'a Question, options: &'a [QuestionOption], generated: bool) -> Self {
        Self {
            id: &question.id,
            group_id: &question.group_id,
            text: &question.text,
            kind: question.kind,
            image_range: &question.image_range,
            images_path: &question.images_path,
            min_selection: question.min_selection,
            max_selection: question.max_selection,
            show_text_when: &question.show_text_when,
            generated,
            options,
        }
    }
}

impl Serialize for StageQuestion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view = match self {
            StageQuestion::Static(q) => QuestionView::new(q, &q.options, false),
            StageQuestion::Generated(g) => QuestionView::new(&g.base, &g.generated_options, true),
        };
        view.serialize(serializer)
    }
}

/// Builds the final stage for a session: image questions with a configured
/// image path get one option per scored category, everything else is served
/// as configured.
pub fn generate_final_stage(group: &QuestionGroup, main: &str, secondary: &str) -> Vec<StageQuestion> {
    group
        .questions
        .iter()
        .map(|question| match &question.images_path {
            Some(prefix) if question.is_generated() => {
                let generated_options = [main, secondary]
                    .iter()
                    .enumerate()
                    .map(|(i, category)| QuestionOption {
                        label: category.to_string(),
                        value: category.to_string(),
                        emoji: None,
                        image: Some(format!("{prefix}{category}{}", names::CATEGORY_IMAGE_EXTENSION)),
                        sort_order: i as i64,
                    })
                    .collect();
                StageQuestion::Generated(GeneratedQuestion {
                    base: question.clone(),
                    generated_options,
                })
            }
            _ => StageQuestion::Static(question.clone()),
        })
        .collect()
}
