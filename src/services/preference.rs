use serde_json::{Map, Value};

use crate::ai::{AiError, DashscopeClient, FragranceClassifier};
use crate::catalog::QuestionKind;
use crate::names;
use crate::scoring::{Preferences, ScoreCard};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ScoringStrategy {
    /// Offline keyword counting.
    #[default]
    Keyword,
    /// Remote classifier, falling back to the fixed defaults on failure.
    External,
}

/// One answered question, with option values already resolved to labels.
#[derive(Clone, Debug, PartialEq)]
pub struct AnsweredQuestion {
    pub question_id: String,
    pub question_text: String,
    pub kind: QuestionKind,
    pub choices: Vec<String>,
    pub text: Option<String>,
}

impl AnsweredQuestion {
    fn free_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Strings counted by the keyword scorer. A single choice is counted
    /// together with its free text; each choice of a multi-valued answer
    /// counts on its own.
    fn keyword_elements(&self) -> Vec<String> {
        let text = self.free_text();

        if self.choices.len() > 1 || self.kind.is_multiple() {
            let mut elements = self.choices.clone();
            elements.extend(text.map(str::to_string));
            return elements;
        }

        match (self.choices.first(), text) {
            (Some(choice), Some(text)) => vec![format!("{choice} {text}")],
            (Some(choice), None) => vec![choice.clone()],
            (None, Some(text)) => vec![text.to_string()],
            (None, None) => Vec::new(),
        }
    }

    fn answer_json(&self) -> Value {
        match self.kind {
            QuestionKind::Multiple | QuestionKind::ImageMultiple => {
                Value::from(self.choices.clone())
            }
            QuestionKind::Text | QuestionKind::SingleWithText => self
                .free_text()
                .map(str::to_string)
                .or_else(|| self.choices.first().cloned())
                .map(Value::String)
                .unwrap_or(Value::Null),
            QuestionKind::Single | QuestionKind::ImageSingle => self
                .choices
                .first()
                .cloned()
                .map(Value::String)
                .unwrap_or(Value::Null),
        }
    }
}

pub fn keyword_preferences(answers: &[AnsweredQuestion]) -> Preferences {
    let elements: Vec<String> = answers.iter().flat_map(|a| a.keyword_elements()).collect();
    let card = ScoreCard::from_elements(elements.iter().map(String::as_str));
    tracing::debug!("keyword ranking: {:?}", card.ranking());
    card.preferences()
}

/// Question text to answer map, in answer order, built from the first
/// answered questions. A repeated question text is keyed by question id.
pub fn classification_payload(answers: &[AnsweredQuestion]) -> String {
    let mut payload = Map::new();
    for answer in answers.iter().take(names::MAX_CLASSIFIED_ANSWERS) {
        let key = if payload.contains_key(&answer.question_text) {
            answer.question_id.clone()
        } else {
            answer.question_text.clone()
        };
        payload.insert(key, answer.answer_json());
    }
    Value::Object(payload).to_string()
}

// ---------------------------------------------------------------------------
// PreferenceScorer
// ---------------------------------------------------------------------------

pub struct PreferenceScorer<C: FragranceClassifier = DashscopeClient> {
    strategy: ScoringStrategy,
    classifier: C,
}

impl<C: FragranceClassifier + Clone> Clone for PreferenceScorer<C> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy,
            classifier: self.classifier.clone(),
        }
    }
}

impl<C: FragranceClassifier> PreferenceScorer<C> {
    pub fn new(strategy: ScoringStrategy, classifier: C) -> Self {
        Self {
            strategy,
            classifier,
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.strategy
    }

    /// Never fails: the external strategy degrades to the fixed defaults.
    pub async fn score(&self, answers: &[AnsweredQuestion]) -> Preferences {
        match self.strategy {
            ScoringStrategy::Keyword => keyword_preferences(answers),
            ScoringStrategy::External => {
                let payload = classification_payload(answers);
                let verdict = self.classifier.classify(&payload).await.and_then(|p| {
                    p.validate().map_err(AiError::Malformed)?;
                    Ok(p)
                });
                match verdict {
                    Ok(preferences) => preferences,
                    Err(e) => {
                        tracing::warn!("classifier unavailable, using default categories: {e}");
                        Preferences::fallback()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mockall::predicate;

    use super::*;
    use crate::ai::MockFragranceClassifier;

    fn answered(text: &str, kind: QuestionKind, choices: &[&str], free: Option<&str>) -> AnsweredQuestion {
        AnsweredQuestion {
            question_id: format!("id-{text}"),
            question_text: text.to_string(),
            kind,
            choices: choices.iter().map(|c| c.to_string()).collect(),
            text: free.map(str::to_string),
        }
    }

    fn sample_answers() -> Vec<AnsweredQuestion> {
        vec![
            answered("喜欢的花", QuestionKind::Single, &["玫瑰"], None),
            answered("喜欢的树", QuestionKind::Multiple, &["雪松", "檀香"], None),
            answered("描述一下", QuestionKind::Text, &[], Some("雨后的森林")),
        ]
    }

    // ----- keyword strategy -----

    #[test]
    fn keyword_elements_split_multiple_choices() {
        let answers = sample_answers();
        assert_eq!(answers[0].keyword_elements(), ["玫瑰"]);
        assert_eq!(answers[1].keyword_elements(), ["雪松", "檀香"]);
        assert_eq!(answers[2].keyword_elements(), ["雨后的森林"]);

        let with_text = answered("q", QuestionKind::SingleWithText, &["其他"], Some("柠檬"));
        assert_eq!(with_text.keyword_elements(), ["其他 柠檬"]);
    }

    #[test]
    fn keyword_strategy_ranks_by_count() {
        let prefs = keyword_preferences(&sample_answers());
        assert_eq!(prefs, Preferences::new("木质类", "花卉类"));
    }

    #[tokio::test]
    async fn keyword_strategy_never_calls_the_classifier() {
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify().never();

        let scorer = PreferenceScorer::new(ScoringStrategy::Keyword, mock);
        let prefs = scorer.score(&sample_answers()).await;
        assert_eq!(prefs.main, "木质类");
    }

    // ----- external strategy -----

    #[tokio::test]
    async fn external_strategy_uses_classifier_verdict() {
        let expected = classification_payload(&sample_answers());
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify()
            .with(predicate::eq(expected))
            .times(1)
            .returning(|_| Box::pin(async { Ok(Preferences::new("东方类", "美食类")) }));

        let scorer = PreferenceScorer::new(ScoringStrategy::External, mock);
        let prefs = scorer.score(&sample_answers()).await;
        assert_eq!(prefs, Preferences::new("东方类", "美食类"));
    }

    #[tokio::test]
    async fn external_failure_falls_back_to_defaults() {
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify()
            .returning(|_| Box::pin(async { Err(AiError::Malformed("timeout".to_string())) }));

        let scorer = PreferenceScorer::new(ScoringStrategy::External, mock);
        for _ in 0..3 {
            let prefs = scorer.score(&sample_answers()).await;
            assert_eq!(prefs, Preferences::new("柑橘类", "花卉类"));
        }
    }

    #[tokio::test]
    async fn repeated_category_verdict_falls_back_to_defaults() {
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify()
            .times(1)
            .returning(|_| Box::pin(async { Ok(Preferences::new("木质类", "木质类")) }));

        let scorer = PreferenceScorer::new(ScoringStrategy::External, mock);
        assert_eq!(scorer.score(&sample_answers()).await, Preferences::fallback());
    }

    #[tokio::test]
    async fn unknown_category_verdict_falls_back_to_defaults() {
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify()
            .times(1)
            .returning(|_| Box::pin(async { Ok(Preferences::new("../../etc/passwd", "不存在的调")) }));

        let scorer = PreferenceScorer::new(ScoringStrategy::External, mock);
        assert_eq!(scorer.score(&sample_answers()).await, Preferences::fallback());
    }

    #[tokio::test]
    async fn missing_credentials_fall_back_to_defaults() {
        let mut mock = MockFragranceClassifier::new();
        mock.expect_classify()
            .returning(|_| Box::pin(async { Err(AiError::NotConfigured("DASHSCOPE_API_KEY")) }));

        let scorer = PreferenceScorer::new(ScoringStrategy::External, mock);
        assert_eq!(scorer.score(&[]).await, Preferences::fallback());
    }

    // ----- payload -----

    #[test]
    fn payload_keeps_answer_order_and_shapes() {
        let payload: Value = serde_json::from_str(&classification_payload(&sample_answers())).unwrap();
        let keys: Vec<_> = payload.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["喜欢的花", "喜欢的树", "描述一下"]);
        assert_eq!(payload["喜欢的花"], "玫瑰");
        assert_eq!(payload["喜欢的树"], serde_json::json!(["雪松", "檀香"]));
        assert_eq!(payload["描述一下"], "雨后的森林");
    }

    #[test]
    fn payload_is_capped() {
        let answers: Vec<_> = (0..30)
            .map(|i| answered(&format!("问题{i}"), QuestionKind::Single, &["A"], None))
            .collect();
        let payload: Value = serde_json::from_str(&classification_payload(&answers)).unwrap();
        let object = payload.as_object().unwrap();
        assert_eq!(object.len(), names::MAX_CLASSIFIED_ANSWERS);
        assert!(object.contains_key("问题19"));
        assert!(!object.contains_key("问题20"));
    }

    #[test]
    fn payload_keeps_questions_sharing_a_text() {
        let answers = vec![
            answered("你喜欢哪种感觉", QuestionKind::Single, &["清新"], None),
            answered("你喜欢哪种感觉", QuestionKind::Single, &["温暖"], None),
        ];
        let payload: Value = serde_json::from_str(&classification_payload(&answers)).unwrap();
        let object = payload.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(payload["你喜欢哪种感觉"], "清新");
        assert_eq!(payload["id-你喜欢哪种感觉"], "温暖");
    }

    #[test]
    fn payload_cap_counts_answers_not_keys() {
        let answers: Vec<_> = (0..30)
            .map(|i| AnsweredQuestion {
                question_id: format!("q{i}"),
                ..answered("同一个问题", QuestionKind::Single, &["A"], None)
            })
            .collect();
        let payload: Value = serde_json::from_str(&classification_payload(&answers)).unwrap();
        let object = payload.as_object().unwrap();
        assert_eq!(object.len(), names::MAX_CLASSIFIED_ANSWERS);
        assert!(object.contains_key("q19"));
        assert!(!object.contains_key("q20"));
    }
}
