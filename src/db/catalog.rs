use std::collections::HashMap;

use color_eyre::Result;

use super::models::{GroupRow, OptionRow, QuestionRow};
use super::Db;
use crate::catalog::{Catalog, Question, QuestionGroup, QuestionOption};
use crate::models::Seed;

impl Db {
    /// Reads every group, question and option into an indexed catalog.
    pub async fn load_catalog(&self) -> Result<Catalog> {
        let groups = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, description FROM question_groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, group_id, text, kind, image_range, images_path,
                   min_selection, max_selection, show_text_when, sort_order
            FROM questions
            ORDER BY group_id, sort_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT question_id, label, value, emoji, image, sort_order
            FROM question_options
            ORDER BY question_id, sort_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<String, Vec<QuestionOption>> = HashMap::new();
        for row in options {
            options_by_question
                .entry(row.question_id)
                .or_default()
                .push(QuestionOption {
                    label: row.label,
                    value: row.value,
                    emoji: row.emoji,
                    image: row.image,
                    sort_order: row.sort_order,
                });
        }

        let mut questions_by_group: HashMap<String, Vec<Question>> = HashMap::new();
        for row in questions {
            let image_range = match row.image_range.as_deref() {
                Some(raw) => Some(serde_json::from_str(raw)?),
                None => None,
            };
            let options = options_by_question.remove(&row.id).unwrap_or_default();
            questions_by_group
                .entry(row.group_id.clone())
                .or_default()
                .push(Question {
                    id: row.id,
                    group_id: row.group_id,
                    text: row.text,
                    kind: row.kind.parse()?,
                    image_range,
                    images_path: row.images_path,
                    min_selection: row.min_selection,
                    max_selection: row.max_selection,
                    show_text_when: row.show_text_when,
                    sort_order: row.sort_order,
                    options,
                });
        }

        let groups = groups
            .into_iter()
            .map(|row| QuestionGroup {
                questions: questions_by_group.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description,
            })
            .collect();

        Ok(Catalog::new(groups))
    }

    /// Insert or replace the seeded groups, questions, options and fragrance
    /// categories atomically in a transaction. Question order follows the
    /// order of the seed document.
    pub async fn load_seed(&self, seed: &Seed) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for group in &seed.question_groups {
            sqlx::query(
                r#"
                INSERT INTO question_groups (id, title, description) VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET title = excluded.title, description = excluded.description
                "#,
            )
            .bind(&group.id)
            .bind(&group.title)
            .bind(&group.description)
            .execute(&mut *tx)
            .await?;

            for (q_idx, question) in group.questions.iter().enumerate() {
                let image_range = question
                    .image_range
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                sqlx::query(
                    r#"
                    INSERT INTO questions (id, group_id, text, kind, image_range, images_path,
                                           min_selection, max_selection, show_text_when, sort_order)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        group_id = excluded.group_id,
                        text = excluded.text,
                        kind = excluded.kind,
                        image_range = excluded.image_range,
                        images_path = excluded.images_path,
                        min_selection = excluded.min_selection,
                        max_selection = excluded.max_selection,
                        show_text_when = excluded.show_text_when,
                        sort_order = excluded.sort_order
                    "#,
                )
                .bind(&question.id)
                .bind(&group.id)
                .bind(&question.text)
                .bind(question.kind.as_str())
                .bind(image_range)
                .bind(&question.images_path)
                .bind(question.min_selection)
                .bind(question.max_selection)
                .bind(&question.show_text_when)
                .bind(q_idx as i64)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM question_options WHERE question_id = ?")
                    .bind(&question.id)
                    .execute(&mut *tx)
                    .await?;

                for (o_idx, option) in question.options.iter().enumerate() {
                    sqlx::query(
                        r#"
                        INSERT INTO question_options (question_id, label, value, emoji, image, sort_order)
                        VALUES (?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&question.id)
                    .bind(&option.label)
                    .bind(&option.value)
                    .bind(&option.emoji)
                    .bind(&option.image)
                    .bind(o_idx as i64)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        for category in &seed.fragrance_categories {
            sqlx::query(
                r#"
                INSERT INTO fragrance_categories (id, name, english_name, core_trait_1, core_trait_2,
                                                  intensity, style_keywords, image_url, category_type)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    english_name = excluded.english_name,
                    core_trait_1 = excluded.core_trait_1,
                    core_trait_2 = excluded.core_trait_2,
                    intensity = excluded.intensity,
                    style_keywords = excluded.style_keywords,
                    image_url = excluded.image_url,
                    category_type = excluded.category_type
                "#,
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.english_name)
            .bind(&category.core_trait_1)
            .bind(&category.core_trait_2)
            .bind(&category.intensity)
            .bind(&category.style_keywords)
            .bind(&category.image_url)
            .bind(&category.category_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let question_count: usize = seed.question_groups.iter().map(|g| g.questions.len()).sum();
        tracing::info!(
            "seed loaded: groups={}, questions={question_count}, fragrance_categories={}",
            seed.question_groups.len(),
            seed.fragrance_categories.len()
        );
        Ok(())
    }
}
