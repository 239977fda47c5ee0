use color_eyre::Result;

use super::models::FragranceCategory;
use super::Db;

impl Db {
    pub async fn fragrance_categories_by_type(
        &self,
        category_type: &str,
    ) -> Result<Vec<FragranceCategory>> {
        let categories = sqlx::query_as::<_, FragranceCategory>(
            r#"
            SELECT id, name, english_name, core_trait_1, core_trait_2, intensity,
                   style_keywords, image_url, category_type
            FROM fragrance_categories
            WHERE category_type = ?
            ORDER BY id
            "#,
        )
        .bind(category_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
