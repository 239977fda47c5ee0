//! Keyword based fragrance family scoring.
//!
//! Every answer element is matched against the families in declaration
//! order and counted under the first family with a matching keyword, or
//! under [`ScentFamily::Other`]. Families are then ranked by count, ties
//! keeping declaration order.

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScentFamily {
    Citrus,
    Floral,
    Woody,
    Oriental,
    Chypre,
    Leather,
    Fougere,
    Green,
    Aquatic,
    Gourmand,
    FruitVegetable,
    Other,
}

pub const DEFAULT_MAIN: ScentFamily = ScentFamily::Citrus;
pub const DEFAULT_SECONDARY: ScentFamily = ScentFamily::Floral;

impl ScentFamily {
    /// Priority order used for keyword matching and tie breaking.
    pub const ALL: [ScentFamily; 12] = [
        ScentFamily::Citrus,
        ScentFamily::Floral,
        ScentFamily::Woody,
        ScentFamily::Oriental,
        ScentFamily::Chypre,
        ScentFamily::Leather,
        ScentFamily::Fougere,
        ScentFamily::Green,
        ScentFamily::Aquatic,
        ScentFamily::Gourmand,
        ScentFamily::FruitVegetable,
        ScentFamily::Other,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Stored category name. Also the file stem of the family's image.
    pub fn label(self) -> &'static str {
        match self {
            ScentFamily::Citrus => "柑橘类",
            ScentFamily::Floral => "花卉类",
            ScentFamily::Woody => "木质类",
            ScentFamily::Oriental => "东方类",
            ScentFamily::Chypre => "西普类",
            ScentFamily::Leather => "皮革类",
            ScentFamily::Fougere => "馥奇类",
            ScentFamily::Green => "绿叶类",
            ScentFamily::Aquatic => "水生类",
            ScentFamily::Gourmand => "美食类",
            ScentFamily::FruitVegetable => "蔬果类",
            ScentFamily::Other => "其他",
        }
    }

    pub fn from_label(label: &str) -> Option<ScentFamily> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ScentFamily::Citrus => &["柑橘", "柠檬", "橙", "柚", "citrus", "lemon", "orange", "bergamot"],
            ScentFamily::Floral => &["花", "玫瑰", "茉莉", "薰衣草", "floral", "flower", "jasmine", "lavender"],
            ScentFamily::Woody => &["木", "檀香", "雪松", "橡木", "woody", "sandalwood", "cedar"],
            ScentFamily::Oriental => &["东", "香料", "麝香", "香草", "oriental", "spice", "musk", "vanilla"],
            ScentFamily::Chypre => &["西普", "苔藓", "橡树", "chypre", "moss"],
            ScentFamily::Leather => &["皮", "烟草", "烟", "leather", "tobacco", "smoke"],
            ScentFamily::Fougere => &["馥奇", "草", "树", "fougere", "fougère", "fern"],
            ScentFamily::Green => &["绿", "叶", "茶", "green", "leaves"],
            ScentFamily::Aquatic => &["水", "海", "雨", "aquatic", "ocean", "water", "marine"],
            ScentFamily::Gourmand => &["食", "甜", "巧", "奶", "gourmand", "chocolate", "caramel", "milk"],
            ScentFamily::FruitVegetable => &["果", "蔬", "苹果", "梨", "fruit", "vegetable", "apple"],
            ScentFamily::Other => &[],
        }
    }

    /// First family, in priority order, with a keyword contained in `text`.
    pub fn classify(text: &str) -> ScentFamily {
        let normalized = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|family| family.keywords().iter().any(|k| normalized.contains(k)))
            .unwrap_or(ScentFamily::Other)
    }
}

impl fmt::Display for ScentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two categories derived for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub main: String,
    pub secondary: String,
}

impl Preferences {
    pub fn new(main: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            secondary: secondary.into(),
        }
    }

    pub fn fallback() -> Self {
        Self::new(DEFAULT_MAIN.label(), DEFAULT_SECONDARY.label())
    }

    /// Both picks must name a known family, and they must differ.
    pub fn validate(&self) -> Result<(), String> {
        for label in [&self.main, &self.secondary] {
            if ScentFamily::from_label(label).is_none() {
                return Err(format!("unknown category '{label}'"));
            }
        }
        if self.main == self.secondary {
            return Err(format!("main and secondary are both '{}'", self.main));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScoreCard {
    counts: [u32; ScentFamily::ALL.len()],
}

impl ScoreCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a str>) -> Self {
        let mut card = Self::new();
        for element in elements {
            card.record(element);
        }
        card
    }

    pub fn record(&mut self, element: &str) -> ScentFamily {
        let family = ScentFamily::classify(element);
        self.counts[family.index()] += 1;
        family
    }

    pub fn count(&self, family: ScentFamily) -> u32 {
        self.counts[family.index()]
    }

    /// All families, highest count first; equal counts keep priority order.
    pub fn ranking(&self) -> Vec<(ScentFamily, u32)> {
        let mut ranking: Vec<_> = ScentFamily::ALL
            .into_iter()
            .map(|family| (family, self.count(family)))
            .collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        ranking
    }

    pub fn preferences(&self) -> Preferences {
        let ranking = self.ranking();
        let main = ranking[0].0;
        let nonzero = ranking.iter().filter(|(_, count)| *count > 0).count();

        let secondary = if nonzero >= 2 {
            ranking[1].0
        } else if main == DEFAULT_SECONDARY {
            DEFAULT_MAIN
        } else {
            DEFAULT_SECONDARY
        };

        Preferences::new(main.label(), secondary.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_family_wins() {
        // citrus is tested before floral
        assert_eq!(ScentFamily::classify("柠檬花"), ScentFamily::Citrus);
        assert_eq!(ScentFamily::classify("Lemon and Jasmine"), ScentFamily::Citrus);
        assert_eq!(ScentFamily::classify("雪松"), ScentFamily::Woody);
        assert_eq!(ScentFamily::classify("A"), ScentFamily::Other);
    }

    #[test]
    fn equal_counts_rank_in_priority_order() {
        let card = ScoreCard::from_elements(["雪松", "玫瑰"]);
        let ranking = card.ranking();

        assert_eq!(ranking[0], (ScentFamily::Floral, 1));
        assert_eq!(ranking[1], (ScentFamily::Woody, 1));
        assert_eq!(card.count(ScentFamily::Other), 0);
        assert_eq!(card.preferences(), Preferences::new("花卉类", "木质类"));
    }

    #[test]
    fn scoring_is_deterministic() {
        let elements = ["海风", "巧克力", "海边", "皮衣", "巧克力"];
        let first = ScoreCard::from_elements(elements).preferences();
        for _ in 0..10 {
            assert_eq!(ScoreCard::from_elements(elements).preferences(), first);
        }
        assert_eq!(first, Preferences::new("水生类", "美食类"));
    }

    #[test]
    fn single_family_falls_back_to_floral_secondary() {
        let card = ScoreCard::from_elements(["雪松", "檀香"]);
        assert_eq!(card.preferences(), Preferences::new("木质类", "花卉类"));
    }

    #[test]
    fn preferences_must_be_two_distinct_families() {
        assert!(Preferences::new("木质类", "东方类").validate().is_ok());
        assert!(Preferences::fallback().validate().is_ok());
        assert!(Preferences::new("木质类", "木质类").validate().is_err());
        assert!(Preferences::new("../../etc/passwd", "花卉类").validate().is_err());
        assert!(Preferences::new("花卉类", "不存在的调").validate().is_err());
    }

    #[test]
    fn fallback_secondary_differs_from_floral_main() {
        let card = ScoreCard::from_elements(["玫瑰"]);
        assert_eq!(card.preferences(), Preferences::new("花卉类", "柑橘类"));
    }

    #[test]
    fn empty_card_yields_documented_defaults() {
        assert_eq!(ScoreCard::new().preferences(), Preferences::fallback());
    }

    #[test]
    fn labels_round_trip() {
        for family in ScentFamily::ALL {
            assert_eq!(ScentFamily::from_label(family.label()), Some(family));
        }
    }
}
