use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{CompositionPart, Config, StrategyKind};
use crate::domain::{ExampleTable, ExampleTableKind, QuestionExample};
use crate::text::{shorten_label, truncate_utf16};

/// Source of uniform indices. Production wraps a seeded `StdRng`; tests
/// script exact sequences.
pub trait RandomSource: Send {
    /// Index in `0..bound`. Callers never pass `bound == 0`.
    fn next_index(&mut self, bound: usize) -> usize;
}

pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn next_index(&mut self, bound: usize) -> usize {
        self.0.gen_range(0..bound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionStrategy {
    /// One random value per category, joined in composition order.
    Categorized { composition: Vec<CompositionPart> },
    /// Uniform shuffle of the curated table, first `count` rows.
    Curated,
}

impl SuggestionStrategy {
    pub fn table_kind(&self) -> ExampleTableKind {
        match self {
            SuggestionStrategy::Categorized { .. } => ExampleTableKind::Categorized,
            SuggestionStrategy::Curated => ExampleTableKind::Curated,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhraseSampler {
    strategy: SuggestionStrategy,
    count: usize,
    label_max_len: usize,
    text_max_len: usize,
}

impl PhraseSampler {
    pub fn new(
        strategy: SuggestionStrategy,
        count: usize,
        label_max_len: usize,
        text_max_len: usize,
    ) -> Self {
        Self {
            strategy,
            count,
            label_max_len,
            text_max_len,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let strategy = match config.suggestions.strategy {
            StrategyKind::Categorized => SuggestionStrategy::Categorized {
                composition: config.suggestions.composition.clone(),
            },
            StrategyKind::Curated => SuggestionStrategy::Curated,
        };
        Self::new(
            strategy,
            config.limits.suggestion_count,
            config.limits.label_max_len,
            config.limits.text_max_len,
        )
    }

    pub fn table_kind(&self) -> ExampleTableKind {
        self.strategy.table_kind()
    }

    /// An empty result means "attach no suggestions".
    pub fn sample(
        &self,
        table: &ExampleTable,
        rng: &mut dyn RandomSource,
    ) -> Vec<QuestionExample> {
        match (&self.strategy, table) {
            (SuggestionStrategy::Curated, ExampleTable::Curated(rows)) => {
                self.sample_curated(rows, rng)
            }
            (SuggestionStrategy::Categorized { composition }, ExampleTable::Categorized(_)) => {
                self.sample_categorized(composition, table, rng)
            }
            _ => {
                tracing::warn!("example table does not match suggestion strategy");
                Vec::new()
            }
        }
    }

    fn sample_curated(
        &self,
        rows: &[QuestionExample],
        rng: &mut dyn RandomSource,
    ) -> Vec<QuestionExample> {
        let mut rows: Vec<&QuestionExample> = rows.iter().filter(|q| !q.is_blank()).collect();
        shuffle(&mut rows, rng);
        rows.into_iter()
            .take(self.count)
            .map(|q| self.cap(&q.label, &q.text))
            .collect()
    }

    fn sample_categorized(
        &self,
        composition: &[CompositionPart],
        table: &ExampleTable,
        rng: &mut dyn RandomSource,
    ) -> Vec<QuestionExample> {
        let mut out = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            match compose(composition, table, rng) {
                Some(phrase) => out.push(self.cap(&phrase, &phrase)),
                None => {
                    tracing::warn!("phrase categories are incomplete, skipping suggestions");
                    return Vec::new();
                }
            }
        }
        out
    }

    fn cap(&self, label: &str, text: &str) -> QuestionExample {
        QuestionExample {
            label: shorten_label(label, self.label_max_len),
            text: truncate_utf16(text, self.text_max_len).to_string(),
        }
    }
}

/// `None` when the composition is empty or any category has no values.
fn compose(
    composition: &[CompositionPart],
    table: &ExampleTable,
    rng: &mut dyn RandomSource,
) -> Option<String> {
    if composition.is_empty() {
        return None;
    }
    let mut phrase = String::new();
    for part in composition {
        let values = &table.category(&part.category)?.values;
        if values.is_empty() {
            return None;
        }
        phrase.push_str(&values[rng.next_index(values.len())]);
        phrase.push_str(&part.suffix);
    }
    Some(phrase)
}

/// Fisher-Yates.
fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.next_index(i + 1);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::utf16_len;
    use crate::domain::PhraseCategory;
    use std::collections::{HashSet, VecDeque};

    struct Scripted(VecDeque<usize>);

    impl Scripted {
        fn new(values: &[usize]) -> Self {
            Self(values.iter().copied().collect())
        }
    }

    impl RandomSource for Scripted {
        fn next_index(&mut self, bound: usize) -> usize {
            let value = self.0.pop_front().unwrap_or(0);
            assert!(value < bound, "scripted index {value} out of 0..{bound}");
            value
        }
    }

    fn part(category: &str, suffix: &str) -> CompositionPart {
        CompositionPart {
            category: category.to_string(),
            suffix: suffix.to_string(),
        }
    }

    fn default_composition() -> Vec<CompositionPart> {
        vec![
            part("場所", "で"),
            part("動詞", ""),
            part("名詞", "の"),
            part("スタイル", ""),
        ]
    }

    fn category(name: &str, values: &[&str]) -> PhraseCategory {
        PhraseCategory {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn phrase_table() -> ExampleTable {
        ExampleTable::Categorized(vec![
            category("場所", &["海辺", "森"]),
            category("動詞", &["走る", "眠る"]),
            category("名詞", &["猫", "犬"]),
            category("スタイル", &["水彩画", "油絵"]),
        ])
    }

    fn curated(rows: &[(&str, &str)]) -> ExampleTable {
        ExampleTable::Curated(
            rows.iter()
                .map(|(label, text)| QuestionExample::new(*label, *text))
                .collect(),
        )
    }

    fn categorized_sampler(count: usize) -> PhraseSampler {
        PhraseSampler::new(
            SuggestionStrategy::Categorized {
                composition: default_composition(),
            },
            count,
            20,
            300,
        )
    }

    #[test]
    fn categorized_composes_one_value_per_category() {
        let sampler = categorized_sampler(1);
        let mut rng = Scripted::new(&[1, 0, 1, 0]);

        let out = sampler.sample(&phrase_table(), &mut rng);
        assert_eq!(out, vec![QuestionExample::new("森で走る犬の水彩画", "森で走る犬の水彩画")]);
    }

    #[test]
    fn categorized_produces_requested_count() {
        let sampler = categorized_sampler(10);
        let mut rng = RngSource(StdRng::seed_from_u64(7));

        let out = sampler.sample(&phrase_table(), &mut rng);
        assert_eq!(out.len(), 10);
        for suggestion in &out {
            let places = ["海辺", "森"];
            assert_eq!(
                places.iter().filter(|p| suggestion.text.starts_with(*p)).count(),
                1
            );
            assert!(["水彩画", "油絵"].iter().any(|s| suggestion.text.ends_with(s)));
        }
    }

    #[test]
    fn categorized_caps_label_and_text() {
        let long = "とても長い場所の名前".repeat(40);
        let table = ExampleTable::Categorized(vec![category("場所", &[long.as_str()])]);
        let sampler = PhraseSampler::new(
            SuggestionStrategy::Categorized {
                composition: vec![part("場所", "")],
            },
            3,
            20,
            300,
        );
        let mut rng = RngSource(StdRng::seed_from_u64(1));

        let out = sampler.sample(&table, &mut rng);
        assert_eq!(out.len(), 3);
        for suggestion in out {
            assert_eq!(suggestion.label.chars().count(), 20);
            assert!(suggestion.label.ends_with('…'));
            assert_eq!(suggestion.text.chars().count(), 300);
        }
    }

    #[test]
    fn categorized_with_missing_category_is_empty() {
        let table = ExampleTable::Categorized(vec![category("場所", &["海辺"])]);
        let mut rng = Scripted::new(&[]);
        assert!(categorized_sampler(3).sample(&table, &mut rng).is_empty());
    }

    #[test]
    fn categorized_with_no_data_is_empty() {
        let mut rng = Scripted::new(&[]);
        let out = categorized_sampler(3).sample(&ExampleTable::Categorized(vec![]), &mut rng);
        assert!(out.is_empty());
    }

    #[test]
    fn curated_shuffle_is_fisher_yates() {
        let table = curated(&[("a", "A"), ("b", "B"), ("c", "C")]);
        let sampler = PhraseSampler::new(SuggestionStrategy::Curated, 2, 20, 300);
        // i=2 swaps with 0 -> [c, b, a]; i=1 swaps with 0 -> [b, c, a]
        let mut rng = Scripted::new(&[0, 0]);

        let out = sampler.sample(&table, &mut rng);
        assert_eq!(
            out,
            vec![QuestionExample::new("b", "B"), QuestionExample::new("c", "C")]
        );
    }

    #[test]
    fn curated_skips_blank_rows() {
        let table = curated(&[("a", "A"), ("", ""), ("b", " "), ("c", "C")]);
        let sampler = PhraseSampler::new(SuggestionStrategy::Curated, 10, 20, 300);
        let mut rng = RngSource(StdRng::seed_from_u64(3));

        let out = sampler.sample(&table, &mut rng);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|q| q.label == "a" || q.label == "c"));
    }

    #[test]
    fn curated_size_is_min_of_count_and_rows() {
        let rows: Vec<(String, String)> = (0..15)
            .map(|i| (format!("label {i}"), format!("text {i}")))
            .collect();
        let table = ExampleTable::Curated(
            rows.iter()
                .map(|(l, t)| QuestionExample::new(l.as_str(), t.as_str()))
                .collect(),
        );

        for (count, expected) in [(0, 0), (3, 3), (15, 15), (20, 15)] {
            let sampler = PhraseSampler::new(SuggestionStrategy::Curated, count, 20, 300);
            let mut rng = RngSource(StdRng::seed_from_u64(count as u64));
            let out = sampler.sample(&table, &mut rng);
            assert_eq!(out.len(), expected);

            let unique: HashSet<_> = out.iter().collect();
            assert_eq!(unique.len(), out.len());
            for q in &out {
                assert!(rows.iter().any(|(l, t)| l == &q.label && t == &q.text));
            }
        }
    }

    #[test]
    fn curated_caps_long_fields() {
        let long_label = "x".repeat(50);
        let long_text = "y".repeat(500);
        let table = curated(&[(long_label.as_str(), long_text.as_str())]);
        let sampler = PhraseSampler::new(SuggestionStrategy::Curated, 1, 20, 300);
        let mut rng = Scripted::new(&[]);

        let out = sampler.sample(&table, &mut rng);
        assert_eq!(out[0].label.chars().count(), 20);
        assert_eq!(out[0].text.chars().count(), 300);
    }

    #[test]
    fn curated_caps_emoji_in_code_units() {
        let label = "🐱".repeat(25);
        let text = "🐶".repeat(300);
        let table = curated(&[(label.as_str(), text.as_str())]);
        let sampler = PhraseSampler::new(SuggestionStrategy::Curated, 1, 20, 300);
        let mut rng = Scripted::new(&[]);

        let out = sampler.sample(&table, &mut rng);
        assert!(utf16_len(&out[0].label) <= 20);
        assert!(out[0].label.ends_with('…'));
        assert_eq!(utf16_len(&out[0].text), 300);
        assert_eq!(out[0].text.chars().count(), 150);
    }

    #[test]
    fn mismatched_table_yields_nothing() {
        let sampler = PhraseSampler::new(SuggestionStrategy::Curated, 3, 20, 300);
        let mut rng = Scripted::new(&[]);
        assert!(sampler.sample(&phrase_table(), &mut rng).is_empty());
    }

    #[test]
    fn strategy_reports_its_table() {
        assert_eq!(
            SuggestionStrategy::Curated.table_kind(),
            ExampleTableKind::Curated
        );
        assert_eq!(categorized_sampler(1).table_kind(), ExampleTableKind::Categorized);
    }
}
