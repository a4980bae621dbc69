//! The word bank judges pick from.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Thematic group of a word. Candidates are spread across groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beasts,
    Rituals,
    Artifacts,
    Guilds,
    Illusions,
    Parables,
    /// Words loaded from configuration.
    Custom,
}

/// How hard a word is to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circle {
    Novice,
    Adept,
    Master,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub word: String,
    pub category: Category,
    pub circle: Circle,
}

/// A pool of drawable words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBank {
    entries: Vec<Entry>,
}

const STANDARD: &[(Category, Circle, &[&str])] = &[
    (Category::Beasts, Circle::Novice, &["cat", "fish", "snail", "owl", "frog", "horse"]),
    (Category::Beasts, Circle::Adept, &["octopus", "peacock", "hedgehog", "flamingo"]),
    (Category::Beasts, Circle::Master, &["chameleon", "platypus", "sea horse"]),
    (Category::Rituals, Circle::Novice, &["birthday", "wedding", "picnic", "dance"]),
    (Category::Rituals, Circle::Adept, &["fireworks", "graduation", "toast", "parade"]),
    (Category::Rituals, Circle::Master, &["seance", "coronation", "handshake"]),
    (Category::Artifacts, Circle::Novice, &["apple", "key", "lamp", "clock", "chair"]),
    (Category::Artifacts, Circle::Adept, &["compass", "lantern", "umbrella", "telescope"]),
    (Category::Artifacts, Circle::Master, &["hourglass", "crystal ball", "sundial"]),
    (Category::Guilds, Circle::Novice, &["pirate", "chef", "king", "doctor"]),
    (Category::Guilds, Circle::Adept, &["astronaut", "blacksmith", "detective", "juggler"]),
    (Category::Guilds, Circle::Master, &["alchemist", "ventriloquist", "cartographer"]),
    (Category::Illusions, Circle::Novice, &["ghost", "rainbow", "shadow", "mirror"]),
    (Category::Illusions, Circle::Adept, &["mirage", "reflection", "magic trick"]),
    (Category::Illusions, Circle::Master, &["optical illusion", "deja vu", "hallucination"]),
    (Category::Parables, Circle::Novice, &["tortoise", "golden egg", "beanstalk"]),
    (Category::Parables, Circle::Adept, &["trojan horse", "glass slipper", "pied piper"]),
    (Category::Parables, Circle::Master, &["sword in the stone", "pandoras box"]),
];

impl WordBank {
    /// The built-in bank.
    pub fn standard() -> Self {
        let entries = STANDARD
            .iter()
            .flat_map(|(category, circle, words)| {
                words.iter().map(move |w| Entry {
                    word: (*w).to_string(),
                    category: *category,
                    circle: *circle,
                })
            })
            .collect();
        Self { entries }
    }

    /// A bank from a plain word list. Blank and duplicate words are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let entries = words
            .into_iter()
            .filter_map(|w| {
                let word = w.as_ref().trim().to_lowercase();
                (!word.is_empty() && seen.insert(word.clone())).then_some(Entry {
                    word,
                    category: Category::Custom,
                    circle: Circle::Adept,
                })
            })
            .collect();
        Self { entries }
    }

    /// Keeps only the words of one circle.
    pub fn restricted_to(&self, circle: Circle) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.circle == circle)
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Draws up to `count` distinct words.
    ///
    /// Each word comes from a different category while unused categories
    /// remain; after that any unused word is taken. Returns fewer than
    /// `count` only when the bank has fewer distinct words.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<String> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.shuffle(rng);

        let mut picked: Vec<String> = Vec::with_capacity(count);
        let mut used_categories = HashSet::new();
        for &i in &order {
            if picked.len() == count {
                return picked;
            }
            let entry = &self.entries[i];
            if used_categories.insert(entry.category) && !picked.contains(&entry.word) {
                picked.push(entry.word.clone());
            }
        }
        for &i in &order {
            if picked.len() == count {
                break;
            }
            let word = &self.entries[i].word;
            if !picked.contains(word) {
                picked.push(word.clone());
            }
        }
        picked
    }
}

impl Default for WordBank {
    fn default() -> Self {
        Self::standard()
    }
}
