//! Built-in word pairs and question tiers.
//!
//! Hosts can override both through the rules JSON; these are the pools used
//! when nothing else is supplied.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Undercover word pair. Agents get the majority word, spies the minority one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub majority: String,
    pub minority: String,
}

impl WordPair {
    pub fn new(majority: &str, minority: &str) -> Self {
        Self {
            majority: majority.to_string(),
            minority: minority.to_string(),
        }
    }
}

const WORD_PAIRS: &[(&str, &str)] = &[
    ("Coffee", "Tea"),
    ("Cat", "Dog"),
    ("Pizza", "Burger"),
    ("Beach", "Pool"),
    ("Guitar", "Violin"),
    ("Train", "Bus"),
    ("Pencil", "Pen"),
    ("Moon", "Sun"),
    ("Butter", "Cheese"),
    ("Doctor", "Nurse"),
    ("Winter", "Autumn"),
    ("Football", "Rugby"),
];

pub fn default_word_pairs() -> Vec<WordPair> {
    WORD_PAIRS
        .iter()
        .map(|(majority, minority)| WordPair::new(majority, minority))
        .collect()
}

/// Question difficulty tier, chosen from the number of living players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Broad,
    Medium,
    Narrow,
}

impl Tier {
    /// Big groups get broad questions so answers can still collide.
    pub fn for_players(alive: usize) -> Self {
        if alive >= 10 {
            Tier::Broad
        } else if alive >= 5 {
            Tier::Medium
        } else {
            Tier::Narrow
        }
    }
}

/// Odd One In question pool, one list per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPool {
    pub broad: Vec<String>,
    pub medium: Vec<String>,
    pub narrow: Vec<String>,
}

impl QuestionPool {
    pub fn tier(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Broad => &self.broad,
            Tier::Medium => &self.medium,
            Tier::Narrow => &self.narrow,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        for tier in [Tier::Broad, Tier::Medium, Tier::Narrow] {
            if self.tier(tier).iter().all(|q| q.trim().is_empty()) {
                return Err(EngineError::validation(format!("{tier:?} question tier is empty")));
            }
        }
        Ok(())
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_questions() -> QuestionPool {
    QuestionPool {
        broad: owned(&[
            "Name a fruit",
            "Name an animal",
            "Name a colour",
            "Name something you find in a kitchen",
            "Name a sport",
            "Name a country",
        ]),
        medium: owned(&[
            "Name a yellow fruit",
            "Name a pet that is not a cat or a dog",
            "Name a breakfast food",
            "Name a board game",
            "Name a musical instrument with strings",
            "Name a superhero",
        ]),
        narrow: owned(&[
            "Name a planet",
            "Name a day of the week",
            "Name a primary colour",
            "Name a season",
            "Name a chess piece",
            "Name an ocean",
        ]),
    }
}
