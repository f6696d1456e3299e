use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::lexicon::{LEXICON, SHARE_OVERRIDE_BONUS, SHARE_OVERRIDE_KEYWORD};
use crate::models::Intent;

const MAX_FORWARDED_CHARS: usize = 1000;

/// Positive per-intent scores for one input. Iteration follows the intent
/// priority order, which is what breaks ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntentScores(BTreeMap<Intent, u32>);

impl IntentScores {
    pub fn get(&self, intent: Intent) -> u32 {
        self.0.get(&intent).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Intent, u32)> + '_ {
        self.0.iter().map(|(intent, score)| (*intent, *score))
    }

    /// Highest score wins; on a tie the higher-priority intent is kept.
    pub fn best(&self) -> Intent {
        let mut best: Option<(Intent, u32)> = None;
        for (intent, score) in self.iter() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((intent, score)),
            }
        }
        best.map(|(intent, _)| intent).unwrap_or(Intent::Other)
    }

    fn add(&mut self, intent: Intent, amount: u32) {
        *self.0.entry(intent).or_insert(0) += amount;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub scores: IntentScores,
}

pub fn normalize_text(input: &str) -> String {
    input.to_lowercase()
}

pub fn score_intents(text: &str) -> IntentScores {
    let normalized = normalize_text(text);
    let mut scores = IntentScores::default();

    for group in &LEXICON {
        let score = group.score(&normalized);
        if score > 0 {
            scores.add(group.intent, score);
        }
    }

    if normalized.contains(SHARE_OVERRIDE_KEYWORD) {
        scores.add(Intent::SharePlan, SHARE_OVERRIDE_BONUS);
    }

    scores
}

pub fn classify_detailed(text: &str) -> Classification {
    let scores = score_intents(text);
    let intent = scores.best();
    debug!(scores = ?scores, intent = %intent, "intent classified");
    Classification { intent, scores }
}

pub fn classify_intent(text: &str) -> Intent {
    classify_detailed(text).intent
}

/// Strips characters that would break the `;`-separated tool grammars and
/// caps the length of text forwarded to the agent.
pub fn sanitize_input(text: &str) -> String {
    text.chars()
        .filter(|ch| !matches!(ch, ';' | '"' | '\'' | '\n'))
        .take(MAX_FORWARDED_CHARS)
        .collect()
}
