//! Canned replies used when the language model cannot be reached.

/// Reply table for one side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackReplies {
    pub workout: &'static str,
    pub diet: &'static str,
    pub motivation: &'static str,
    pub default: &'static str,
}

pub const SERVER_REPLIES: FallbackReplies = FallbackReplies {
    workout: "Quick workout tip: Try 10 push-ups, 15 squats, 30-sec plank. Repeat 3x! 💪 (Offline mode)",
    diet: "Quick nutrition tip: Fill half your plate with veggies, quarter with protein, quarter with complex carbs! 🥗 (Offline mode)",
    motivation: "You're already winning by asking! 🏆 Every small step counts. Keep going, champion! (Offline mode)",
    default: "I'm having trouble connecting right now. Please try again! 🤖 (Offline mode)",
};

pub const CLIENT_REPLIES: FallbackReplies = FallbackReplies {
    workout: SERVER_REPLIES.workout,
    diet: SERVER_REPLIES.diet,
    motivation: SERVER_REPLIES.motivation,
    default: "I'm in offline mode right now. Try asking about workouts, nutrition, or motivation! 🤖",
};

/// Keyword groups in priority order. The first group with a hit wins.
const WORKOUT_KEYWORDS: &[&str] = &["workout", "exercise"];
const DIET_KEYWORDS: &[&str] = &["diet", "nutrition"];
const MOTIVATION_KEYWORDS: &[&str] = &["motivation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Workout,
    Diet,
    Motivation,
    General,
}

/// Classifies a message by the first keyword group it contains.
pub fn topic(message: &str) -> Topic {
    let lower = message.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if hit(WORKOUT_KEYWORDS) {
        Topic::Workout
    } else if hit(DIET_KEYWORDS) {
        Topic::Diet
    } else if hit(MOTIVATION_KEYWORDS) {
        Topic::Motivation
    } else {
        Topic::General
    }
}

impl FallbackReplies {
    pub fn reply_for(&self, message: &str) -> &'static str {
        match topic(message) {
            Topic::Workout => self.workout,
            Topic::Diet => self.diet,
            Topic::Motivation => self.motivation,
            Topic::General => self.default,
        }
    }
}
