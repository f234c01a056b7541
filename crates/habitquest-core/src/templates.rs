//! # Habit Templates
//!
//! Ready-made habits offered when adding a new one.

use crate::{Frequency, NewHabit, StatCategory};

/// A predefined habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub category: StatCategory,
    pub xp_value: u64,
    pub frequency: Frequency,
}

impl HabitTemplate {
    /// Habit fields for this template.
    #[must_use]
    pub fn new_habit(&self) -> NewHabit {
        NewHabit {
            name: self.name.to_string(),
            category: self.category,
            xp_value: self.xp_value,
            frequency: self.frequency,
        }
    }
}

pub const HABIT_TEMPLATES: &[HabitTemplate] = &[
    HabitTemplate {
        name: "Morning Exercise",
        description: "Engage in physical activity for at least 15 minutes.",
        category: StatCategory::Body,
        xp_value: 15,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Read a Book Chapter",
        description: "Read at least one chapter of a book.",
        category: StatCategory::Mind,
        xp_value: 10,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Meditate",
        description: "Practice mindfulness meditation for 5-10 minutes.",
        category: StatCategory::Wellbeing,
        xp_value: 10,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Drink Water Regularly",
        description: "Drink at least 8 glasses of water throughout the day.",
        category: StatCategory::Body,
        xp_value: 5,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Practice a Skill",
        description: "Dedicate 30 minutes to practicing a chosen skill.",
        category: StatCategory::Skill,
        xp_value: 20,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Plan Your Day",
        description: "Take 5 minutes to plan your tasks and priorities for the day.",
        category: StatCategory::Discipline,
        xp_value: 5,
        frequency: Frequency::Daily,
    },
    HabitTemplate {
        name: "Weekly Review",
        description: "Review your progress and plan for the upcoming week.",
        category: StatCategory::Discipline,
        xp_value: 25,
        frequency: Frequency::Weekly,
    },
];

/// Look up a template by name, ignoring case and surrounding whitespace.
#[must_use]
pub fn find_template(name: &str) -> Option<&'static HabitTemplate> {
    let name = name.trim();
    HABIT_TEMPLATES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let review = find_template("  weekly review ").expect("template");
        assert_eq!(review.frequency, Frequency::Weekly);
        assert_eq!(review.xp_value, 25);
        assert!(find_template("Juggle").is_none());
    }

    #[test]
    fn templates_are_valid_habits() {
        for template in HABIT_TEMPLATES {
            let habit = template.new_habit();
            assert!(habit.xp_value > 0, "{} awards no xp", template.name);
            assert_eq!(habit.name, template.name);
        }
    }
}
