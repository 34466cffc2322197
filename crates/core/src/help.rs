//! Graduated help.
//!
//! A pure lookup into a sub-task's help ladder. The session owns the
//! per-sub-task counter and the event emission.

use crate::activity::{HelpLevel, SubTask};

/// The next help to dispense for a sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpStep<'a> {
    Level(&'a HelpLevel),
    /// Every level has already been dispensed.
    Exhausted,
}

/// Returns the level at `dispensed`, or `Exhausted` past the end of the ladder.
pub fn next(sub_task: &SubTask, dispensed: usize) -> HelpStep<'_> {
    sub_task
        .help_levels
        .get(dispensed)
        .map_or(HelpStep::Exhausted, HelpStep::Level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::AuthoredActivity;

    fn laddered() -> SubTask {
        let raw: AuthoredActivity = serde_json::from_value(serde_json::json!({
            "key": "fractions",
            "sub_tasks": [{
                "help_levels": [
                    { "id": "help1", "type": "hint", "content": "Think about multiples." },
                    { "id": "help2", "type": "explanation", "content": "A common denominator is a shared multiple." }
                ]
            }]
        }))
        .unwrap();
        raw.validate().sub_tasks.remove(0)
    }

    #[test]
    fn test_levels_dispensed_in_order() {
        let st = laddered();
        match next(&st, 0) {
            HelpStep::Level(level) => assert_eq!(level.id, "help1"),
            HelpStep::Exhausted => panic!("expected first level"),
        }
        match next(&st, 1) {
            HelpStep::Level(level) => {
                assert_eq!(level.id, "help2");
                assert_eq!(level.position, 1);
            }
            HelpStep::Exhausted => panic!("expected second level"),
        }
    }

    #[test]
    fn test_exhausted_forever_after_ladder_end() {
        let st = laddered();
        for dispensed in 2..10 {
            assert_eq!(next(&st, dispensed), HelpStep::Exhausted);
        }
    }

    #[test]
    fn test_empty_ladder_is_immediately_exhausted() {
        let mut st = laddered();
        st.help_levels.clear();
        assert_eq!(next(&st, 0), HelpStep::Exhausted);
    }
}
