use serde::{Deserialize, Serialize};

/// Per-user completion state for one training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressData {
    pub completed_lesson_ids: Vec<i64>,
    pub next_lesson_id: Option<i64>,
    pub total_lessons: u32,
    pub completed_lessons_count: u32,
}

impl ProgressData {
    /// Whole-number completion percentage; 0 for a training with no lessons.
    pub fn percent_complete(&self) -> u8 {
        if self.total_lessons == 0 {
            return 0;
        }
        let pct = (self.completed_lessons_count as f64 * 100.0) / self.total_lessons as f64;
        pct.round().min(100.0) as u8
    }

    pub fn is_lesson_complete(&self, lesson_id: i64) -> bool {
        self.completed_lesson_ids.contains(&lesson_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressCreate {
    pub lesson_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_complete_handles_empty_training() {
        let data = ProgressData {
            completed_lesson_ids: vec![],
            next_lesson_id: None,
            total_lessons: 0,
            completed_lessons_count: 0,
        };
        assert_eq!(data.percent_complete(), 0);
    }

    #[test]
    fn percent_complete_rounds() {
        let data = ProgressData {
            completed_lesson_ids: vec![1, 2],
            next_lesson_id: Some(3),
            total_lessons: 3,
            completed_lessons_count: 2,
        };
        assert_eq!(data.percent_complete(), 67);
        assert!(data.is_lesson_complete(2));
        assert!(!data.is_lesson_complete(3));
    }
}
