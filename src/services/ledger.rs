//! 成绩账本
//!
//! 只追加的有序记录表，序号从 1 开始且连续

use chrono::Local;

use crate::models::{GradedStudent, SectionScores};

#[derive(Debug, Default)]
pub struct ResultsLedger {
    records: Vec<GradedStudent>,
}

impl ResultsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录，序号 = 当前长度 + 1
    pub fn append(&mut self, scores: SectionScores, source: impl Into<String>) -> GradedStudent {
        let record = GradedStudent {
            id: self.next_id(),
            scores,
            source: source.into(),
            graded_at: Local::now(),
        };
        self.records.push(record.clone());
        record
    }

    pub fn list(&self) -> &[GradedStudent] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 清空记录，下一条记录的序号回到 1
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn next_id(&self) -> u32 {
        self.records.len() as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(total: f64) -> SectionScores {
        SectionScores {
            multiple_choice_score: total,
            complex_multiple_choice_score: 0.0,
            essay_score: 0.0,
            total_score: total,
        }
    }

    #[test]
    fn test_ids_are_dense() {
        let mut ledger = ResultsLedger::new();
        for expected in 1..=5u32 {
            let before = ledger.len();
            let record = ledger.append(scores(expected as f64), format!("s{}.jpg", expected));
            assert_eq!(record.id as usize, before + 1);
            assert_eq!(record.id, expected);
        }
        let ids: Vec<u32> = ledger.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut ledger = ResultsLedger::new();
        ledger.append(scores(1.0), "a.jpg");
        ledger.append(scores(2.0), "b.jpg");

        ledger.clear();
        assert!(ledger.list().is_empty());
        assert!(ledger.is_empty());

        let record = ledger.append(scores(3.0), "c.jpg");
        assert_eq!(record.id, 1);
    }
}
