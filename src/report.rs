//! Per-item outcomes of batch operations.

use uuid::Uuid;

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded(Uuid),
    Duplicate { of: Uuid, slug: String, distance: u32 },
    NotFound,
    Error(String),
}

/// One batch item: what was asked for, and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// File path or photo id, as given.
    pub item: String,
    pub outcome: ItemOutcome,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn push(&mut self, item: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(ItemReport {
            item: item.into(),
            outcome,
        });
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Succeeded(_)))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Duplicate { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::NotFound))
    }

    pub fn errors(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Error(_)))
    }

    /// True when no item failed or went missing. Duplicates are not failures.
    pub fn is_clean(&self) -> bool {
        self.errors() == 0 && self.not_found() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_outcome() {
        let mut report = BatchReport::default();
        report.push("a.jpg", ItemOutcome::Succeeded(Uuid::new_v4()));
        report.push("b.jpg", ItemOutcome::Succeeded(Uuid::new_v4()));
        report.push(
            "c.jpg",
            ItemOutcome::Duplicate {
                of: Uuid::new_v4(),
                slug: "a".into(),
                distance: 0,
            },
        );
        report.push("d.jpg", ItemOutcome::NotFound);
        report.push("e.jpg", ItemOutcome::Error("boom".into()));

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.duplicates(), 1);
        assert_eq!(report.not_found(), 1);
        assert_eq!(report.errors(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.items[3].item, "d.jpg");
    }

    #[test]
    fn duplicates_keep_report_clean() {
        let mut report = BatchReport::default();
        report.push(
            "x.jpg",
            ItemOutcome::Duplicate {
                of: Uuid::new_v4(),
                slug: "x".into(),
                distance: 3,
            },
        );
        assert!(report.is_clean());
        assert!(BatchReport::default().is_clean());
    }
}
