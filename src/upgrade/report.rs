use super::registry::UpgradeAction;
use crate::core::BuildVersion;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Human-readable identity of the record, usually its path.
    pub item: String,
    pub status: ItemStatus,
}

/// Per-record outcomes of one action.
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub version: BuildVersion,
    pub name: &'static str,
    pub outcomes: Vec<ItemOutcome>,
}

impl ActionReport {
    pub fn new(action: &UpgradeAction) -> Self {
        Self {
            version: action.version,
            name: action.name,
            outcomes: Vec::new(),
        }
    }

    pub fn done(&mut self, item: impl Into<String>) {
        self.push(item, ItemStatus::Done);
    }

    pub fn skipped(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.push(item, ItemStatus::Skipped(reason.into()));
    }

    pub fn failed(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.push(item, ItemStatus::Failed(reason.into()));
    }

    fn push(&mut self, item: impl Into<String>, status: ItemStatus) {
        self.outcomes.push(ItemOutcome {
            item: item.into(),
            status,
        });
    }

    pub fn done_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Done))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            ItemStatus::Failed(reason) => Some((o.item.as_str(), reason.as_str())),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Result of a whole upgrade run.
#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub from: BuildVersion,
    pub to: BuildVersion,
    pub actions: Vec<ActionReport>,
}

impl UpgradeReport {
    pub fn new(from: BuildVersion, to: BuildVersion) -> Self {
        Self {
            from,
            to,
            actions: Vec::new(),
        }
    }

    /// Tags of the actions that ran, in execution order.
    pub fn versions_run(&self) -> Vec<BuildVersion> {
        self.actions.iter().map(|a| a.version).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.actions.iter().map(ActionReport::failed_count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}

impl fmt::Display for UpgradeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Upgrade {} -> {}", self.from, self.to)?;
        if self.actions.is_empty() {
            return writeln!(f, "  no upgrade actions needed");
        }
        for action in &self.actions {
            writeln!(
                f,
                "  {:<18} done={} skipped={} failed={}",
                action.name,
                action.done_count(),
                action.skipped_count(),
                action.failed_count()
            )?;
            for (item, reason) in action.failures() {
                writeln!(f, "    ! {}: {}", item, reason)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ActionReport {
        ActionReport {
            version: BuildVersion(21000),
            name: "upgrade_to_21000",
            outcomes: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let mut action = report();
        action.done("/projects/tutorial/");
        action.failed("/fr/tutorial/a.po", "no such file");
        action.skipped("/fr/tutorial/b.po", "no cached value");
        action.done("/fr/tutorial/c.po");

        assert_eq!(action.done_count(), 2);
        assert_eq!(action.failed_count(), 1);
        assert_eq!(action.skipped_count(), 1);
        assert_eq!(
            action.failures().collect::<Vec<_>>(),
            vec![("/fr/tutorial/a.po", "no such file")]
        );
    }

    #[test]
    fn test_display_lists_failures() {
        let mut action = report();
        action.failed("/fr/tutorial/a.po", "no such file");
        let mut upgrade = UpgradeReport::new(BuildVersion(20030), BuildVersion(21000));
        upgrade.actions.push(action);

        let text = upgrade.to_string();
        assert!(text.contains("Upgrade 20030 -> 21000"));
        assert!(text.contains("! /fr/tutorial/a.po: no such file"));
        assert!(!upgrade.is_clean());
    }
}
