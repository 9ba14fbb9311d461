use super::UpgradeContext;
use super::actions;
use super::report::ActionReport;
use crate::core::{BuildVersion, Result, UpgradeError};
use std::fmt;

pub type ActionFn = fn(&UpgradeContext<'_>, &mut ActionReport) -> Result<()>;

/// A one-shot data fix-up tied to the build version that introduced it.
#[derive(Clone, Copy)]
pub struct UpgradeAction {
    pub version: BuildVersion,
    pub name: &'static str,
    pub description: &'static str,
    run: ActionFn,
}

impl fmt::Debug for UpgradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeAction")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

impl UpgradeAction {
    pub const fn new(
        version: u32,
        name: &'static str,
        description: &'static str,
        run: ActionFn,
    ) -> Self {
        Self {
            version: BuildVersion::new(version),
            name,
            description,
            run,
        }
    }

    pub fn run(&self, ctx: &UpgradeContext<'_>, report: &mut ActionReport) -> Result<()> {
        (self.run)(ctx, report)
    }
}

/// Every registered action, ascending by version.
pub static UPGRADE_ACTIONS: [UpgradeAction; 4] = [
    UpgradeAction::new(
        20030,
        "upgrade_to_20030",
        "Fixing permissions table",
        actions::upgrade_to_20030,
    ),
    UpgradeAction::new(
        21000,
        "upgrade_to_21000",
        "Creating project directories and importing translations",
        actions::upgrade_to_21000,
    ),
    UpgradeAction::new(
        21060,
        "upgrade_to_21060",
        "Flushing cached stats",
        actions::upgrade_to_21060,
    ),
    UpgradeAction::new(
        22000,
        "upgrade_to_22000",
        "Recovering store sync times",
        actions::upgrade_to_22000,
    ),
];

/// Actions tagged in `(old, new]`, ascending by version.
pub fn upgrade_functions(
    old: BuildVersion,
    new: BuildVersion,
) -> Result<Vec<&'static UpgradeAction>> {
    if old > new {
        return Err(UpgradeError::Downgrade { from: old, to: new });
    }
    let mut selected: Vec<&'static UpgradeAction> = UPGRADE_ACTIONS
        .iter()
        .filter(|action| action.version.is_between(old, new))
        .collect();
    selected.sort_by_key(|action| action.version);
    Ok(selected)
}

pub fn find_action(version: BuildVersion) -> Option<&'static UpgradeAction> {
    UPGRADE_ACTIONS.iter().find(|action| action.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(actions: &[&UpgradeAction]) -> Vec<u32> {
        actions.iter().map(|a| a.version.get()).collect()
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in UPGRADE_ACTIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        for action in &UPGRADE_ACTIONS {
            assert_eq!(action.name, format!("upgrade_to_{}", action.version));
        }
    }

    #[test]
    fn test_selects_open_closed_range() {
        let selected = upgrade_functions(BuildVersion(20000), BuildVersion(21060)).unwrap();
        assert_eq!(versions(&selected), vec![20030, 21000, 21060]);

        let selected = upgrade_functions(BuildVersion(20030), BuildVersion(22000)).unwrap();
        assert_eq!(versions(&selected), vec![21000, 21060, 22000]);
    }

    #[test]
    fn test_equal_versions_select_nothing() {
        let selected = upgrade_functions(BuildVersion(21060), BuildVersion(21060)).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_downgrade_rejected() {
        let err = upgrade_functions(BuildVersion(22000), BuildVersion(21000)).unwrap_err();
        assert!(matches!(err, UpgradeError::Downgrade { .. }));
    }

    #[test]
    fn test_find_action() {
        assert_eq!(find_action(BuildVersion(21060)).map(|a| a.name), Some("upgrade_to_21060"));
        assert!(find_action(BuildVersion(21061)).is_none());
    }
}
