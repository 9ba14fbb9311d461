//! Version-gated upgrade runs.
//!
//! [`upgrade`] picks every action registered in [`registry::UPGRADE_ACTIONS`]
//! whose tag lies in `(old, new]`, runs them in ascending order and stores
//! `new` as the current build version.
//!
//! Actions are best effort: a record that cannot be migrated is logged and
//! recorded in the action's [`ActionReport`], and the loop moves on. An action
//! returning `Err` aborts the run before `new` is stored.

pub mod actions;
pub mod registry;
pub mod report;

pub use registry::{UPGRADE_ACTIONS, UpgradeAction, find_action, upgrade_functions};
pub use report::{ActionReport, ItemOutcome, ItemStatus, UpgradeReport};

use crate::core::{BuildVersion, Result, UpgradeError};
use crate::interface::{Cache, Repository, StoreFiles, VersionStore};
use crate::storage::save_pootle_version;
use tracing::{Level, event, info_span};

/// Collaborators an upgrade run reads from and writes to.
pub struct UpgradeContext<'a> {
    pub records: &'a dyn Repository,
    pub store_files: &'a dyn StoreFiles,
    pub cache: &'a dyn Cache,
    pub versions: &'a dyn VersionStore,
    pub abort_on_item_failure: bool,
}

impl<'a> UpgradeContext<'a> {
    pub fn new(
        records: &'a dyn Repository,
        store_files: &'a dyn StoreFiles,
        cache: &'a dyn Cache,
        versions: &'a dyn VersionStore,
    ) -> Self {
        Self {
            records,
            store_files,
            cache,
            versions,
            abort_on_item_failure: false,
        }
    }

    pub fn abort_on_item_failure(mut self, abort: bool) -> Self {
        self.abort_on_item_failure = abort;
        self
    }
}

/// Upgrade stored data from build `old` to build `new`.
///
/// The tag of each finished action is stored as it completes, and `new` is
/// stored once every action has run, even when `old == new`.
pub fn upgrade(
    ctx: &UpgradeContext<'_>,
    old: BuildVersion,
    new: BuildVersion,
) -> Result<UpgradeReport> {
    let selected = upgrade_functions(old, new)?;
    log::debug!(
        "Will run the following upgrade functions: {:?}",
        selected.iter().map(|a| a.name).collect::<Vec<_>>()
    );

    let mut report = UpgradeReport::new(old, new);
    for action in selected {
        let span = info_span!(
            "upgrade.action",
            version = %action.version,
            name = action.name
        );
        let _enter = span.enter();

        let mut action_report = ActionReport::new(action);
        if let Err(err) = action.run(ctx, &mut action_report) {
            event!(Level::ERROR, error = %err, "upgrade action aborted");
            return Err(err);
        }

        let failed = action_report.failed_count();
        if failed > 0 {
            event!(Level::WARN, failed, "upgrade action finished with failed items");
            if ctx.abort_on_item_failure {
                return Err(UpgradeError::ItemFailures {
                    action: action.name,
                    failed,
                });
            }
        }

        save_pootle_version(ctx.versions, action.version)?;
        event!(
            Level::INFO,
            done = action_report.done_count(),
            skipped = action_report.skipped_count(),
            "upgrade action finished"
        );
        report.actions.push(action_report);
    }

    save_pootle_version(ctx.versions, new)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::{
        InMemoryRepository, InMemoryVersionStore, POOTLE_BUILDVERSION, pootle_version,
    };

    #[test]
    fn test_noop_upgrade_still_saves_version() {
        let repo = InMemoryRepository::new();
        let cache = MemoryCache::new(8).unwrap();
        let versions = InMemoryVersionStore::new();
        let ctx = UpgradeContext::new(&repo, &repo, &cache, &versions);

        let report = upgrade(&ctx, BuildVersion(21060), BuildVersion(21060)).unwrap();
        assert!(report.actions.is_empty());
        assert_eq!(pootle_version(&versions).unwrap(), Some(BuildVersion(21060)));
        assert_eq!(
            versions.history().unwrap(),
            vec![(POOTLE_BUILDVERSION.to_string(), BuildVersion(21060))]
        );
    }

    #[test]
    fn test_downgrade_saves_nothing() {
        let repo = InMemoryRepository::new();
        let cache = MemoryCache::new(8).unwrap();
        let versions = InMemoryVersionStore::new();
        let ctx = UpgradeContext::new(&repo, &repo, &cache, &versions);

        assert!(upgrade(&ctx, BuildVersion(22000), BuildVersion(20030)).is_err());
        assert!(versions.history().unwrap().is_empty());
    }
}
