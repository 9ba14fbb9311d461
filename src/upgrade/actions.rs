//! Post-upgrade actions, one per build version that needed a data fix-up.

use super::UpgradeContext;
use super::report::ActionReport;
use crate::cache::cache_key;
use crate::core::{Result, Store};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde_json::Value;

/// Cached accessors of a translation project that go stale once it holds
/// obsolete units.
pub const STALE_STATS_KEYS: [&str; 4] = [
    "getquickstats",
    "getcompletestats",
    "get_mtime",
    "has_suggestions",
];

/// Permissions used to hang off a content type named `pootle`; they now
/// belong to the directory model.
pub fn upgrade_to_20030(ctx: &UpgradeContext<'_>, report: &mut ActionReport) -> Result<()> {
    info!("Fixing permissions table");

    let (mut content_type, _created) = ctx
        .records
        .get_or_create_content_type("pootle_app", "directory")?;

    for mut permission in ctx.records.permissions_by_content_type_name("pootle")? {
        permission.content_type_id = content_type.id;
        match ctx.records.save_permission(&permission) {
            Ok(()) => report.done(&permission.codename),
            Err(e) => {
                info!(
                    "Something broke while upgrading permission {}:\n{}",
                    permission.codename, e
                );
                report.failed(&permission.codename, e.to_string());
            }
        }
    }

    content_type.name = "pootle".to_string();
    ctx.records.save_content_type(&content_type)?;
    Ok(())
}

/// Projects gain directories, stores gain translation projects, and every
/// store gets parsed into the database.
pub fn upgrade_to_21000(ctx: &UpgradeContext<'_>, report: &mut ActionReport) -> Result<()> {
    info!("Creating project directories");

    ctx.records.root_get_or_make_subdir("projects")?;
    for mut project in ctx.records.projects()? {
        // saving makes the project pick up its directory
        match ctx.records.save_project(&mut project) {
            Ok(()) => report.done(format!("project {}", project.code)),
            Err(e) => {
                info!("Something broke while upgrading {}:\n{}", project, e);
                report.failed(format!("project {}", project.code), e.to_string());
            }
        }
    }

    info!("Associating stores with translation projects");

    for mut store in ctx.records.stores()? {
        let associated = ctx
            .records
            .directory_translation_project(store.parent_id)
            .and_then(|tp| {
                store.translation_project_id = Some(tp.id);
                ctx.records.save_store(&store)
            });
        match associated {
            Ok(()) => report.done(&store.pootle_path),
            Err(e) => {
                info!("Something broke while upgrading {}:\n{}", store.pootle_path, e);
                report.failed(&store.pootle_path, e.to_string());
            }
        }
    }

    info!("Importing translations into the database. This can take a while");

    for store in ctx.records.stores()? {
        parse_store(ctx, &store, report);
        import_suggestions(ctx, &store, report);
    }

    info!("All translations are now imported");
    Ok(())
}

fn parse_store(ctx: &UpgradeContext<'_>, store: &Store, report: &mut ActionReport) {
    debug!("Importing strings from {}", store.real_path);
    let parsed = ctx
        .store_files
        .require_units(store)
        .and_then(|()| ctx.store_files.quick_stats(store));
    match parsed {
        Ok(stats) => {
            debug!("Imported strings ({}) from {}", stats.total, store.real_path);
            report.done(format!("parse {}", store.real_path));
        }
        Err(e) => {
            debug!("Failed to import strings from {}: {}", store.real_path, e);
            report.failed(format!("parse {}", store.real_path), e.to_string());
        }
    }
}

fn import_suggestions(ctx: &UpgradeContext<'_>, store: &Store, report: &mut ActionReport) {
    debug!("Importing suggestions for {} (if any)", store.real_path);
    let files = ctx.store_files;
    let imported = files.import_pending(store).and_then(|()| {
        match files.has_suggestions(store) {
            Ok(false) => Ok(0),
            Ok(true) | Err(_) => files.suggestion_count(store),
        }
    });
    match imported {
        Ok(count) => {
            if count > 0 {
                debug!("Imported suggestions ({}) from {}", count, store.real_path);
            }
            report.done(format!("suggestions {}", store.real_path));
        }
        Err(e) => {
            debug!("Failed to import suggestions from {}: {}", store.real_path, e);
            report.failed(format!("suggestions {}", store.real_path), e.to_string());
        }
    }
}

/// Stats cached before obsolete units were excluded from them are wrong.
pub fn upgrade_to_21060(ctx: &UpgradeContext<'_>, report: &mut ActionReport) -> Result<()> {
    info!("Flushing cached stats");

    for tp in ctx.records.translation_projects_with_obsolete_units()? {
        let keys: Vec<String> = STALE_STATS_KEYS
            .iter()
            .map(|name| cache_key(&tp.pootle_path, name))
            .collect();
        match ctx.cache.delete_many(&keys) {
            Ok(()) => report.done(&tp.pootle_path),
            Err(e) => {
                info!("Something broke while flushing stats for {}:\n{}", tp.pootle_path, e);
                report.failed(&tp.pootle_path, e.to_string());
            }
        }
    }
    Ok(())
}

/// Sync times used to live only in the cache; keep whatever is still there.
pub fn upgrade_to_22000(ctx: &UpgradeContext<'_>, report: &mut ActionReport) -> Result<()> {
    info!("Recovering store sync times");

    for mut store in ctx.records.stores()? {
        let key = cache_key(&store.pootle_path, "sync");
        let cached = match ctx.cache.get(&key) {
            Ok(cached) => cached,
            Err(e) => {
                debug!("Failed to read {} from cache: {}", key, e);
                report.failed(&store.pootle_path, e.to_string());
                continue;
            }
        };
        let last_sync = match cached.as_ref().map(parse_sync_time) {
            None | Some(Ok(None)) => {
                report.skipped(&store.pootle_path, "no cached sync time");
                continue;
            }
            Some(Err(reason)) => {
                debug!("Ignoring cached sync time for {}: {}", store.pootle_path, reason);
                report.skipped(&store.pootle_path, reason);
                continue;
            }
            Some(Ok(Some(last_sync))) => last_sync,
        };

        store.sync_time = Some(last_sync);
        match ctx.records.save_store(&store) {
            Ok(()) => report.done(&store.pootle_path),
            Err(e) => {
                info!("Something broke while upgrading {}:\n{}", store.pootle_path, e);
                report.failed(&store.pootle_path, e.to_string());
            }
        }
    }
    Ok(())
}

/// `Ok(None)` for falsy cache values, `Err` for values that are set but not
/// a timestamp.
fn parse_sync_time(value: &Value) -> std::result::Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| format!("unparsable sync time {:?}: {}", s, e)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(None),
            Some(secs) => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| format!("sync time {} out of range", secs)),
            None => Err(format!("unparsable sync time {}", n)),
        },
        other => Err(format!("unexpected cached sync time {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sync_time_falsy() {
        assert_eq!(parse_sync_time(&json!(null)), Ok(None));
        assert_eq!(parse_sync_time(&json!(false)), Ok(None));
        assert_eq!(parse_sync_time(&json!("")), Ok(None));
        assert_eq!(parse_sync_time(&json!(0)), Ok(None));
    }

    #[test]
    fn test_parse_sync_time_values() {
        let expected = DateTime::parse_from_rfc3339("2011-07-04T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_sync_time(&json!("2011-07-04T12:30:00+00:00")), Ok(Some(expected)));
        assert_eq!(parse_sync_time(&json!(expected.timestamp())), Ok(Some(expected)));
        assert!(parse_sync_time(&json!("yesterday")).is_err());
        assert!(parse_sync_time(&json!([1, 2])).is_err());
    }
}
