//! Tag-based reconciliation of hook registrations in `settings.json`.
//!
//! The settings file is shared state owned by the user and the host tool;
//! autopilot owns only the entries carrying its `_tag` marker. Every
//! operation here is scoped by that marker: merging replaces our own
//! entries and never touches foreign ones, removal strips exactly the
//! tagged entries, and unknown fields at every level of the document ride
//! along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{AutopilotError, FailOpen, Result};
use crate::manifest::{HookRegistration, TAG};
use crate::util::read_to_string_limited;

/// The whole settings.json document. Only the `hooks` key is interpreted;
/// everything else is carried through verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One matcher group under an event: a tool-name matcher plus the hooks
/// that fire for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatcherGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One hook entry. Foreign entries may omit any of these fields; absent
/// fields stay absent on re-serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HookEntry {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<serde_json::Number>,
    #[serde(rename = "_tag", skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    pub run_async: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookEntry {
    /// Whether this entry carries the autopilot ownership marker.
    pub fn is_ours(&self) -> bool {
        self.tag.as_deref() == Some(TAG)
    }

    fn command_contains(&self, needle: &str) -> bool {
        self.command.as_deref().is_some_and(|c| c.contains(needle))
    }
}

/// A foreign entry that points at one of our guard slugs. Usually a stale
/// registration from a previous distribution of the same hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub event: String,
    pub command: String,
}

/// Build the settings entry for a registration.
pub fn build_hook_entry(reg: &HookRegistration, exe: &Path) -> HookEntry {
    HookEntry {
        kind: Some("command".to_string()),
        command: Some(reg.command(exe)),
        timeout: Some(serde_json::Number::from(reg.timeout)),
        tag: Some(TAG.to_string()),
        run_async: reg.run_async.then_some(true),
        extra: Map::new(),
    }
}

/// Parse the groups under one event. `None` when the event is absent or
/// its value has an unexpected shape; a malformed event is left alone
/// rather than rewritten.
fn event_groups(doc: &SettingsDocument, event: &str) -> Option<Vec<MatcherGroup>> {
    let value = doc.hooks.as_ref()?.get(event)?;
    serde_json::from_value(value.clone()).ok()
}

fn set_event_groups(doc: &mut SettingsDocument, event: &str, groups: Vec<MatcherGroup>) {
    let hooks = doc.hooks.get_or_insert_with(Map::new);
    // Serializing Vec<MatcherGroup> cannot fail: every field is a plain
    // JSON shape. Degrade to an empty array rather than panic.
    let value = serde_json::to_value(groups).unwrap_or_else(|_| Value::Array(Vec::new()));
    hooks.insert(event.to_string(), value);
}

/// Merge registrations into the document.
///
/// For each registration: find or create the matcher group for its event,
/// drop any previously tagged entry for the same guard (the command may
/// have moved with the binary), and append the fresh entry. Foreign
/// entries in the same group are never touched. Applying the same
/// registrations twice yields the same document.
pub fn merge(doc: &mut SettingsDocument, regs: &[HookRegistration], exe: &Path) {
    for reg in regs {
        let event = reg.event.as_str();
        let mut groups = match event_groups(doc, event) {
            Some(groups) => groups,
            None if doc
                .hooks
                .as_ref()
                .is_some_and(|h| h.contains_key(event)) =>
            {
                tracing::warn!("settings event {event} has an unexpected shape, skipping");
                continue;
            }
            None => Vec::new(),
        };

        let wanted_matcher = reg.matcher.map(str::to_string);
        let pos = groups
            .iter()
            .position(|g| g.matcher == wanted_matcher)
            .unwrap_or_else(|| {
                groups.push(MatcherGroup {
                    matcher: wanted_matcher,
                    hooks: Vec::new(),
                    extra: Map::new(),
                });
                groups.len() - 1
            });
        let group = &mut groups[pos];

        let slug = reg.guard.slug();
        group
            .hooks
            .retain(|entry| !(entry.is_ours() && entry.command_contains(slug)));
        group.hooks.push(build_hook_entry(reg, exe));

        set_event_groups(doc, event, groups);
    }
}

/// Remove every tagged entry from the document, pruning groups and events
/// that end up empty. Foreign entries and malformed events are untouched.
/// Returns the number of entries removed.
pub fn remove_all(doc: &mut SettingsDocument) -> usize {
    prune_matching(doc, |entry| entry.is_ours())
}

/// Destructively remove foreign entries that collide with a registration's
/// guard slug, keeping tagged entries. Each registration only prunes its
/// own event; a colliding command under some other event is left alone.
/// Returns the number of entries removed.
pub fn deduplicate(doc: &mut SettingsDocument, regs: &[HookRegistration]) -> usize {
    let mut removed = 0;
    for reg in regs {
        let slug = reg.guard.slug();
        removed += prune_event_matching(doc, reg.event.as_str(), |entry| {
            !entry.is_ours() && entry.command_contains(slug)
        });
    }
    removed
}

fn prune_matching(doc: &mut SettingsDocument, remove: impl Fn(&HookEntry) -> bool) -> usize {
    let Some(hooks) = doc.hooks.as_ref() else {
        return 0;
    };
    let events: Vec<String> = hooks.keys().cloned().collect();
    events
        .iter()
        .map(|event| prune_event_matching(doc, event, &remove))
        .sum()
}

fn prune_event_matching(
    doc: &mut SettingsDocument,
    event: &str,
    remove: impl Fn(&HookEntry) -> bool,
) -> usize {
    let Some(mut groups) = event_groups(doc, event) else {
        return 0;
    };
    let mut removed = 0;
    for group in &mut groups {
        let before = group.hooks.len();
        group.hooks.retain(|entry| !remove(entry));
        removed += before - group.hooks.len();
    }
    groups.retain(|group| !group.hooks.is_empty());

    if groups.is_empty() {
        if let Some(hooks) = doc.hooks.as_mut() {
            hooks.remove(event);
        }
    } else {
        set_event_groups(doc, event, groups);
    }

    if doc.hooks.as_ref().is_some_and(Map::is_empty) {
        doc.hooks = None;
    }
    removed
}

/// Find foreign entries whose command mentions a registration's guard
/// slug, scoped to that registration's event. Non-destructive; install
/// surfaces these as warnings before offering de-duplication.
pub fn detect_conflicts(doc: &SettingsDocument, regs: &[HookRegistration]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for reg in regs {
        let event = reg.event.as_str();
        let Some(groups) = event_groups(doc, event) else {
            continue;
        };
        let slug = reg.guard.slug();
        for group in &groups {
            for entry in &group.hooks {
                if !entry.is_ours() && entry.command_contains(slug) {
                    conflicts.push(Conflict {
                        event: event.to_string(),
                        command: entry.command.clone().unwrap_or_default(),
                    });
                }
            }
        }
    }
    conflicts
}

/// Whether a tagged entry for this registration's guard is present.
pub fn is_installed(doc: &SettingsDocument, reg: &HookRegistration) -> bool {
    let Some(groups) = event_groups(doc, reg.event.as_str()) else {
        return false;
    };
    let slug = reg.guard.slug();
    groups
        .iter()
        .flat_map(|g| &g.hooks)
        .any(|entry| entry.is_ours() && entry.command_contains(slug))
}

/// Read and parse the settings document.
///
/// A missing file yields an empty document. An unreadable or unparsable
/// file also yields an empty document, with a warning; install always
/// writes a backup before mutating, so nothing is silently lost.
pub fn read_settings(path: &Path) -> SettingsDocument {
    if !path.exists() {
        return SettingsDocument::default();
    }
    read_to_string_limited(path)
        .and_then(|content| serde_json::from_str(&content).map_err(AutopilotError::from))
        .fail_open_default(&format!("reading {}", path.display()))
}

/// Write the settings document atomically: serialize pretty with a
/// trailing newline, write to a sibling temp file, rename into place.
pub fn write_settings(path: &Path, doc: &SettingsDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AutopilotError::storage(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(doc)?;
    content.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| AutopilotError::storage(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| AutopilotError::storage(path, e))?;
    Ok(())
}

/// Copy the current settings file to the backup path, if it exists.
pub fn backup_settings(path: &Path, backup: &Path) -> Result<()> {
    if path.exists() {
        fs::copy(path, backup).map_err(|e| AutopilotError::storage(backup, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{CORE_REGISTRATIONS, GuardKind, all_registrations};
    use proptest::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn exe() -> PathBuf {
        PathBuf::from("/opt/autopilot/bin/autopilot")
    }

    fn parse(json: &str) -> SettingsDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_merge_into_empty_document() {
        let mut doc = SettingsDocument::default();
        merge(&mut doc, &CORE_REGISTRATIONS, &exe());

        let hooks = doc.hooks.as_ref().unwrap();
        assert_eq!(hooks.len(), 3);
        assert!(is_installed(&doc, &CORE_REGISTRATIONS[0]));
        assert!(is_installed(&doc, &CORE_REGISTRATIONS[1]));
        assert!(is_installed(&doc, &CORE_REGISTRATIONS[2]));
    }

    #[test]
    fn test_merge_entry_shape() {
        let mut doc = SettingsDocument::default();
        merge(&mut doc, &CORE_REGISTRATIONS[..1], &exe());

        let value = serde_json::to_value(&doc).unwrap();
        let entry = &value["hooks"]["PreToolUse"][0]["hooks"][0];
        assert_eq!(entry["type"], "command");
        assert_eq!(
            entry["command"],
            "/opt/autopilot/bin/autopilot hook autopilot-approver"
        );
        assert_eq!(entry["timeout"], 5);
        assert_eq!(entry["_tag"], TAG);
        assert!(entry.get("async").is_none());
        assert_eq!(value["hooks"]["PreToolUse"][0]["matcher"], "Write|Edit|Bash");
    }

    #[test]
    fn test_merge_async_flag() {
        let regs = all_registrations();
        let monitor = regs
            .iter()
            .find(|r| r.guard == GuardKind::ContextMonitor)
            .unwrap();
        let entry = build_hook_entry(monitor, &exe());
        assert_eq!(entry.run_async, Some(true));
    }

    #[test]
    fn test_merge_idempotent() {
        let mut doc = SettingsDocument::default();
        let regs = all_registrations();
        merge(&mut doc, &regs, &exe());
        let once = serde_json::to_string(&doc).unwrap();
        merge(&mut doc, &regs, &exe());
        let twice = serde_json::to_string(&doc).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_replaces_entry_after_binary_move() {
        let mut doc = SettingsDocument::default();
        merge(&mut doc, &CORE_REGISTRATIONS, &exe());
        merge(
            &mut doc,
            &CORE_REGISTRATIONS,
            &PathBuf::from("/usr/local/bin/autopilot"),
        );

        let groups = event_groups(&doc, "Stop").unwrap();
        let commands: Vec<&str> = groups
            .iter()
            .flat_map(|g| &g.hooks)
            .filter_map(|e| e.command.as_deref())
            .collect();
        assert_eq!(
            commands,
            vec!["/usr/local/bin/autopilot hook build-guard"]
        );
    }

    #[test]
    fn test_merge_preserves_foreign_entries_in_same_group() {
        let mut doc = parse(
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [ { "type": "command", "command": "notify-send done" } ] }
                ]
              }
            }"#,
        );
        merge(&mut doc, &CORE_REGISTRATIONS[2..3], &exe());

        let groups = event_groups(&doc, "Stop").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hooks.len(), 2);
        assert_eq!(groups[0].hooks[0].command.as_deref(), Some("notify-send done"));
        assert!(groups[0].hooks[1].is_ours());
    }

    #[test]
    fn test_merge_distinct_matcher_makes_new_group() {
        let mut doc = parse(
            r#"{
              "hooks": {
                "PreToolUse": [
                  { "matcher": "Bash", "hooks": [ { "command": "custom" } ] }
                ]
              }
            }"#,
        );
        merge(&mut doc, &CORE_REGISTRATIONS[..1], &exe());

        let groups = event_groups(&doc, "PreToolUse").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].matcher.as_deref(), Some("Bash"));
        assert_eq!(groups[1].matcher.as_deref(), Some("Write|Edit|Bash"));
    }

    #[test]
    fn test_merge_preserves_unknown_fields() {
        let mut doc = parse(
            r#"{
              "model": "opus",
              "hooks": {
                "Stop": [
                  { "hooks": [ { "command": "x", "custom": true } ], "note": "mine" }
                ]
              }
            }"#,
        );
        merge(&mut doc, &CORE_REGISTRATIONS[2..3], &exe());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["model"], "opus");
        assert_eq!(value["hooks"]["Stop"][0]["note"], "mine");
        assert_eq!(value["hooks"]["Stop"][0]["hooks"][0]["custom"], true);
    }

    #[test]
    fn test_merge_skips_malformed_event() {
        let mut doc = parse(r#"{ "hooks": { "Stop": "not an array" } }"#);
        merge(&mut doc, &CORE_REGISTRATIONS[2..3], &exe());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["hooks"]["Stop"], "not an array");
    }

    #[test]
    fn test_remove_all_strips_only_tagged() {
        let mut doc = parse(
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [ { "command": "notify-send done" } ] }
                ]
              }
            }"#,
        );
        merge(&mut doc, &all_registrations(), &exe());
        let removed = remove_all(&mut doc);
        assert_eq!(removed, 6);

        let hooks = doc.hooks.as_ref().unwrap();
        assert_eq!(hooks.len(), 1);
        let groups = event_groups(&doc, "Stop").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hooks[0].command.as_deref(), Some("notify-send done"));
    }

    #[test]
    fn test_remove_all_prunes_empty_structures() {
        let mut doc = SettingsDocument::default();
        merge(&mut doc, &all_registrations(), &exe());
        remove_all(&mut doc);
        assert!(doc.hooks.is_none());
    }

    #[test]
    fn test_remove_all_on_empty_document() {
        let mut doc = SettingsDocument::default();
        assert_eq!(remove_all(&mut doc), 0);
    }

    #[test]
    fn test_detect_conflicts_flags_stale_script_entries() {
        let doc = parse(
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [
                    { "type": "command", "command": "node /home/dev/.claude/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        );
        let conflicts = detect_conflicts(&doc, &all_registrations());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].event, "Stop");
        assert!(conflicts[0].command.contains("build-guard"));
    }

    #[test]
    fn test_detect_conflicts_ignores_tagged_and_unrelated() {
        let mut doc = parse(
            r#"{
              "hooks": {
                "Stop": [ { "hooks": [ { "command": "notify-send done" } ] } ]
              }
            }"#,
        );
        merge(&mut doc, &all_registrations(), &exe());
        assert!(detect_conflicts(&doc, &all_registrations()).is_empty());
    }

    #[test]
    fn test_deduplicate_removes_stale_keeps_ours() {
        let mut doc = parse(
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [
                    { "type": "command", "command": "node /old/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        );
        merge(&mut doc, &CORE_REGISTRATIONS, &exe());
        let removed = deduplicate(&mut doc, &CORE_REGISTRATIONS);
        assert_eq!(removed, 1);
        assert!(is_installed(&doc, &CORE_REGISTRATIONS[2]));
        assert!(detect_conflicts(&doc, &CORE_REGISTRATIONS).is_empty());
    }

    #[test]
    fn test_deduplicate_only_touches_matching_event() {
        // build-guard registers on Stop; a colliding command under
        // PreToolUse is someone else's business.
        let mut doc = parse(
            r#"{
              "hooks": {
                "PreToolUse": [
                  { "hooks": [
                    { "type": "command", "command": "node /old/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        );
        let before = serde_json::to_string(&doc).unwrap();
        assert_eq!(deduplicate(&mut doc, &CORE_REGISTRATIONS), 0);
        assert_eq!(serde_json::to_string(&doc).unwrap(), before);
    }

    #[test]
    fn test_detect_conflicts_scoped_to_matching_event() {
        let doc = parse(
            r#"{
              "hooks": {
                "PreToolUse": [
                  { "hooks": [
                    { "type": "command", "command": "node /old/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        );
        assert!(detect_conflicts(&doc, &all_registrations()).is_empty());
    }

    #[test]
    fn test_is_installed_false_on_empty() {
        let doc = SettingsDocument::default();
        assert!(!is_installed(&doc, &CORE_REGISTRATIONS[0]));
    }

    #[test]
    fn test_read_settings_missing_file() {
        let temp = TempDir::new().unwrap();
        let doc = read_settings(&temp.path().join("settings.json"));
        assert_eq!(doc, SettingsDocument::default());
    }

    #[test]
    fn test_read_settings_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let doc = read_settings(&path);
        assert_eq!(doc, SettingsDocument::default());
    }

    #[test]
    fn test_write_read_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let mut doc = parse(r#"{ "model": "opus" }"#);
        merge(&mut doc, &CORE_REGISTRATIONS, &exe());

        write_settings(&path, &doc).unwrap();
        let reread = read_settings(&path);
        assert_eq!(doc, reread);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_backup_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let backup = temp.path().join("settings.json.bak");
        fs::write(&path, "{}").unwrap();

        backup_settings(&path, &backup).unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{}");
    }

    #[test]
    fn test_backup_settings_missing_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let backup = temp.path().join("settings.json.bak");
        backup_settings(&path, &backup).unwrap();
        assert!(!backup.exists());
    }

    proptest! {
        /// Merging and then removing our registrations restores any foreign
        /// document to its original shape.
        #[test]
        fn prop_merge_then_remove_restores_foreign(
            key in "[a-z]{1,8}",
            val in "[a-zA-Z0-9 ]{0,16}",
            foreign_cmd in "[a-z/ .]{1,24}",
        ) {
            let mut doc = SettingsDocument::default();
            doc.extra.insert(key, Value::String(val));
            let mut hooks = Map::new();
            hooks.insert(
                "Stop".to_string(),
                serde_json::json!([{ "hooks": [{ "command": foreign_cmd }] }]),
            );
            doc.hooks = Some(hooks);

            // Commands containing a guard slug are conflicts, not foreign.
            prop_assume!(!GuardKind::ALL.iter().any(|g| foreign_cmd.contains(g.slug())));

            let before = serde_json::to_string(&doc).unwrap();
            merge(&mut doc, &all_registrations(), &exe());
            remove_all(&mut doc);
            let after = serde_json::to_string(&doc).unwrap();
            prop_assert_eq!(before, after);
        }

        /// Merge is idempotent for any binary location.
        #[test]
        fn prop_merge_idempotent(path in "/[a-z]{1,10}/[a-z]{1,10}") {
            let exe = PathBuf::from(path);
            let mut doc = SettingsDocument::default();
            merge(&mut doc, &all_registrations(), &exe);
            let once = serde_json::to_string(&doc).unwrap();
            merge(&mut doc, &all_registrations(), &exe);
            prop_assert_eq!(once, serde_json::to_string(&doc).unwrap());
        }
    }
}
