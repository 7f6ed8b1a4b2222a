//! Durable consent store (§4.2, §6.4).
//!
//! Re-architected per the Design Notes as an explicit store object rather
//! than process-global mutable state. The on-disk format is an append-only
//! log of `app_id\tcapability\tdecision\ttimestamp` records; replay keeps
//! the last record per `(app_id, capability)` key, matching "latest entry
//! wins" without needing a compaction step.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::manifest::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny,
}

impl Decision {
    fn as_str(self) -> &'static str {
        match self {
            Decision::Grant => "grant",
            Decision::Deny => "deny",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "grant" => Some(Decision::Grant),
            "deny" => Some(Decision::Deny),
            _ => None,
        }
    }
}

/// Result of a [`ConsentStore::lookup`]: either a prior decision, or
/// `Unknown` meaning the prompter must be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Grant,
    Deny,
    Unknown,
}

/// An explicit consent store object, owning an in-memory index
/// write-through to a durable flat file for the lifetime of one launcher
/// invocation.
pub struct ConsentStore {
    path: PathBuf,
    index: HashMap<(String, &'static str), Decision>,
}

impl ConsentStore {
    /// Open (or create) the store at `path`, replaying existing records.
    /// A corrupted store degrades to empty per §4.2's rationale — the
    /// launcher will simply re-prompt rather than fail the launch.
    pub fn open(path: &Path) -> Self {
        let index = match File::open(path) {
            Ok(file) => replay(file).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "consent store is corrupted, treating as empty"
                );
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            index,
        }
    }

    pub fn lookup(&self, app_id: &str, capability: Capability) -> LookupResult {
        match self.index.get(&(app_id.to_string(), capability.as_str())) {
            Some(Decision::Grant) => LookupResult::Grant,
            Some(Decision::Deny) => LookupResult::Deny,
            None => LookupResult::Unknown,
        }
    }

    /// Record a decision. Durable before returning: the write is appended
    /// and `sync_all`'d, then the in-memory index is updated so subsequent
    /// `lookup` calls in this process observe it immediately.
    pub fn record(
        &mut self,
        app_id: &str,
        capability: Capability,
        decision: Decision,
    ) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = chrono::Utc::now().to_rfc3339();
        writeln!(
            file,
            "{}\t{}\t{}\t{}",
            app_id,
            capability.as_str(),
            decision.as_str(),
            timestamp
        )?;
        file.sync_all()?;

        self.index
            .insert((app_id.to_string(), capability.as_str()), decision);
        Ok(())
    }
}

fn replay(file: File) -> std::io::Result<HashMap<(String, &'static str), Decision>> {
    let mut index = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(4, '\t');
        let (Some(app_id), Some(cap_name), Some(decision_str)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(capability) = Capability::parse(cap_name) else {
            continue;
        };
        let Some(decision) = Decision::parse(decision_str) else {
            continue;
        };
        index.insert((app_id.to_string(), capability.as_str()), decision);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lookup_unknown_for_fresh_store() {
        let dir = tempdir().unwrap();
        let store = ConsentStore::open(&dir.path().join("consent.log"));
        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Unknown);
    }

    #[test]
    fn record_then_lookup_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        let mut store = ConsentStore::open(&path);
        store
            .record("a", Capability::NetClient, Decision::Grant)
            .unwrap();
        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Grant);
    }

    #[test]
    fn record_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        {
            let mut store = ConsentStore::open(&path);
            store
                .record("a", Capability::NetClient, Decision::Grant)
                .unwrap();
        }
        let store = ConsentStore::open(&path);
        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Grant);
    }

    #[test]
    fn newest_write_wins_on_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        let mut store = ConsentStore::open(&path);
        store
            .record("a", Capability::NetClient, Decision::Grant)
            .unwrap();
        store
            .record("a", Capability::NetClient, Decision::Deny)
            .unwrap();
        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Deny);

        let reopened = ConsentStore::open(&path);
        assert_eq!(reopened.lookup("a", Capability::NetClient), LookupResult::Deny);
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        let mut store = ConsentStore::open(&path);
        store
            .record("a", Capability::NetClient, Decision::Grant)
            .unwrap();
        store
            .record("b", Capability::NetClient, Decision::Deny)
            .unwrap();
        store
            .record("a", Capability::FsReadDocs, Decision::Deny)
            .unwrap();

        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Grant);
        assert_eq!(store.lookup("b", Capability::NetClient), LookupResult::Deny);
        assert_eq!(store.lookup("a", Capability::FsReadDocs), LookupResult::Deny);
    }

    #[test]
    fn corrupted_store_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        std::fs::write(&path, "not\ta\tvalid\trecord\nnet.client\n").unwrap();
        let store = ConsentStore::open(&path);
        // Garbage lines are skipped rather than failing the whole store.
        assert_eq!(store.lookup("a", Capability::NetClient), LookupResult::Unknown);
    }
}
