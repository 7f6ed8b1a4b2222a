//! Consent store (§4.2) and consent prompter (§4.3).

pub mod prompter;
pub mod store;

use crate::error::LauncherError;
use crate::manifest::Capability;
use prompter::ConsentPrompter;
use store::{ConsentStore, Decision, LookupResult};

/// Resolve the granted capability set for one launch: consult the store
/// for each requested capability in manifest declaration order, prompting
/// (and recording) on the first miss. The first `deny` — whether
/// previously recorded or just answered — aborts the whole launch (§4.3).
pub fn resolve_consent(
    store: &mut ConsentStore,
    prompter: &mut dyn ConsentPrompter,
    app_id: &str,
    requested_in_order: &[Capability],
) -> Result<Vec<Capability>, LauncherError> {
    let mut granted = Vec::with_capacity(requested_in_order.len());

    for &capability in requested_in_order {
        let decision = match store.lookup(app_id, capability) {
            LookupResult::Grant => Decision::Grant,
            LookupResult::Deny => Decision::Deny,
            LookupResult::Unknown => {
                let decision = prompter.ask(app_id, capability);
                if let Err(err) = store.record(app_id, capability, decision) {
                    tracing::error!(
                        app_id,
                        capability = capability.as_str(),
                        error = %err,
                        "failed to persist consent decision"
                    );
                }
                decision
            }
        };

        match decision {
            Decision::Grant => granted.push(capability),
            Decision::Deny => {
                return Err(LauncherError::ConsentDenied {
                    app_id: app_id.to_string(),
                    capability: capability.as_str().to_string(),
                });
            }
        }
    }

    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::prompter::ScriptedPrompter;
    use tempfile::tempdir;

    #[test]
    fn no_missing_capabilities_means_no_prompt() {
        let dir = tempdir().unwrap();
        let mut store = ConsentStore::open(&dir.path().join("consent.log"));
        let mut prompter = ScriptedPrompter::new([]);
        let granted = resolve_consent(&mut store, &mut prompter, "a", &[]).unwrap();
        assert!(granted.is_empty());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn allow_then_allow_grants_both_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        let mut store = ConsentStore::open(&path);
        let mut prompter = ScriptedPrompter::new([Decision::Grant]);
        let granted =
            resolve_consent(&mut store, &mut prompter, "a", &[Capability::NetClient]).unwrap();
        assert_eq!(granted, vec![Capability::NetClient]);

        // Second invocation: no prompt, same answer (S3).
        let mut store2 = ConsentStore::open(&path);
        let mut prompter2 = ScriptedPrompter::new([]);
        let granted2 =
            resolve_consent(&mut store2, &mut prompter2, "a", &[Capability::NetClient]).unwrap();
        assert_eq!(granted2, vec![Capability::NetClient]);
        assert!(prompter2.asked.is_empty());
    }

    #[test]
    fn first_deny_aborts_and_skips_remaining_prompts() {
        let dir = tempdir().unwrap();
        let mut store = ConsentStore::open(&dir.path().join("consent.log"));
        let mut prompter = ScriptedPrompter::new([Decision::Grant, Decision::Deny]);
        let err = resolve_consent(
            &mut store,
            &mut prompter,
            "a",
            &[Capability::NetClient, Capability::FsReadDocs],
        )
        .unwrap_err();
        assert!(matches!(err, LauncherError::ConsentDenied { .. }));
        // Both prompts were asked (first Allow, second Deny); no third.
        assert_eq!(prompter.asked.len(), 2);
    }

    #[test]
    fn previously_denied_capability_aborts_without_reprompting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("consent.log");
        {
            let mut store = ConsentStore::open(&path);
            store
                .record("a", Capability::NetClient, Decision::Deny)
                .unwrap();
        }
        let mut store = ConsentStore::open(&path);
        let mut prompter = ScriptedPrompter::new([]);
        let err =
            resolve_consent(&mut store, &mut prompter, "a", &[Capability::NetClient]).unwrap_err();
        assert!(matches!(err, LauncherError::ConsentDenied { .. }));
        assert!(prompter.asked.is_empty());
    }
}
