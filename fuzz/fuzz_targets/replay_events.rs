#![no_main]

use issuefold_core::apply::apply;
use issuefold_core::event::Event;
use issuefold_core::replay::Replayer;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

// Input: JSON lines of events. Batch replay and a hand fold over `apply`
// must agree on success, and on the failing event when they fail.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let events: Vec<Event> = text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let mut replayer = Replayer::new();
    let batch = replayer.extend(&events).map_err(|err| err.event_id().to_string());

    let mut folded = BTreeMap::new();
    let mut fold_failure = None;
    for event in &events {
        let previous = folded.remove(&event.issue_id);
        match apply(previous.clone(), event) {
            Ok(next) => {
                folded.insert(event.issue_id.clone(), next);
            }
            Err(_) => {
                if let Some(previous) = previous {
                    folded.insert(event.issue_id.clone(), previous);
                }
                fold_failure = Some(event.id.clone());
                break;
            }
        }
    }

    match (batch, fold_failure) {
        (Ok(()), None) => assert_eq!(replayer.snapshots(), &folded),
        (Err(batch_id), Some(fold_id)) => {
            assert_eq!(batch_id, fold_id);
            assert_eq!(replayer.snapshots(), &folded);
        }
        (batch, fold) => panic!("replay {batch:?} disagrees with fold {fold:?}"),
    }
});
