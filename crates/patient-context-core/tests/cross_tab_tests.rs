//! Cross-tab synchronization tests.

use patient_context_core::models::{RouteState, StorageEvent};
use patient_context_core::{ContextResolver, CrossTabSynchronizer, OriginStorage};

fn slot_values(resolver: &ContextResolver) -> Vec<Option<String>> {
    resolver
        .slots()
        .iter()
        .map(|name| resolver.store().read_slot(name))
        .collect()
}

#[test]
fn test_external_change_adopted_and_remirrored() {
    let origin = OriginStorage::in_memory();
    let mut this_tab = ContextResolver::with_defaults(origin.open_tab());
    let sync = CrossTabSynchronizer::attach(this_tab.store());
    this_tab.select_patient("old-id");

    // Another tab touches only the primary slot
    let other = origin.open_tab();
    other.write_slot("activePatientId", "\"new-id\"");

    assert_eq!(sync.pump(&mut this_tab), 1);
    assert_eq!(this_tab.active().unwrap().as_str(), "new-id");
    assert_eq!(slot_values(&this_tab), vec![Some("\"new-id\"".to_string()); 4]);
}

#[test]
fn test_last_write_wins() {
    let origin = OriginStorage::in_memory();
    let mut this_tab = ContextResolver::with_defaults(origin.open_tab());
    let sync = CrossTabSynchronizer::attach(this_tab.store());

    let other = origin.open_tab();
    other.write_slot("patientId", "\"first\"");
    other.write_slot("selectedPatientId", "\"second\"");

    assert_eq!(sync.pump(&mut this_tab), 2);
    assert_eq!(this_tab.active().unwrap().as_str(), "second");
    assert_eq!(slot_values(&this_tab), vec![Some("\"second\"".to_string()); 4]);
}

#[test]
fn test_three_tabs_converge() {
    let origin = OriginStorage::in_memory();
    let mut tabs: Vec<ContextResolver> = (0..3)
        .map(|_| ContextResolver::with_defaults(origin.open_tab()))
        .collect();
    let syncs: Vec<CrossTabSynchronizer> = tabs
        .iter()
        .map(|tab| CrossTabSynchronizer::attach(tab.store()))
        .collect();

    tabs[1].on_navigation(&RouteState::ready().with_param("id", "p-42"));

    // Pump until quiet
    for _ in 0..3 {
        for (tab, sync) in tabs.iter_mut().zip(&syncs) {
            sync.pump(tab);
        }
    }

    for tab in &tabs {
        assert_eq!(tab.active().unwrap().as_str(), "p-42");
    }
}

#[test]
fn test_same_tab_writes_do_not_loop_back() {
    let origin = OriginStorage::in_memory();
    let mut tab = ContextResolver::with_defaults(origin.open_tab());
    let sync = CrossTabSynchronizer::attach(tab.store());

    tab.select_patient("p-1");
    tab.select_patient("p-2");

    assert_eq!(sync.pump(&mut tab), 0);
    assert_eq!(tab.active().unwrap().as_str(), "p-2");
}

#[test]
fn test_cleared_in_other_tab_keeps_context() {
    let origin = OriginStorage::in_memory();
    let mut this_tab = ContextResolver::with_defaults(origin.open_tab());
    let sync = CrossTabSynchronizer::attach(this_tab.store());
    this_tab.select_patient("p-1");

    let mut other = ContextResolver::with_defaults(origin.open_tab());
    other.clear();

    assert_eq!(sync.pump(&mut this_tab), 0);
    assert_eq!(this_tab.active().unwrap().as_str(), "p-1");
}

#[test]
fn test_handle_event_while_unresolved() {
    let origin = OriginStorage::in_memory();
    let mut tab = ContextResolver::with_defaults(origin.open_tab());

    let event = StorageEvent::set("currentPatientId", "\"from-elsewhere\"");
    assert!(CrossTabSynchronizer::handle_event(&mut tab, &event));
    assert_eq!(tab.active().unwrap().as_str(), "from-elsewhere");
}

#[test]
fn test_competing_selections_settle_on_last_write() {
    let origin = OriginStorage::in_memory();
    let mut tab_a = ContextResolver::with_defaults(origin.open_tab());
    let mut tab_b = ContextResolver::with_defaults(origin.open_tab());
    let sync_a = CrossTabSynchronizer::attach(tab_a.store());
    let sync_b = CrossTabSynchronizer::attach(tab_b.store());

    // Both pick before either hears from the other
    tab_a.select_patient("p1");
    tab_b.select_patient("p2");

    let mut settled = false;
    for _ in 0..10 {
        let changed_a = sync_a.pump(&mut tab_a);
        let changed_b = sync_b.pump(&mut tab_b);
        if changed_a == 0 && changed_b == 0 {
            settled = true;
            break;
        }
    }

    assert!(settled, "tabs kept exchanging events");
    assert_eq!(tab_a.active().unwrap().as_str(), "p2");
    assert_eq!(tab_b.active().unwrap().as_str(), "p2");
    assert_eq!(slot_values(&tab_a), vec![Some("\"p2\"".to_string()); 4]);
}
