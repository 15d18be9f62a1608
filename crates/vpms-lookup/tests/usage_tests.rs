//! Code reference discovery over the reference schema

use pretty_assertions::assert_eq;
use vpms_archetype::ArchetypeDescriptor;
use vpms_lookup::CodeReference;
use vpms_test_utils::archetypes::*;
use vpms_test_utils::{direct_lookup, Fixture};

fn keys(references: &[CodeReference]) -> Vec<(String, String)> {
    references
        .iter()
        .map(|r| (r.short_name().to_string(), r.node().name.clone()))
        .collect()
}

fn pair(archetype: &str, node: &str) -> (String, String) {
    (archetype.to_string(), node.to_string())
}

#[test]
fn test_target_lookup_references() {
    let fixture = Fixture::new();

    let state = fixture.finder.get_code_references(STATE).unwrap();
    assert_eq!(keys(&state), vec![pair(LOCATION, "state")]);

    let suburb = fixture.finder.get_code_references(SUBURB).unwrap();
    assert_eq!(keys(&suburb), vec![pair(LOCATION, "suburb")]);

    let breed = fixture.finder.get_code_references(BREED).unwrap();
    assert_eq!(keys(&breed), vec![pair(PATIENT, "breed")]);
}

#[test]
fn test_direct_lookup_references() {
    let fixture = Fixture::new();

    let species = fixture.finder.get_code_references(SPECIES).unwrap();
    assert_eq!(keys(&species), vec![pair(BREED, "species"), pair(PATIENT, "species")]);

    let reason = fixture.finder.get_code_references(VISIT_REASON).unwrap();
    assert_eq!(keys(&reason), vec![pair(APPOINTMENT, "reason")]);
    assert!(!reason[0].node().is_details());

    let title = fixture.finder.get_code_references(PERSON_TITLE).unwrap();
    assert_eq!(keys(&title), vec![pair(CUSTOMER, "title")]);
}

#[test]
fn test_classification_only_lookups_have_no_code_references() {
    let fixture = Fixture::new();
    for lookup in [ACCOUNT_TYPE, CONTACT_PURPOSE, PRICING_GROUP, COUNTRY] {
        assert!(
            fixture.finder.get_code_references(lookup).unwrap().is_empty(),
            "{lookup} has code references"
        );
    }
}

#[test]
fn test_family_excludes_lookup_archetypes() {
    let fixture = Fixture::new();
    let references = fixture.finder.get_code_references("lookup.*").unwrap();

    assert!(references.iter().all(|r| !r.short_name().starts_with("lookup.")));
    assert_eq!(
        keys(&references),
        vec![
            pair(APPOINTMENT, "reason"),
            pair(LOCATION, "state"),
            pair(LOCATION, "suburb"),
            pair(CUSTOMER, "title"),
            pair(PATIENT, "breed"),
            pair(PATIENT, "species"),
        ]
    );
}

#[test]
fn test_results_are_unique_per_archetype_and_path() {
    let fixture = Fixture::new();
    let references = fixture.finder.get_code_references("lookup.s*").unwrap();
    let mut seen: Vec<_> = references
        .iter()
        .map(|r| (r.short_name().to_string(), r.path().to_string()))
        .collect();
    let total = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), total);
}

#[test]
fn test_schema_change_invalidates_cached_references() {
    let fixture = Fixture::new();
    assert_eq!(fixture.finder.get_code_references(STATE).unwrap().len(), 1);

    fixture
        .archetypes
        .register(
            ArchetypeDescriptor::new("party.supplierVet", "Party")
                .with_node(direct_lookup("state", "/details/state", STATE)),
        )
        .unwrap();

    let references = fixture.finder.get_code_references(STATE).unwrap();
    assert_eq!(
        keys(&references),
        vec![pair(LOCATION, "state"), pair("party.supplierVet", "state")]
    );
}

#[test]
fn test_malformed_lookup_name_is_rejected() {
    let fixture = Fixture::new();
    let err = fixture.finder.get_code_references("lookup state").unwrap_err();
    assert!(err.is_configuration());
}
