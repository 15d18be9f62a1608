//! Testing utilities for the VPMS lookup workspace
//!
//! A small reference schema covering every storage shape the lookup engine
//! handles, plus helpers to build stores, lookups and objects against it.

#![allow(missing_docs)]

use std::sync::Arc;
use vpms_archetype::{ArchetypeDescriptor, ArchetypeRegistry, AssertionDescriptor, NodeDescriptor};
use vpms_lookup::{Lookup, LookupReplacer, LookupService, LookupUsageFinder};
use vpms_store::{IMObject, MemorySession, MemoryStore, StorageRegistry};

/// Archetype short names in the reference schema
pub mod archetypes {
    pub const STATE: &str = "lookup.state";
    pub const SUBURB: &str = "lookup.suburb";
    pub const COUNTRY: &str = "lookup.country";
    pub const PERSON_TITLE: &str = "lookup.personTitle";
    pub const VISIT_REASON: &str = "lookup.visitReason";
    pub const SPECIES: &str = "lookup.species";
    pub const BREED: &str = "lookup.breed";
    pub const ACCOUNT_TYPE: &str = "lookup.customerAccountType";
    pub const CONTACT_PURPOSE: &str = "lookup.contactPurpose";
    pub const PRICING_GROUP: &str = "lookup.pricingGroup";

    pub const COUNTRY_STATE: &str = "lookupRelationship.countryState";
    pub const STATE_SUBURB: &str = "lookupRelationship.stateSuburb";
    pub const SPECIES_BREED: &str = "lookupRelationship.speciesBreed";

    pub const LOCATION: &str = "contact.location";
    pub const CUSTOMER: &str = "party.customerperson";
    pub const PATIENT: &str = "party.patientpet";
    pub const APPOINTMENT: &str = "act.customerAppointment";
    pub const FIXED_PRICE: &str = "productPrice.fixedPrice";
}

use archetypes::*;

fn lookup_archetype(short_name: &str) -> ArchetypeDescriptor {
    ArchetypeDescriptor::new(short_name, "Lookup")
        .with_node(NodeDescriptor::new("code", "/code"))
        .with_node(NodeDescriptor::new("name", "/name"))
        .with_node(NodeDescriptor::new("description", "/description"))
        .with_node(NodeDescriptor::new("defaultLookup", "/defaultLookup"))
}

fn relationship(short_name: &str, source: &str, target: &str) -> ArchetypeDescriptor {
    ArchetypeDescriptor::new(short_name, "LookupRelationship")
        .with_node(NodeDescriptor::new("source", "/source").with_range(&[source]))
        .with_node(NodeDescriptor::new("target", "/target").with_range(&[target]))
}

/// Node holding a code of `source`
pub fn direct_lookup(name: &str, path: &str, source: &str) -> NodeDescriptor {
    NodeDescriptor::new(name, path).with_assertion(
        AssertionDescriptor::new("lookup")
            .with_property("type", "lookup")
            .with_property("source", source),
    )
}

/// Node holding a code at the target end of `relationship`
pub fn target_lookup(name: &str, path: &str, relationship: &str) -> NodeDescriptor {
    NodeDescriptor::new(name, path).with_assertion(
        AssertionDescriptor::new("lookup")
            .with_property("type", "targetLookup")
            .with_property("relationship", relationship),
    )
}

fn classifications(filter: &str) -> NodeDescriptor {
    NodeDescriptor::new("classifications", "/classifications").with_filter(filter)
}

/// Reference schema
pub fn schema() -> Vec<ArchetypeDescriptor> {
    let mut schema: Vec<_> = [
        STATE,
        SUBURB,
        COUNTRY,
        PERSON_TITLE,
        VISIT_REASON,
        SPECIES,
        ACCOUNT_TYPE,
        CONTACT_PURPOSE,
        PRICING_GROUP,
    ]
    .into_iter()
    .map(lookup_archetype)
    .collect();

    schema.extend([
        lookup_archetype(BREED).with_node(direct_lookup("species", "/details/species", SPECIES)),
        relationship(COUNTRY_STATE, COUNTRY, STATE),
        relationship(STATE_SUBURB, STATE, SUBURB),
        relationship(SPECIES_BREED, SPECIES, BREED),
        ArchetypeDescriptor::new(LOCATION, "Contact")
            .with_node(NodeDescriptor::new("address", "/details/address"))
            .with_node(target_lookup("suburb", "/details/suburb", STATE_SUBURB))
            .with_node(target_lookup("state", "/details/state", COUNTRY_STATE))
            .with_node(classifications(CONTACT_PURPOSE)),
        ArchetypeDescriptor::new(CUSTOMER, "Party")
            .with_node(NodeDescriptor::new("name", "/name"))
            .with_node(direct_lookup("title", "/details/title", PERSON_TITLE))
            .with_node(classifications(ACCOUNT_TYPE)),
        ArchetypeDescriptor::new(PATIENT, "Party")
            .with_node(NodeDescriptor::new("name", "/name"))
            .with_node(direct_lookup("species", "/details/species", SPECIES))
            .with_node(target_lookup("breed", "/details/breed", SPECIES_BREED)),
        ArchetypeDescriptor::new(APPOINTMENT, "Act")
            .with_node(direct_lookup("reason", "/reason", VISIT_REASON))
            .with_node(
                NodeDescriptor::new("status", "/status")
                    .with_assertion(AssertionDescriptor::new("lookup.local")),
            )
            .with_node(NodeDescriptor::new("notes", "/details/notes")),
        ArchetypeDescriptor::new(FIXED_PRICE, "ProductPrice")
            .with_node(NodeDescriptor::new("price", "/price"))
            .with_node(classifications(PRICING_GROUP)),
    ]);
    schema
}

/// Schema, storage, store and engine wired together
pub struct Fixture {
    pub archetypes: Arc<ArchetypeRegistry>,
    pub storage: Arc<StorageRegistry>,
    pub store: Arc<MemoryStore>,
    pub finder: Arc<LookupUsageFinder>,
    pub replacer: LookupReplacer,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Fixture over the reference schema and built-in storage
    pub fn new() -> Self {
        Self::with_schema(schema())
    }

    /// Fixture over a custom schema
    pub fn with_schema(schema: Vec<ArchetypeDescriptor>) -> Self {
        let archetypes = Arc::new(ArchetypeRegistry::with_archetypes(schema).unwrap());
        let storage = Arc::new(StorageRegistry::builtin());
        let store = Arc::new(MemoryStore::new(archetypes.clone(), storage.clone()));
        let finder = Arc::new(LookupUsageFinder::new(archetypes.clone()));
        let replacer = LookupReplacer::new(finder.clone(), storage.clone());
        Self {
            archetypes,
            storage,
            store,
            finder,
            replacer,
        }
    }

    /// Session on the fixture store
    pub fn session(&self) -> MemorySession<'_> {
        self.store.session()
    }

    /// Transactional service over the fixture store
    pub fn service(&self) -> LookupService<MemoryStore> {
        LookupService::new(self.replacer.clone(), self.store.clone())
    }

    /// Create and commit a lookup
    pub fn lookup(&self, archetype: &str, code: &str) -> Lookup {
        let mut session = self.session();
        let lookup = create_lookup(&mut session, archetype, code);
        session.commit().unwrap();
        lookup
    }

    /// Save and commit an object
    pub fn object(&self, object: IMObject) -> IMObject {
        let mut session = self.session();
        let object = save(&mut session, object);
        session.commit().unwrap();
        object
    }

    /// Reload a committed object
    pub fn reload(&self, object: &IMObject) -> IMObject {
        self.session()
            .get(&object.archetype, object.id)
            .unwrap()
            .unwrap()
    }
}

/// Save a new lookup in `session`
pub fn create_lookup(session: &mut MemorySession<'_>, archetype: &str, code: &str) -> Lookup {
    let mut object = Lookup::new(0, archetype, code).to_object();
    session.save(&mut object).unwrap();
    Lookup::from_object(&object)
}

/// Save an object in `session`
pub fn save(session: &mut MemorySession<'_>, mut object: IMObject) -> IMObject {
    session.save(&mut object).unwrap();
    object
}

/// `contact.location` with the given state code
pub fn location(state: &str) -> IMObject {
    IMObject::new(LOCATION)
        .with_value("address", "1 Collins St")
        .with_value("state", state)
}

/// `party.customerperson` classified with the given lookups
pub fn customer(name: &str, classifications: &[&Lookup]) -> IMObject {
    classifications
        .iter()
        .fold(IMObject::new(CUSTOMER).with_value("name", name), |object, lookup| {
            object.with_classification(lookup.id)
        })
}
