//! End-to-end walks over the continent / country / city graph.

mod common;

use std::sync::Arc;

use jsonapi_codec::{
    codec, CompoundDocument, DocumentBuilder, EntityRef, InclusionError, LinkOptions, ReadOptions,
    Relationship, RelationshipLinks, ResourceKey, ResourceObject, Selector, WriteOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{registry, world, Continent};

fn keys(resources: &[ResourceObject]) -> Vec<String> {
    resources.iter().map(|r| r.key().to_string()).collect()
}

fn links(resource_type: &str, id: &str, key: &str) -> RelationshipLinks {
    RelationshipLinks {
        related: Some(format!("/{resource_type}/{id}/{key}")),
        relationship: Some(format!("/{resource_type}/{id}/links/{key}")),
    }
}

fn build(continent: &Arc<Continent>, paths: &[&str]) -> CompoundDocument {
    let registry = registry();
    let mut builder = DocumentBuilder::new(&registry);
    for path in paths {
        builder = builder.include_path(path).unwrap();
    }
    builder.single(Some(continent.clone())).unwrap()
}

#[test]
fn test_no_inclusion_leaves_relationships_unlinked() {
    let world = world();
    let document = build(&world.north_america, &[]);

    assert_eq!(keys(document.primary()), vec!["continents:31"]);
    assert!(document.included().is_empty());

    let continent = &document.primary()[0];
    assert_eq!(continent.relationships.len(), 1);
    assert_eq!(
        continent.relationship("countries"),
        Some(&Relationship::unlinked(links("continents", "31", "countries")))
    );
}

#[test]
fn test_include_countries() {
    let world = world();
    let document = build(&world.north_america, &["countries"]);

    let continent = &document.primary()[0];
    assert_eq!(
        continent.relationship("countries"),
        Some(&Relationship::to_many(
            [ResourceKey::new("countries", "21")],
            links("continents", "31", "countries"),
        ))
    );

    assert_eq!(keys(document.included()), vec!["countries:21"]);
    let usa = &document.included()[0];
    assert_eq!(usa.relationships.len(), 2);
    // "countries.continent" is not requested, so the back reference stays a
    // reference only.
    assert_eq!(
        usa.relationship("continent"),
        Some(&Relationship::unlinked(links("countries", "21", "continent")))
    );
    assert_eq!(
        usa.relationship("cities"),
        Some(&Relationship::unlinked(links("countries", "21", "cities")))
    );
}

#[test]
fn test_include_back_reference_links_primary_without_duplicating() {
    let world = world();
    let document = build(&world.north_america, &["countries.continent"]);

    assert_eq!(keys(document.primary()), vec!["continents:31"]);
    assert_eq!(keys(document.included()), vec!["countries:21"]);
    assert_eq!(
        document.included()[0].relationship("continent"),
        Some(&Relationship::to_one(
            Some(ResourceKey::new("continents", "31")),
            links("countries", "21", "continent"),
        ))
    );
}

#[test]
fn test_nested_inclusion_discovery_order() {
    let world = world();
    let document = build(&world.north_america, &["countries.cities"]);

    assert_eq!(
        keys(document.included()),
        vec!["countries:21", "cities:11", "cities:12"]
    );
    let new_york = document
        .find(&ResourceKey::new("cities", "11"))
        .unwrap();
    assert!(!new_york.relationship("country").unwrap().is_linked());
}

#[test]
fn test_collection_includes_each_country_once() {
    let world = world();
    let registry = registry();
    let document = DocumentBuilder::new(&registry)
        .include_path("countries")
        .unwrap()
        .collection([world.north_america.clone(), world.europe.clone()])
        .unwrap();

    assert!(document.is_collection());
    assert_eq!(keys(document.primary()), vec!["continents:31", "continents:32"]);
    assert_eq!(
        keys(document.included()),
        vec!["countries:21", "countries:22", "countries:23"]
    );
    assert_eq!(
        document.primary()[1].relationship("countries").unwrap().linked_keys(),
        &[
            ResourceKey::new("countries", "22"),
            ResourceKey::new("countries", "23"),
        ]
    );
}

#[test]
fn test_shared_target_included_once() {
    let world = world();
    let registry = registry();
    let document = DocumentBuilder::new(&registry)
        .include_path("country")
        .unwrap()
        .include_path("country.continent")
        .unwrap()
        .collection([world.new_york.clone(), world.los_angeles.clone()])
        .unwrap();

    assert_eq!(
        keys(document.included()),
        vec!["countries:21", "continents:31"]
    );
    for city in document.primary() {
        assert_eq!(
            city.relationship("country").unwrap().linked_keys(),
            &[ResourceKey::new("countries", "21")]
        );
    }
}

#[test]
fn test_first_path_wins() {
    let world = world();
    let registry = registry();
    // USA is first reached through "country", which does not expand its
    // cities. The later "countries.cities" visit reuses that conversion.
    let document = DocumentBuilder::new(&registry)
        .include_path("country")
        .unwrap()
        .include_path("countries.cities")
        .unwrap()
        .build_collection(&[
            world.new_york.clone() as EntityRef,
            world.north_america.clone() as EntityRef,
        ])
        .unwrap();

    assert_eq!(keys(document.primary()), vec!["cities:11", "continents:31"]);
    assert_eq!(keys(document.included()), vec!["countries:21"]);
    let usa = &document.included()[0];
    assert!(!usa.relationship("cities").unwrap().is_linked());
    assert!(!document.contains(&ResourceKey::new("cities", "12")));
}

#[test]
fn test_primary_reached_through_earlier_primary_is_built_at_root() {
    let world = world();
    let registry = registry();
    let builder = DocumentBuilder::new(&registry)
        .include_path("continent")
        .unwrap()
        .include_path("countries")
        .unwrap();

    let usa_first = builder
        .build_collection(&[
            world.usa.clone() as EntityRef,
            world.north_america.clone() as EntityRef,
        ])
        .unwrap();
    assert_eq!(keys(usa_first.primary()), vec!["countries:21", "continents:31"]);
    assert!(usa_first.included().is_empty());
    assert_eq!(
        usa_first.primary()[0].relationship("continent").unwrap().linked_keys(),
        &[ResourceKey::new("continents", "31")]
    );
    assert_eq!(
        usa_first.primary()[1].relationship("countries"),
        Some(&Relationship::to_many(
            [ResourceKey::new("countries", "21")],
            links("continents", "31", "countries"),
        ))
    );

    let continent_first = builder
        .build_collection(&[
            world.north_america.clone() as EntityRef,
            world.usa.clone() as EntityRef,
        ])
        .unwrap();
    for resource in continent_first.primary() {
        assert_eq!(usa_first.find(&resource.key()), Some(resource));
    }
}

#[test]
fn test_cycle_terminates() {
    let world = world();
    let document = build(
        &world.europe,
        &["countries.continent.countries.continent", "countries.cities.country"],
    );

    assert_eq!(keys(document.primary()), vec!["continents:32"]);
    assert_eq!(
        keys(document.included()),
        vec!["countries:22", "cities:13", "countries:23", "cities:14"]
    );
}

#[test]
fn test_selector_matches_dotted_path() {
    let world = world();
    let registry = registry();
    let selector = Selector::root()
        .field("countries")
        .select(|country| country.field("cities"));

    let from_selector = DocumentBuilder::new(&registry)
        .include_selector(&selector)
        .unwrap()
        .single(Some(world.north_america.clone()))
        .unwrap();
    let from_path = build(&world.north_america, &["countries.cities"]);

    assert_eq!(from_selector, from_path);
}

#[test]
fn test_selector_with_method_call_is_rejected() {
    let registry = registry();
    let selector = Selector::root().field("countries").call("Where");

    let err = DocumentBuilder::new(&registry)
        .include_selector(&selector)
        .unwrap_err();
    assert_eq!(
        err,
        InclusionError::InvalidExpression {
            construct: "Where".into()
        }
    );
}

#[test]
fn test_written_document_shape() {
    let world = world();
    let registry = registry();
    let document = DocumentBuilder::new(&registry)
        .links(LinkOptions::with_base_url("https://api.example.com/"))
        .include_path("countries")
        .unwrap()
        .single(Some(world.north_america.clone()))
        .unwrap();

    assert_eq!(
        codec::to_value(&document).unwrap(),
        json!({
            "data": {
                "type": "continents",
                "id": "31",
                "name": "North America",
                "links": {
                    "countries": {
                        "self": "https://api.example.com/continents/31/links/countries",
                        "resource": "https://api.example.com/continents/31/countries",
                        "data": [{"type": "countries", "id": "21"}]
                    }
                }
            },
            "included": [{
                "type": "countries",
                "id": "21",
                "name": "USA",
                "links": {
                    "continent": {
                        "self": "https://api.example.com/countries/21/links/continent",
                        "resource": "https://api.example.com/countries/21/continent"
                    },
                    "cities": {
                        "self": "https://api.example.com/countries/21/links/cities",
                        "resource": "https://api.example.com/countries/21/cities"
                    }
                }
            }]
        })
    );
}

#[test]
fn test_walk_write_read_round_trip() {
    let world = world();
    let registry = registry();
    let document = DocumentBuilder::new(&registry)
        .include_path("countries.cities.country")
        .unwrap()
        .collection([world.north_america.clone(), world.europe.clone()])
        .unwrap();

    for options in [WriteOptions::compact(), WriteOptions::pretty()] {
        let bytes = codec::to_vec(&document, &options).unwrap();
        let decoded = codec::from_slice(&bytes, &registry, &ReadOptions::default()).unwrap();
        assert_eq!(decoded, document);
    }
}
