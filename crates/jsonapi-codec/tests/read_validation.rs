//! Request bodies against the geography registry, accepted and rejected.

mod common;

use jsonapi_codec::{
    codec, ErrorCode, ReadError, ReadOptions, Relationship, RelationshipPayloadError, ResourceKey,
    WriteOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::registry;

fn read(text: &str) -> Result<jsonapi_codec::CompoundDocument, ReadError> {
    codec::from_str(text, &registry(), &ReadOptions::default())
}

fn rejection(text: &str) -> ReadError {
    match read(text) {
        Ok(document) => panic!("expected rejection of {text}, got {document:?}"),
        Err(err) => err,
    }
}

#[test]
fn test_accepts_client_update_with_ids_form() {
    let document = read(
        r#"{
            "data": {
                "type": "countries",
                "id": "21",
                "name": "United States",
                "links": {
                    "continent": {"type": "continents", "id": "31"},
                    "cities": {"ids": ["11", "12", "11"], "type": "cities"}
                }
            }
        }"#,
    )
    .unwrap();

    assert!(!document.is_collection());
    let usa = &document.primary()[0];
    assert_eq!(usa.key(), ResourceKey::new("countries", "21"));
    assert_eq!(
        usa.attribute("name").and_then(|v| v.as_json()),
        Some(&json!("United States"))
    );
    assert_eq!(
        usa.relationship("continent").unwrap().linked_keys(),
        &[ResourceKey::new("continents", "31")]
    );
    // Repeated ids collapse onto their first position.
    assert_eq!(
        usa.relationship("cities").unwrap().linked_keys(),
        &[ResourceKey::new("cities", "11"), ResourceKey::new("cities", "12")]
    );
}

#[test]
fn test_accepts_clearing_a_to_one() {
    let document = read(
        r#"{"data": {"type": "cities", "id": "11", "links": {"country": null}}}"#,
    )
    .unwrap();
    assert!(matches!(
        document.primary()[0].relationship("country"),
        Some(Relationship::ToOne { linkage: None, .. })
    ));
}

#[test]
fn test_rejection_codes() {
    let cases: &[(&str, ErrorCode)] = &[
        (r#"[]"#, ErrorCode::MalformedDocument),
        (r#"{"data": null"#, ErrorCode::MalformedDocument),
        (r#"{"data": null} {}"#, ErrorCode::MalformedDocument),
        (r#"{"data": 7}"#, ErrorCode::MalformedDocument),
        (r#"{"data": null, "data": null}"#, ErrorCode::MalformedDocument),
        (r#"{"data": null, "included": {}}"#, ErrorCode::MalformedDocument),
        (r#"{"meta": {}}"#, ErrorCode::MissingPrimaryData),
        (r#"{"data": {"type": "countries"}}"#, ErrorCode::InvalidResourceObject),
        (r#"{"data": {"type": "countries", "id": 21}}"#, ErrorCode::InvalidResourceObject),
        (r#"{"data": {"type": "planets", "id": "3"}}"#, ErrorCode::UnknownResourceType),
        (
            r#"{"data": {"type": "countries", "id": "21", "links": []}}"#,
            ErrorCode::InvalidRelationshipPayload,
        ),
        (r#"{"data": null, "errors": []}"#, ErrorCode::UnknownTopLevelKey),
        (r#"{"data": null, "meta": 1}"#, ErrorCode::InvalidMetadata),
    ];

    for (text, expected) in cases {
        let err = rejection(text);
        assert_eq!(err.code(), *expected, "{text}: {err}");
        assert_eq!(err.status(), 400);
    }
}

#[test]
fn test_to_many_payload_rules() {
    let cases = [
        (
            json!({"ids": ["11"], "type": "cities", "data": []}),
            RelationshipPayloadError::DataAndIds,
        ),
        (
            json!({"type": "cities", "data": []}),
            RelationshipPayloadError::DataAndType,
        ),
        (json!({}), RelationshipPayloadError::MissingLinkage),
        (json!({"ids": ["11"]}), RelationshipPayloadError::IdsWithoutType),
        (json!({"type": "cities"}), RelationshipPayloadError::TypeWithoutIds),
        (json!({"ids": "11", "type": "cities"}), RelationshipPayloadError::IdsNotStrings),
    ];

    for (payload, kind) in cases {
        let body = json!({
            "data": {"type": "countries", "id": "21", "links": {"cities": payload}}
        });
        let err = rejection(&body.to_string());
        assert_eq!(
            err,
            ReadError::InvalidRelationship {
                key: "cities".into(),
                kind,
            }
        );
    }
}

#[test]
fn test_linkage_to_unknown_type_is_rejected() {
    let err = rejection(
        r#"{"data": {"type": "countries", "id": "21",
            "links": {"cities": {"data": [{"type": "towns", "id": "1"}]}}}}"#,
    );
    assert_eq!(err.code(), ErrorCode::UnknownResourceType);
}

#[test]
fn test_duplicate_resource_across_sections() {
    let err = rejection(
        r#"{"data": {"type": "cities", "id": "11"},
            "included": [{"type": "cities", "id": "11"}]}"#,
    );
    assert_eq!(
        err,
        ReadError::DuplicateResource {
            resource_type: "cities".into(),
            id: "11".into(),
        }
    );
}

#[test]
fn test_limits_are_configurable() {
    let options = ReadOptions {
        max_resources: 10,
        max_linkage: 2,
    };
    let err = codec::from_str(
        r#"{"data": {"type": "countries", "id": "21",
            "links": {"cities": {"ids": ["11", "12", "13"], "type": "cities"}}}}"#,
        &registry(),
        &options,
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedDocument);
}

#[test]
fn test_rejection_rendered_as_error_document() {
    let err = rejection(
        r#"{"data": {"type": "countries", "id": "21",
            "links": {"cities": {"ids": ["11"], "type": "cities", "data": []}}}}"#,
    );

    let mut out = Vec::new();
    codec::write_error(&mut out, &err, &WriteOptions::pretty()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        value,
        json!({
            "errors": [{
                "status": "400",
                "code": "invalid_relationship_payload",
                "title": "Invalid relationship payload",
                "detail": "relationship `cities`: if `data` is specified, then `ids` may not be"
            }]
        })
    );
}
