//! Simple reader to inspect JSON:API documents.
//!
//! Reads the file named on the command line against a small geography
//! registry and prints every resource, or the error document on rejection.

use std::fs;
use std::sync::Arc;

use jsonapi_codec::{
    codec, AttributeValue, Relationship, ReadOptions, ResourceObject, TypeRegistry, WriteOptions,
};
use tracing_subscriber::EnvFilter;

struct Continent {
    id: String,
    name: String,
    countries: Vec<Arc<Country>>,
}

struct Country {
    id: String,
    name: String,
    continent: Option<Arc<Continent>>,
    cities: Vec<Arc<City>>,
}

struct City {
    id: String,
    name: String,
    country: Option<Arc<Country>>,
}

fn registry() -> TypeRegistry {
    let built = TypeRegistry::builder()
        .register::<Continent>("continents", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_many("countries", |c| c.countries.clone())
        })
        .register::<Country>("countries", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_one("continent", |c| c.continent.clone())
                .to_many("cities", |c| c.cities.clone())
        })
        .register::<City>("cities", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_one("country", |c| c.country.clone())
        })
        .build();

    match built {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("Registry error: {err}");
            std::process::exit(1);
        }
    }
}

fn format_attribute(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Json(value) => {
            let text = value.to_string();
            let preview: String = text.chars().take(80).collect();
            if text.chars().count() > 80 {
                format!("{preview}...")
            } else {
                preview
            }
        }
        AttributeValue::RawJson(Some(text)) => format!("RAW({text})"),
        AttributeValue::Decimal(Some(number)) => format!("DECIMAL({number})"),
        AttributeValue::RawJson(None) | AttributeValue::Decimal(None) => "null".to_string(),
    }
}

fn format_relationship(relationship: &Relationship) -> String {
    match relationship {
        Relationship::Unlinked { .. } => "(not linked)".to_string(),
        Relationship::ToOne { linkage: None, .. } => "null".to_string(),
        Relationship::ToOne {
            linkage: Some(key), ..
        } => key.to_string(),
        Relationship::ToMany { linkage, .. } => {
            let keys: Vec<String> = linkage.iter().map(ToString::to_string).collect();
            format!("[{}]", keys.join(", "))
        }
    }
}

fn print_resource(resource: &ResourceObject) {
    println!("  {}:{}", resource.resource_type, resource.id);
    for (key, value) in &resource.attributes {
        println!("    {key} = {}", format_attribute(value));
    }
    for (key, relationship) in &resource.relationships {
        println!("    {key} -> {}", format_relationship(relationship));
    }
    if let Some(meta) = &resource.meta {
        println!("    meta = {}", serde_json::Value::Object(meta.clone()));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: read_file <document.json>");
        std::process::exit(2);
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");
            std::process::exit(1);
        }
    };

    let registry = registry();
    let document = match codec::from_slice(&bytes, &registry, &ReadOptions::default()) {
        Ok(document) => document,
        Err(err) => {
            let stdout = std::io::stdout();
            if let Err(write_err) = codec::write_error(stdout.lock(), &err, &WriteOptions::pretty()) {
                eprintln!("Failed to write error document: {write_err}");
            }
            println!();
            std::process::exit(1);
        }
    };

    let kind = if document.is_collection() {
        "collection"
    } else {
        "single"
    };
    println!("Document ({kind}): {} bytes", bytes.len());

    println!("Primary data: {}", document.primary().len());
    for resource in document.primary() {
        print_resource(resource);
    }

    if !document.included().is_empty() {
        println!("Included: {}", document.included().len());
        for resource in document.included() {
            print_resource(resource);
        }
    }

    if let Some(meta) = &document.meta {
        println!("Meta: {}", serde_json::Value::Object(meta.clone()));
    }
}
