//! Benchmark for walking, writing and reading a synthetic geography graph.
//!
//! Builds continents, countries and cities with back references, then times
//! each stage for several inclusion settings.

use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;

use jsonapi_codec::{
    codec, DocumentBuilder, LinkOptions, ReadOptions, TypeRegistry, WriteOptions,
};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONTINENTS: usize = 7;
const COUNTRIES_PER_CONTINENT: usize = 30;
const CITIES_PER_COUNTRY: usize = 40;
const ITERATIONS: u32 = 5;

struct Continent {
    id: usize,
    name: String,
    countries: OnceLock<Vec<Arc<Country>>>,
}

struct Country {
    id: usize,
    name: String,
    code: String,
    continent: Weak<Continent>,
    cities: OnceLock<Vec<Arc<City>>>,
}

struct City {
    id: usize,
    name: String,
    population: u64,
    area_km2: Decimal,
    location: Option<String>,
    country: Weak<Country>,
}

fn registry() -> TypeRegistry {
    let built = TypeRegistry::builder()
        .register::<Continent>("continents", |c| c.id.to_string(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_many("countries", |c| c.countries.get().cloned().unwrap_or_default())
        })
        .register::<Country>("countries", |c| c.id.to_string(), |f| {
            f.attribute("name", |c| c.name.clone())
                .attribute("code", |c| c.code.clone())
                .computed("cityCount", |c| c.cities.get().map_or(0, Vec::len))
                .to_one("continent", |c| c.continent.upgrade())
                .to_many("cities", |c| c.cities.get().cloned().unwrap_or_default())
        })
        .register::<City>("cities", |c| c.id.to_string(), |f| {
            f.attribute("name", |c| c.name.clone())
                .attribute("population", |c| c.population)
                .decimal("area_km2", |c| c.area_km2)
                .raw_json("location", |c| c.location.clone())
                .to_one("country", |c| c.country.upgrade())
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

fn build_graph() -> Vec<Arc<Continent>> {
    let mut next_country = 1000;
    let mut next_city = 100_000;

    (0..CONTINENTS)
        .map(|c| {
            let continent = Arc::new(Continent {
                id: c + 1,
                name: format!("Continent {}", c + 1),
                countries: OnceLock::new(),
            });

            let countries: Vec<Arc<Country>> = (0..COUNTRIES_PER_CONTINENT)
                .map(|n| {
                    next_country += 1;
                    let country = Arc::new(Country {
                        id: next_country,
                        name: format!("Country {next_country}"),
                        code: format!("C{:03}", n),
                        continent: Arc::downgrade(&continent),
                        cities: OnceLock::new(),
                    });

                    let cities: Vec<Arc<City>> = (0..CITIES_PER_COUNTRY)
                        .map(|i| {
                            next_city += 1;
                            Arc::new(City {
                                id: next_city,
                                name: format!("City {next_city}"),
                                population: 10_000 + (i as u64) * 1_337,
                                area_km2: Decimal::new(next_city as i64 * 7 + 13, 2),
                                location: (i % 3 != 0).then(|| {
                                    format!(
                                        "{{ \"lat\": {}.5, \"lon\": -{}.25 }}",
                                        i % 90,
                                        n % 180
                                    )
                                }),
                                country: Arc::downgrade(&country),
                            })
                        })
                        .collect();
                    let _ = country.cities.set(cities);
                    country
                })
                .collect();
            let _ = continent.countries.set(countries);
            continent
        })
        .collect()
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

fn run_case(registry: &TypeRegistry, continents: &[Arc<Continent>], paths: &[&str]) {
    let mut builder =
        DocumentBuilder::new(registry).links(LinkOptions::with_base_url("https://api.example.com"));
    for path in paths {
        builder = match builder.include_path(path) {
            Ok(builder) => builder,
            Err(err) => {
                eprintln!("Invalid inclusion path {path:?}: {err}");
                return;
            }
        };
    }

    let label = if paths.is_empty() {
        "(none)".to_string()
    } else {
        paths.join(",")
    };
    println!("--- include: {label} ---");

    let start = Instant::now();
    let mut document = None;
    for _ in 0..ITERATIONS {
        match builder.collection(continents.iter().cloned()) {
            Ok(built) => document = Some(built),
            Err(err) => {
                eprintln!("Walk error: {err}");
                return;
            }
        }
    }
    let walk_time = start.elapsed() / ITERATIONS;
    let Some(document) = document else {
        return;
    };

    let options = WriteOptions::compact();
    let start = Instant::now();
    let mut bytes = Vec::new();
    for _ in 0..ITERATIONS {
        bytes = match codec::to_vec(&document, &options) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("Write error: {err}");
                return;
            }
        };
    }
    let write_time = start.elapsed() / ITERATIONS;

    let read_options = ReadOptions::default();
    let start = Instant::now();
    let mut decoded = None;
    for _ in 0..ITERATIONS {
        match codec::from_slice(&bytes, registry, &read_options) {
            Ok(read) => decoded = Some(read),
            Err(err) => {
                eprintln!("Read error: {err}");
                return;
            }
        }
    }
    let read_time = start.elapsed() / ITERATIONS;

    let resources = document.primary().len() + document.included().len();
    println!("  Resources:  {} primary, {} included", document.primary().len(), document.included().len());
    println!("  Size:       {}", format_size(bytes.len()));
    println!("  Walk:       {:?}", walk_time);
    println!(
        "  Write:      {:?} ({:.2} MB/s)",
        write_time,
        bytes.len() as f64 / write_time.as_secs_f64() / (1024.0 * 1024.0)
    );
    println!(
        "  Read:       {:?} ({:.2} MB/s)",
        read_time,
        bytes.len() as f64 / read_time.as_secs_f64() / (1024.0 * 1024.0)
    );

    if let Some(decoded) = decoded {
        let round_tripped = decoded.primary().len() + decoded.included().len();
        if round_tripped != resources {
            eprintln!("  Round trip mismatch: wrote {resources}, read {round_tripped}");
        }
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = registry();

    let start = Instant::now();
    let continents = build_graph();
    info!(elapsed = ?start.elapsed(), "built graph");

    println!("=== JSON:API codec benchmark ===");
    println!(
        "Graph: {} continents, {} countries, {} cities",
        CONTINENTS,
        CONTINENTS * COUNTRIES_PER_CONTINENT,
        CONTINENTS * COUNTRIES_PER_CONTINENT * CITIES_PER_COUNTRY
    );
    println!();

    run_case(&registry, &continents, &[]);
    run_case(&registry, &continents, &["countries"]);
    run_case(&registry, &continents, &["countries.cities"]);
    run_case(&registry, &continents, &["countries.cities.country.continent"]);
}
