#![allow(dead_code)]

use std::sync::{Arc, OnceLock, Weak};

use jsonapi_codec::TypeRegistry;

pub struct Continent {
    pub id: String,
    pub name: String,
    pub countries: OnceLock<Vec<Arc<Country>>>,
}

pub struct Country {
    pub id: String,
    pub name: String,
    pub continent: Weak<Continent>,
    pub cities: OnceLock<Vec<Arc<City>>>,
}

pub struct City {
    pub id: String,
    pub name: String,
    pub country: Weak<Country>,
}

/// Keeps every node of the fixture graph alive; back references are weak.
pub struct World {
    pub north_america: Arc<Continent>,
    pub europe: Arc<Continent>,
    pub usa: Arc<Country>,
    pub uk: Arc<Country>,
    pub france: Arc<Country>,
    pub new_york: Arc<City>,
    pub los_angeles: Arc<City>,
    pub london: Arc<City>,
    pub paris: Arc<City>,
}

pub fn registry() -> TypeRegistry {
    TypeRegistry::builder()
        .register::<Continent>("continents", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_many("countries", |c| c.countries.get().cloned().unwrap_or_default())
        })
        .register::<Country>("countries", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_one("continent", |c| c.continent.upgrade())
                .to_many("cities", |c| c.cities.get().cloned().unwrap_or_default())
        })
        .register::<City>("cities", |c| c.id.clone(), |f| {
            f.attribute("name", |c| c.name.clone())
                .to_one("country", |c| c.country.upgrade())
        })
        .build()
        .expect("fixture registry is valid")
}

fn continent(id: &str, name: &str) -> Arc<Continent> {
    Arc::new(Continent {
        id: id.into(),
        name: name.into(),
        countries: OnceLock::new(),
    })
}

fn country(id: &str, name: &str, continent: &Arc<Continent>) -> Arc<Country> {
    Arc::new(Country {
        id: id.into(),
        name: name.into(),
        continent: Arc::downgrade(continent),
        cities: OnceLock::new(),
    })
}

fn city(id: &str, name: &str, country: &Arc<Country>) -> Arc<City> {
    Arc::new(City {
        id: id.into(),
        name: name.into(),
        country: Arc::downgrade(country),
    })
}

pub fn world() -> World {
    let north_america = continent("31", "North America");
    let europe = continent("32", "Europe");

    let usa = country("21", "USA", &north_america);
    let uk = country("22", "UK", &europe);
    let france = country("23", "France", &europe);

    let new_york = city("11", "New York", &usa);
    let los_angeles = city("12", "Los Angeles", &usa);
    let london = city("13", "London", &uk);
    let paris = city("14", "Paris", &france);

    let _ = north_america.countries.set(vec![usa.clone()]);
    let _ = europe.countries.set(vec![uk.clone(), france.clone()]);

    let _ = usa.cities.set(vec![new_york.clone(), los_angeles.clone()]);
    let _ = uk.cities.set(vec![london.clone()]);
    let _ = france.cities.set(vec![paris.clone()]);

    World {
        north_america,
        europe,
        usa,
        uk,
        france,
        new_york,
        los_angeles,
        london,
        paris,
    }
}
