//! Shared fixtures for unit tests

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::context::MemoryStore;
use crate::schema::{Entity, FieldKind, Schema};

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub name: String,
    pub population: i64,
    pub area: f64,
    pub landlocked: bool,
    pub capital: Option<String>,
    pub joined_un: Option<DateTime<Utc>>,
    pub cities: Vec<City>,
}

impl Country {
    pub fn new(name: &str, population: i64, area: f64) -> Self {
        Self {
            name: name.to_string(),
            population,
            area,
            landlocked: false,
            capital: None,
            joined_un: None,
            cities: Vec::new(),
        }
    }

    pub fn capital(mut self, capital: &str) -> Self {
        self.capital = Some(capital.to_string());
        self
    }

    pub fn landlocked(mut self) -> Self {
        self.landlocked = true;
        self
    }

    pub fn joined_un(mut self, year: i32, month: u32, day: u32) -> Self {
        self.joined_un = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single();
        self
    }
}

static COUNTRY: Lazy<Schema<Country>> = Lazy::new(|| {
    Schema::builder("Country")
        .field("name", FieldKind::Text, |c: &Country| c.name.clone())
        .field("population", FieldKind::Integer, |c: &Country| c.population)
        .field("area", FieldKind::Float, |c: &Country| c.area)
        .field("landlocked", FieldKind::Boolean, |c: &Country| c.landlocked)
        .nullable("capital", FieldKind::Text, |c: &Country| c.capital.clone())
        .nullable("joined_un", FieldKind::Timestamp, |c: &Country| c.joined_un)
        .key("name")
        .relation("cities")
        .build()
});

impl Entity for Country {
    fn schema() -> &'static Schema<Self> {
        &COUNTRY
    }
}

static CITY: Lazy<Schema<City>> = Lazy::new(|| {
    Schema::builder("City")
        .field("id", FieldKind::Integer, |c: &City| c.id)
        .field("name", FieldKind::Text, |c: &City| c.name.clone())
        .field("country", FieldKind::Text, |c: &City| c.country.clone())
        .key("id")
        .build()
});

impl Entity for City {
    fn schema() -> &'static Schema<Self> {
        &CITY
    }
}

/// Read model served by a named query rather than a stored set
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySearch {
    pub name: String,
    pub city_count: i64,
}

static COUNTRY_SEARCH: Lazy<Schema<CountrySearch>> = Lazy::new(|| {
    Schema::builder("CountrySearch")
        .field("name", FieldKind::Text, |c: &CountrySearch| c.name.clone())
        .field("city_count", FieldKind::Integer, |c: &CountrySearch| c.city_count)
        .key("name")
        .get_all_query("country_search")
        .build()
});

impl Entity for CountrySearch {
    fn schema() -> &'static Schema<Self> {
        &COUNTRY_SEARCH
    }
}

/// Five countries in a fixed insertion order
pub fn countries() -> Vec<Country> {
    vec![
        Country::new("France", 68_000_000, 551_695.0)
            .capital("Paris")
            .joined_un(1945, 10, 24),
        Country::new("Austria", 9_100_000, 83_879.0)
            .capital("Vienna")
            .landlocked()
            .joined_un(1955, 12, 14),
        Country::new("Finland", 5_600_000, 338_455.0)
            .capital("Helsinki")
            .joined_un(1955, 12, 14),
        Country::new("Fiji", 900_000, 18_274.0).capital("Suva"),
        Country::new("Atlantis", 9_100_000, 1.0),
    ]
}

pub fn cities() -> Vec<City> {
    let city = |id: i64, name: &str, country: &str| City {
        id,
        name: name.to_string(),
        country: country.to_string(),
    };
    vec![
        city(1, "Paris", "France"),
        city(2, "Lyon", "France"),
        city(3, "Vienna", "Austria"),
        city(4, "Helsinki", "Finland"),
    ]
}

pub fn names(items: &[Country]) -> Vec<&str> {
    items.iter().map(|c| c.name.as_str()).collect()
}

/// Store seeded with countries and cities, with the `cities` include and the
/// `country_search` named query registered
pub fn store() -> MemoryStore {
    MemoryStore::builder()
        .seed(countries())
        .seed(cities())
        .include("cities", |country: &mut Country, sets| {
            country.cities = sets
                .all::<City>()
                .iter()
                .filter(|city| city.country == country.name)
                .cloned()
                .collect();
        })
        .named_query("country_search", |sets| {
            sets.all::<Country>()
                .iter()
                .map(|country| CountrySearch {
                    name: country.name.clone(),
                    city_count: sets
                        .all::<City>()
                        .iter()
                        .filter(|city| city.country == country.name)
                        .count() as i64,
                })
                .collect::<Vec<_>>()
        })
        .build()
}
