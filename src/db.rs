use crate::pipeline::SourceRun;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Fixed page size of the browse interface.
pub const ENTRIES_PER_PAGE: usize = 18;

const IMAGE_TYPE_GALLERY: i64 = 0;
const IMAGE_TYPE_FLOORPLAN: i64 = 1;

/// Create a fresh database at `path`, deleting any previous one. The store
/// must be empty of an agency's prior data before a run; there is no
/// upsert, so re-running against an existing file duplicates rows.
pub fn create(path: &str) -> Result<Connection> {
    if Path::new(path).exists() {
        std::fs::remove_file(path).with_context(|| format!("Failed to remove {}", path))?;
    }
    let conn = connect(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn connect(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS agency (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            baseurl     TEXT NOT NULL,
            description TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS apartment (
            id             INTEGER PRIMARY KEY,
            agency_id      INTEGER NOT NULL REFERENCES agency(id),
            url            TEXT NOT NULL,
            name           TEXT NOT NULL,
            bedrooms       INTEGER NOT NULL,
            bathrooms      INTEGER NOT NULL,
            price          INTEGER NOT NULL,
            address        TEXT NOT NULL,
            leasing_period TEXT NOT NULL,
            description    TEXT NOT NULL,
            lat            REAL NOT NULL,
            lng            REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_apartment_agency ON apartment(agency_id);
        CREATE INDEX IF NOT EXISTS idx_apartment_price ON apartment(price);

        CREATE TABLE IF NOT EXISTS image (
            id           INTEGER PRIMARY KEY,
            apartment_id INTEGER NOT NULL REFERENCES apartment(id),
            url          TEXT NOT NULL,
            type         INTEGER NOT NULL,
            image_index  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_image_apartment ON image(apartment_id);

        CREATE TABLE IF NOT EXISTS amenity (
            id           INTEGER PRIMARY KEY,
            apartment_id INTEGER NOT NULL REFERENCES apartment(id),
            amenity      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_amenity_apartment ON amenity(apartment_id);

        CREATE TABLE IF NOT EXISTS apartment_rating (
            id           INTEGER PRIMARY KEY,
            apartment_id INTEGER NOT NULL REFERENCES apartment(id),
            value        INTEGER NOT NULL,
            text         TEXT
        );

        CREATE TABLE IF NOT EXISTS agency_rating (
            id        INTEGER PRIMARY KEY,
            agency_id INTEGER NOT NULL REFERENCES agency(id),
            value     INTEGER NOT NULL,
            text      TEXT
        );
        ",
    )?;
    Ok(())
}

/// Persist one site run: the agency row, then every apartment with its
/// images and amenities, in one transaction. A mid-batch failure rolls the
/// whole run back; no partially-committed agency is possible.
pub fn store_run(conn: &Connection, run: &SourceRun) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        tx.execute(
            "INSERT INTO agency (name, baseurl, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![run.agency.name, run.agency.base_url, run.agency.description],
        )?;
        let agency_id = tx.last_insert_rowid();

        let mut apartment_stmt = tx.prepare(
            "INSERT INTO apartment
             (agency_id, url, name, bedrooms, bathrooms, price, address,
              leasing_period, description, lat, lng)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        let mut image_stmt = tx.prepare(
            "INSERT INTO image (apartment_id, url, type, image_index)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut amenity_stmt =
            tx.prepare("INSERT INTO amenity (apartment_id, amenity) VALUES (?1, ?2)")?;

        for apartment in &run.apartments {
            apartment_stmt.execute(rusqlite::params![
                agency_id,
                apartment.url,
                apartment.name,
                apartment.bedrooms,
                apartment.bathrooms,
                apartment.price,
                apartment.address,
                apartment.leasing_period,
                apartment.description,
                apartment.lat,
                apartment.lng,
            ])?;
            let apartment_id = tx.last_insert_rowid();

            // Gallery images keep their discovery order; the floorplan, if
            // present, is indexed strictly after them.
            for (index, url) in apartment.image_urls.iter().enumerate() {
                image_stmt.execute(rusqlite::params![
                    apartment_id,
                    url,
                    IMAGE_TYPE_GALLERY,
                    index as i64
                ])?;
            }
            if let Some(floorplan) = &apartment.floorplan_url {
                image_stmt.execute(rusqlite::params![
                    apartment_id,
                    floorplan,
                    IMAGE_TYPE_FLOORPLAN,
                    apartment.image_urls.len() as i64
                ])?;
            }

            for amenity in &apartment.amenities {
                amenity_stmt.execute(rusqlite::params![apartment_id, amenity])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Browse queries ──

/// Browse filters; all predicates AND-compose, bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub keywords: Option<String>,
    pub agency: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_bedrooms: Option<u32>,
    pub max_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub max_bathrooms: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Bedrooms,
    Bathrooms,
}

#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            key: SortKey::Price,
            descending: false,
        }
    }
}

impl Sort {
    fn order_clause(&self) -> String {
        let column = match self.key {
            SortKey::Price => "a.price",
            SortKey::Bedrooms => "a.bedrooms",
            SortKey::Bathrooms => "a.bathrooms",
        };
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}, a.id", column, direction)
    }
}

#[derive(Debug, Clone)]
pub struct ImageRow {
    pub url: String,
    pub is_floorplan: bool,
    pub image_index: i64,
}

#[derive(Debug, Clone)]
pub struct RatingRow {
    pub id: i64,
    pub value: i64,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApartmentRow {
    pub id: i64,
    pub agency: String,
    pub url: String,
    pub name: String,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub price: i64,
    pub address: String,
    pub leasing_period: String,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub images: Vec<ImageRow>,
    pub amenities: Vec<String>,
    pub ratings: Vec<RatingRow>,
}

#[derive(Debug, Clone)]
pub struct AgencyRow {
    pub id: i64,
    pub name: String,
    pub baseurl: String,
    pub description: String,
    pub ratings: Vec<RatingRow>,
}

/// Filtered, sorted, paginated apartment query. Returns the rows for
/// `current_page` (1-based) and the total page count. Both derive from the
/// same result set, so they cannot disagree. Passing `limit_to_page =
/// false` returns everything (the map view).
pub fn query_apartments(
    conn: &Connection,
    filter: &Filter,
    sort: Sort,
    current_page: usize,
    limit_to_page: bool,
) -> Result<(Vec<ApartmentRow>, usize)> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(keywords) = &filter.keywords {
        conditions.push(format!("a.description LIKE ?{}", params.len() + 1));
        params.push(Box::new(format!("%{}%", keywords)));
    }
    if let Some(agency) = &filter.agency {
        conditions.push(format!("c.name LIKE ?{}", params.len() + 1));
        params.push(Box::new(agency.clone()));
    }
    if let Some(min_price) = filter.min_price {
        conditions.push(format!("a.price >= ?{}", params.len() + 1));
        params.push(Box::new(min_price));
    }
    if let Some(max_price) = filter.max_price {
        conditions.push(format!("a.price <= ?{}", params.len() + 1));
        params.push(Box::new(max_price));
    }
    if let Some(min_bedrooms) = filter.min_bedrooms {
        conditions.push(format!("a.bedrooms >= ?{}", params.len() + 1));
        params.push(Box::new(min_bedrooms));
    }
    if let Some(max_bedrooms) = filter.max_bedrooms {
        conditions.push(format!("a.bedrooms <= ?{}", params.len() + 1));
        params.push(Box::new(max_bedrooms));
    }
    if let Some(min_bathrooms) = filter.min_bathrooms {
        conditions.push(format!("a.bathrooms >= ?{}", params.len() + 1));
        params.push(Box::new(min_bathrooms));
    }
    if let Some(max_bathrooms) = filter.max_bathrooms {
        conditions.push(format!("a.bathrooms <= ?{}", params.len() + 1));
        params.push(Box::new(max_bathrooms));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT a.id, c.name, a.url, a.name, a.bedrooms, a.bathrooms, a.price,
                a.address, a.leasing_period, a.description, a.lat, a.lng
         FROM apartment a
         JOIN agency c ON c.id = a.agency_id{}
         ORDER BY {}",
        where_clause,
        sort.order_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut rows: Vec<ApartmentRow> = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(ApartmentRow {
                id: row.get(0)?,
                agency: row.get(1)?,
                url: row.get(2)?,
                name: row.get(3)?,
                bedrooms: row.get(4)?,
                bathrooms: row.get(5)?,
                price: row.get(6)?,
                address: row.get(7)?,
                leasing_period: row.get(8)?,
                description: row.get(9)?,
                lat: row.get(10)?,
                lng: row.get(11)?,
                images: Vec::new(),
                amenities: Vec::new(),
                ratings: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let num_entries = rows.len();
    let num_pages = if limit_to_page {
        // Ceiling division; the obvious `n / per + 1` over-counts by one
        // whenever n is an exact multiple of the page size.
        num_entries.div_ceil(ENTRIES_PER_PAGE).max(1)
    } else {
        1
    };

    if limit_to_page {
        let start = current_page.saturating_sub(1) * ENTRIES_PER_PAGE;
        let end = (start + ENTRIES_PER_PAGE).min(rows.len());
        rows = if start < rows.len() {
            rows[start..end].to_vec()
        } else {
            Vec::new()
        };
    }

    for row in &mut rows {
        load_details(conn, row)?;
    }

    Ok((rows, num_pages))
}

pub fn get_apartment(conn: &Connection, id: i64) -> Result<Option<ApartmentRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, c.name, a.url, a.name, a.bedrooms, a.bathrooms, a.price,
                a.address, a.leasing_period, a.description, a.lat, a.lng
         FROM apartment a
         JOIN agency c ON c.id = a.agency_id
         WHERE a.id = ?1",
    )?;

    let row = stmt
        .query_map([id], |row| {
            Ok(ApartmentRow {
                id: row.get(0)?,
                agency: row.get(1)?,
                url: row.get(2)?,
                name: row.get(3)?,
                bedrooms: row.get(4)?,
                bathrooms: row.get(5)?,
                price: row.get(6)?,
                address: row.get(7)?,
                leasing_period: row.get(8)?,
                description: row.get(9)?,
                lat: row.get(10)?,
                lng: row.get(11)?,
                images: Vec::new(),
                amenities: Vec::new(),
                ratings: Vec::new(),
            })
        })?
        .next()
        .transpose()?;

    match row {
        Some(mut row) => {
            load_details(conn, &mut row)?;
            Ok(Some(row))
        }
        None => Ok(None),
    }
}

fn load_details(conn: &Connection, row: &mut ApartmentRow) -> Result<()> {
    let mut image_stmt = conn.prepare(
        "SELECT url, type, image_index FROM image
         WHERE apartment_id = ?1 ORDER BY image_index",
    )?;
    row.images = image_stmt
        .query_map([row.id], |r| {
            Ok(ImageRow {
                url: r.get(0)?,
                is_floorplan: r.get::<_, i64>(1)? == IMAGE_TYPE_FLOORPLAN,
                image_index: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut amenity_stmt =
        conn.prepare("SELECT amenity FROM amenity WHERE apartment_id = ?1 ORDER BY id")?;
    row.amenities = amenity_stmt
        .query_map([row.id], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rating_stmt = conn.prepare(
        "SELECT id, value, text FROM apartment_rating WHERE apartment_id = ?1 ORDER BY id",
    )?;
    row.ratings = rating_stmt
        .query_map([row.id], |r| {
            Ok(RatingRow {
                id: r.get(0)?,
                value: r.get(1)?,
                text: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(())
}

pub fn list_agencies(conn: &Connection) -> Result<Vec<AgencyRow>> {
    let mut stmt = conn.prepare("SELECT id, name, baseurl, description FROM agency ORDER BY id")?;
    let mut agencies: Vec<AgencyRow> = stmt
        .query_map([], |row| {
            Ok(AgencyRow {
                id: row.get(0)?,
                name: row.get(1)?,
                baseurl: row.get(2)?,
                description: row.get(3)?,
                ratings: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rating_stmt =
        conn.prepare("SELECT id, value, text FROM agency_rating WHERE agency_id = ?1 ORDER BY id")?;
    for agency in &mut agencies {
        agency.ratings = rating_stmt
            .query_map([agency.id], |r| {
                Ok(RatingRow {
                    id: r.get(0)?,
                    value: r.get(1)?,
                    text: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(agencies)
}

// ── Review submission ──
// The only writers of rating rows; the scraper never creates ratings.

pub fn save_apartment_review(
    conn: &Connection,
    apartment_id: i64,
    value: i64,
    text: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO apartment_rating (apartment_id, value, text) VALUES (?1, ?2, ?3)",
        rusqlite::params![apartment_id, value, text],
    )?;
    Ok(())
}

pub fn save_agency_review(
    conn: &Connection,
    agency_id: i64,
    value: i64,
    text: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO agency_rating (agency_id, value, text) VALUES (?1, ?2, ?3)",
        rusqlite::params![agency_id, value, text],
    )?;
    Ok(())
}
