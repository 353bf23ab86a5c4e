//! SQLite-backed entity store.
//!
//! Mirrors the in-memory store over a single SQLite connection. Collections
//! are returned in id order. Datasets are imported in one transaction, and
//! station block assignments are written in one transaction per batch.
//!
//! Centers are stored as two nullable columns; dates use rusqlite's chrono
//! conversions.

use std::path::Path;

use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::engine::{validate_dataset, EntitySource, StationWriter};
use crate::entities::{
    Area, Block, BlockId, ContractStatus, ContractType, Contractor, Cruise, Dataset, EnvResult,
    GeoResult, Media, Sample, Station, StationId,
};
use crate::error::{OptionExt, Result, SeabedError};
use crate::GeoPoint;

/// Entity store over a SQLite database.
pub struct SqliteEntityStore {
    conn: Mutex<Connection>,
}

fn center_from(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    }
}

impl SqliteEntityStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS contract_types (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contract_statuses (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contractors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                contract_type_id INTEGER NOT NULL,
                contract_status_id INTEGER NOT NULL,
                sponsoring_state TEXT NOT NULL,
                contractual_year INTEGER NOT NULL,
                contract_number TEXT NOT NULL DEFAULT '',
                remarks TEXT
            );

            CREATE TABLE IF NOT EXISTS areas (
                id INTEGER PRIMARY KEY,
                contractor_id INTEGER NOT NULL REFERENCES contractors(id),
                name TEXT NOT NULL,
                boundary TEXT NOT NULL DEFAULT '',
                center_lat REAL,
                center_lng REAL,
                total_size_km2 REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS blocks (
                id INTEGER PRIMARY KEY,
                area_id INTEGER NOT NULL REFERENCES areas(id),
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT '',
                boundary TEXT NOT NULL DEFAULT '',
                center_lat REAL,
                center_lng REAL,
                size_km2 REAL NOT NULL DEFAULT 0,
                category TEXT NOT NULL DEFAULT '',
                resource_density REAL,
                economic_value REAL
            );

            CREATE TABLE IF NOT EXISTS cruises (
                id INTEGER PRIMARY KEY,
                contractor_id INTEGER NOT NULL REFERENCES contractors(id),
                name TEXT NOT NULL,
                vessel TEXT NOT NULL DEFAULT '',
                start_date TEXT,
                end_date TEXT,
                center_lat REAL,
                center_lng REAL
            );

            CREATE TABLE IF NOT EXISTS stations (
                id INTEGER PRIMARY KEY,
                cruise_id INTEGER NOT NULL REFERENCES cruises(id),
                code TEXT NOT NULL,
                station_type TEXT NOT NULL DEFAULT '',
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                block_id INTEGER REFERENCES blocks(id)
            );

            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY,
                station_id INTEGER NOT NULL REFERENCES stations(id),
                code TEXT NOT NULL,
                sample_type TEXT NOT NULL DEFAULT '',
                matrix_type TEXT NOT NULL DEFAULT '',
                habitat_type TEXT NOT NULL DEFAULT '',
                device TEXT NOT NULL DEFAULT '',
                depth_upper REAL,
                depth_lower REAL,
                description TEXT,
                analysis TEXT,
                result TEXT,
                unit TEXT
            );

            CREATE TABLE IF NOT EXISTS env_results (
                id INTEGER PRIMARY KEY,
                sample_id INTEGER NOT NULL REFERENCES samples(id),
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT NOT NULL DEFAULT '',
                remarks TEXT
            );

            CREATE TABLE IF NOT EXISTS geo_results (
                id INTEGER PRIMARY KEY,
                sample_id INTEGER NOT NULL REFERENCES samples(id),
                category TEXT NOT NULL,
                analysis TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT NOT NULL DEFAULT '',
                qualifier TEXT,
                remarks TEXT
            );

            CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY,
                sample_id INTEGER NOT NULL REFERENCES samples(id),
                file_name TEXT NOT NULL,
                media_type TEXT NOT NULL DEFAULT '',
                camera_specs TEXT,
                capture_date TEXT,
                remarks TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_stations_cruise ON stations(cruise_id);
            CREATE INDEX IF NOT EXISTS idx_stations_block ON stations(block_id);
            CREATE INDEX IF NOT EXISTS idx_samples_station ON samples(station_id);
            CREATE INDEX IF NOT EXISTS idx_blocks_area ON blocks(area_id);
            "#,
        )?;
        Ok(())
    }

    // ========================================================================
    // Import
    // ========================================================================

    /// Replace every table with a validated dataset, in one transaction.
    pub fn import(&self, data: &Dataset) -> Result<()> {
        validate_dataset(data)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM media; DELETE FROM geo_results; DELETE FROM env_results;
             DELETE FROM samples; DELETE FROM stations; DELETE FROM cruises;
             DELETE FROM blocks; DELETE FROM areas; DELETE FROM contractors;
             DELETE FROM contract_statuses; DELETE FROM contract_types;",
        )?;

        for t in &data.contract_types {
            tx.execute(
                "INSERT INTO contract_types (id, name) VALUES (?1, ?2)",
                params![t.id, t.name],
            )?;
        }
        for s in &data.contract_statuses {
            tx.execute(
                "INSERT INTO contract_statuses (id, name) VALUES (?1, ?2)",
                params![s.id, s.name],
            )?;
        }
        for c in &data.contractors {
            tx.execute(
                "INSERT INTO contractors (id, name, contract_type_id, contract_status_id,
                    sponsoring_state, contractual_year, contract_number, remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.name,
                    c.contract_type_id,
                    c.contract_status_id,
                    c.sponsoring_state,
                    c.contractual_year,
                    c.contract_number,
                    c.remarks
                ],
            )?;
        }
        for a in &data.areas {
            tx.execute(
                "INSERT INTO areas (id, contractor_id, name, boundary, center_lat, center_lng,
                    total_size_km2)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    a.id,
                    a.contractor_id,
                    a.name,
                    a.boundary,
                    a.center.map(|c| c.latitude),
                    a.center.map(|c| c.longitude),
                    a.total_size_km2
                ],
            )?;
        }
        for b in &data.blocks {
            tx.execute(
                "INSERT INTO blocks (id, area_id, name, status, boundary, center_lat, center_lng,
                    size_km2, category, resource_density, economic_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    b.id,
                    b.area_id,
                    b.name,
                    b.status,
                    b.boundary,
                    b.center.map(|c| c.latitude),
                    b.center.map(|c| c.longitude),
                    b.size_km2,
                    b.category,
                    b.resource_density,
                    b.economic_value
                ],
            )?;
        }
        for c in &data.cruises {
            tx.execute(
                "INSERT INTO cruises (id, contractor_id, name, vessel, start_date, end_date,
                    center_lat, center_lng)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.contractor_id,
                    c.name,
                    c.vessel,
                    c.start_date,
                    c.end_date,
                    c.center.map(|p| p.latitude),
                    c.center.map(|p| p.longitude)
                ],
            )?;
        }
        for s in &data.stations {
            tx.execute(
                "INSERT INTO stations (id, cruise_id, code, station_type, latitude, longitude,
                    block_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    s.id,
                    s.cruise_id,
                    s.code,
                    s.station_type,
                    s.latitude,
                    s.longitude,
                    s.block_id
                ],
            )?;
        }
        for s in &data.samples {
            tx.execute(
                "INSERT INTO samples (id, station_id, code, sample_type, matrix_type, habitat_type,
                    device, depth_upper, depth_lower, description, analysis, result, unit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    s.id,
                    s.station_id,
                    s.code,
                    s.sample_type,
                    s.matrix_type,
                    s.habitat_type,
                    s.device,
                    s.depth_upper,
                    s.depth_lower,
                    s.description,
                    s.analysis,
                    s.result,
                    s.unit
                ],
            )?;
        }
        for r in &data.env_results {
            tx.execute(
                "INSERT INTO env_results (id, sample_id, category, name, value, unit, remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![r.id, r.sample_id, r.category, r.name, r.value, r.unit, r.remarks],
            )?;
        }
        for r in &data.geo_results {
            tx.execute(
                "INSERT INTO geo_results (id, sample_id, category, analysis, value, unit,
                    qualifier, remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    r.id,
                    r.sample_id,
                    r.category,
                    r.analysis,
                    r.value,
                    r.unit,
                    r.qualifier,
                    r.remarks
                ],
            )?;
        }
        for m in &data.media {
            tx.execute(
                "INSERT INTO media (id, sample_id, file_name, media_type, camera_specs,
                    capture_date, remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    m.id,
                    m.sample_id,
                    m.file_name,
                    m.media_type,
                    m.camera_specs,
                    m.capture_date,
                    m.remarks
                ],
            )?;
        }

        tx.commit()?;
        info!(
            "[persistence] imported {} contractors, {} blocks, {} stations, {} samples",
            data.contractors.len(),
            data.blocks.len(),
            data.stations.len(),
            data.samples.len()
        );
        Ok(())
    }

    /// Read every table back into a dataset.
    pub fn export(&self) -> Result<Dataset> {
        Ok(Dataset {
            contract_types: self.contract_types()?,
            contract_statuses: self.contract_statuses()?,
            contractors: self.contractors()?,
            areas: self.areas()?,
            blocks: self.blocks()?,
            cruises: self.cruises()?,
            stations: self.stations()?,
            samples: self.samples()?,
            env_results: self.env_results()?,
            geo_results: self.geo_results()?,
            media: self.media()?,
        })
    }

    // ========================================================================
    // Row mapping
    // ========================================================================

    fn query_all<T>(
        &self,
        sql: &str,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    fn station_from_row(row: &Row<'_>) -> rusqlite::Result<Station> {
        Ok(Station {
            id: row.get(0)?,
            cruise_id: row.get(1)?,
            code: row.get(2)?,
            station_type: row.get(3)?,
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            block_id: row.get(6)?,
        })
    }
}

const STATION_COLUMNS: &str =
    "SELECT id, cruise_id, code, station_type, latitude, longitude, block_id FROM stations";

impl EntitySource for SqliteEntityStore {
    fn contract_types(&self) -> Result<Vec<ContractType>> {
        self.query_all("SELECT id, name FROM contract_types ORDER BY id", |row| {
            Ok(ContractType {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
    }

    fn contract_statuses(&self) -> Result<Vec<ContractStatus>> {
        self.query_all("SELECT id, name FROM contract_statuses ORDER BY id", |row| {
            Ok(ContractStatus {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
    }

    fn contractors(&self) -> Result<Vec<Contractor>> {
        self.query_all(
            "SELECT id, name, contract_type_id, contract_status_id, sponsoring_state,
                contractual_year, contract_number, remarks
             FROM contractors ORDER BY id",
            |row| {
                Ok(Contractor {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    contract_type_id: row.get(2)?,
                    contract_status_id: row.get(3)?,
                    sponsoring_state: row.get(4)?,
                    contractual_year: row.get(5)?,
                    contract_number: row.get(6)?,
                    remarks: row.get(7)?,
                })
            },
        )
    }

    fn areas(&self) -> Result<Vec<Area>> {
        self.query_all(
            "SELECT id, contractor_id, name, boundary, center_lat, center_lng, total_size_km2
             FROM areas ORDER BY id",
            |row| {
                Ok(Area {
                    id: row.get(0)?,
                    contractor_id: row.get(1)?,
                    name: row.get(2)?,
                    boundary: row.get(3)?,
                    center: center_from(row.get(4)?, row.get(5)?),
                    total_size_km2: row.get(6)?,
                })
            },
        )
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        self.query_all(
            "SELECT id, area_id, name, status, boundary, center_lat, center_lng, size_km2,
                category, resource_density, economic_value
             FROM blocks ORDER BY id",
            |row| {
                Ok(Block {
                    id: row.get(0)?,
                    area_id: row.get(1)?,
                    name: row.get(2)?,
                    status: row.get(3)?,
                    boundary: row.get(4)?,
                    center: center_from(row.get(5)?, row.get(6)?),
                    size_km2: row.get(7)?,
                    category: row.get(8)?,
                    resource_density: row.get(9)?,
                    economic_value: row.get(10)?,
                })
            },
        )
    }

    fn cruises(&self) -> Result<Vec<Cruise>> {
        self.query_all(
            "SELECT id, contractor_id, name, vessel, start_date, end_date, center_lat, center_lng
             FROM cruises ORDER BY id",
            |row| {
                Ok(Cruise {
                    id: row.get(0)?,
                    contractor_id: row.get(1)?,
                    name: row.get(2)?,
                    vessel: row.get(3)?,
                    start_date: row.get(4)?,
                    end_date: row.get(5)?,
                    center: center_from(row.get(6)?, row.get(7)?),
                })
            },
        )
    }

    fn stations(&self) -> Result<Vec<Station>> {
        self.query_all(&format!("{} ORDER BY id", STATION_COLUMNS), Self::station_from_row)
    }

    fn samples(&self) -> Result<Vec<Sample>> {
        self.query_all(
            "SELECT id, station_id, code, sample_type, matrix_type, habitat_type, device,
                depth_upper, depth_lower, description, analysis, result, unit
             FROM samples ORDER BY id",
            |row| {
                Ok(Sample {
                    id: row.get(0)?,
                    station_id: row.get(1)?,
                    code: row.get(2)?,
                    sample_type: row.get(3)?,
                    matrix_type: row.get(4)?,
                    habitat_type: row.get(5)?,
                    device: row.get(6)?,
                    depth_upper: row.get(7)?,
                    depth_lower: row.get(8)?,
                    description: row.get(9)?,
                    analysis: row.get(10)?,
                    result: row.get(11)?,
                    unit: row.get(12)?,
                })
            },
        )
    }

    fn env_results(&self) -> Result<Vec<EnvResult>> {
        self.query_all(
            "SELECT id, sample_id, category, name, value, unit, remarks
             FROM env_results ORDER BY id",
            |row| {
                Ok(EnvResult {
                    id: row.get(0)?,
                    sample_id: row.get(1)?,
                    category: row.get(2)?,
                    name: row.get(3)?,
                    value: row.get(4)?,
                    unit: row.get(5)?,
                    remarks: row.get(6)?,
                })
            },
        )
    }

    fn geo_results(&self) -> Result<Vec<GeoResult>> {
        self.query_all(
            "SELECT id, sample_id, category, analysis, value, unit, qualifier, remarks
             FROM geo_results ORDER BY id",
            |row| {
                Ok(GeoResult {
                    id: row.get(0)?,
                    sample_id: row.get(1)?,
                    category: row.get(2)?,
                    analysis: row.get(3)?,
                    value: row.get(4)?,
                    unit: row.get(5)?,
                    qualifier: row.get(6)?,
                    remarks: row.get(7)?,
                })
            },
        )
    }

    fn media(&self) -> Result<Vec<Media>> {
        self.query_all(
            "SELECT id, sample_id, file_name, media_type, camera_specs, capture_date, remarks
             FROM media ORDER BY id",
            |row| {
                Ok(Media {
                    id: row.get(0)?,
                    sample_id: row.get(1)?,
                    file_name: row.get(2)?,
                    media_type: row.get(3)?,
                    camera_specs: row.get(4)?,
                    capture_date: row.get(5)?,
                    remarks: row.get(6)?,
                })
            },
        )
    }

    fn stations_in_block(&self, block_id: BlockId) -> Result<Vec<Station>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} WHERE block_id = ?1 ORDER BY id", STATION_COLUMNS))?;
        let rows = stmt.query_map(params![block_id], Self::station_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Station>>>()?)
    }
}

impl StationWriter for SqliteEntityStore {
    fn save_station_blocks(&self, updates: &[(StationId, BlockId)]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut block_exists = tx.prepare("SELECT 1 FROM blocks WHERE id = ?1")?;
            let mut update = tx.prepare("UPDATE stations SET block_id = ?1 WHERE id = ?2")?;

            for &(station_id, block_id) in updates {
                let found: Option<i64> = block_exists
                    .query_row(params![block_id], |row| row.get(0))
                    .optional()?;
                if found.is_none() {
                    // Dropping the transaction rolls back earlier rows
                    return Err(SeabedError::Integrity {
                        entity: "station",
                        id: station_id,
                        missing: "block",
                        missing_id: block_id,
                    });
                }
                let changed = update.execute(params![block_id, station_id])?;
                (changed > 0)
                    .then_some(())
                    .ok_or_not_found("station", station_id)?;
            }
        }
        tx.commit()?;
        debug!("[persistence] saved {} station block assignments", updates.len());
        Ok(updates.len())
    }
}
