//! SQL for the carbon_footprint table and its verification queries.

pub const TABLE: &str = "carbon_footprint";

/// Create the target table if missing, then empty it for a clean reload.
pub fn create_and_truncate() -> &'static str {
    "CREATE TABLE IF NOT EXISTS carbon_footprint (
        year INTEGER,
        country_code INTEGER,
        country_name VARCHAR,
        short_name VARCHAR,
        isoa2 VARCHAR,
        record VARCHAR,
        crop_land DOUBLE,
        grazing_land DOUBLE,
        forest_land DOUBLE,
        fishing_ground DOUBLE,
        builtup_land DOUBLE,
        carbon DOUBLE,
        value DOUBLE,
        score VARCHAR
    );
    TRUNCATE TABLE carbon_footprint;"
}

pub fn count_rows() -> &'static str {
    "SELECT count(*) FROM carbon_footprint"
}

pub fn sample_rows() -> &'static str {
    "SELECT year, country_name, record, carbon, value \
     FROM carbon_footprint LIMIT 10"
}

/// Per-year average carbon for one country (`?` = country name).
pub fn yearly_carbon() -> &'static str {
    "SELECT year, avg(carbon) AS avg_carbon \
     FROM carbon_footprint \
     WHERE country_name = ? \
     GROUP BY year \
     ORDER BY year ASC"
}
