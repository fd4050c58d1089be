//! kvseed Fixtures
//!
//! Seeds the lookup regression fixture: a data table of 100 typed rows under
//! family `col`, plus a row in the shared `pxflookup` table mapping logical
//! field names to data-table columns. Also reads those mappings back and
//! verifies a seeded store against the fixture definition.

pub mod lookup;
pub mod rows;
pub mod seeder;
pub mod verify;

pub use lookup::{LookupTable, LOOKUP_FAMILY, LOOKUP_TABLE};
pub use rows::{row_key, rows, FixtureColumn, FixtureRow, DATA_FAMILY, FIXTURE_COLUMNS};
pub use seeder::{FixtureSeeder, SeedReport, TeardownReport};
pub use verify::{digest, verify, Mismatch, VerifyReport};
