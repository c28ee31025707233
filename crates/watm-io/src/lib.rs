//! Dataset store adapter: reads the immutable scenario dataset from a
//! directory of Parquet/CSV tables and writes query results back out.

pub mod export;
pub mod frame;
pub mod store;

pub use export::{series_frame_to_dataframe, write_series_frame};
pub use frame::{read_frame, write_frame};
pub use store::{DatasetStore, LEGACY_SCENARIO_ID, VARIABLES_MAP_FILE};
