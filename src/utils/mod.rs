pub mod collection_ext;
pub mod dataset_file;
pub mod error;
pub mod output;
pub mod string_ext;
pub mod time_window;

pub use collection_ext::{group_by, vec_to_map};
pub use dataset_file::{read_frame_csv, write_frame_csv};
pub use error::{ApiError, ApiResult};
pub use output::{OutputFormat, error_document, render};
pub use string_ext::{StringExt, clean_optional_string, normalize_optional_value, normalize_value};
pub use time_window::TimeWindow;
