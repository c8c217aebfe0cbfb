pub mod formatter;

pub use formatter::{
    format_factors, format_json, format_percentage, format_result, format_tsv, should_use_colors,
};
