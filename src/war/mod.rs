//! Web-accessible-resources patching and match-pattern handling.

mod groups;
mod patterns;

pub use groups::patch_web_accessible_resources;
pub use patterns::{
    clean_match_pattern, glob_covers, glob_to_regex, is_glob_pattern, validate_match_pattern,
};
