pub mod chart;
pub mod composer;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
