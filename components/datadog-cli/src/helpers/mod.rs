pub mod clock;
pub mod load_config;
pub mod paths;
