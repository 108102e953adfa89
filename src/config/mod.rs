/// Database configuration and connection management
pub mod database;

/// Reference data seeding from seed.toml
pub mod seed;
