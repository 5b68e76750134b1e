//! `SQLite` database handle for the PlayVault server.

playvault_core::define_database!(Database, "Server database migrations complete");
