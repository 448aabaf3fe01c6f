//! `SQLite` database handle for the notekeep server.

notekeep_core::define_database!(Database, "Database migrations complete");
