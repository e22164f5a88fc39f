// Odoo MCP Gate - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod paths;
pub mod config;
pub mod error;
pub mod profiles;
pub mod tools;
pub mod executor;
pub mod odoo_conf;
pub mod switch;
pub mod import;
pub mod handlers;
pub mod dispatch;
pub mod mcp;
pub mod session;

// ============================================================================
// LMDB
// ============================================================================

/// SESSION.DB: LMDB-backed session journal
pub mod storage;
