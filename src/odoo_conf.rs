// Odoo MCP Gate - Profile Root Layout
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// File names inside a profile root and a tiny key=value reader for
// odoo.conf. Only `db_name` is ever looked up; everything else in the
// file is Odoo's business.

use std::io;
use std::path::Path;

pub const ACTIVE_CONF: &str = "odoo.conf";
pub const BACKUP_CONF: &str = "odoo.conf.backup";
pub const LOG_FILE: &str = "odoo.log";
pub const DB_NAME_KEY: &str = "db_name";
pub const CORE_ADDONS_DIR: &str = "odoo";
pub const ENTERPRISE_DIR: &str = "enterprise";

/// `odoo-<project>.conf`
pub fn project_conf_name(project: &str) -> String {
    format!("odoo-{}.conf", project)
}

/// A project name usable as a single path component inside the root
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Value of `key` in key=value text. Comment lines (`;`, `#`) are skipped,
/// a blank value counts as absent.
pub fn read_key(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with(';') && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Database named by the active odoo.conf, if the file and key exist
pub fn current_db_name(root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join(ACTIVE_CONF)).ok()?;
    read_key(&content, DB_NAME_KEY)
}

/// `odoo*.conf` files in the root, sorted by name
pub fn list_conf_files(root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("odoo") && name.ends_with(".conf") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_db_name_with_loose_spacing() {
        let conf = "[options]\naddons_path = odoo/addons\ndb_name=   acme_prod  \nhttp_port = 8069\n";
        assert_eq!(read_key(conf, "db_name"), Some("acme_prod".to_string()));
    }

    #[test]
    fn missing_blank_or_commented_key_is_none() {
        assert_eq!(read_key("[options]\nhttp_port = 8069\n", "db_name"), None);
        assert_eq!(read_key("db_name =\n", "db_name"), None);
        assert_eq!(read_key("; db_name = old\n# db_name = older\n", "db_name"), None);
        // prefix of another key does not match
        assert_eq!(read_key("db_name_filter = .*\n", "db_name"), None);
    }

    #[test]
    fn plain_names_only() {
        assert!(is_plain_name("acme"));
        assert!(is_plain_name("acme-2024"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../etc"));
    }

    #[test]
    fn lists_only_odoo_conf_files_sorted() -> io::Result<()> {
        let dir = tempdir()?;
        for name in ["odoo.conf", "odoo-zeta.conf", "odoo-acme.conf", "odoo.conf.backup", "other.conf", "odoo.log"] {
            std::fs::write(dir.path().join(name), "")?;
        }
        let names = list_conf_files(dir.path())?;
        assert_eq!(names, vec!["odoo-acme.conf", "odoo-zeta.conf", "odoo.conf"]);
        Ok(())
    }

    #[test]
    fn current_db_name_absent_without_active_conf() -> io::Result<()> {
        let dir = tempdir()?;
        assert_eq!(current_db_name(dir.path()), None);
        std::fs::write(dir.path().join(ACTIVE_CONF), "db_name = demo\n")?;
        assert_eq!(current_db_name(dir.path()), Some("demo".to_string()));
        Ok(())
    }
}
