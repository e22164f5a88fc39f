// Odoo MCP Gate - Database Import Preparation
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Validates an Odoo backup .zip, unpacks it to the fixed import directory,
// checks for dump.sql and describes the manual restore. Never touches a
// live database.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::EnvironmentProfile;
use crate::error::ToolError;
use crate::paths::expand_home;

pub const DUMP_FILE: &str = "dump.sql";
pub const FILESTORE_DIR: &str = "filestore";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub archive: PathBuf,
    pub extract_dir: PathBuf,
    pub entries: usize,
    pub sha256: String,
    pub has_filestore: bool,
}

impl ImportReport {
    /// Manual restore procedure
    pub fn message(&self, filestore_root: &Path) -> String {
        let dir = self.extract_dir.display();
        let mut msg = format!(
            "Database import requires manual steps:\n\n\
             Archive: {} ({} entries, sha256 {})\n\n\
             1. Backup extracted to: {}\n\
             2. Create/restore PostgreSQL database:\n   \
                dropdb database_name\n   \
                createdb database_name\n   \
                psql database_name < {}/{}\n\n",
            self.archive.display(),
            self.entries,
            self.sha256,
            dir,
            dir,
            DUMP_FILE,
        );
        if self.has_filestore {
            msg.push_str(&format!(
                "3. Restore filestore:\n   cp -r {}/{}/* {}/database_name/\n\n",
                dir,
                FILESTORE_DIR,
                filestore_root.display(),
            ));
        } else {
            msg.push_str("3. No filestore in this backup; skip the filestore restore.\n\n");
        }
        msg.push_str(
            "4. Update odoo.conf with database name\n\
             5. Restart Odoo\n\n\
             Note: Full automation of this process requires PostgreSQL credentials and is not yet implemented.",
        );
        msg
    }
}

/// Relative backup paths are taken from the profile root
fn locate(profile: &EnvironmentProfile, backup_file: &str) -> PathBuf {
    let path = expand_home(backup_file.trim());
    if path.is_absolute() {
        path
    } else {
        profile.root.join(path)
    }
}

fn sha256_file(path: &Path) -> Result<String, ToolError> {
    let mut file = File::open(path).map_err(|e| ToolError::io(format!("Failed to open {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| ToolError::io(format!("Failed to read {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Unpack every entry that stays inside `dest`. Returns the number written.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, ToolError> {
    use zip::ZipArchive;

    let file = File::open(archive_path)
        .map_err(|e| ToolError::io(format!("Failed to open {}", archive_path.display()), e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ToolError::ArchiveInvalid(format!("{} is not a readable zip: {}", archive_path.display(), e)))?;

    log::info!("Extracting {} entries from {:?} to {:?}", archive.len(), archive_path, dest);

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ToolError::ArchiveInvalid(format!("unreadable entry #{}: {}", i, e)))?;

        // zip slip: entries naming paths outside dest are dropped
        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                log::warn!("Skipping unsafe archive entry {:?}", entry.name());
                continue;
            }
        };
        let outpath = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| ToolError::io(format!("Failed to create {}", outpath.display()), e))?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::io(format!("Failed to create {}", parent.display()), e))?;
        }
        let mut out = File::create(&outpath)
            .map_err(|e| ToolError::io(format!("Failed to create {}", outpath.display()), e))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| ToolError::io(format!("Failed to extract {}", relative.display()), e))?;
        written += 1;
    }
    Ok(written)
}

/// Validate, unpack and verify a backup archive
pub fn prepare_import(
    profile: &EnvironmentProfile,
    backup_file: &str,
    extract_dir: &Path,
) -> Result<ImportReport, ToolError> {
    let archive = locate(profile, backup_file);
    if !archive.is_file() {
        return Err(ToolError::FileNotFound(archive));
    }
    let is_zip = archive
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if !is_zip {
        return Err(ToolError::ArchiveInvalid(format!(
            "Backup file must be a .zip file: {}",
            archive.display()
        )));
    }

    let sha256 = sha256_file(&archive)?;

    // a dump.sql left by an earlier import must not satisfy the check below
    if extract_dir.exists() {
        std::fs::remove_dir_all(extract_dir)
            .map_err(|e| ToolError::io(format!("Failed to clear {}", extract_dir.display()), e))?;
    }
    std::fs::create_dir_all(extract_dir)
        .map_err(|e| ToolError::io(format!("Failed to create {}", extract_dir.display()), e))?;

    let entries = extract_zip(&archive, extract_dir)?;

    if !extract_dir.join(DUMP_FILE).is_file() {
        return Err(ToolError::ArchiveInvalid(format!(
            "{} not found in backup archive {}",
            DUMP_FILE,
            archive.display()
        )));
    }

    Ok(ImportReport {
        archive,
        extract_dir: extract_dir.to_path_buf(),
        entries,
        sha256,
        has_filestore: extract_dir.join(FILESTORE_DIR).is_dir(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let mut zip = zip::ZipWriter::new(File::create(path)?);
        let options = SimpleFileOptions::default();
        for (name, body) in files {
            zip.start_file(*name, options)?;
            zip.write_all(body)?;
        }
        zip.finish()?;
        Ok(())
    }

    fn profile(root: &Path) -> EnvironmentProfile {
        EnvironmentProfile::new("odoo18", root, "Odoo 18")
    }

    #[test]
    fn valid_backup_is_extracted_and_described() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("acme.zip");
        write_zip(
            &archive,
            &[
                ("dump.sql", b"CREATE TABLE res_partner ();"),
                ("manifest.json", b"{}"),
                ("filestore/ab/abcdef", b"blob"),
            ],
        )?;
        let target = dir.path().join("import");
        let report = prepare_import(&profile(dir.path()), archive.to_str().unwrap(), &target)?;

        assert_eq!(report.entries, 3);
        assert!(report.has_filestore);
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(std::fs::read_to_string(target.join("dump.sql"))?, "CREATE TABLE res_partner ();");

        let text = report.message(Path::new("/home/dev/.local/share/Odoo/filestore"));
        assert!(text.contains("psql database_name <"));
        assert!(text.contains("/home/dev/.local/share/Odoo/filestore/database_name/"));
        assert!(text.contains("Restart Odoo"));
        Ok(())
    }

    #[test]
    fn relative_path_resolves_against_profile_root() -> anyhow::Result<()> {
        let dir = tempdir()?;
        write_zip(&dir.path().join("backup.zip"), &[("dump.sql", b"--")])?;
        let report = prepare_import(&profile(dir.path()), "backup.zip", &dir.path().join("out"))?;
        assert!(!report.has_filestore);
        assert!(report.message(Path::new("/fs")).contains("No filestore"));
        Ok(())
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = prepare_import(&profile(dir.path()), "/nope/backup.zip", &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(ref p) if p == Path::new("/nope/backup.zip")));
    }

    #[test]
    fn wrong_extension_is_invalid_and_nothing_extracted() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let dump = dir.path().join("backup.tar.gz");
        std::fs::write(&dump, b"not a zip")?;
        let out = dir.path().join("out");
        let err = prepare_import(&profile(dir.path()), dump.to_str().unwrap(), &out).unwrap_err();
        assert!(matches!(err, ToolError::ArchiveInvalid(ref m) if m.contains(".zip")));
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn archive_without_dump_is_invalid() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("partial.zip");
        write_zip(&archive, &[("nested/dump.sql", b"--"), ("manifest.json", b"{}")])?;
        let err = prepare_import(&profile(dir.path()), archive.to_str().unwrap(), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, ToolError::ArchiveInvalid(ref m) if m.contains("dump.sql")));
        Ok(())
    }

    #[test]
    fn stale_dump_from_previous_import_does_not_count() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out)?;
        std::fs::write(out.join("dump.sql"), "old")?;
        let archive = dir.path().join("empty.zip");
        write_zip(&archive, &[("manifest.json", b"{}")])?;
        let err = prepare_import(&profile(dir.path()), archive.to_str().unwrap(), &out).unwrap_err();
        assert!(matches!(err, ToolError::ArchiveInvalid(_)));
        Ok(())
    }

    #[test]
    fn corrupt_zip_is_invalid() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("corrupt.zip");
        std::fs::write(&archive, b"PK\x03\x04 garbage")?;
        let err = prepare_import(&profile(dir.path()), archive.to_str().unwrap(), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, ToolError::ArchiveInvalid(_)));
        Ok(())
    }
}
