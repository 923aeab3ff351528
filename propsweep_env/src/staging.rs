//! Copies a simulator distribution into a repetition workspace.
//!
//! Two layouts are accepted:
//! - a `.zip` archive, extracted into the workspace as-is
//! - a directory, copied recursively under its own name
//!
//! Either way a distribution called `simulator` ends up at
//! `<workspace>/simulator/...`.

use crate::EnvError;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Stages `source` into `dest` (blocking).
pub fn stage_distribution(source: &Path, dest: &Path) -> Result<(), EnvError> {
    if source.is_dir() {
        let name = source
            .file_name()
            .ok_or_else(|| EnvError::staging(format!("distribution has no name: {}", source.display())))?;
        return copy_tree(source, &dest.join(name));
    }
    
    let is_zip = source
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if source.is_file() && is_zip {
        return extract_zip(source, dest);
    }
    
    Err(EnvError::staging(format!(
        "distribution must be a directory or .zip archive: {}",
        source.display()
    )))
}

fn copy_tree(source: &Path, dest: &Path) -> Result<(), EnvError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| EnvError::staging(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| EnvError::staging(e.to_string()))?;
        let target = dest.join(relative);
        
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), EnvError> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| EnvError::staging(format!("{}: {}", archive.display(), e)))?;
    zip.extract(dest)
        .map_err(|e| EnvError::staging(format!("{}: {}", archive.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    
    #[test]
    fn test_copy_directory_distribution() {
        let src_root = tempfile::tempdir().unwrap();
        let dist = src_root.path().join("simulator");
        fs::create_dir_all(dist.join("bin")).unwrap();
        fs::write(dist.join("bin/run.sh"), "echo hi").unwrap();
        
        let dest = tempfile::tempdir().unwrap();
        stage_distribution(&dist, dest.path()).unwrap();
        
        let copied = fs::read_to_string(dest.path().join("simulator/bin/run.sh")).unwrap();
        assert_eq!(copied, "echo hi");
    }
    
    #[test]
    fn test_extract_zip_distribution() {
        let src_root = tempfile::tempdir().unwrap();
        let archive = src_root.path().join("simulator.zip");
        {
            let file = fs::File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("simulator/conf/settings.txt", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"nodes=500").unwrap();
            writer.finish().unwrap();
        }
        
        let dest = tempfile::tempdir().unwrap();
        stage_distribution(&archive, dest.path()).unwrap();
        
        let extracted = fs::read_to_string(dest.path().join("simulator/conf/settings.txt")).unwrap();
        assert_eq!(extracted, "nodes=500");
    }
    
    #[test]
    fn test_rejects_plain_file() {
        let src_root = tempfile::tempdir().unwrap();
        let bogus = src_root.path().join("simulator.tar");
        fs::write(&bogus, "not a zip").unwrap();
        
        let dest = tempfile::tempdir().unwrap();
        let err = stage_distribution(&bogus, dest.path()).unwrap_err();
        assert!(matches!(err, EnvError::StagingError(_)));
    }
}
