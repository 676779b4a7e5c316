//! Archive extraction
//!
//! Cask artifacts are usually `.zip` (often `Foo.app.zip`) or `.tar.gz`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// Errors raised while unpacking an artifact.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The artifact is a container we cannot open.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The archive is corrupt or contains an unsafe path.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Container formats the installer can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// `.zip`, including `.app.zip`.
    Zip,
    /// `.tar.gz` / `.tgz`.
    TarGz,
    /// Uncompressed `.tar`.
    Tar,
    /// Disk images need `hdiutil`, which is not supported.
    Dmg,
    /// Flat installer packages are not supported.
    Pkg,
    /// Anything else: copied as-is.
    Raw,
}

/// Detect archive format from file extension
pub fn detect_format(path: &Path) -> ArtifactFormat {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        ArtifactFormat::TarGz
    } else if path_str.ends_with(".tar") {
        ArtifactFormat::Tar
    } else if path_str.ends_with(".zip") {
        ArtifactFormat::Zip
    } else if path_str.ends_with(".dmg") {
        ArtifactFormat::Dmg
    } else if path_str.ends_with(".pkg") {
        ArtifactFormat::Pkg
    } else {
        ArtifactFormat::Raw
    }
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let gz_decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    extract_tar(gz_decoder, dest_dir)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path: PathBuf = entry.path()?.components().collect();

        // Zip Slip
        if relative_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(invalid_path(&relative_path));
        }

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name()?
                .ok_or_else(|| invalid_path(&relative_path))?
                .into_owned();
            // Hard link targets are archive paths, symlinks are relative to their directory.
            let base = if kind.is_symlink() {
                relative_path.parent().unwrap_or(Path::new(""))
            } else {
                Path::new("")
            };
            if !stays_inside(base, &target) {
                return Err(unsafe_link(&relative_path, &target));
            }
        }

        // `unpack_in` refuses to write through a symlink that leaves `dest_dir`.
        if !entry.unpack_in(dest_dir)? {
            return Err(invalid_path(&relative_path));
        }
        count += 1;
    }

    Ok(count)
}

/// Extract a zip archive, restoring unix modes and symlinks.
///
/// App bundles rely on both: `Contents/MacOS/<exe>` must stay executable and
/// frameworks are full of version symlinks.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let root = dest_dir.canonicalize()?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(invalid_path(Path::new(file.name())));
        };
        let absolute_path = dest_dir.join(&relative_path);

        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            ensure_within(&root, &absolute_path, &relative_path)?;
            continue;
        }
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
            ensure_within(&root, p, &relative_path)?;
        }

        #[cfg(unix)]
        if file.is_symlink() {
            let mut target = String::new();
            file.read_to_string(&mut target)?;
            let base = relative_path.parent().unwrap_or(Path::new(""));
            if !stays_inside(base, Path::new(&target)) {
                return Err(unsafe_link(&relative_path, Path::new(&target)));
            }
            std::os::unix::fs::symlink(target, &absolute_path)?;
            count += 1;
            continue;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }
        count += 1;
    }

    Ok(count)
}

fn invalid_path(path: &Path) -> ExtractError {
    ExtractError::Archive(format!("Invalid path in archive: {}", path.display()))
}

fn unsafe_link(path: &Path, target: &Path) -> ExtractError {
    ExtractError::Archive(format!(
        "Link escapes extraction directory: {} -> {}",
        path.display(),
        target.display()
    ))
}

/// Whether `target`, taken relative to the archive directory `base`, stays
/// under the archive root. Purely lexical: absolute targets never do.
fn stays_inside(base: &Path, target: &Path) -> bool {
    let mut depth = base
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    for c in target.components() {
        match c {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// `path` must exist; fails if it resolves outside the canonical `root`.
fn ensure_within(root: &Path, path: &Path, entry: &Path) -> Result<(), ExtractError> {
    if path.canonicalize()?.starts_with(root) {
        Ok(())
    } else {
        Err(invalid_path(entry))
    }
}

/// Extract an archive into `dest_dir`, auto-detecting the format.
///
/// Returns the number of entries written.
pub fn extract_auto(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    match detect_format(archive_path) {
        ArtifactFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArtifactFormat::Tar => extract_tar(BufReader::new(File::open(archive_path)?), dest_dir),
        ArtifactFormat::Zip => extract_zip(archive_path, dest_dir),
        ArtifactFormat::Dmg | ArtifactFormat::Pkg => Err(ExtractError::UnsupportedFormat(
            archive_path.display().to_string(),
        )),
        ArtifactFormat::Raw => {
            fs::create_dir_all(dest_dir)?;
            let filename = archive_path
                .file_name()
                .ok_or_else(|| ExtractError::Archive("Invalid filename".to_string()))?;
            fs::copy(archive_path, dest_dir.join(filename))?;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("mdiew-aarch64-apple-darwin.app.zip")),
            ArtifactFormat::Zip
        );
        assert_eq!(detect_format(Path::new("foo.tar.gz")), ArtifactFormat::TarGz);
        assert_eq!(detect_format(Path::new("foo.tgz")), ArtifactFormat::TarGz);
        assert_eq!(detect_format(Path::new("BAZ.ZIP")), ArtifactFormat::Zip);
        assert_eq!(detect_format(Path::new("Foo.dmg")), ArtifactFormat::Dmg);
        assert_eq!(detect_format(Path::new("foo")), ArtifactFormat::Raw);
    }

    #[test]
    fn test_extract_zip_bundle() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("Demo.app.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&src).unwrap());
            let opts = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            zip.add_directory("Demo.app/Contents/MacOS/", opts).unwrap();
            zip.start_file("Demo.app/Contents/MacOS/Demo", opts).unwrap();
            zip.write_all(b"#!/bin/sh\n").unwrap();
            zip.finish().unwrap();
        }

        let dest = dir.path().join("out");
        extract_auto(&src, &dest).unwrap();

        let exe = dest.join("Demo.app/Contents/MacOS/Demo");
        assert!(exe.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&exe).unwrap().permissions().mode() & 0o111, 0o111);
        }
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("demo.tar.gz");
        {
            let enc = flate2::write::GzEncoder::new(
                File::create(&src).unwrap(),
                flate2::Compression::default(),
            );
            let mut builder = tar::Builder::new(enc);
            let data = b"plist";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "Demo.app/Contents/Info.plist", &data[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = dir.path().join("out");
        assert_eq!(extract_auto(&src, &dest).unwrap(), 1);
        assert!(dest.join("Demo.app/Contents/Info.plist").exists());
    }

    fn outside_dir(dir: &Path) -> PathBuf {
        let outside = dir.join("outside");
        fs::create_dir_all(&outside).unwrap();
        outside
    }

    #[test]
    fn test_zip_symlink_cannot_escape() {
        let dir = tempdir().unwrap();
        let outside = outside_dir(dir.path());

        for target in [outside.to_str().unwrap(), "../../outside"] {
            let src = dir.path().join("Evil.app.zip");
            {
                let mut zip = zip::ZipWriter::new(File::create(&src).unwrap());
                let opts = zip::write::SimpleFileOptions::default();
                zip.add_symlink("Evil.app/link", target, opts).unwrap();
                zip.start_file("Evil.app/link/pwned", opts).unwrap();
                zip.write_all(b"gotcha").unwrap();
                zip.finish().unwrap();
            }

            let dest = dir.path().join("out");
            let err = extract_auto(&src, &dest).unwrap_err();
            assert!(matches!(err, ExtractError::Archive(_)), "{err}");
            assert!(!outside.join("pwned").exists());
            fs::remove_dir_all(&dest).unwrap();
        }
    }

    #[test]
    fn test_zip_internal_symlink_is_kept() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("Demo.app.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&src).unwrap());
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("Demo.app/Contents/Frameworks/A/lib", opts).unwrap();
            zip.write_all(b"lib").unwrap();
            zip.add_symlink("Demo.app/Contents/Frameworks/Current", "A", opts)
                .unwrap();
            zip.finish().unwrap();
        }

        let dest = dir.path().join("out");
        assert_eq!(extract_auto(&src, &dest).unwrap(), 2);
        assert!(dest.join("Demo.app/Contents/Frameworks/Current/lib").exists());
    }

    #[test]
    fn test_zip_parent_dir_entry_rejected() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("evil.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&src).unwrap());
            zip.start_file("../evil", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"gotcha").unwrap();
            zip.finish().unwrap();
        }

        let dest = dir.path().join("out");
        assert!(matches!(
            extract_auto(&src, &dest),
            Err(ExtractError::Archive(_))
        ));
        assert!(!dir.path().join("evil").exists());
    }

    fn tar_with(build: impl FnOnce(&mut tar::Builder<File>)) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let mut builder = tar::Builder::new(File::create(dir.path().join("evil.tar")).unwrap());
        build(&mut builder);
        builder.into_inner().unwrap();
        dir
    }

    #[test]
    fn test_tar_symlink_cannot_escape() {
        let outside_root = tempdir().unwrap();
        let outside = outside_dir(outside_root.path());
        let dir = tar_with(|b| {
            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_link_name(&outside).unwrap();
            b.append_data(&mut link, "Evil.app/link", io::empty()).unwrap();

            let mut file = tar::Header::new_gnu();
            file.set_size(6);
            file.set_mode(0o644);
            b.append_data(&mut file, "Evil.app/link/pwned", &b"gotcha"[..])
                .unwrap();
        });

        let dest = dir.path().join("out");
        assert!(matches!(
            extract_auto(&dir.path().join("evil.tar"), &dest),
            Err(ExtractError::Archive(_))
        ));
        assert!(!outside.join("pwned").exists());
    }

    #[test]
    fn test_tar_parent_dir_entry_rejected() {
        let dir = tar_with(|b| {
            let data = b"gotcha";
            let mut header = tar::Header::new_old();
            // The builder refuses `..` paths, so write the name field directly.
            header.as_old_mut().name[..7].copy_from_slice(b"../evil");
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            b.append(&header, &data[..]).unwrap();
        });

        let dest = dir.path().join("out");
        assert!(matches!(
            extract_auto(&dir.path().join("evil.tar"), &dest),
            Err(ExtractError::Archive(_))
        ));
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn test_dmg_is_unsupported() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("Demo.dmg");
        fs::write(&src, b"koly").unwrap();
        assert!(matches!(
            extract_auto(&src, &dir.path().join("out")),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_extract_raw_copies() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("tool");
        fs::write(&src, b"binary content").unwrap();

        let dest = dir.path().join("extracted");
        assert_eq!(extract_auto(&src, &dest).unwrap(), 1);
        assert!(dest.join("tool").exists());
    }
}
