use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use framestory_ml::vision::VisionLanguageModel;

use crate::extractor::{Disposition, extract_frame_metadata};
use crate::metadata::FrameMetadata;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Image files directly inside `dir`, sorted by file name. Frames are assumed
/// to follow lexical file name order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::error!("Invalid folder path: {}", dir.display());
        bail!(
            "Folder {} does not exist or is not a directory",
            dir.display()
        );
    }

    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    Ok(collect_images(
        dir,
        entries.map(|entry| entry.map(|entry| entry.path())),
    ))
}

fn collect_images(
    dir: &Path,
    entries: impl Iterator<Item = std::io::Result<PathBuf>>,
) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if is_image(&path) => images.push(path),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("Skipping unreadable entry in {}: {err}", dir.display());
            }
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    images
}

/// Describes every image in `dir`, in file name order.
pub fn process_images_in_folder<M: VisionLanguageModel>(
    dir: &Path,
    model: &mut M,
) -> Result<Vec<FrameMetadata>> {
    let images = list_images(dir).context("Folder processing failed")?;
    tracing::info!("Found {} images in {}", images.len(), dir.display());

    let mut metadata = Vec::with_capacity(images.len());
    for path in images {
        match extract_frame_metadata(&path, model) {
            Ok(frame) => metadata.push(frame),
            Err(err) => match err.disposition() {
                Disposition::Degrade => {
                    tracing::error!("Error processing frame {}: {}", path.display(), err.kind);
                    metadata.push(err.degraded());
                }
                Disposition::Skip => {
                    tracing::warn!("Skipping image {} due to error: {}", path.display(), err.kind);
                }
                Disposition::Abort => {
                    return Err(anyhow::Error::new(err).context("Folder processing failed"));
                }
            },
        }
    }

    if metadata.is_empty() {
        tracing::warn!("No valid images found in {}", dir.display());
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image(Path::new("a.png")));
        assert!(is_image(Path::new("b.JPG")));
        assert!(is_image(Path::new("c.JpEg")));
        assert!(!is_image(Path::new("d.gif")));
        assert!(!is_image(Path::new("e.png.txt")));
        assert!(!is_image(Path::new("png")));
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let entries = vec![
            Ok(PathBuf::from("/frames/2.png")),
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
            Ok(PathBuf::from("/frames/notes.txt")),
            Ok(PathBuf::from("/frames/1.jpg")),
        ];

        let images = collect_images(Path::new("/frames"), entries.into_iter());

        assert_eq!(
            images,
            vec![PathBuf::from("/frames/1.jpg"), PathBuf::from("/frames/2.png")]
        );
    }

    #[test]
    fn missing_folder_is_fatal() {
        let err = list_images(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("does not exist or is not a directory"));
    }
}
