pub mod check;
pub mod edit;
pub mod generate;
pub mod init;
pub mod list;
pub mod preview;

use std::path::Path;

use scenereel_scene_model::LoadedManifest;

/// Load a manifest, with the path in the error message.
pub(crate) fn load_manifest(path: &Path) -> anyhow::Result<LoadedManifest> {
    LoadedManifest::load(path).map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))
}

/// Convert a 1-based scene number from the command line to an index.
pub(crate) fn scene_index(number: usize) -> anyhow::Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Scene numbers start at 1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_numbers_are_one_based() {
        assert_eq!(scene_index(1).unwrap(), 0);
        assert_eq!(scene_index(4).unwrap(), 3);
        assert!(scene_index(0).is_err());
    }
}
