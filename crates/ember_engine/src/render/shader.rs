//! Precompiled shader binaries
//!
//! SPIR-V files live under `<assets>/shaders/{vert,frag}/`. The file
//! extension is validated against the requested stage before anything is
//! uploaded; a mismatch is a reported error, never silently ignored.

use crate::core::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

/// Pipeline stage a shader binary belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    /// File extension the binary must carry
    pub fn expected_extension(self) -> &'static str {
        match self {
            Self::Vertex => ".vert.spv",
            Self::Fragment => ".frag.spv",
        }
    }

    /// Conventional subdirectory under `<assets>/shaders/`
    pub fn subdirectory(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
        }
    }
}

/// A loaded, validated SPIR-V binary
#[derive(Debug, Clone)]
pub struct ShaderBinary {
    /// Stage this binary targets
    pub stage: ShaderStage,
    /// Raw SPIR-V bytes, guaranteed to be a whole number of u32 words
    pub bytes: Vec<u8>,
}

/// Resolve the conventional path of a shader file
pub fn shader_path(asset_root: &Path, stage: ShaderStage, file_name: &str) -> PathBuf {
    asset_root
        .join("shaders")
        .join(stage.subdirectory())
        .join(file_name)
}

/// Load a shader binary from the conventional directory layout,
/// validating its extension and SPIR-V word alignment.
pub fn load_shader(
    asset_root: &Path,
    stage: ShaderStage,
    file_name: &str,
) -> EngineResult<ShaderBinary> {
    if !file_name.ends_with(stage.expected_extension()) {
        return Err(EngineError::invalid_path(
            "shader",
            format!(
                "{file_name} does not match the {} extension for a {:?} shader",
                stage.expected_extension(),
                stage
            ),
        ));
    }

    let path = shader_path(asset_root, stage, file_name);
    let bytes = std::fs::read(&path).map_err(|e| {
        EngineError::invalid_path("shader", format!("failed to open {}: {e}", path.display()))
    })?;

    if bytes.len() % std::mem::size_of::<u32>() != 0 {
        return Err(EngineError::invalid_path(
            "shader",
            format!("{} is not valid SPIR-V: length not a multiple of 4", path.display()),
        ));
    }

    log::debug!("loaded {:?} shader {} ({} bytes)", stage, path.display(), bytes.len());
    Ok(ShaderBinary { stage, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use std::fs;

    fn temp_asset_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("ember_shader_test_{tag}"));
        fs::create_dir_all(root.join("shaders/vert")).unwrap();
        fs::create_dir_all(root.join("shaders/frag")).unwrap();
        root
    }

    #[test]
    fn extension_mismatch_is_reported() {
        let root = temp_asset_root("ext");
        let err = load_shader(&root, ShaderStage::Vertex, "mesh.frag.spv").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        assert!(err.reason.contains(".vert.spv"));
    }

    #[test]
    fn missing_file_is_reported() {
        let root = temp_asset_root("missing");
        let err = load_shader(&root, ShaderStage::Fragment, "absent.frag.spv").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
    }

    #[test]
    fn misaligned_bytes_are_rejected() {
        let root = temp_asset_root("align");
        let path = root.join("shaders/vert/bad.vert.spv");
        fs::write(&path, [0u8; 7]).unwrap();

        let err = load_shader(&root, ShaderStage::Vertex, "bad.vert.spv").unwrap_err();
        assert!(err.reason.contains("multiple of 4"));
    }

    #[test]
    fn aligned_file_loads() {
        let root = temp_asset_root("ok");
        let path = root.join("shaders/frag/good.frag.spv");
        fs::write(&path, 0x0723_0203u32.to_le_bytes()).unwrap();

        let binary = load_shader(&root, ShaderStage::Fragment, "good.frag.spv").unwrap();
        assert_eq!(binary.bytes.len(), 4);
        assert_eq!(binary.stage, ShaderStage::Fragment);
    }
}
