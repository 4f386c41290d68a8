use crate::RenderError;
use std::path::{Path, PathBuf};

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

const HEADER_WORDS: usize = 5;

/// A compiled SPIR-V module read from disk.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    path: PathBuf,
    words: Vec<u32>,
}

impl ShaderCode {
    /// Read and validate a SPIR-V file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RenderError::ShaderRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Validate `bytes` as SPIR-V. Either byte order is accepted; words are
    /// returned in native order.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self, RenderError> {
        let path = path.into();
        let invalid = |reason: String| RenderError::InvalidShader {
            path: path.clone(),
            reason,
        };

        if bytes.len() % 4 != 0 {
            return Err(invalid(format!(
                "length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let mut words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if words.len() < HEADER_WORDS {
            return Err(invalid(format!("{} words is shorter than the header", words.len())));
        }
        match words[0] {
            SPIRV_MAGIC => {}
            m if m.swap_bytes() == SPIRV_MAGIC => {
                for w in &mut words {
                    *w = w.swap_bytes();
                }
            }
            m => return Err(invalid(format!("bad magic number {m:#010x}"))),
        }

        Ok(Self { path, words })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(magic: u32) -> Vec<u8> {
        let mut bytes = magic.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn accepts_little_endian_module() {
        let code = ShaderCode::from_bytes("v.spv", &module_bytes(SPIRV_MAGIC)).unwrap();
        assert_eq!(code.words()[0], SPIRV_MAGIC);
        assert_eq!(code.words().len(), 5);
    }

    #[test]
    fn accepts_big_endian_module() {
        let code = ShaderCode::from_bytes("v.spv", &module_bytes(SPIRV_MAGIC.swap_bytes())).unwrap();
        assert_eq!(code.words()[0], SPIRV_MAGIC);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = ShaderCode::from_bytes("v.spv", &module_bytes(0xdead_beef)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidShader { .. }));
    }

    #[test]
    fn rejects_truncated_module() {
        assert!(ShaderCode::from_bytes("v.spv", &[3, 2, 35]).is_err());
        assert!(ShaderCode::from_bytes("v.spv", &SPIRV_MAGIC.to_le_bytes()).is_err());
    }

    #[test]
    fn rejects_partial_trailing_word() {
        let mut bytes = module_bytes(SPIRV_MAGIC);
        bytes.push(0);
        let err = ShaderCode::from_bytes("v.spv", &bytes).unwrap_err();
        let RenderError::InvalidShader { reason, .. } = &err else {
            panic!("expected InvalidShader, got {err:?}");
        };
        assert!(reason.contains("multiple of 4"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ShaderCode::from_file("/no/such/dir/vert.spv").unwrap_err();
        assert!(matches!(err, RenderError::ShaderRead { .. }));
    }
}
