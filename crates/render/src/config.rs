use std::path::{Path, PathBuf};

pub const VERTEX_SHADER_FILE: &str = "vert.spv";
pub const FRAGMENT_SHADER_FILE: &str = "frag.spv";

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Compiled SPIR-V vertex shader.
    pub vertex_shader: PathBuf,
    /// Compiled SPIR-V fragment shader.
    pub fragment_shader: PathBuf,
    /// RGBA clear colour for each frame.
    pub clear_color: [f64; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::from_shader_dir("shaders")
    }
}

impl RendererConfig {
    /// Look for `vert.spv` and `frag.spv` inside `dir`.
    pub fn from_shader_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vertex_shader: dir.join(VERTEX_SHADER_FILE),
            fragment_shader: dir.join(FRAGMENT_SHADER_FILE),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f64; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_shader_dir() {
        let config = RendererConfig::default();
        assert_eq!(config.vertex_shader, Path::new("shaders").join("vert.spv"));
        assert_eq!(config.fragment_shader, Path::new("shaders").join("frag.spv"));
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }
}
