use std::path::Path;

/// Judge adapter contract for language-specific compile/run stages.
pub trait JudgeAdapter: Send + Sync {
    /// Name of the single source file inside a work area
    fn source_file_name(&self) -> &'static str;
    /// Name of the single artifact inside a work area
    fn artifact_file_name(&self) -> &'static str;
    fn compile_command(&self, source: &Path, artifact: &Path) -> Vec<String>;
    fn run_command(&self, artifact: &Path) -> Vec<String>;
}
