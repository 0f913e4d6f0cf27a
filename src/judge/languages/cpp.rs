use crate::config::loader::CompilerConfig;
use crate::judge::adapter::JudgeAdapter;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CppAdapter {
    compiler: String,
    extra_args: Vec<String>,
}

impl CppAdapter {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            compiler: config.path.clone(),
            extra_args: config.args.clone(),
        }
    }
}

impl Default for CppAdapter {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}

impl JudgeAdapter for CppAdapter {
    fn source_file_name(&self) -> &'static str {
        "main.cpp"
    }

    fn artifact_file_name(&self) -> &'static str {
        "main"
    }

    fn compile_command(&self, source: &Path, artifact: &Path) -> Vec<String> {
        let mut argv = vec![
            self.compiler.clone(),
            source.to_string_lossy().to_string(),
            "-o".to_string(),
            artifact.to_string_lossy().to_string(),
        ];
        argv.extend(self.extra_args.iter().cloned());
        argv
    }

    fn run_command(&self, artifact: &Path) -> Vec<String> {
        vec![artifact.to_string_lossy().to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_command_requests_warnings() {
        let adapter = CppAdapter::default();
        let argv = adapter.compile_command(Path::new("/w/main.cpp"), Path::new("/w/main"));
        assert_eq!(argv, vec!["g++", "/w/main.cpp", "-o", "/w/main", "-Wall"]);
    }

    #[test]
    fn test_configured_compiler_and_flags() {
        let config = CompilerConfig {
            path: "/usr/bin/clang++".to_string(),
            args: vec!["-Wall".to_string(), "-std=c++17".to_string()],
            deadline_ms: 1_000,
        };
        let argv = CppAdapter::new(&config)
            .compile_command(Path::new("main.cpp"), Path::new("main"));
        assert_eq!(argv[0], "/usr/bin/clang++");
        assert_eq!(argv.last().map(String::as_str), Some("-std=c++17"));
    }

    #[test]
    fn test_run_command_is_artifact() {
        let adapter = CppAdapter::default();
        assert_eq!(adapter.run_command(Path::new("/w/main")), vec!["/w/main"]);
    }
}
