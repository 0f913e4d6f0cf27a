use crate::config::loader::CompilerConfig;
use crate::config::types::Language;
use crate::judge::adapter::JudgeAdapter;
use crate::judge::languages::cpp::CppAdapter;

/// Adapter for an already-validated language.
pub fn adapter_for(language: Language, compiler: &CompilerConfig) -> Box<dyn JudgeAdapter> {
    match language {
        Language::Cpp => Box::new(CppAdapter::new(compiler)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cpp_resolves() {
        let adapter = adapter_for(Language::Cpp, &CompilerConfig::default());
        assert_eq!(adapter.source_file_name(), "main.cpp");
        assert_eq!(adapter.artifact_file_name(), "main");
    }

    #[test]
    fn test_compiler_config_flows_into_adapter() {
        let config = CompilerConfig {
            path: "/opt/gcc/bin/g++".to_string(),
            args: vec!["-O2".to_string()],
            ..CompilerConfig::default()
        };
        let adapter = adapter_for(Language::Cpp, &config);
        let argv = adapter.compile_command(Path::new("main.cpp"), Path::new("main"));
        assert_eq!(argv, ["/opt/gcc/bin/g++", "main.cpp", "-o", "main", "-O2"]);
    }
}
