use crate::config::loader::{CompilerConfig, ServiceConfig};
use crate::config::types::{CompileOutcome, ExecutionRequest, ExecutionResult, Result};
use crate::exec::compiler::Compiler;
use crate::exec::runner::Runner;
use crate::judge::{adapter_for, JudgeAdapter};
use crate::observability::usage;
use crate::safety::workspace::{WorkArea, WorkspaceManager};
use crate::utils::output::OutputLimits;
use std::path::Path;
use std::time::Duration;

/// Composes the compiler and runner stages for one request at a time.
///
/// Holds configuration only; every `execute` call owns its own work area, so
/// one instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    workspaces: WorkspaceManager,
    compiler_config: CompilerConfig,
    compiler: Compiler,
    runner: Runner,
}

impl Orchestrator {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let limits = OutputLimits::from(&config.output);
        Ok(Self {
            workspaces: WorkspaceManager::new(config.workspace_root.clone())?,
            compiler_config: config.compiler.clone(),
            compiler: Compiler::from_config(&config.compiler, limits.clone()),
            runner: Runner::from_config(&config.runner, limits),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        self.workspaces.base_dir()
    }

    pub fn sweep_stale_work_areas(&self, max_age: Duration) -> Result<usize> {
        self.workspaces.sweep_stale(max_age)
    }

    /// Validate raw fields and run the pipeline.
    ///
    /// Rejections (empty code, unsupported language) return before any work
    /// area exists or any process is spawned.
    pub fn submit(&self, code: &str, language: &str, test_input: &str) -> Result<ExecutionResult> {
        let request = ExecutionRequest::new(code, language, test_input)?;
        self.execute(&request)
    }

    /// Run one request through compile and, on success, run.
    ///
    /// `Err` is reserved for infrastructure failures. The work area is
    /// removed before returning on every path.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let adapter = adapter_for(request.language(), &self.compiler_config);
        let area = self.workspaces.create_work_area()?;
        let id = area.id().to_string();

        let result = self.execute_in(&area, adapter.as_ref(), request);

        if let Err(e) = area.close() {
            log::warn!("[{}] {}", id, e);
        }
        match &result {
            Ok(r) => log::info!("[{}] finished with {}", id, r.status()),
            Err(e) => log::error!("[{}] pipeline failed: {}", id, e),
        }
        result
    }

    fn execute_in(
        &self,
        area: &WorkArea,
        adapter: &dyn JudgeAdapter,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        let source = area.write_source(adapter.source_file_name(), request.code())?;
        let artifact = area.artifact_path(adapter.artifact_file_name());

        log::debug!("[{}] compiling", area.id());
        match self.compiler.compile(adapter, &source, &artifact)? {
            CompileOutcome::Failed(diagnostic) => Ok(ExecutionResult::compile_failed(
                diagnostic,
                usage::sample(Duration::ZERO),
            )),
            CompileOutcome::Compiled(artifact) => {
                log::debug!("[{}] running", area.id());
                let run = self.runner.run(adapter, &artifact, request.test_input())?;
                let usage = usage::sample(run.elapsed);
                Ok(ExecutionResult::from_run(run, usage))
            }
        }
    }
}
