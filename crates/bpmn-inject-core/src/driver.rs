//! File-to-file entry points: read a document, rewrite it, persist the result.

use std::path::{Path, PathBuf};

use bpmn_inject_config::Config;
use tracing::{debug, error, info};

use crate::diff::{build_unified_diff, line_changes};
use crate::error::{ExitCode, InjectResult};
use crate::fs::write_atomic;
use crate::injector::{
    Injector, InjectorSettings, DEFAULT_POST_PROCESS_TASK_NAME, DEFAULT_PRE_PROCESS_TASK_NAME,
};
use crate::model::TaskAttributes;

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub add_pre_process_task: bool,
    pub add_post_process_task: bool,
    pub pre_process_task_name: String,
    pub post_process_task_name: String,
    pub settings: InjectorSettings,
    pub dry_run: bool,
    pub backup: bool,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            add_pre_process_task: true,
            add_post_process_task: true,
            pre_process_task_name: DEFAULT_PRE_PROCESS_TASK_NAME.to_string(),
            post_process_task_name: DEFAULT_POST_PROCESS_TASK_NAME.to_string(),
            settings: InjectorSettings::default(),
            dry_run: false,
            backup: false,
        }
    }
}

impl InjectOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            add_pre_process_task: config.inject.add_pre_process_task,
            add_post_process_task: config.inject.add_post_process_task,
            pre_process_task_name: config.inject.pre_process_task_name.clone(),
            post_process_task_name: config.inject.post_process_task_name.clone(),
            settings: InjectorSettings::from(config),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct InjectOutcome {
    pub exit_code: ExitCode,
    pub changed: bool,
    pub pre_process_tasks: Vec<String>,
    pub post_process_tasks: Vec<String>,
    pub diff: Option<String>,
    pub result: String,
}

/// Reads `input`, runs the enabled injections (start side first), and writes
/// the document to `output`. Failures are logged and returned; the target is
/// only replaced once the whole document has been rewritten.
pub fn inject_service_tasks(
    input: &Path,
    output: &Path,
    options: &InjectOptions,
) -> InjectResult<InjectOutcome> {
    match run_injection(input, output, options) {
        Ok(outcome) => {
            info!(
                output = %output.display(),
                pre_process_tasks = outcome.pre_process_tasks.len(),
                post_process_tasks = outcome.post_process_tasks.len(),
                dry_run = options.dry_run,
                "injected service tasks"
            );
            Ok(outcome)
        }
        Err(err) => {
            error!(
                input = %input.display(),
                output = %output.display(),
                error = %err,
                "error injecting service tasks"
            );
            Err(err)
        }
    }
}

fn run_injection(
    input: &Path,
    output: &Path,
    options: &InjectOptions,
) -> InjectResult<InjectOutcome> {
    let content = std::fs::read_to_string(input)?;
    let mut injector = Injector::with_settings(&content, options.settings.clone())?;

    let pre_process_tasks = if options.add_pre_process_task {
        injector.inject_after_each_start(&options.pre_process_task_name)?
    } else {
        Vec::new()
    };

    let post_process_tasks = if options.add_post_process_task {
        injector.inject_before_each_end(&options.post_process_task_name)?
    } else {
        Vec::new()
    };

    let result = injector.serialize()?;
    let diff = persist(&content, &result, output, options.dry_run, options.backup)?;

    Ok(InjectOutcome {
        exit_code: ExitCode::Success,
        changed: content != result,
        pre_process_tasks,
        post_process_tasks,
        diff,
        result,
    })
}

#[derive(Debug, Clone)]
pub struct InsertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub after: String,
    pub before: String,
    pub attributes: TaskAttributes,
    /// Reject identifiers that do not name a node of the process.
    pub strict: bool,
    pub settings: InjectorSettings,
    pub dry_run: bool,
    pub backup: bool,
}

#[derive(Debug)]
pub struct InsertOutcome {
    pub exit_code: ExitCode,
    pub task_id: String,
    pub diff: Option<String>,
    pub result: String,
}

/// Inserts one custom service task between two nodes of the document at
/// `request.input` and writes the result to `request.output`.
pub fn insert_task_between(request: &InsertRequest) -> InjectResult<InsertOutcome> {
    run_insert(request).inspect_err(|err| {
        error!(
            input = %request.input.display(),
            after = %request.after,
            before = %request.before,
            error = %err,
            "error inserting custom service task"
        );
    })
}

fn run_insert(request: &InsertRequest) -> InjectResult<InsertOutcome> {
    let content = std::fs::read_to_string(&request.input)?;
    let mut injector = Injector::with_settings(&content, request.settings.clone())?;

    let task_id = if request.strict {
        injector.insert_between_checked(&request.after, &request.before, &request.attributes)?
    } else {
        injector.insert_between(&request.after, &request.before, &request.attributes)?
    };

    let result = injector.serialize()?;
    let diff = persist(
        &content,
        &result,
        &request.output,
        request.dry_run,
        request.backup,
    )?;

    info!(task = %task_id, output = %request.output.display(), "inserted custom service task");

    Ok(InsertOutcome {
        exit_code: ExitCode::Success,
        task_id,
        diff,
        result,
    })
}

fn persist(
    original: &str,
    result: &str,
    output: &Path,
    dry_run: bool,
    backup: bool,
) -> InjectResult<Option<String>> {
    let diff = build_unified_diff(original, result, output.to_string_lossy().as_ref());
    let (inserted, deleted) = line_changes(original, result);
    debug!(output = %output.display(), inserted, deleted, dry_run, "rendered rewrite");
    if !dry_run {
        write_atomic(output, result, backup)?;
    }
    Ok(diff)
}
