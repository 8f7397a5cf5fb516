pub mod diff;
pub mod driver;
pub mod error;
pub mod fs;
pub mod ids;
pub mod injector;
pub mod model;
pub mod query;
pub mod rewrite;
pub mod xml;

pub use driver::{
    inject_service_tasks, insert_task_between, InjectOptions, InjectOutcome, InsertOutcome,
    InsertRequest,
};
pub use error::{ExitCode, InjectError, InjectResult};
pub use ids::IdGenerator;
pub use injector::{
    Injector, InjectorSettings, DEFAULT_POST_PROCESS_TASK_NAME, DEFAULT_PRE_PROCESS_TASK_NAME,
};
pub use model::{FlowNode, Role, SequenceFlow, TaskAttributes};
pub use rewrite::GraphRewriter;
