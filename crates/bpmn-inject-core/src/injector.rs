use bpmn_inject_config::{Config, TaskSettings, DEFAULT_ID_SEED};

use crate::error::{InjectError, InjectResult};
use crate::ids::IdGenerator;
use crate::model::{FlowNode, Role, SequenceFlow, TaskAttributes};
use crate::query;
use crate::rewrite::GraphRewriter;
use crate::xml::{Element, XmlDocument};

pub const DEFAULT_PRE_PROCESS_TASK_NAME: &str = bpmn_inject_config::DEFAULT_PRE_PROCESS_TASK_NAME;
pub const DEFAULT_POST_PROCESS_TASK_NAME: &str =
    bpmn_inject_config::DEFAULT_POST_PROCESS_TASK_NAME;

const PROCESS: &str = "process";

/// Execution metadata and identifier seed used by an [`Injector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorSettings {
    pub task: TaskSettings,
    pub id_seed: u64,
}

impl Default for InjectorSettings {
    fn default() -> Self {
        Self {
            task: TaskSettings::default(),
            id_seed: DEFAULT_ID_SEED,
        }
    }
}

impl From<&Config> for InjectorSettings {
    fn from(config: &Config) -> Self {
        Self {
            task: config.task.clone(),
            id_seed: config.ids.seed,
        }
    }
}

/// Owns one parsed BPMN document and rewrites its first process.
///
/// The identifier counter belongs to the instance, so two injectors never
/// share sequence numbers. Every rewrite takes `&mut self`; one instance
/// cannot be rewritten from two places at once.
#[derive(Debug, Clone)]
pub struct Injector {
    document: XmlDocument,
    process_path: Vec<usize>,
    element_prefix: Option<String>,
    ids: IdGenerator,
    task: TaskSettings,
}

impl Injector {
    /// Parses `xml` with default settings. Fails with
    /// [`InjectError::MissingProcess`] when the document has no process.
    pub fn parse(xml: &str) -> InjectResult<Self> {
        Self::with_settings(xml, InjectorSettings::default())
    }

    pub fn with_settings(xml: &str, settings: InjectorSettings) -> InjectResult<Self> {
        let document = XmlDocument::parse(xml)?;
        let process_path = document
            .find_path(PROCESS)
            .ok_or(InjectError::MissingProcess)?;
        let element_prefix = document
            .element_at(&process_path)
            .and_then(Element::prefix)
            .map(str::to_string);

        Ok(Self {
            document,
            process_path,
            element_prefix,
            ids: IdGenerator::new(settings.id_seed),
            task: settings.task,
        })
    }

    pub fn inject_after_each_start(&mut self, name: &str) -> InjectResult<Vec<String>> {
        Ok(self.rewriter()?.inject_after_each_start(name))
    }

    pub fn inject_before_each_end(&mut self, name: &str) -> InjectResult<Vec<String>> {
        Ok(self.rewriter()?.inject_before_each_end(name))
    }

    /// Permissive insertion; see [`GraphRewriter::insert_between`].
    pub fn insert_between(
        &mut self,
        after: &str,
        before: &str,
        attributes: &TaskAttributes,
    ) -> InjectResult<String> {
        Ok(self.rewriter()?.insert_between(after, before, attributes))
    }

    /// Strict insertion; see [`GraphRewriter::insert_between_checked`].
    pub fn insert_between_checked(
        &mut self,
        after: &str,
        before: &str,
        attributes: &TaskAttributes,
    ) -> InjectResult<String> {
        self.rewriter()?
            .insert_between_checked(after, before, attributes)
    }

    pub fn find_by_role(&self, role: &Role) -> InjectResult<Vec<FlowNode>> {
        Ok(query::find_by_role(self.process()?, role))
    }

    pub fn find_outgoing(&self, node_id: &str) -> InjectResult<Vec<SequenceFlow>> {
        Ok(query::find_outgoing(self.process()?, node_id))
    }

    pub fn find_incoming(&self, node_id: &str) -> InjectResult<Vec<SequenceFlow>> {
        Ok(query::find_incoming(self.process()?, node_id))
    }

    pub fn nodes(&self) -> InjectResult<Vec<FlowNode>> {
        Ok(query::nodes(self.process()?))
    }

    pub fn flows(&self) -> InjectResult<Vec<SequenceFlow>> {
        Ok(query::flows(self.process()?))
    }

    pub fn process_id(&self) -> Option<&str> {
        self.process().ok()?.attribute("id")
    }

    pub fn serialize(&self) -> InjectResult<String> {
        self.document.serialize()
    }

    /// Borrows the process for direct rewriting with this instance's counter.
    pub fn rewriter(&mut self) -> InjectResult<GraphRewriter<'_>> {
        let process = self
            .document
            .element_at_mut(&self.process_path)
            .ok_or(InjectError::MissingProcess)?;
        Ok(GraphRewriter::new(
            process,
            &mut self.ids,
            &self.task,
            self.element_prefix.as_deref(),
        ))
    }

    fn process(&self) -> InjectResult<&Element> {
        self.document
            .element_at(&self.process_path)
            .ok_or(InjectError::MissingProcess)
    }
}
