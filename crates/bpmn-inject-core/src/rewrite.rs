//! Splices service tasks into the flow graph of a single process.
//!
//! Start-side injection replaces each original outgoing flow with a new one
//! leaving the inserted task. End-side injection keeps each incoming flow and
//! only retargets it, so those flows keep their identifiers.

use bpmn_inject_config::TaskSettings;
use tracing::debug;

use crate::error::{InjectError, InjectResult};
use crate::ids::IdGenerator;
use crate::model::{Role, TaskAttributes, ID, NAME, SEQUENCE_FLOW, SOURCE_REF, TARGET_REF};
use crate::query;
use crate::xml::Element;

pub const SERVICE_TASK_PREFIX: &str = "ServiceTask";
pub const CUSTOM_SERVICE_TASK_PREFIX: &str = "CustomServiceTask";
pub const FLOW_PREFIX: &str = "Flow";

/// Mutating view over one process element.
pub struct GraphRewriter<'a> {
    process: &'a mut Element,
    ids: &'a mut IdGenerator,
    task: &'a TaskSettings,
    element_prefix: Option<&'a str>,
}

impl<'a> GraphRewriter<'a> {
    /// `element_prefix` is the namespace prefix given to created elements,
    /// normally the prefix of the process element itself.
    pub fn new(
        process: &'a mut Element,
        ids: &'a mut IdGenerator,
        task: &'a TaskSettings,
        element_prefix: Option<&'a str>,
    ) -> Self {
        Self {
            process,
            ids,
            task,
            element_prefix,
        }
    }

    /// Inserts a task named `name` directly after every start event.
    /// Returns the identifiers of the created tasks in start-event order.
    pub fn inject_after_each_start(&mut self, name: &str) -> Vec<String> {
        let starts = query::find_by_role(self.process, &Role::StartEvent);
        let mut created = Vec::with_capacity(starts.len());

        for start in starts {
            let task_id = self.ids.next(SERVICE_TASK_PREFIX);
            let flow_id = self.ids.next(FLOW_PREFIX);

            let task = self.service_task(&task_id, name);
            self.process.append_element(task);

            let outgoing = query::find_outgoing(self.process, &start.id);

            let entry = self.sequence_flow(&flow_id, &start.id, &task_id);
            self.process.append_element(entry);

            for flow in &outgoing {
                let replacement_id = self.ids.next(FLOW_PREFIX);
                let replacement = self.sequence_flow(&replacement_id, &task_id, &flow.target_ref);
                self.process.append_element(replacement);
            }

            // Replacements land after every original flow, so the snapshot
            // positions stay valid when removed back to front.
            for flow in outgoing.iter().rev() {
                self.process.remove_child(flow.position);
            }

            debug!(
                start = %start.id,
                task = %task_id,
                successors = outgoing.len(),
                "injected service task after start event"
            );
            created.push(task_id);
        }

        created
    }

    /// Inserts a task named `name` directly before every end event.
    /// Returns the identifiers of the created tasks in end-event order.
    pub fn inject_before_each_end(&mut self, name: &str) -> Vec<String> {
        let ends = query::find_by_role(self.process, &Role::EndEvent);
        let mut created = Vec::with_capacity(ends.len());

        for end in ends {
            let task_id = self.ids.next(SERVICE_TASK_PREFIX);
            let flow_id = self.ids.next(FLOW_PREFIX);

            let task = self.service_task(&task_id, name);
            self.process.append_element(task);

            let incoming = query::find_incoming(self.process, &end.id);

            let exit = self.sequence_flow(&flow_id, &task_id, &end.id);
            self.process.append_element(exit);

            for flow in &incoming {
                if let Some(element) = self.process.child_element_mut(flow.position) {
                    element.set_attribute(TARGET_REF, task_id.as_str());
                }
            }

            debug!(
                end = %end.id,
                task = %task_id,
                predecessors = incoming.len(),
                "injected service task before end event"
            );
            created.push(task_id);
        }

        created
    }

    /// Inserts a custom task with flows `after -> task -> before`.
    ///
    /// Neither identifier is checked: the caller is responsible for naming
    /// nodes that exist, otherwise the new flows dangle. Existing flows
    /// between the two nodes are left alone.
    pub fn insert_between(
        &mut self,
        after: &str,
        before: &str,
        attributes: &TaskAttributes,
    ) -> String {
        let task_id = self.ids.next(CUSTOM_SERVICE_TASK_PREFIX);

        let mut task = self.service_task(&task_id, attributes.name());
        for (key, value) in attributes.iter() {
            let key = match key {
                TaskAttributes::TYPE | TaskAttributes::TOPIC => self.extension_attribute(key),
                _ => key.to_string(),
            };
            task.set_attribute(key, value);
        }
        self.process.append_element(task);

        let into_id = self.ids.next(FLOW_PREFIX);
        let out_of_id = self.ids.next(FLOW_PREFIX);
        let into = self.sequence_flow(&into_id, after, &task_id);
        let out_of = self.sequence_flow(&out_of_id, &task_id, before);
        self.process.append_element(into);
        self.process.append_element(out_of);

        debug!(after, before, task = %task_id, "inserted custom service task");
        task_id
    }

    /// Like [`insert_between`](Self::insert_between) but fails with
    /// [`InjectError::UnknownNode`] unless both identifiers name flow nodes of
    /// the process. Nothing is mutated and no identifiers are consumed on
    /// failure.
    pub fn insert_between_checked(
        &mut self,
        after: &str,
        before: &str,
        attributes: &TaskAttributes,
    ) -> InjectResult<String> {
        for id in [after, before] {
            if !query::contains_node(self.process, id) {
                return Err(InjectError::UnknownNode { id: id.to_string() });
            }
        }
        Ok(self.insert_between(after, before, attributes))
    }

    fn qualified(&self, local_name: &str) -> String {
        match self.element_prefix {
            Some(prefix) => format!("{prefix}:{local_name}"),
            None => local_name.to_string(),
        }
    }

    fn extension_attribute(&self, local_name: &str) -> String {
        format!("{}:{local_name}", self.task.extension_prefix)
    }

    fn service_task(&self, id: &str, name: &str) -> Element {
        Element::new(self.qualified(Role::ServiceTask.local_name()))
            .with_attribute(ID, id)
            .with_attribute(NAME, name)
            .with_attribute(self.extension_attribute("type"), self.task.task_type.as_str())
            .with_attribute(self.extension_attribute("topic"), self.task.topic.as_str())
    }

    fn sequence_flow(&self, id: &str, source: &str, target: &str) -> Element {
        Element::new(self.qualified(SEQUENCE_FLOW))
            .with_attribute(ID, id)
            .with_attribute(SOURCE_REF, source)
            .with_attribute(TARGET_REF, target)
    }
}
