//! Read-only lookups over the direct children of a process element.
//!
//! Every function returns an owned snapshot. Later mutation of the process
//! does not change a vector that was already returned, which is what lets the
//! rewriter iterate a flow list while it appends and removes flows.

use crate::model::{FlowNode, Role, SequenceFlow, ID, SEQUENCE_FLOW, SOURCE_REF, TARGET_REF};
use crate::xml::Element;

/// Nodes with the given role, in document order.
pub fn find_by_role(process: &Element, role: &Role) -> Vec<FlowNode> {
    process
        .child_elements()
        .filter(|(_, element)| element.local_name() == role.local_name())
        .map(|(_, element)| FlowNode::from_element(element))
        .collect()
}

/// Flows whose `sourceRef` is `node_id`, in document order.
pub fn find_outgoing(process: &Element, node_id: &str) -> Vec<SequenceFlow> {
    flows_where(process, SOURCE_REF, node_id)
}

/// Flows whose `targetRef` is `node_id`, in document order.
pub fn find_incoming(process: &Element, node_id: &str) -> Vec<SequenceFlow> {
    flows_where(process, TARGET_REF, node_id)
}

/// Every sequence flow in the process, in document order.
pub fn flows(process: &Element) -> Vec<SequenceFlow> {
    process
        .child_elements()
        .filter(|(_, element)| element.local_name() == SEQUENCE_FLOW)
        .map(|(position, element)| SequenceFlow::from_element(position, element))
        .collect()
}

/// Every child that is not a sequence flow, in document order.
pub fn nodes(process: &Element) -> Vec<FlowNode> {
    process
        .child_elements()
        .filter(|(_, element)| element.local_name() != SEQUENCE_FLOW)
        .map(|(_, element)| FlowNode::from_element(element))
        .collect()
}

pub(crate) fn contains_node(process: &Element, node_id: &str) -> bool {
    process.child_elements().any(|(_, element)| {
        element.local_name() != SEQUENCE_FLOW && element.attribute(ID) == Some(node_id)
    })
}

fn flows_where(process: &Element, reference: &str, node_id: &str) -> Vec<SequenceFlow> {
    process
        .child_elements()
        .filter(|(_, element)| {
            element.local_name() == SEQUENCE_FLOW && element.attribute(reference) == Some(node_id)
        })
        .map(|(position, element)| SequenceFlow::from_element(position, element))
        .collect()
}
