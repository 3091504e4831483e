//! Joint registry: the key-to-handle map for both skeleton layers.
//!
//! Node names are rewritten many times during a build, so the registry is
//! the only identity mechanism: a [`JointKey`] resolves to a [`NodeId`]
//! per layer, and handles stay valid across every rename and re-parent.

use std::collections::BTreeMap;

use rigcraft_scene::NodeId;
use rigcraft_spec::JointKey;

use crate::error::{RigError, RigResult};

/// Which parallel skeleton a joint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointLayer {
    /// Deformation skeleton.
    Bind,
    /// Control-driven skeleton, constrained onto Bind.
    Anim,
}

impl JointLayer {
    fn label(&self) -> &'static str {
        match self {
            JointLayer::Bind => "bind",
            JointLayer::Anim => "animation",
        }
    }
}

/// Key-to-handle registry, one map per layer.
#[derive(Debug, Default)]
pub struct JointRegistry {
    bind: BTreeMap<JointKey, NodeId>,
    anim: BTreeMap<JointKey, NodeId>,
}

impl JointRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn layer(&self, layer: JointLayer) -> &BTreeMap<JointKey, NodeId> {
        match layer {
            JointLayer::Bind => &self.bind,
            JointLayer::Anim => &self.anim,
        }
    }

    /// Registers a joint. Replaces any previous entry for the key.
    pub fn register(&mut self, layer: JointLayer, key: JointKey, id: NodeId) {
        match layer {
            JointLayer::Bind => self.bind.insert(key, id),
            JointLayer::Anim => self.anim.insert(key, id),
        };
    }

    /// Removes a joint entry (used when a placeholder joint is deleted).
    pub fn remove(&mut self, layer: JointLayer, key: &JointKey) {
        match layer {
            JointLayer::Bind => self.bind.remove(key),
            JointLayer::Anim => self.anim.remove(key),
        };
    }

    /// Resolves a key, erroring if it is not registered.
    pub fn node(&self, layer: JointLayer, key: &JointKey) -> RigResult<NodeId> {
        self.layer(layer)
            .get(key)
            .copied()
            .ok_or_else(|| RigError::MissingJoint(key.clone(), layer.label()))
    }

    /// Resolves a list of keys in order.
    pub fn chain(&self, layer: JointLayer, keys: &[JointKey]) -> RigResult<Vec<NodeId>> {
        keys.iter().map(|k| self.node(layer, k)).collect()
    }

    /// The key registered for a node in a layer, if any.
    pub fn key_of(&self, layer: JointLayer, id: NodeId) -> Option<&JointKey> {
        self.layer(layer)
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k)
    }

    /// All keys registered in a layer.
    pub fn keys(&self, layer: JointLayer) -> impl Iterator<Item = &JointKey> {
        self.layer(layer).keys()
    }
}
