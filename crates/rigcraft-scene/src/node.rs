//! Scene node identity, kinds, and attribute plumbing.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;

use crate::transform::LocalTransform;

/// Opaque handle to a scene node.
///
/// Handles stay valid across renames and re-parenting; only deletion
/// invalidates them. They are never reused within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The raw index, for diagnostics only.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// One end of an attribute connection: a node plus an attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plug {
    /// Owning node.
    pub node: NodeId,
    /// Attribute name on that node.
    pub attr: String,
}

impl Plug {
    /// Creates a plug.
    pub fn new(node: NodeId, attr: impl Into<String>) -> Self {
        Self {
            node,
            attr: attr.into(),
        }
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}.{}", self.node.0, self.attr)
    }
}

/// An attribute value: scalar or three-component vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue {
    /// Single float.
    Scalar(f64),
    /// Vector of three floats.
    Vec3(DVec3),
}

impl AttrValue {
    /// Returns the scalar, or the X component of a vector.
    pub fn as_scalar(&self) -> f64 {
        match self {
            AttrValue::Scalar(v) => *v,
            AttrValue::Vec3(v) => v.x,
        }
    }

    /// Returns the vector, splatting a scalar across all components.
    pub fn as_vec3(&self) -> DVec3 {
        match self {
            AttrValue::Scalar(v) => DVec3::splat(*v),
            AttrValue::Vec3(v) => *v,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Scalar(v)
    }
}

impl From<DVec3> for AttrValue {
    fn from(v: DVec3) -> Self {
        AttrValue::Vec3(v)
    }
}

/// A user-defined or built-in attribute on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDef {
    /// Stored value, used when no connection drives the attribute.
    pub value: AttrValue,
    /// Whether the attribute shows in animation channels.
    pub keyable: bool,
    /// Locked attributes reject writes.
    pub locked: bool,
    /// Optional lower clamp for incoming writes.
    pub min: Option<f64>,
    /// Optional upper clamp for incoming writes.
    pub max: Option<f64>,
}

impl AttrDef {
    /// A keyable, unlocked, unclamped attribute.
    pub fn keyable(value: impl Into<AttrValue>) -> Self {
        Self {
            value: value.into(),
            keyable: true,
            locked: false,
            min: None,
            max: None,
        }
    }

    /// Adds a clamp range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// Operation selector for a multiply/divide utility node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdOperation {
    /// `output = input1 * input2`, component-wise.
    Multiply,
    /// `output = input1 / input2`, component-wise.
    Divide,
}

/// Comparison selector for a condition utility node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOperation {
    /// `first_term == second_term`.
    Equal,
    /// `first_term >= second_term`.
    GreaterOrEqual,
    /// `first_term > second_term`.
    GreaterThan,
}

/// What a scene node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain transform (group).
    Transform,
    /// Skeleton joint.
    Joint,
    /// Locator: a transform rendered as a cross marker.
    Locator,
    /// IK handle spanning a joint chain. The solve itself happens in the
    /// host application; the scene records the span and the pole target.
    IkHandle {
        /// First joint of the solved chain.
        start_joint: NodeId,
        /// Last joint of the solved chain.
        end_joint: NodeId,
    },
    /// NURBS ribbon surface: a 5x4 control-vertex grid.
    Surface {
        /// CV positions in world space at creation, row-major. Rows run
        /// along the surface length, four columns across the width.
        cvs: Vec<DVec3>,
    },
    /// Cluster deformer over a row range of a surface's CVs.
    Cluster {
        /// Deformed surface.
        surface: NodeId,
        /// Half-open row range of deformed CVs.
        rows: std::ops::Range<usize>,
    },
    /// Follicle pinned to a surface UV position.
    Follicle {
        /// Host surface.
        surface: NodeId,
        /// Parameter along the surface length, 0..=1.
        u: f64,
        /// Parameter across the surface width, 0..=1.
        v: f64,
    },
    /// Control curve: CV points in the node's local space.
    Curve {
        /// Curve control vertices, local space.
        cvs: Vec<DVec3>,
        /// Curve degree (1 = polyline).
        degree: u8,
    },
    /// Multiply/divide utility: `input1`, `input2` -> `output`.
    MultiplyDivide(MdOperation),
    /// Sum utility: `output = input1 + input2`.
    Sum,
    /// Reverse utility: `input` -> `output = 1 - input`.
    Reverse,
    /// Condition utility: compares `first_term` against `second_term` and
    /// outputs `color_if_true` or `color_if_false`.
    Condition(CondOperation),
    /// Blend utility: `output = color1 * blender + color2 * (1 - blender)`.
    BlendPair,
    /// Live distance between two transforms, in world space, on `distance`.
    Distance {
        /// Measured from this node's world position.
        start: NodeId,
        /// To this node's world position.
        end: NodeId,
    },
}

impl NodeKind {
    /// Short human-readable kind name.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Transform => "transform",
            NodeKind::Joint => "joint",
            NodeKind::Locator => "locator",
            NodeKind::IkHandle { .. } => "ikHandle",
            NodeKind::Surface { .. } => "surface",
            NodeKind::Cluster { .. } => "cluster",
            NodeKind::Follicle { .. } => "follicle",
            NodeKind::Curve { .. } => "curve",
            NodeKind::MultiplyDivide(_) => "multiplyDivide",
            NodeKind::Sum => "sum",
            NodeKind::Reverse => "reverse",
            NodeKind::Condition(_) => "condition",
            NodeKind::BlendPair => "blendPair",
            NodeKind::Distance { .. } => "distance",
        }
    }
}

/// One scene node: kind, hierarchy links, transform, attributes.
#[derive(Debug, Clone)]
pub struct Node {
    /// Current node name. Not required to be unique.
    pub name: String,
    /// What the node is.
    pub kind: NodeKind,
    /// Parent node, if any.
    pub parent: Option<NodeId>,
    /// Child nodes, in creation order.
    pub children: Vec<NodeId>,
    /// Parent-relative transform.
    pub local: LocalTransform,
    /// Attributes, built-in and user-added.
    pub attrs: BTreeMap<String, AttrDef>,
}

impl Node {
    /// Creates a node with an empty attribute table.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            local: LocalTransform::default(),
            attrs: BTreeMap::new(),
        }
    }
}
