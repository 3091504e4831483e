//! In-memory scene backend.
//!
//! [`MemoryScene`] is a complete headless implementation of
//! [`SceneBackend`]: a node arena with hierarchy, a recorded constraint
//! list, and a pull-based dataflow graph over attribute connections.
//! Utility nodes (multiply/divide, reverse, condition, blend, distance)
//! evaluate on read, so tests can drive an input attribute and observe the
//! value that arrives at the far end of a network.
//!
//! Constraints without a maintained offset are solved during world-matrix
//! evaluation; offset constraints and IK handles are recorded structurally
//! (the build pipeline only ever reads the rest pose, which satisfies
//! them by construction).

use std::ops::Range;

use glam::{DMat4, DQuat, DVec3};

use crate::backend::SceneBackend;
use crate::constraint::{Constraint, ConstraintKind};
use crate::error::{SceneError, SceneResult};
use crate::node::{
    AttrDef, AttrValue, CondOperation, MdOperation, Node, NodeId, NodeKind, Plug,
};
use crate::transform::{euler_deg_from_quat, quat_from_euler_deg, LocalTransform};

/// Ribbon surface CV grid: five rows along the length, four columns across.
pub const SURFACE_ROWS: usize = 5;
/// Columns per CV row.
pub const SURFACE_COLS: usize = 4;

/// Transform channel bases addressable through the attribute interface.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Channel {
    Translate,
    Rotate,
    Scale,
    JointOrient,
}

/// Splits `translateX`-style names into a channel and optional component.
fn channel_of(attr: &str) -> Option<(Channel, Option<usize>)> {
    let (base, comp) = if let Some(b) = attr.strip_suffix('X') {
        (b, Some(0))
    } else if let Some(b) = attr.strip_suffix('Y') {
        (b, Some(1))
    } else if let Some(b) = attr.strip_suffix('Z') {
        (b, Some(2))
    } else {
        (attr, None)
    };
    let channel = match base {
        "translate" => Channel::Translate,
        "rotate" => Channel::Rotate,
        "scale" => Channel::Scale,
        "jointOrient" => Channel::JointOrient,
        _ => return None,
    };
    Some((channel, comp))
}

/// The in-memory scene graph.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: Vec<Option<Node>>,
    /// `(source, destination)` pairs; a destination holds one incoming edge.
    connections: Vec<(Plug, Plug)>,
    constraints: Vec<Constraint>,
}

impl MemoryScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(SceneError::NodeNotFound(id))
    }

    fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> SceneResult<NodeId> {
        if let Some(p) = parent {
            self.node(p)?;
        }
        node.parent = parent;
        node.attrs
            .entry("visibility".to_string())
            .or_insert_with(|| AttrDef::keyable(1.0));
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        if let Some(p) = parent {
            self.node_mut(p)?.children.push(id);
        }
        Ok(id)
    }

    /// All incoming connections and constraints referencing `ids` are dropped.
    fn drop_references(&mut self, ids: &[NodeId]) {
        self.connections
            .retain(|(src, dst)| !ids.contains(&src.node) && !ids.contains(&dst.node));
        self.constraints
            .retain(|c| !ids.contains(&c.driver) && !ids.contains(&c.driven));
    }

    // ========================================================================
    // Attribute evaluation
    // ========================================================================

    fn eval(&self, plug: &Plug, seen: &mut Vec<Plug>) -> SceneResult<AttrValue> {
        if seen.contains(plug) {
            return Err(SceneError::EvalCycle(plug.clone()));
        }
        seen.push(plug.clone());
        let result = self.eval_uncached(plug, seen);
        seen.pop();
        result
    }

    fn eval_uncached(&self, plug: &Plug, seen: &mut Vec<Plug>) -> SceneResult<AttrValue> {
        let node = self.node(plug.node)?;

        // An incoming connection overrides everything else.
        if let Some((src, _)) = self.connections.iter().find(|(_, dst)| dst == plug) {
            let src = src.clone();
            return self.eval(&src, seen);
        }

        // Computed outputs of utility nodes.
        match (&node.kind, plug.attr.as_str()) {
            (NodeKind::MultiplyDivide(op), "output") => {
                let op = *op;
                let a = self.channel_vec(plug.node, "input1", seen)?;
                let b = self.channel_vec(plug.node, "input2", seen)?;
                let out = match op {
                    MdOperation::Multiply => a * b,
                    MdOperation::Divide => DVec3::new(
                        safe_div(a.x, b.x),
                        safe_div(a.y, b.y),
                        safe_div(a.z, b.z),
                    ),
                };
                return Ok(AttrValue::Vec3(out));
            }
            (NodeKind::Reverse, "output") => {
                let v = self.channel_vec(plug.node, "input", seen)?;
                return Ok(AttrValue::Vec3(DVec3::ONE - v));
            }
            (NodeKind::Sum, "output") => {
                let a = self.channel_vec(plug.node, "input1", seen)?;
                let b = self.channel_vec(plug.node, "input2", seen)?;
                return Ok(AttrValue::Vec3(a + b));
            }
            (NodeKind::Condition(op), "outColor") => {
                let op = *op;
                let first = self
                    .eval(&Plug::new(plug.node, "firstTerm"), seen)?
                    .as_scalar();
                let second = self
                    .eval(&Plug::new(plug.node, "secondTerm"), seen)?
                    .as_scalar();
                let pass = match op {
                    CondOperation::Equal => first == second,
                    CondOperation::GreaterOrEqual => first >= second,
                    CondOperation::GreaterThan => first > second,
                };
                let branch = if pass { "colorIfTrue" } else { "colorIfFalse" };
                let v = self.channel_vec(plug.node, branch, seen)?;
                return Ok(AttrValue::Vec3(v));
            }
            (NodeKind::BlendPair, "output") => {
                let blender = self
                    .eval(&Plug::new(plug.node, "blender"), seen)?
                    .as_scalar();
                let c1 = self.channel_vec(plug.node, "color1", seen)?;
                let c2 = self.channel_vec(plug.node, "color2", seen)?;
                return Ok(AttrValue::Vec3(c1 * blender + c2 * (1.0 - blender)));
            }
            (NodeKind::Distance { start, end }, "distance") => {
                let (start, end) = (*start, *end);
                let a = self.world_matrix_inner(start, seen)?.w_axis.truncate();
                let b = self.world_matrix_inner(end, seen)?.w_axis.truncate();
                return Ok(AttrValue::Scalar((b - a).length()));
            }
            _ => {}
        }

        // Transform channels read the stored local transform.
        if let Some((channel, comp)) = channel_of(&plug.attr) {
            let v = match channel {
                Channel::Translate => node.local.translate,
                Channel::Rotate => node.local.rotate_deg,
                Channel::Scale => node.local.scale,
                Channel::JointOrient => node.local.joint_orient_deg,
            };
            return Ok(match comp {
                Some(i) => AttrValue::Scalar(v[i]),
                None => AttrValue::Vec3(v),
            });
        }

        if let Some(def) = node.attrs.get(&plug.attr) {
            return Ok(def.value);
        }

        // `outputX`-style component reads of a computed or connected vector.
        if let Some(base) = plug
            .attr
            .strip_suffix('X')
            .map(|b| (b, 0))
            .or_else(|| plug.attr.strip_suffix('Y').map(|b| (b, 1)))
            .or_else(|| plug.attr.strip_suffix('Z').map(|b| (b, 2)))
        {
            let (base_attr, comp) = base;
            if !base_attr.is_empty() {
                match self.eval(&Plug::new(plug.node, base_attr), seen) {
                    Ok(v) => return Ok(AttrValue::Scalar(v.as_vec3()[comp])),
                    Err(SceneError::AttrNotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Err(SceneError::AttrNotFound {
            node: node.name.clone(),
            attr: plug.attr.clone(),
        })
    }

    /// Per-component vector read, honoring component-level connections.
    /// Used for transform channels and utility-node vector inputs alike.
    fn channel_vec(&self, id: NodeId, base: &str, seen: &mut Vec<Plug>) -> SceneResult<DVec3> {
        Ok(DVec3::new(
            self.eval(&Plug::new(id, format!("{base}X")), seen)?.as_scalar(),
            self.eval(&Plug::new(id, format!("{base}Y")), seen)?.as_scalar(),
            self.eval(&Plug::new(id, format!("{base}Z")), seen)?.as_scalar(),
        ))
    }

    fn world_matrix_inner(&self, id: NodeId, seen: &mut Vec<Plug>) -> SceneResult<DMat4> {
        let node = self.node(id)?;
        let parent_m = match node.parent {
            Some(p) => self.world_matrix_inner(p, seen)?,
            None => DMat4::IDENTITY,
        };
        let jo = node.local.joint_orient_deg;
        let t = self.channel_vec(id, "translate", seen)?;
        let r = self.channel_vec(id, "rotate", seen)?;
        let s = self.channel_vec(id, "scale", seen)?;
        let mut m = parent_m
            * DMat4::from_translation(t)
            * DMat4::from_quat(quat_from_euler_deg(jo) * quat_from_euler_deg(r))
            * DMat4::from_scale(s);

        // Offset-free constraints are solved live; constraints with a
        // maintained offset stay structural (the rest pose already
        // satisfies them).
        for c in self.constraints.iter() {
            if c.driven != id || c.maintain_offset {
                continue;
            }
            let driver_m = self.world_matrix_inner(c.driver, seen)?;
            match c.kind {
                ConstraintKind::Parent => {
                    let (s, _, _) = m.to_scale_rotation_translation();
                    let (_, dr, dt) = driver_m.to_scale_rotation_translation();
                    m = DMat4::from_scale_rotation_translation(s, dr, dt);
                }
                ConstraintKind::Point => {
                    m.w_axis = driver_m.w_axis;
                }
                ConstraintKind::Orient => {
                    let (s, _, t) = m.to_scale_rotation_translation();
                    let (_, dr, _) = driver_m.to_scale_rotation_translation();
                    m = DMat4::from_scale_rotation_translation(s, dr, t);
                }
                ConstraintKind::Scale => {
                    let (_, r, t) = m.to_scale_rotation_translation();
                    let (ds, _, _) = driver_m.to_scale_rotation_translation();
                    m = DMat4::from_scale_rotation_translation(ds, r, t);
                }
                ConstraintKind::PoleVector => {}
            }
        }
        Ok(m)
    }

    fn surface_cvs(&self, surface: NodeId) -> SceneResult<&[DVec3]> {
        let node = self.node(surface)?;
        match &node.kind {
            NodeKind::Surface { cvs } => Ok(cvs),
            _ => Err(SceneError::WrongKind {
                node: node.name.clone(),
                expected: "surface",
            }),
        }
    }

    /// Hierarchical outline of the scene, for diagnostics and CLI dumps.
    pub fn outline(&self) -> serde_json::Value {
        let roots: Vec<serde_json::Value> = self
            .nodes()
            .into_iter()
            .filter(|id| matches!(self.node(*id), Ok(n) if n.parent.is_none()))
            .map(|id| self.outline_node(id))
            .collect();
        serde_json::Value::Array(roots)
    }

    fn outline_node(&self, id: NodeId) -> serde_json::Value {
        // The id is live by construction here.
        let (name, kind, children) = match self.node(id) {
            Ok(n) => (n.name.clone(), n.kind.label(), n.children.clone()),
            Err(_) => return serde_json::Value::Null,
        };
        let pos = self
            .world_position(id)
            .unwrap_or(DVec3::ZERO);
        serde_json::json!({
            "name": name,
            "kind": kind,
            "position": [pos.x, pos.y, pos.z],
            "children": children
                .into_iter()
                .map(|c| self.outline_node(c))
                .collect::<Vec<_>>(),
        })
    }
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

/// Bilinear sample of the CV grid at surface parameters `(u, v)`.
fn sample_surface(cvs: &[DVec3], u: f64, v: f64) -> DVec3 {
    let ru = u.clamp(0.0, 1.0) * (SURFACE_ROWS - 1) as f64;
    let cv = v.clamp(0.0, 1.0) * (SURFACE_COLS - 1) as f64;
    let r0 = (ru.floor() as usize).min(SURFACE_ROWS - 2);
    let c0 = (cv.floor() as usize).min(SURFACE_COLS - 2);
    let fr = ru - r0 as f64;
    let fc = cv - c0 as f64;
    let at = |r: usize, c: usize| cvs[r * SURFACE_COLS + c];
    let top = at(r0, c0).lerp(at(r0, c0 + 1), fc);
    let bottom = at(r0 + 1, c0).lerp(at(r0 + 1, c0 + 1), fc);
    top.lerp(bottom, fr)
}

impl SceneBackend for MemoryScene {
    fn create_group(&mut self, name: &str, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.insert(Node::new(name, NodeKind::Transform), parent)
    }

    fn create_joint(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        world_pos: DVec3,
    ) -> SceneResult<NodeId> {
        let id = self.insert(Node::new(name, NodeKind::Joint), parent)?;
        self.set_world_position(id, world_pos)?;
        Ok(id)
    }

    fn create_locator(&mut self, name: &str, parent: Option<NodeId>) -> SceneResult<NodeId> {
        self.insert(Node::new(name, NodeKind::Locator), parent)
    }

    fn create_curve(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        cvs: Vec<DVec3>,
        degree: u8,
    ) -> SceneResult<NodeId> {
        self.insert(Node::new(name, NodeKind::Curve { cvs, degree }), parent)
    }

    fn create_utility(&mut self, name: &str, kind: NodeKind) -> SceneResult<NodeId> {
        let mut node = Node::new(name, kind.clone());
        let mut attr = |n: &str, v: AttrValue| {
            node.attrs.insert(n.to_string(), AttrDef::keyable(v));
        };
        match kind {
            NodeKind::MultiplyDivide(_) => {
                attr("input1", AttrValue::Vec3(DVec3::ONE));
                attr("input2", AttrValue::Vec3(DVec3::ONE));
            }
            NodeKind::Reverse => {
                attr("input", AttrValue::Vec3(DVec3::ZERO));
            }
            NodeKind::Sum => {
                attr("input1", AttrValue::Vec3(DVec3::ZERO));
                attr("input2", AttrValue::Vec3(DVec3::ZERO));
            }
            NodeKind::Condition(_) => {
                attr("firstTerm", AttrValue::Scalar(0.0));
                attr("secondTerm", AttrValue::Scalar(0.0));
                attr("colorIfTrue", AttrValue::Vec3(DVec3::ZERO));
                attr("colorIfFalse", AttrValue::Vec3(DVec3::ONE));
            }
            NodeKind::BlendPair => {
                attr("blender", AttrValue::Scalar(0.5));
                attr("color1", AttrValue::Vec3(DVec3::ZERO));
                attr("color2", AttrValue::Vec3(DVec3::ZERO));
            }
            NodeKind::Distance { start, end } => {
                self.node(start)?;
                self.node(end)?;
            }
            _ => {
                return Err(SceneError::WrongKind {
                    node: name.to_string(),
                    expected: "utility node kind",
                })
            }
        }
        self.insert(node, None)
    }

    fn create_ik_handle(
        &mut self,
        name: &str,
        start_joint: NodeId,
        end_joint: NodeId,
    ) -> SceneResult<NodeId> {
        for id in [start_joint, end_joint] {
            let node = self.node(id)?;
            if !matches!(node.kind, NodeKind::Joint) {
                return Err(SceneError::WrongKind {
                    node: node.name.clone(),
                    expected: "joint",
                });
            }
        }
        let end_world = self.world_position(end_joint)?;
        let id = self.insert(
            Node::new(
                name,
                NodeKind::IkHandle {
                    start_joint,
                    end_joint,
                },
            ),
            None,
        )?;
        // The handle transform sits at the effector.
        self.set_translation(id, end_world)?;
        Ok(id)
    }

    fn create_ribbon_surface(
        &mut self,
        name: &str,
        center: DVec3,
        length_axis: DVec3,
        length: f64,
        width: f64,
    ) -> SceneResult<NodeId> {
        let axis = length_axis.normalize_or_zero();
        let axis = if axis == DVec3::ZERO { DVec3::Y } else { axis };
        let across = axis.any_orthonormal_vector();
        let mut cvs = Vec::with_capacity(SURFACE_ROWS * SURFACE_COLS);
        for row in 0..SURFACE_ROWS {
            let rt = row as f64 / (SURFACE_ROWS - 1) as f64 - 0.5;
            for col in 0..SURFACE_COLS {
                let ct = col as f64 / (SURFACE_COLS - 1) as f64 - 0.5;
                cvs.push(center + axis * (length * rt) + across * (width * ct));
            }
        }
        self.insert(Node::new(name, NodeKind::Surface { cvs }), None)
    }

    fn create_cluster(
        &mut self,
        name: &str,
        surface: NodeId,
        rows: Range<usize>,
    ) -> SceneResult<NodeId> {
        let surface_name = self.node(surface)?.name.clone();
        let cvs = self.surface_cvs(surface)?;
        if rows.is_empty() || rows.end > SURFACE_ROWS {
            return Err(SceneError::CvRange {
                node: surface_name,
                row: rows.end.max(rows.start),
            });
        }
        let members: Vec<DVec3> = rows
            .clone()
            .flat_map(|r| (0..SURFACE_COLS).map(move |c| r * SURFACE_COLS + c))
            .map(|i| cvs[i])
            .collect();
        let centroid = members.iter().sum::<DVec3>() / members.len() as f64;
        let id = self.insert(Node::new(name, NodeKind::Cluster { surface, rows }), None)?;
        self.set_translation(id, centroid)?;
        Ok(id)
    }

    fn create_follicle(
        &mut self,
        name: &str,
        surface: NodeId,
        u: f64,
        v: f64,
    ) -> SceneResult<NodeId> {
        let pos = sample_surface(self.surface_cvs(surface)?, u, v);
        let id = self.insert(Node::new(name, NodeKind::Follicle { surface, u, v }), None)?;
        self.set_translation(id, pos)?;
        Ok(id)
    }

    fn duplicate_parent_only(&mut self, node: NodeId, new_name: &str) -> SceneResult<NodeId> {
        let source = self.node(node)?;
        let mut copy = Node::new(new_name, source.kind.clone());
        copy.local = source.local.clone();
        copy.attrs = source.attrs.clone();
        let parent = source.parent;
        self.insert(copy, parent)
    }

    fn duplicate_subtree(&mut self, node: NodeId, new_name: &str) -> SceneResult<NodeId> {
        let parent = self.node(node)?.parent;
        self.clone_rec(node, parent, Some(new_name))
    }

    fn delete(&mut self, node: NodeId) -> SceneResult<()> {
        let mut doomed = vec![node];
        doomed.extend(self.descendants(node)?);
        if let Some(parent) = self.node(node)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != node);
        }
        for id in &doomed {
            self.nodes[id.0 as usize] = None;
        }
        self.drop_references(&doomed);
        Ok(())
    }

    fn rename(&mut self, node: NodeId, new_name: &str) -> SceneResult<()> {
        self.node_mut(node)?.name = new_name.to_string();
        Ok(())
    }

    fn name(&self, node: NodeId) -> SceneResult<String> {
        Ok(self.node(node)?.name.clone())
    }

    fn kind(&self, node: NodeId) -> SceneResult<NodeKind> {
        Ok(self.node(node)?.kind.clone())
    }

    fn parent_of(&self, node: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    fn children_of(&self, node: NodeId) -> SceneResult<Vec<NodeId>> {
        Ok(self.node(node)?.children.clone())
    }

    fn descendants(&self, node: NodeId) -> SceneResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = self.node(node)?.children.clone();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.node(id)?.children.clone();
            children.reverse();
            stack.append(&mut children);
        }
        Ok(out)
    }

    fn reparent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> SceneResult<()> {
        let old_parent = self.node(node)?.parent;
        if old_parent == new_parent {
            return Ok(());
        }
        if let Some(p) = new_parent {
            if p == node || self.descendants(node)?.contains(&p) {
                return Err(SceneError::ParentCycle { node, parent: p });
            }
        }

        let world = self.world_matrix(node)?;
        let parent_world = match new_parent {
            Some(p) => self.world_matrix(p)?,
            None => DMat4::IDENTITY,
        };
        let local_m = parent_world.inverse() * world;
        let (scale, rot, translate) = local_m.to_scale_rotation_translation();

        if let Some(p) = old_parent {
            self.node_mut(p)?.children.retain(|c| *c != node);
        }
        if let Some(p) = new_parent {
            self.node_mut(p)?.children.push(node);
        }
        let target = self.node_mut(node)?;
        target.parent = new_parent;
        let orient = quat_from_euler_deg(target.local.joint_orient_deg);
        target.local.translate = translate;
        target.local.scale = scale;
        target.local.rotate_deg = euler_deg_from_quat(orient.inverse() * rot);
        Ok(())
    }

    fn local(&self, node: NodeId) -> SceneResult<LocalTransform> {
        Ok(self.node(node)?.local.clone())
    }

    fn world_matrix(&self, node: NodeId) -> SceneResult<DMat4> {
        self.world_matrix_inner(node, &mut Vec::new())
    }

    fn world_position(&self, node: NodeId) -> SceneResult<DVec3> {
        Ok(self.world_matrix(node)?.w_axis.truncate())
    }

    fn world_rotation(&self, node: NodeId) -> SceneResult<DQuat> {
        let (_, rot, _) = self.world_matrix(node)?.to_scale_rotation_translation();
        Ok(rot)
    }

    fn set_translation(&mut self, node: NodeId, translate: DVec3) -> SceneResult<()> {
        self.node_mut(node)?.local.translate = translate;
        Ok(())
    }

    fn set_rotation_deg(&mut self, node: NodeId, rotate: DVec3) -> SceneResult<()> {
        self.node_mut(node)?.local.rotate_deg = rotate;
        Ok(())
    }

    fn set_scale(&mut self, node: NodeId, scale: DVec3) -> SceneResult<()> {
        self.node_mut(node)?.local.scale = scale;
        Ok(())
    }

    fn set_joint_orient_deg(&mut self, node: NodeId, orient: DVec3) -> SceneResult<()> {
        self.node_mut(node)?.local.joint_orient_deg = orient;
        Ok(())
    }

    fn set_world_position(&mut self, node: NodeId, pos: DVec3) -> SceneResult<()> {
        let parent = self.node(node)?.parent;
        let local = match parent {
            Some(p) => self.world_matrix(p)?.inverse().transform_point3(pos),
            None => pos,
        };
        self.set_translation(node, local)
    }

    fn set_world_rotation(&mut self, node: NodeId, rot: DQuat) -> SceneResult<()> {
        let parent = self.node(node)?.parent;
        let parent_rot = match parent {
            Some(p) => self.world_rotation(p)?,
            None => DQuat::IDENTITY,
        };
        let target = self.node_mut(node)?;
        let orient = quat_from_euler_deg(target.local.joint_orient_deg);
        target.local.rotate_deg = euler_deg_from_quat(orient.inverse() * parent_rot.inverse() * rot);
        Ok(())
    }

    fn freeze_rotation(&mut self, node: NodeId) -> SceneResult<()> {
        let target = self.node_mut(node)?;
        let combined = target.local.rotation();
        target.local.joint_orient_deg = euler_deg_from_quat(combined);
        target.local.rotate_deg = DVec3::ZERO;
        Ok(())
    }

    fn add_attr(&mut self, node: NodeId, attr: &str, def: AttrDef) -> SceneResult<()> {
        let target = self.node_mut(node)?;
        if target.attrs.contains_key(attr) || channel_of(attr).is_some() {
            return Err(SceneError::AttrExists {
                node: target.name.clone(),
                attr: attr.to_string(),
            });
        }
        target.attrs.insert(attr.to_string(), def);
        Ok(())
    }

    fn set_attr(&mut self, node: NodeId, attr: &str, value: AttrValue) -> SceneResult<()> {
        let target = self.node_mut(node)?;
        if let Some(def) = target.attrs.get(attr) {
            if def.locked {
                return Err(SceneError::AttrLocked {
                    node: target.name.clone(),
                    attr: attr.to_string(),
                });
            }
        }
        if let Some((channel, comp)) = channel_of(attr) {
            let slot = match channel {
                Channel::Translate => &mut target.local.translate,
                Channel::Rotate => &mut target.local.rotate_deg,
                Channel::Scale => &mut target.local.scale,
                Channel::JointOrient => &mut target.local.joint_orient_deg,
            };
            match comp {
                Some(i) => slot[i] = value.as_scalar(),
                None => *slot = value.as_vec3(),
            }
            return Ok(());
        }
        match target.attrs.get_mut(attr) {
            Some(def) => {
                let clamped = match (value, def.min, def.max) {
                    (AttrValue::Scalar(v), min, max) => AttrValue::Scalar(
                        v.clamp(min.unwrap_or(f64::NEG_INFINITY), max.unwrap_or(f64::INFINITY)),
                    ),
                    (v @ AttrValue::Vec3(_), _, _) => v,
                };
                def.value = clamped;
                Ok(())
            }
            None => {
                // `input2X`-style component write into a stored vector.
                if let Some((base, comp)) = attr
                    .strip_suffix('X')
                    .map(|b| (b, 0))
                    .or_else(|| attr.strip_suffix('Y').map(|b| (b, 1)))
                    .or_else(|| attr.strip_suffix('Z').map(|b| (b, 2)))
                {
                    if let Some(def) = target.attrs.get_mut(base) {
                        let mut v = def.value.as_vec3();
                        v[comp] = value.as_scalar();
                        def.value = AttrValue::Vec3(v);
                        return Ok(());
                    }
                }
                Err(SceneError::AttrNotFound {
                    node: target.name.clone(),
                    attr: attr.to_string(),
                })
            }
        }
    }

    fn get_attr(&self, node: NodeId, attr: &str) -> SceneResult<AttrValue> {
        self.eval(&Plug::new(node, attr), &mut Vec::new())
    }

    fn connect(&mut self, src: Plug, dst: Plug) -> SceneResult<()> {
        self.node(src.node)?;
        self.node(dst.node)?;
        self.connections.retain(|(_, d)| *d != dst);
        self.connections.push((src, dst));
        Ok(())
    }

    fn hide_and_lock(&mut self, node: NodeId, attrs: &[&str]) -> SceneResult<()> {
        let target = self.node_mut(node)?;
        for attr in attrs {
            let def = target
                .attrs
                .entry((*attr).to_string())
                .or_insert_with(|| AttrDef::keyable(0.0));
            def.keyable = false;
            def.locked = true;
        }
        Ok(())
    }

    fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        driver: NodeId,
        driven: NodeId,
        maintain_offset: bool,
    ) -> SceneResult<()> {
        self.node(driver)?;
        self.node(driven)?;
        self.constraints.push(Constraint {
            kind,
            driver,
            driven,
            maintain_offset,
        });
        Ok(())
    }

    fn constraints_on(&self, driven: NodeId) -> Vec<Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.driven == driven)
            .cloned()
            .collect()
    }

    fn nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| NodeId(i as u32)))
            .collect()
    }

    fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, slot)| matches!(slot, Some(n) if n.name == name))
            .map(|(i, _)| NodeId(i as u32))
    }
}

impl MemoryScene {
    fn clone_rec(
        &mut self,
        source: NodeId,
        parent: Option<NodeId>,
        rename: Option<&str>,
    ) -> SceneResult<NodeId> {
        let src = self.node(source)?;
        let mut copy = Node::new(
            rename.map(str::to_string).unwrap_or_else(|| src.name.clone()),
            src.kind.clone(),
        );
        copy.local = src.local.clone();
        copy.attrs = src.attrs.clone();
        let children = src.children.clone();
        let id = self.insert(copy, parent)?;
        for child in children {
            self.clone_rec(child, Some(id), None)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn vec_close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn joint_world_position_stacks_through_parents() {
        let mut scene = MemoryScene::new();
        let root = scene.create_joint("root", None, DVec3::new(0.0, 100.0, 0.0)).unwrap();
        let child = scene
            .create_joint("child", Some(root), DVec3::new(15.0, 145.0, 0.0))
            .unwrap();
        assert!(vec_close(
            scene.world_position(child).unwrap(),
            DVec3::new(15.0, 145.0, 0.0)
        ));
        assert!(vec_close(
            scene.local(child).unwrap().translate,
            DVec3::new(15.0, 45.0, 0.0)
        ));
    }

    #[test]
    fn reparent_preserves_world_transform() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        scene.set_translation(a, DVec3::new(5.0, 0.0, 0.0)).unwrap();
        scene.set_rotation_deg(a, DVec3::new(0.0, 90.0, 0.0)).unwrap();
        let b = scene.create_group("b", None).unwrap();
        scene.set_translation(b, DVec3::new(1.0, 2.0, 3.0)).unwrap();

        let before = scene.world_matrix(b).unwrap();
        scene.reparent(b, Some(a)).unwrap();
        let after = scene.world_matrix(b).unwrap();
        assert!((before.w_axis - after.w_axis).length() < 1e-9);
        assert_eq!(scene.parent_of(b).unwrap(), Some(a));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        let b = scene.create_group("b", Some(a)).unwrap();
        assert!(matches!(
            scene.reparent(a, Some(b)),
            Err(SceneError::ParentCycle { .. })
        ));
    }

    #[test]
    fn freeze_rotation_keeps_world_rotation() {
        let mut scene = MemoryScene::new();
        let joint = scene.create_joint("j", None, DVec3::ZERO).unwrap();
        scene.set_rotation_deg(joint, DVec3::new(30.0, 45.0, 0.0)).unwrap();
        let before = scene.world_rotation(joint).unwrap();
        scene.freeze_rotation(joint).unwrap();
        let after = scene.world_rotation(joint).unwrap();
        assert!(before.angle_between(after) < 1e-9);
        assert!(vec_close(scene.local(joint).unwrap().rotate_deg, DVec3::ZERO));
    }

    #[test]
    fn connection_overrides_stored_value() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        let b = scene.create_group("b", None).unwrap();
        scene.add_attr(a, "roll", AttrDef::keyable(7.0)).unwrap();
        scene.add_attr(b, "follow", AttrDef::keyable(0.0)).unwrap();
        scene.connect(Plug::new(a, "roll"), Plug::new(b, "follow")).unwrap();
        assert!(close(scene.get_attr(b, "follow").unwrap().as_scalar(), 7.0));
        scene.set_attr(a, "roll", AttrValue::Scalar(-2.0)).unwrap();
        assert!(close(scene.get_attr(b, "follow").unwrap().as_scalar(), -2.0));
    }

    #[test]
    fn reverse_node_complements_input() {
        let mut scene = MemoryScene::new();
        let rev = scene.create_utility("rev", NodeKind::Reverse).unwrap();
        scene.set_attr(rev, "input", AttrValue::Scalar(0.25)).unwrap();
        assert!(close(scene.get_attr(rev, "outputX").unwrap().as_scalar(), 0.75));
    }

    #[test]
    fn condition_defaults_pass_ones_when_false() {
        let mut scene = MemoryScene::new();
        let cond = scene
            .create_utility("cond", NodeKind::Condition(CondOperation::GreaterOrEqual))
            .unwrap();
        scene.set_attr(cond, "firstTerm", AttrValue::Scalar(0.5)).unwrap();
        scene.set_attr(cond, "secondTerm", AttrValue::Scalar(1.0)).unwrap();
        assert!(vec_close(
            scene.get_attr(cond, "outColor").unwrap().as_vec3(),
            DVec3::ONE
        ));
    }

    #[test]
    fn blend_interpolates_between_colors() {
        let mut scene = MemoryScene::new();
        let blend = scene.create_utility("blend", NodeKind::BlendPair).unwrap();
        scene.set_attr(blend, "color1", AttrValue::Vec3(DVec3::new(10.0, 0.0, 0.0))).unwrap();
        scene.set_attr(blend, "color2", AttrValue::Vec3(DVec3::new(20.0, 0.0, 0.0))).unwrap();

        scene.set_attr(blend, "blender", AttrValue::Scalar(1.0)).unwrap();
        assert!(close(scene.get_attr(blend, "outputX").unwrap().as_scalar(), 10.0));
        scene.set_attr(blend, "blender", AttrValue::Scalar(0.0)).unwrap();
        assert!(close(scene.get_attr(blend, "outputX").unwrap().as_scalar(), 20.0));
        scene.set_attr(blend, "blender", AttrValue::Scalar(0.25)).unwrap();
        assert!(close(scene.get_attr(blend, "outputX").unwrap().as_scalar(), 17.5));
    }

    #[test]
    fn distance_node_is_live() {
        let mut scene = MemoryScene::new();
        let a = scene.create_locator("a", None).unwrap();
        let b = scene.create_locator("b", None).unwrap();
        scene.set_translation(b, DVec3::new(3.0, 4.0, 0.0)).unwrap();
        let dist = scene
            .create_utility("dist", NodeKind::Distance { start: a, end: b })
            .unwrap();
        assert!(close(scene.get_attr(dist, "distance").unwrap().as_scalar(), 5.0));
        scene.set_translation(b, DVec3::new(6.0, 8.0, 0.0)).unwrap();
        assert!(close(scene.get_attr(dist, "distance").unwrap().as_scalar(), 10.0));
    }

    #[test]
    fn divide_network_feeds_connected_scale() {
        let mut scene = MemoryScene::new();
        let joint = scene.create_joint("j", None, DVec3::ZERO).unwrap();
        let md = scene
            .create_utility("md", NodeKind::MultiplyDivide(MdOperation::Divide))
            .unwrap();
        scene.set_attr(md, "input1", AttrValue::Scalar(30.0)).unwrap();
        scene.set_attr(md, "input2", AttrValue::Scalar(20.0)).unwrap();
        scene.connect(Plug::new(md, "outputX"), Plug::new(joint, "scaleX")).unwrap();
        assert!(close(scene.get_attr(joint, "scaleX").unwrap().as_scalar(), 1.5));
        // The connected channel flows into the world matrix too.
        let (scale, _, _) = scene.world_matrix(joint).unwrap().to_scale_rotation_translation();
        assert!(close(scale.x, 1.5));
    }

    #[test]
    fn cluster_sits_at_member_centroid() {
        let mut scene = MemoryScene::new();
        let surface = scene
            .create_ribbon_surface("rib", DVec3::new(0.0, 120.0, 0.0), DVec3::Y, 40.0, 8.0)
            .unwrap();
        // Middle row only: centered on the surface center.
        let cluster = scene.create_cluster("mid", surface, 2..3).unwrap();
        assert!(vec_close(
            scene.world_position(cluster).unwrap(),
            DVec3::new(0.0, 120.0, 0.0)
        ));
        // Bottom two rows sit below center.
        let bottom = scene.create_cluster("bottom", surface, 0..2).unwrap();
        assert!(scene.world_position(bottom).unwrap().y < 120.0);
    }

    #[test]
    fn cluster_rejects_out_of_range_rows() {
        let mut scene = MemoryScene::new();
        let surface = scene
            .create_ribbon_surface("rib", DVec3::ZERO, DVec3::Y, 40.0, 8.0)
            .unwrap();
        assert!(matches!(
            scene.create_cluster("bad", surface, 3..9),
            Err(SceneError::CvRange { .. })
        ));
    }

    #[test]
    fn follicle_samples_surface_point() {
        let mut scene = MemoryScene::new();
        let center = DVec3::new(0.0, 120.0, 0.0);
        let surface = scene
            .create_ribbon_surface("rib", center, DVec3::Y, 40.0, 8.0)
            .unwrap();
        let mid = scene.create_follicle("fol", surface, 0.5, 0.5).unwrap();
        assert!(vec_close(scene.world_position(mid).unwrap(), center));
        let start = scene.create_follicle("fol0", surface, 0.0, 0.5).unwrap();
        assert!(vec_close(
            scene.world_position(start).unwrap(),
            DVec3::new(0.0, 100.0, 0.0)
        ));
    }

    #[test]
    fn delete_drops_subtree_and_references() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        let b = scene.create_group("b", Some(a)).unwrap();
        let other = scene.create_group("other", None).unwrap();
        scene.add_attr(b, "out", AttrDef::keyable(1.0)).unwrap();
        scene.add_attr(other, "in", AttrDef::keyable(0.0)).unwrap();
        scene.connect(Plug::new(b, "out"), Plug::new(other, "in")).unwrap();

        scene.delete(a).unwrap();
        assert!(matches!(scene.name(b), Err(SceneError::NodeNotFound(_))));
        // The connection died with its source; the stored value shows again.
        assert!(close(scene.get_attr(other, "in").unwrap().as_scalar(), 0.0));
    }

    #[test]
    fn duplicate_subtree_renames_root_only() {
        let mut scene = MemoryScene::new();
        let root = scene.create_joint("arm", None, DVec3::ZERO).unwrap();
        scene
            .create_joint("elbow", Some(root), DVec3::new(10.0, 0.0, 0.0))
            .unwrap();
        let copy = scene.duplicate_subtree(root, "arm_ik").unwrap();
        assert_eq!(scene.name(copy).unwrap(), "arm_ik");
        let children = scene.children_of(copy).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(scene.name(children[0]).unwrap(), "elbow");
        assert!(vec_close(
            scene.world_position(children[0]).unwrap(),
            DVec3::new(10.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn locked_attr_rejects_writes() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        scene.add_attr(a, "stretch", AttrDef::keyable(1.0)).unwrap();
        scene.hide_and_lock(a, &["stretch"]).unwrap();
        assert!(matches!(
            scene.set_attr(a, "stretch", AttrValue::Scalar(2.0)),
            Err(SceneError::AttrLocked { .. })
        ));
    }

    #[test]
    fn attr_range_clamps_writes() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        scene
            .add_attr(a, "ikFk", AttrDef::keyable(0.0).with_range(0.0, 1.0))
            .unwrap();
        scene.set_attr(a, "ikFk", AttrValue::Scalar(3.0)).unwrap();
        assert!(close(scene.get_attr(a, "ikFk").unwrap().as_scalar(), 1.0));
    }

    #[test]
    fn connection_cycles_are_detected() {
        let mut scene = MemoryScene::new();
        let a = scene.create_group("a", None).unwrap();
        let b = scene.create_group("b", None).unwrap();
        scene.add_attr(a, "x", AttrDef::keyable(0.0)).unwrap();
        scene.add_attr(b, "y", AttrDef::keyable(0.0)).unwrap();
        scene.connect(Plug::new(a, "x"), Plug::new(b, "y")).unwrap();
        scene.connect(Plug::new(b, "y"), Plug::new(a, "x")).unwrap();
        assert!(matches!(
            scene.get_attr(a, "x"),
            Err(SceneError::EvalCycle(_))
        ));
    }
}
