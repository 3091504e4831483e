//! Template skeleton: the placed joint-position dataset the rigger consumes.
//!
//! A template is a flat map of [`JointKey`] to local placement data. It is
//! normally produced by a placement tool and loaded from JSON, but
//! [`TemplateSkeleton::biped`] synthesizes the standard biped template
//! directly, including extra fingers and toes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::key::{JointKey, Side};

/// Distance between neighboring synthetic toe chains.
const TOE_OFFSET: f64 = 1.25;
/// Distance between neighboring synthetic extra-finger chains.
const EXTRA_FINGER_OFFSET: f64 = 3.0;

/// One placed template joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateJoint {
    /// World position [X, Y, Z].
    pub position: [f64; 3],
    /// Parent joint key, if any. The root has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<JointKey>,
}

impl TemplateJoint {
    /// Creates a parented template joint.
    pub fn new(position: [f64; 3], parent: JointKey) -> Self {
        Self {
            position,
            parent: Some(parent),
        }
    }

    /// Creates a root-level template joint.
    pub fn root(position: [f64; 3]) -> Self {
        Self {
            position,
            parent: None,
        }
    }
}

/// A placed template skeleton: joint positions plus parent links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSkeleton {
    /// All template joints, keyed by joint key.
    pub joints: BTreeMap<JointKey, TemplateJoint>,
}

impl TemplateSkeleton {
    /// Parses a template skeleton from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a template skeleton from a JSON file.
    ///
    /// A missing or unreadable file reports as [`TemplateError::Io`], which
    /// is distinct from the structural errors [`validate`](Self::validate)
    /// raises for an incomplete skeleton.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Looks up a template joint.
    pub fn get(&self, key: &JointKey) -> Option<&TemplateJoint> {
        self.joints.get(key)
    }

    /// Number of template joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Returns true if the template has no joints.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    fn insert(&mut self, key: JointKey, joint: TemplateJoint) {
        self.joints.insert(key, joint);
    }

    /// Checks the template for structural completeness: a parentless
    /// `c_root`, no dangling parent links, and every joint the biped build
    /// sequence addresses directly.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let root = JointKey::center("root");
        match self.joints.get(&root) {
            None => return Err(TemplateError::MissingRoot),
            Some(j) if j.parent.is_some() => return Err(TemplateError::RootHasParent),
            Some(_) => {}
        }

        for (key, joint) in &self.joints {
            if let Some(parent) = &joint.parent {
                if !self.joints.contains_key(parent) {
                    return Err(TemplateError::UnknownParent {
                        joint: key.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for name in ["chest", "neck", "head", "headTip"] {
            let key = JointKey::center(name);
            if !self.joints.contains_key(&key) {
                return Err(TemplateError::MissingJoint(key));
            }
        }
        for side in [Side::Left, Side::Right] {
            for name in [
                "clavicle", "shoulder", "elbow", "wrist", "thigh", "knee", "ankle", "ball",
                "footTip",
            ] {
                let key = JointKey::new(side, name);
                if !self.joints.contains_key(&key) {
                    return Err(TemplateError::MissingJoint(key));
                }
            }
        }
        Ok(())
    }

    /// Builds the standard biped template.
    ///
    /// `finger_count` beyond the five named fingers adds synthetic
    /// `extraFingerA..` chains stacked behind the pinky; fewer keeps a
    /// truncated subset of the named fingers (a count of 0 or 1 keeps just
    /// the index finger, matching the original tool). `toe_count` toes are
    /// always synthetic `toeA..` chains fanned out from the ball joint.
    pub fn biped(finger_count: u32, toe_count: u32) -> Self {
        let mut t = TemplateSkeleton::default();
        let c = |name: &str| JointKey::center(name);

        t.insert(c("root"), TemplateJoint::root([0.0, 100.0, 0.0]));
        t.insert(c("chest"), TemplateJoint::new([0.0, 140.0, 0.0], c("root")));
        t.insert(c("neck"), TemplateJoint::new([0.0, 150.0, 0.0], c("chest")));
        t.insert(c("head"), TemplateJoint::new([0.0, 160.0, 0.0], c("neck")));
        t.insert(
            c("headTip"),
            TemplateJoint::new([0.0, 180.0, 0.0], c("head")),
        );

        for side in [Side::Left, Side::Right] {
            t.add_side(side, finger_count, toe_count);
        }
        t
    }

    /// Adds one side's limbs and digits. Positions are authored for the
    /// left side and mirrored across X for the right.
    fn add_side(&mut self, side: Side, finger_count: u32, toe_count: u32) {
        let sx = if side == Side::Right { -1.0 } else { 1.0 };
        let k = |name: &str| JointKey::new(side, name);
        let ks = |name: &str, seq: u32| JointKey::seq(side, name, seq);
        let p = |x: f64, y: f64, z: f64| [x * sx, y, z];

        // Arm, T-pose with the elbow pulled slightly back so the pole
        // vector is well defined.
        self.insert(
            k("clavicle"),
            TemplateJoint::new(p(3.0, 145.0, 0.0), JointKey::center("chest")),
        );
        self.insert(
            k("shoulder"),
            TemplateJoint::new(p(15.0, 145.0, 0.0), k("clavicle")),
        );
        self.insert(
            k("elbow"),
            TemplateJoint::new(p(40.0, 145.0, -3.0), k("shoulder")),
        );
        self.insert(
            k("wrist"),
            TemplateJoint::new(p(65.0, 145.0, 0.0), k("elbow")),
        );

        // Leg, knee pushed forward.
        self.insert(
            k("thigh"),
            TemplateJoint::new(p(9.0, 95.0, 0.0), JointKey::center("root")),
        );
        self.insert(k("knee"), TemplateJoint::new(p(10.0, 52.0, 3.0), k("thigh")));
        self.insert(k("ankle"), TemplateJoint::new(p(10.0, 10.0, 0.0), k("knee")));
        self.insert(k("ball"), TemplateJoint::new(p(10.0, 2.0, 12.0), k("ankle")));
        self.insert(
            k("footTip"),
            TemplateJoint::new(p(10.0, 2.0, 20.0), k("ball")),
        );

        // Named fingers, four joints each, root parented to the wrist.
        let named: [(&str, [[f64; 3]; 4]); 5] = [
            (
                "thumb",
                [
                    [70.0, 143.0, 4.0],
                    [73.0, 142.0, 6.0],
                    [75.0, 141.0, 7.5],
                    [77.0, 140.0, 9.0],
                ],
            ),
            (
                "index",
                [
                    [75.0, 145.0, 3.0],
                    [79.0, 145.0, 3.0],
                    [82.0, 145.0, 3.0],
                    [84.0, 145.0, 3.0],
                ],
            ),
            (
                "middle",
                [
                    [76.0, 145.0, 1.0],
                    [80.0, 145.0, 1.0],
                    [83.5, 145.0, 1.0],
                    [86.0, 145.0, 1.0],
                ],
            ),
            (
                "ring",
                [
                    [75.5, 145.0, -1.0],
                    [79.0, 145.0, -1.0],
                    [82.0, 145.0, -1.0],
                    [84.0, 145.0, -1.0],
                ],
            ),
            (
                "pinky",
                [
                    [74.0, 145.0, -3.0],
                    [77.0, 145.0, -3.0],
                    [79.5, 145.0, -3.0],
                    [81.0, 145.0, -3.0],
                ],
            ),
        ];

        let keep = named_finger_count(finger_count);
        for (name, positions) in named.iter().take(keep) {
            let mut parent = k("wrist");
            for (i, pos) in positions.iter().enumerate() {
                let key = ks(name, i as u32 + 1);
                self.insert(key.clone(), TemplateJoint::new(p(pos[0], pos[1], pos[2]), parent));
                parent = key;
            }
        }
        // finger_count <= 1 keeps only the index finger.
        if finger_count <= 1 {
            let (name, positions) = &named[1];
            let mut parent = k("wrist");
            for (i, pos) in positions.iter().enumerate() {
                let key = ks(name, i as u32 + 1);
                self.insert(key.clone(), TemplateJoint::new(p(pos[0], pos[1], pos[2]), parent));
                parent = key;
            }
        }

        // Synthetic extra fingers stacked behind the pinky.
        if finger_count > 5 {
            let pinky = &named[4].1;
            for extra in 0..(finger_count - 5) {
                let name = format!("extraFinger{}", letter(extra));
                let z_shift = -EXTRA_FINGER_OFFSET * (extra as f64 + 1.0);
                let mut parent = k("wrist");
                for (i, pos) in pinky.iter().enumerate() {
                    let key = ks(&name, i as u32 + 1);
                    self.insert(
                        key.clone(),
                        TemplateJoint::new(p(pos[0], pos[1], pos[2] + z_shift), parent),
                    );
                    parent = key;
                }
            }
        }

        // Synthetic toes fanned out from the ball joint, three joints each.
        let toe_template = [[10.0, 2.0, 13.0], [10.0, 2.0, 17.0], [10.0, 2.0, 20.0]];
        for toe in 0..toe_count {
            let name = format!("toe{}", letter(toe));
            let spread = if toe % 2 == 0 {
                TOE_OFFSET * (toe as f64 + 1.0)
            } else {
                -TOE_OFFSET * (toe as f64 + 1.0)
            };
            let mut parent = k("ball");
            for (i, pos) in toe_template.iter().enumerate() {
                let key = ks(&name, i as u32 + 1);
                self.insert(
                    key.clone(),
                    TemplateJoint::new(p(pos[0] + spread, pos[1], pos[2]), parent),
                );
                parent = key;
            }
        }
    }
}

/// How many of the five named fingers a finger count keeps.
fn named_finger_count(finger_count: u32) -> usize {
    if finger_count <= 1 {
        0 // index-only fallback handled by the caller
    } else {
        finger_count.min(5) as usize
    }
}

/// Uppercase letter suffix for synthetic digit chains (A, B, C, ...).
fn letter(i: u32) -> char {
    (b'A' + (i % 26) as u8) as char
}
