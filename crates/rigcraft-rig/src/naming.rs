//! Node-name formatting.
//!
//! Names follow `<rig>_<side>_<name><seq>_<suffix>` and are display labels
//! only: every lookup goes through [`NodeId`](rigcraft_scene::NodeId) handles,
//! so names can be rewritten freely during construction.

use rigcraft_spec::JointKey;

/// Role suffixes, one per node role the build produces.
pub mod suffix {
    /// Bind-layer joint.
    pub const BIND: &str = "bnd";
    /// Animation-layer joint.
    pub const ANIM: &str = "jnt";
    /// IK chain joint.
    pub const IK: &str = "ik";
    /// FK chain joint.
    pub const FK: &str = "fk";
    /// Foot-roll driver joint.
    pub const DRIVER: &str = "drv";
    /// Control curve.
    pub const CONTROL: &str = "ctr";
    /// Control space group.
    pub const SPACE: &str = "nul";
    /// Digit curl offset group.
    pub const OFFSET: &str = "offset";
    /// Plain group.
    pub const GROUP: &str = "grp";
    /// IK solver handle.
    pub const IK_HANDLE: &str = "ikh";
    /// Surface follicle.
    pub const FOLLICLE: &str = "fol";
    /// Cluster deformer.
    pub const CLUSTER: &str = "cls";
    /// Ribbon surface.
    pub const SURFACE: &str = "surf";
    /// Locator.
    pub const LOCATOR: &str = "loc";
    /// Blend node.
    pub const BLEND: &str = "bc";
    /// Reverse node.
    pub const REVERSE: &str = "rev";
    /// Generic dataflow node.
    pub const NODE: &str = "nod";
    /// Distance node.
    pub const DISTANCE: &str = "dm";
}

/// Formats a joint-derived node name: `<rig>_<key>_<suffix>`.
pub fn joint_name(rig: &str, key: &JointKey, suffix: &str) -> String {
    format!("{rig}_{key}_{suffix}")
}

/// Formats a non-joint node name: `<rig>_<mid>_<suffix>`.
pub fn part_name(rig: &str, mid: &str, suffix: &str) -> String {
    format!("{rig}_{mid}_{suffix}")
}

/// Formats a sided part name: `<rig>_<side>_<mid>_<suffix>`.
pub fn sided_name(rig: &str, side_prefix: &str, mid: &str, suffix: &str) -> String {
    format!("{rig}_{side_prefix}_{mid}_{suffix}")
}

/// Replaces the trailing `_<suffix>` segment of an existing name.
pub fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('_') {
        Some((stem, _)) => format!("{stem}_{suffix}"),
        None => format!("{name}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigcraft_spec::Side;

    #[test]
    fn joint_names_follow_convention() {
        let key = JointKey::seq(Side::Left, "spine", 3);
        assert_eq!(joint_name("hero", &key, suffix::BIND), "hero_l_spine03_bnd");
    }

    #[test]
    fn suffix_swap_keeps_stem() {
        assert_eq!(with_suffix("hero_l_wrist_jnt", suffix::IK), "hero_l_wrist_ik");
        assert_eq!(with_suffix("plain", "ctr"), "plain_ctr");
    }
}
