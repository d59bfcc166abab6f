use serde::{Deserialize, Serialize};
use unnamed_entity::EntityId;

use crate::error::Result;
use crate::node::NodeId;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    /// Coarse routing: one track per channel, carrying the whole channel width as capacity.
    Global,
    #[default]
    Detailed,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    pub route_type: RouteType,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Intra-tile connectivity is modeled; reachability is not checked.
    pub flat: bool,
    /// Virtual clock network root, skipped by the node checks.
    pub excluded_node: Option<u32>,
}

impl CheckOptions {
    /// Compares by index, so an id past the end of the graph excludes nothing.
    pub fn is_excluded(&self, node: NodeId) -> bool {
        self.excluded_node
            .is_some_and(|idx| idx as usize == node.to_idx())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub build: BuildOptions,
    pub check: CheckOptions,
}

impl Options {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;

    #[test]
    fn parse_options() {
        let opts = Options::from_toml(
            r#"
            [build]
            route_type = "global"

            [check]
            flat = true
            excluded_node = 12
            "#,
        )
        .unwrap();
        assert_eq!(opts.build.route_type, RouteType::Global);
        assert!(opts.check.flat);
        assert!(opts.check.is_excluded(NodeId::from_idx(12)));
        assert!(!opts.check.is_excluded(NodeId::from_idx(13)));
        assert_eq!(Options::from_toml("").unwrap(), Options::default());
    }

    #[test]
    fn unknown_fields_rejected() {
        assert_matches!(
            Options::from_toml("[check]\nflatt = true\n"),
            Err(Error::Options(_))
        );
        assert_matches!(
            Options::from_toml("[build]\nroute_type = \"coarse\"\n"),
            Err(Error::Options(_))
        );
    }

    #[test]
    fn oversized_excluded_node_rejected() {
        assert_matches!(
            Options::from_toml("[check]\nexcluded_node = 5000000000\n"),
            Err(Error::Options(_))
        );
        assert_matches!(
            Options::from_toml("[check]\nexcluded_node = -1\n"),
            Err(Error::Options(_))
        );
        let opts = Options::from_toml("[check]\nexcluded_node = 4294967295\n").unwrap();
        assert!(!opts.check.is_excluded(NodeId::from_idx(0)));
    }
}
