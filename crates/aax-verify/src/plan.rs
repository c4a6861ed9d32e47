//! Image build ordering using `petgraph`.
//!
//! Images that build `FROM` another image declare it in `depends_on`. The
//! plan is a topological order of the dependency graph, restricted to the
//! selected images and everything they need.

use std::collections::{BTreeSet, HashMap};

use aax_common::error::{AaxError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::contract::ImageTarget;

/// Dependency graph over the images of a contract.
#[derive(Debug)]
pub struct BuildGraph<'c> {
    graph: DiGraph<&'c ImageTarget, ()>,
    index: HashMap<&'c str, NodeIndex>,
}

impl<'c> BuildGraph<'c> {
    /// Builds the graph for `images`.
    ///
    /// Edges point from a dependency to its dependent so a topological sort
    /// yields dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::NotFound`] if an image depends on a name that is
    /// not in `images`.
    pub fn new(images: &'c [ImageTarget]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let index: HashMap<&str, NodeIndex> = images
            .iter()
            .map(|image| (image.name.as_str(), graph.add_node(image)))
            .collect();

        for image in images {
            let dependent = index[image.name.as_str()];
            for dependency in &image.depends_on {
                let Some(&from) = index.get(dependency.as_str()) else {
                    return Err(AaxError::NotFound {
                        kind: "image dependency",
                        id: format!("{dependency} (required by {})", image.name),
                    });
                };
                let _ = graph.add_edge(from, dependent, ());
            }
        }
        Ok(Self { graph, index })
    }

    /// Returns the images to build for `selection`, dependencies first.
    ///
    /// An empty selection plans every image.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::NotFound`] for an unknown selected name and
    /// [`AaxError::Config`] if the dependencies form a cycle.
    pub fn plan(&self, selection: &[String]) -> Result<Vec<&'c ImageTarget>> {
        let order = petgraph::algo::toposort(&self.graph, None).map_err(|cycle| {
            AaxError::config(format!(
                "cyclic image dependency involving `{}`",
                self.graph[cycle.node_id()].name
            ))
        })?;

        if selection.is_empty() {
            return Ok(order.into_iter().map(|idx| self.graph[idx]).collect());
        }

        let wanted = self.closure(selection)?;
        Ok(order
            .into_iter()
            .filter(|idx| wanted.contains(idx))
            .map(|idx| self.graph[idx])
            .collect())
    }

    fn closure(&self, selection: &[String]) -> Result<BTreeSet<NodeIndex>> {
        let reversed = Reversed(&self.graph);
        let mut wanted = BTreeSet::new();
        for name in selection {
            let start = *self.index.get(name.as_str()).ok_or_else(|| AaxError::NotFound {
                kind: "image",
                id: name.clone(),
            })?;
            let mut dfs = Dfs::new(reversed, start);
            while let Some(idx) = dfs.next(reversed) {
                let _ = wanted.insert(idx);
            }
        }
        Ok(wanted)
    }
}

/// Plans the build of `selection` (all images when empty).
///
/// # Errors
///
/// See [`BuildGraph::new`] and [`BuildGraph::plan`].
pub fn build_order<'c>(images: &'c [ImageTarget], selection: &[String]) -> Result<Vec<&'c ImageTarget>> {
    BuildGraph::new(images)?.plan(selection)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use aax_common::types::BuildArgs;

    use super::*;
    use crate::contract::Contract;

    fn image(name: &str, deps: &[&str]) -> ImageTarget {
        ImageTarget {
            name: name.to_string(),
            tag: format!("t/{name}"),
            dockerfile: PathBuf::from("Dockerfile"),
            context: PathBuf::from("."),
            build_args: BuildArgs::new(),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            checks: Vec::new(),
        }
    }

    fn names(plan: &[&ImageTarget]) -> Vec<String> {
        plan.iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn base_is_built_before_derived_images() {
        let contract = Contract::default();
        let order = names(&build_order(&contract.images, &[]).expect("plan"));
        assert_eq!(order.len(), 7);
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("ee-base") < pos("ee-builder"));
        assert!(pos("ee-base") < pos("dev-tools"));
    }

    #[test]
    fn selection_pulls_in_dependencies_only() {
        let contract = Contract::default();
        let order = names(
            &build_order(&contract.images, &["dev-tools".to_string()]).expect("plan"),
        );
        assert_eq!(order, vec!["ee-base", "dev-tools"]);
    }

    #[test]
    fn independent_selection_is_alone() {
        let contract = Contract::default();
        let order = names(&build_order(&contract.images, &["pulp".to_string()]).expect("plan"));
        assert_eq!(order, vec!["pulp"]);
    }

    #[test]
    fn transitive_dependencies_are_ordered() {
        let images = vec![image("c", &["b"]), image("b", &["a"]), image("a", &[])];
        let order = names(&build_order(&images, &["c".to_string()]).expect("plan"));
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let images = vec![image("dev-tools", &["ee-bse"])];
        let err = build_order(&images, &[]).unwrap_err();
        assert!(matches!(err, AaxError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let images = vec![image("ee-base", &[])];
        let err = build_order(&images, &["awx".to_string()]).unwrap_err();
        assert!(err.to_string().contains("awx"));
    }

    #[test]
    fn cycle_is_rejected() {
        let images = vec![image("a", &["b"]), image("b", &["a"])];
        let err = build_order(&images, &[]).unwrap_err();
        assert!(err.to_string().contains("cyclic"), "got: {err}");
    }
}
