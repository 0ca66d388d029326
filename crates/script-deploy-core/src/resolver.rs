//! Dependency Resolver
//!
//! Grouped depth-first topological sort with cycle detection:
//! - Service scripts are excluded
//! - Groups are processed in ascending `order_group`, each in isolation
//! - Within a group, a script runs after the script it depends on
//! - Unknown dependencies become phantom nodes that are never emitted
//!
//! Order is deterministic: outer iteration follows node discovery order, which
//! is input order with a phantom dependency discovered right after the first
//! script naming it.

use crate::error::DeployError;
use crate::script::{Script, ScriptKey};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

#[derive(Debug)]
struct Node {
    key: ScriptKey,
    /// Index into the caller's script slice; `None` for phantom nodes.
    script: Option<usize>,
    /// Scripts that depend on this node (edge `depends_on -> script_key`).
    dependents: Vec<usize>,
    mark: Mark,
}

/// Arena-backed dependency graph of a single order group.
#[derive(Debug, Default)]
struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<ScriptKey, usize>,
}

impl DependencyGraph {
    fn build(scripts: &[Script], members: &[usize]) -> Self {
        let mut graph = Self::default();

        for &idx in members {
            let script = &scripts[idx];
            let node = graph.node_for(&script.script_key);
            graph.nodes[node].script = Some(idx);

            let Some(parent) = script.depends_on.as_ref().filter(|k| !k.is_empty()) else {
                continue;
            };
            let parent = graph.node_for(parent);
            graph.nodes[parent].dependents.push(node);
        }

        graph
    }

    fn node_for(&mut self, key: &ScriptKey) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            key: key.clone(),
            script: None,
            dependents: Vec::new(),
            mark: Mark::Unvisited,
        });
        self.index.insert(key.clone(), idx);
        idx
    }

    /// Depth-first post-order, reversed. Uses an explicit `(node, cursor)` stack.
    fn topological_order(mut self) -> Result<Vec<usize>, DeployError> {
        let mut finished: Vec<usize> = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.nodes.len() {
            if self.nodes[start].mark != Mark::Unvisited {
                continue;
            }
            self.nodes[start].mark = Mark::Visiting;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;

                if let Some(&next) = self.nodes[node].dependents.get(cursor) {
                    frame.1 += 1;
                    match self.nodes[next].mark {
                        Mark::Visiting => {
                            return Err(DeployError::CyclicDependency(
                                self.nodes[next].key.clone(),
                            ));
                        }
                        Mark::Visited => {}
                        Mark::Unvisited => {
                            self.nodes[next].mark = Mark::Visiting;
                            stack.push((next, 0));
                        }
                    }
                } else {
                    self.nodes[node].mark = Mark::Visited;
                    finished.push(node);
                    stack.pop();
                }
            }
        }

        Ok(finished
            .into_iter()
            .rev()
            .filter_map(|node| self.nodes[node].script)
            .collect())
    }
}

/// Resolve deployment order. Returns indices into `scripts`.
///
/// Fails with [`DeployError::DuplicateScriptKey`] when two non-service scripts
/// share a key, with [`DeployError::InvalidScript`] when one has an empty
/// key, and with [`DeployError::CyclicDependency`] when a group's
/// dependencies form a cycle.
pub fn resolve_order(scripts: &[Script]) -> Result<Vec<usize>, DeployError> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    let mut group_of: HashMap<&ScriptKey, i32> = HashMap::new();

    for (idx, script) in scripts.iter().enumerate() {
        if script.is_service {
            continue;
        }
        if script.script_key.is_empty() {
            return Err(DeployError::InvalidScript("script key must not be empty".into()));
        }
        if group_of.insert(&script.script_key, script.order_group).is_some() {
            return Err(DeployError::DuplicateScriptKey(script.script_key.clone()));
        }
        groups.entry(script.order_group).or_default().push(idx);
    }

    for script in scripts.iter().filter(|s| !s.is_service) {
        let Some(dep) = script.depends_on.as_ref().filter(|k| !k.is_empty()) else {
            continue;
        };
        match group_of.get(dep) {
            Some(&group) if group != script.order_group => {
                tracing::warn!(
                    script_key = %script.script_key,
                    depends_on = %dep,
                    script_group = script.order_group,
                    dependency_group = group,
                    "Dependency crosses order groups; ordering follows groups only"
                );
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    script_key = %script.script_key,
                    depends_on = %dep,
                    "Dependency is not part of this run"
                );
            }
        }
    }

    let mut order = Vec::with_capacity(group_of.len());
    for (group, members) in &groups {
        let sorted = DependencyGraph::build(scripts, members).topological_order()?;
        tracing::trace!(group, count = sorted.len(), "Resolved order group");
        order.extend(sorted);
    }

    Ok(order)
}

/// Resolve deployment order and return the scripts themselves.
pub fn sort_scripts(scripts: &[Script]) -> Result<Vec<&Script>, DeployError> {
    Ok(resolve_order(scripts)?
        .into_iter()
        .map(|idx| &scripts[idx])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(key: &str) -> Script {
        Script::new(key, format!("Source_{key}"))
    }

    fn keys(scripts: &[Script]) -> Vec<String> {
        sort_scripts(scripts)
            .unwrap()
            .into_iter()
            .map(|s| s.script_key.to_string())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(sort_scripts(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_script() {
        assert_eq!(keys(&[script("Script1")]), vec!["Script1"]);
    }

    #[test]
    fn test_empty_key_rejected() {
        let scripts = vec![script("Script1"), Script::new("", "Source_Empty")];
        let err = resolve_order(&scripts).unwrap_err();
        assert!(matches!(err, DeployError::InvalidScript(_)));
        assert!(err.is_structural());
    }

    #[test]
    fn test_service_scripts_excluded() {
        let scripts = vec![script("Script1"), Script::service("Script2", "s")];
        assert_eq!(keys(&scripts), vec!["Script1"]);
    }

    #[test]
    fn test_reference_order() {
        let scripts = vec![
            script("Script6").with_dependency("Script2"),
            script("Script5").with_dependency("Script4"),
            script("Script3").with_dependency("Script2"),
            script("Script4").with_dependency("Script2"),
            script("Script2").with_dependency("Script1"),
            script("Script1"),
            script("IndependentScript1").in_group(-1000),
            script("IndependentScript2").in_group(-1000),
        ];

        assert_eq!(
            keys(&scripts),
            vec![
                "IndependentScript2",
                "IndependentScript1",
                "Script1",
                "Script2",
                "Script4",
                "Script5",
                "Script3",
                "Script6",
            ]
        );
    }

    #[test]
    fn test_cycle_reports_reentered_node() {
        let scripts = vec![
            script("Script1").with_dependency("Script2"),
            script("Script2").with_dependency("Script3"),
            script("Script3").with_dependency("Script4"),
            script("Script4").with_dependency("Script2"),
        ];

        let err = sort_scripts(&scripts).unwrap_err();
        assert!(matches!(&err, DeployError::CyclicDependency(key) if key.as_str() == "Script2"));
        assert_eq!(err.to_string(), "Cyclic dependency detected for script: Script2");
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let scripts = vec![script("A").with_dependency("A")];
        let err = sort_scripts(&scripts).unwrap_err();
        assert!(matches!(err, DeployError::CyclicDependency(key) if key.as_str() == "A"));
    }

    #[test]
    fn test_phantom_dependency_not_emitted() {
        let scripts = vec![script("B").with_dependency("Missing"), script("A")];
        assert_eq!(keys(&scripts), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_dependency_is_ignored() {
        let mut b = script("B");
        b.depends_on = Some(ScriptKey::from(""));
        assert_eq!(keys(&[script("A"), b]), vec!["B", "A"]);
    }

    #[test]
    fn test_keys_compare_case_insensitively() {
        let scripts = vec![script("child").with_dependency("PARENT"), script("Parent")];
        assert_eq!(keys(&scripts), vec!["Parent", "child"]);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let scripts = vec![script("Script1"), script("SCRIPT1")];
        let err = sort_scripts(&scripts).unwrap_err();
        assert!(matches!(err, DeployError::DuplicateScriptKey(_)));
    }

    #[test]
    fn test_service_duplicate_is_not_a_conflict() {
        let scripts = vec![script("Script1"), Script::service("Script1", "svc")];
        assert_eq!(keys(&scripts), vec!["Script1"]);
    }

    #[test]
    fn test_groups_run_ascending_and_isolated() {
        // B depends on A but lives in an earlier group, so it still runs first.
        let scripts = vec![
            script("A").in_group(10),
            script("B").with_dependency("A").in_group(-5),
            script("C").in_group(0),
        ];
        assert_eq!(keys(&scripts), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_cycle_across_groups_is_not_a_cycle() {
        let scripts = vec![
            script("A").with_dependency("B").in_group(0),
            script("B").with_dependency("A").in_group(1),
        ];
        assert_eq!(keys(&scripts), vec!["A", "B"]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut scripts = vec![script("S0")];
        for i in 1..50_000 {
            scripts.push(script(&format!("S{i}")).with_dependency(format!("S{}", i - 1)));
        }

        let order = resolve_order(&scripts).unwrap();
        assert_eq!(order.len(), scripts.len());
        assert_eq!(scripts[order[0]].script_key.as_str(), "S0");
        assert_eq!(scripts[*order.last().unwrap()].script_key.as_str(), "S49999");
    }

    #[test]
    fn test_deterministic() {
        let scripts = vec![
            script("Script3").with_dependency("Script1"),
            script("Script2").with_dependency("Script1"),
            script("Script1"),
            script("Other"),
        ];
        let first = keys(&scripts);
        for _ in 0..10 {
            assert_eq!(keys(&scripts), first);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Random forests: script `i` may depend on any earlier-created script.
        fn arb_scripts() -> impl Strategy<Value = Vec<Script>> {
            prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), 0..3i32), 0..40)
                .prop_map(|specs| {
                    let mut scripts: Vec<Script> = specs
                        .iter()
                        .enumerate()
                        .map(|(i, (dep, has_dep, group))| {
                            let mut s = Script::new(format!("S{i}"), "src").in_group(*group);
                            if *has_dep && i > 0 {
                                s = s.with_dependency(format!("S{}", dep.index(i)));
                            }
                            s
                        })
                        .collect();
                    // Present them in a scrambled but reproducible order.
                    scripts.reverse();
                    scripts
                })
        }

        proptest! {
            #[test]
            fn order_is_a_permutation(scripts in arb_scripts()) {
                let mut order = resolve_order(&scripts).unwrap();
                order.sort_unstable();
                prop_assert_eq!(order, (0..scripts.len()).collect::<Vec<_>>());
            }

            #[test]
            fn groups_are_non_decreasing(scripts in arb_scripts()) {
                let sorted = sort_scripts(&scripts).unwrap();
                for pair in sorted.windows(2) {
                    prop_assert!(pair[0].order_group <= pair[1].order_group);
                }
            }

            #[test]
            fn same_group_dependency_runs_first(scripts in arb_scripts()) {
                let sorted = sort_scripts(&scripts).unwrap();
                let position: HashMap<&ScriptKey, (usize, i32)> = sorted
                    .iter()
                    .enumerate()
                    .map(|(pos, s)| (&s.script_key, (pos, s.order_group)))
                    .collect();

                for (pos, s) in sorted.iter().enumerate() {
                    let Some(dep) = &s.depends_on else { continue };
                    if let Some(&(dep_pos, dep_group)) = position.get(dep) {
                        if dep_group == s.order_group {
                            prop_assert!(dep_pos < pos, "{} must follow {}", s.script_key, dep);
                        }
                    }
                }
            }

            #[test]
            fn resolution_is_deterministic(scripts in arb_scripts()) {
                prop_assert_eq!(resolve_order(&scripts).unwrap(), resolve_order(&scripts).unwrap());
            }
        }
    }
}
