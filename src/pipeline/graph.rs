//! 流水线依赖图
//!
//! 使用邻接表和入度表实现 DAG；构建时即校验未知依赖与环（Kahn 算法），
//! 任何智能体运行前就报 InvalidPipelineGraph。

use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline::types::{AgentName, PipelineError};

/// 声明式依赖图：节点为智能体名，边为「依赖 -> 依赖者」
#[derive(Debug)]
pub struct PipelineGraph {
    /// 邻接表：智能体 -> 依赖它的智能体（按名排序，遍历顺序确定）
    adjacency: BTreeMap<AgentName, Vec<AgentName>>,
    /// 每个智能体声明的依赖
    dependencies: BTreeMap<AgentName, Vec<AgentName>>,
}

impl PipelineGraph {
    /// 从 (名字, 依赖列表) 声明构建并校验
    pub fn new(declarations: &[(AgentName, Vec<AgentName>)]) -> Result<Self, PipelineError> {
        let mut adjacency: BTreeMap<AgentName, Vec<AgentName>> = BTreeMap::new();
        let mut dependencies: BTreeMap<AgentName, Vec<AgentName>> = BTreeMap::new();

        for (name, _) in declarations {
            if dependencies.contains_key(name) {
                return Err(PipelineError::InvalidGraph(format!(
                    "duplicate agent name '{}'",
                    name
                )));
            }
            dependencies.insert(name.clone(), Vec::new());
            adjacency.insert(name.clone(), Vec::new());
        }

        for (name, deps) in declarations {
            for dep in deps {
                if !dependencies.contains_key(dep) {
                    return Err(PipelineError::InvalidGraph(format!(
                        "agent '{}' depends on unknown agent '{}'",
                        name, dep
                    )));
                }
                if dep == name {
                    return Err(PipelineError::InvalidGraph(format!(
                        "agent '{}' depends on itself",
                        name
                    )));
                }
                if let Some(dependents) = adjacency.get_mut(dep) {
                    dependents.push(name.clone());
                }
                if let Some(declared) = dependencies.get_mut(name) {
                    declared.push(dep.clone());
                }
            }
        }

        let graph = Self {
            adjacency,
            dependencies,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Kahn 拓扑排序；有节点排不进去即有环
    fn check_acyclic(&self) -> Result<(), PipelineError> {
        let mut in_degree: BTreeMap<&AgentName, usize> = self
            .dependencies
            .iter()
            .map(|(name, deps)| (name, deps.len()))
            .collect();

        let mut queue: Vec<&AgentName> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut visited = 0usize;

        while let Some(name) = queue.pop() {
            visited += 1;
            if let Some(dependents) = self.adjacency.get(name) {
                for dependent in dependents {
                    if let Some(d) = in_degree.get_mut(dependent) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push(dependent);
                        }
                    }
                }
            }
        }

        if visited != self.dependencies.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| n.as_str())
                .collect();
            return Err(PipelineError::InvalidGraph(format!(
                "dependency cycle involving: {}",
                stuck.join(", ")
            )));
        }
        Ok(())
    }

    /// 所有已声明的智能体名（按名排序）
    pub fn agents(&self) -> impl Iterator<Item = &AgentName> {
        self.dependencies.keys()
    }

    pub fn dependencies_of(&self, name: &str) -> &[AgentName] {
        self.dependencies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 尚未处理、且所有依赖都已在 done 集合中的智能体
    pub fn ready(&self, done: &BTreeSet<AgentName>) -> Vec<AgentName> {
        self.dependencies
            .iter()
            .filter(|(name, deps)| {
                !done.contains(*name) && deps.iter().all(|d| done.contains(d))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(pairs: &[(&str, &[&str])]) -> Vec<(AgentName, Vec<AgentName>)> {
        pairs
            .iter()
            .map(|(n, deps)| {
                (
                    n.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_diamond_graph_valid() {
        let graph = PipelineGraph::new(&decl(&[
            ("analyst", &[]),
            ("summarizer", &["analyst"]),
            ("strategy", &["analyst"]),
            ("reporter", &["summarizer", "strategy"]),
        ]))
        .unwrap();

        let ready = graph.ready(&BTreeSet::new());
        assert_eq!(ready, vec!["analyst".to_string()]);

        let mut done = BTreeSet::new();
        done.insert("analyst".to_string());
        let ready = graph.ready(&done);
        assert_eq!(ready, vec!["strategy".to_string(), "summarizer".to_string()]);
    }

    #[test]
    fn test_cycle_detected() {
        let err = PipelineGraph::new(&decl(&[("a", &["b"]), ("b", &["a"])])).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = PipelineGraph::new(&decl(&[("a", &["a"])])).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = PipelineGraph::new(&decl(&[("a", &["ghost"])])).unwrap_err();
        assert!(err.to_string().contains("unknown agent 'ghost'"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = PipelineGraph::new(&decl(&[("a", &[]), ("a", &[])])).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
