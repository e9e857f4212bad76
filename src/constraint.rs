use std::collections::HashSet;

use crate::error::SolveError;
use crate::model::{GraphModel, LinkId, NodeId};

/// 單次查詢的限制條件：排除的節點與連線，加上必須依序經過的中繼點。
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    excluded_nodes: HashSet<NodeId>,
    excluded_links: HashSet<LinkId>,
    waypoints: Vec<NodeId>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn exclude_node(&mut self, id: NodeId) -> &mut Self {
        self.excluded_nodes.insert(id);
        self
    }
    pub fn exclude_link(&mut self, id: LinkId) -> &mut Self {
        self.excluded_links.insert(id);
        self
    }
    pub fn add_waypoint(&mut self, id: NodeId) -> &mut Self {
        self.waypoints.push(id);
        self
    }
    pub fn node_excluded(&self, id: NodeId) -> bool {
        self.excluded_nodes.contains(&id)
    }
    pub fn link_excluded(&self, id: LinkId) -> bool {
        self.excluded_links.contains(&id)
    }
    pub fn waypoints(&self) -> &[NodeId] {
        &self.waypoints
    }
    /// 流量類查詢用：同樣的排除集，但中繼點不適用
    pub fn without_waypoints(&self) -> ConstraintSet {
        ConstraintSet {
            excluded_nodes: self.excluded_nodes.clone(),
            excluded_links: self.excluded_links.clone(),
            waypoints: vec![],
        }
    }

    /// 搜尋開始前的快速檢查：排除集不可蓋掉端點，中繼點不可被排除。
    pub fn validate(
        &self,
        g: &GraphModel,
        src: NodeId,
        dst: NodeId,
    ) -> Result<(), SolveError> {
        if self.node_excluded(src) {
            return Err(SolveError::InvalidConstraint(format!(
                "起點 {} 被排除集涵蓋",
                g.node(src).name
            )));
        }
        if self.node_excluded(dst) {
            return Err(SolveError::InvalidConstraint(format!(
                "終點 {} 被排除集涵蓋",
                g.node(dst).name
            )));
        }
        for &wp in self.waypoints.iter() {
            if self.node_excluded(wp) {
                return Err(SolveError::InvalidConstraint(format!(
                    "中繼點 {} 被排除集涵蓋",
                    g.node(wp).name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::NodeKind;

    #[test]
    fn test_validate_fails_fast() {
        let mut g = GraphModel::new();
        let a = g.add_node("A", NodeKind::Router).unwrap();
        let b = g.add_node("B", NodeKind::Router).unwrap();
        let c = g.add_node("C", NodeKind::Router).unwrap();
        g.add_link("AB", (a, b), 1.0, 1.0).unwrap();

        let mut cons = ConstraintSet::new();
        assert!(cons.validate(&g, a, b).is_ok());

        cons.exclude_node(c);
        cons.add_waypoint(c);
        match cons.validate(&g, a, b) {
            Err(SolveError::InvalidConstraint(_)) => {}
            other => panic!("應為 InvalidConstraint，卻得到 {:?}", other),
        }

        let mut cons = ConstraintSet::new();
        cons.exclude_node(a);
        assert!(cons.validate(&g, a, b).is_err());
    }
}
