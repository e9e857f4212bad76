use std::collections::HashMap;

use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::model::{AsId, GraphModel, LinkId, NodeId, PathResult};
use crate::util::KeyedMinHeap;

/// (成本, 路徑節點名次序列)。成本相同時比較名次序列，
/// 因此等成本路徑裡字典序最小的節點序列勝出，結果可重現。
type Priority = (f64, Vec<usize>);

/// 限制條件下的 A* 最短路徑。啟發值取零（等同 Dijkstra），必然可採納；
/// 成本假設非負，負成本請走 Bellman-Ford。
pub struct ShortestPathSolver<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
    ranks: Vec<usize>,
}

impl<'a> ShortestPathSolver<'a> {
    pub fn new(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        ShortestPathSolver {
            g,
            as_ctx,
            ranks: g.name_ranks(),
        }
    }

    /// 中繼點把查詢切成依序的子搜尋，結果串接（共用的中繼點去重）。
    /// 不連通回傳空路徑，不是錯誤。
    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
    ) -> Result<PathResult, SolveError> {
        cons.validate(self.g, src, dst)?;
        concat_legs(src, cons.waypoints(), dst, |a, b| Ok(self.leg(a, b, cons)))
    }

    /// 單段搜尋。找不到路徑回傳 None。
    pub(crate) fn leg(
        &self,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
    ) -> Option<(f64, Vec<NodeId>, Vec<LinkId>)> {
        if src == dst {
            return Some((0.0, vec![src], vec![]));
        }
        let mut heap: KeyedMinHeap<Priority, NodeId, Option<(NodeId, LinkId)>> =
            KeyedMinHeap::new();
        let mut settled: HashMap<NodeId, Option<(NodeId, LinkId)>> = HashMap::new();
        heap.push(src, (0.0, vec![self.ranks[src.0]]), None);

        while let Some((u, (cost, key), back)) = heap.pop() {
            settled.insert(u, back);
            if u == dst {
                let (nodes, links) = reconstruct(&settled, src, dst);
                return Some((cost, nodes, links));
            }
            for (link, v) in self.g.neighbors(u, self.as_ctx) {
                if cons.link_excluded(link) || cons.node_excluded(v) || settled.contains_key(&v)
                {
                    continue;
                }
                let mut nkey = key.clone();
                nkey.push(self.ranks[v.0]);
                let prio = (cost + self.g.cost(link, self.as_ctx), nkey);
                if heap.contains_key(&v) {
                    heap.decrease_entry(&v, prio, Some((u, link)));
                } else {
                    heap.push(v, prio, Some((u, link)));
                }
            }
        }
        None
    }
}

fn reconstruct(
    settled: &HashMap<NodeId, Option<(NodeId, LinkId)>>,
    src: NodeId,
    dst: NodeId,
) -> (Vec<NodeId>, Vec<LinkId>) {
    let mut nodes = vec![dst];
    let mut links = vec![];
    let mut cur = dst;
    while cur != src {
        let (prev, link) = settled[&cur].expect("回溯表缺少前驅");
        nodes.push(prev);
        links.push(link);
        cur = prev;
    }
    nodes.reverse();
    links.reverse();
    (nodes, links)
}

/// 把依序各段的搜尋結果串成一條路徑。任一段不連通則整體視為不連通。
pub(crate) fn concat_legs(
    src: NodeId,
    waypoints: &[NodeId],
    dst: NodeId,
    mut leg_fn: impl FnMut(
        NodeId,
        NodeId,
    ) -> Result<Option<(f64, Vec<NodeId>, Vec<LinkId>)>, SolveError>,
) -> Result<PathResult, SolveError> {
    let mut stops = vec![src];
    stops.extend_from_slice(waypoints);
    stops.push(dst);

    let mut nodes: Vec<NodeId> = vec![];
    let mut links: Vec<LinkId> = vec![];
    let mut cost = 0.0;
    for pair in stops.windows(2) {
        match leg_fn(pair[0], pair[1])? {
            None => return Ok(PathResult::empty()),
            Some((leg_cost, leg_nodes, leg_links)) => {
                if nodes.is_empty() {
                    nodes = leg_nodes;
                } else {
                    // 段落交界的中繼點只留一份
                    nodes.extend(leg_nodes.into_iter().skip(1));
                }
                links.extend(leg_links);
                cost += leg_cost;
            }
        }
    }
    Ok(PathResult { nodes, links, cost })
}
