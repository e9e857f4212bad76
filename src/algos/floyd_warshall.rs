use crate::algos::arcs::{ArcGraph, EPS};
use crate::error::SolveError;
use crate::model::LinkId;

/// Floyd-Warshall 全點對距離矩陣。刻意的 O(V³)，
/// 只適合需要完整兩兩分析的中小型拓撲。
pub(crate) struct FwMatrices {
    pub dist: Vec<Vec<f64>>,
    next: Vec<Vec<Option<(usize, LinkId)>>>,
}

impl FwMatrices {
    /// 重建 i→j 的路徑 (節點序列, 連線序列)，不連通時回傳 None
    pub fn path(&self, i: usize, j: usize) -> Option<(Vec<usize>, Vec<LinkId>)> {
        if i == j {
            return Some((vec![i], vec![]));
        }
        self.next[i][j]?;
        let mut nodes = vec![i];
        let mut links = vec![];
        let mut cur = i;
        while cur != j {
            let (nx, link) = self.next[cur][j]?;
            nodes.push(nx);
            links.push(link);
            cur = nx;
        }
        Some((nodes, links))
    }
}

pub(crate) fn floyd_warshall(ag: &ArcGraph) -> Result<FwMatrices, SolveError> {
    let n = ag.n;
    let mut dist = vec![vec![f64::INFINITY; n]; n];
    let mut next: Vec<Vec<Option<(usize, LinkId)>>> = vec![vec![None; n]; n];
    for i in 0..n {
        dist[i][i] = 0.0;
    }
    for arc in ag.arcs.iter() {
        // 平行連線只留最便宜的一條
        if arc.cost < dist[arc.from][arc.to] {
            dist[arc.from][arc.to] = arc.cost;
            next[arc.from][arc.to] = Some((arc.to, arc.link.unwrap()));
        }
    }
    for k in 0..n {
        for i in 0..n {
            if dist[i][k].is_infinite() {
                continue;
            }
            for j in 0..n {
                let through = dist[i][k] + dist[k][j];
                if through < dist[i][j] - EPS {
                    dist[i][j] = through;
                    next[i][j] = next[i][k];
                }
            }
        }
    }
    for i in 0..n {
        if dist[i][i] < -EPS {
            return Err(SolveError::NegativeCycle);
        }
    }
    Ok(FwMatrices { dist, next })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algos::bellman_ford::bellman_ford;
    use crate::constraint::ConstraintSet;
    use crate::model::{GraphModel, NodeKind};

    fn ring(n: usize) -> GraphModel {
        let mut g = GraphModel::new();
        let ids: Vec<_> = (0..n)
            .map(|i| g.add_node(&format!("n{}", i), NodeKind::Router).unwrap())
            .collect();
        for i in 0..n {
            g.add_link(
                &format!("l{}", i),
                (ids[i], ids[(i + 1) % n]),
                (i + 1) as f64,
                1.0,
            )
            .unwrap();
        }
        g
    }

    #[test]
    fn test_matches_bellman_ford_for_every_pair() {
        let g = ring(6);
        let ag = ArcGraph::build(&g, None, &ConstraintSet::new());
        let fw = floyd_warshall(&ag).unwrap();
        for i in 0..6 {
            let (bf, _) = bellman_ford(&ag, i).unwrap();
            for j in 0..6 {
                assert!(
                    (fw.dist[i][j] - bf[j]).abs() < 1e-6,
                    "{}→{} 距離不一致: fw={} bf={}",
                    i,
                    j,
                    fw.dist[i][j],
                    bf[j]
                );
            }
        }
    }

    #[test]
    fn test_path_reconstruction() {
        let g = ring(4);
        let ag = ArcGraph::build(&g, None, &ConstraintSet::new());
        let fw = floyd_warshall(&ag).unwrap();
        // 0→2 走 0-1-2（成本 3）而非 0-3-2（成本 7）
        let (nodes, links) = fw.path(0, 2).unwrap();
        assert_eq!(vec![0, 1, 2], nodes);
        assert_eq!(2, links.len());
        assert_eq!(3.0, fw.dist[0][2]);
    }
}
