use std::collections::HashSet;

use crate::algos::arcs::{Arc, ArcGraph};
use crate::algos::bellman_ford::{bellman_ford, walk_back};
use crate::algos::shortest_path::ShortestPathSolver;
use crate::algos::{DisjointMode, DpAlgorithm};
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::model::{AsId, GraphModel, NodeId, PathResult};

/// 不相交路徑用的基底視圖。sibling 指向同一條連線的反向弧，
/// base_node 把（可能拆分過的）節點映回模型節點。
struct BaseGraph {
    ag: ArcGraph,
    sibling: Vec<Option<usize>>,
    base_node: Vec<usize>,
}

#[derive(Clone, Copy)]
enum Origin {
    /// 基底圖的弧
    Base(usize),
    /// 解集合中某弧的反向（走它代表取消原弧）
    Reversal(usize),
}

struct Transformed {
    ag: ArcGraph,
    origin: Vec<Origin>,
}

fn link_base(g: &GraphModel, as_ctx: Option<AsId>, cons: &ConstraintSet) -> BaseGraph {
    let ag = ArcGraph::build(g, as_ctx, cons);
    let sibling = (0..ag.arcs.len()).map(|i| Some(i ^ 1)).collect();
    let base_node = (0..ag.n).collect();
    BaseGraph {
        sibling,
        base_node,
        ag,
    }
}

/// 節點拆分：x 進、x+n 出，中間一條零成本內部弧。
/// 內部弧容量隱含為一，使路徑不得共用節點；起終點不拆分。
fn node_split_base(
    g: &GraphModel,
    as_ctx: Option<AsId>,
    cons: &ConstraintSet,
    src: usize,
    dst: usize,
) -> BaseGraph {
    let base = ArcGraph::build(g, as_ctx, cons);
    let n = base.n;
    let mut arcs: Vec<Arc> = vec![];
    let mut out: Vec<Vec<usize>> = vec![vec![]; 2 * n];
    let mut sibling: Vec<Option<usize>> = vec![];
    for (i, arc) in base.arcs.iter().enumerate() {
        let from = if arc.from == src || arc.from == dst {
            arc.from
        } else {
            arc.from + n
        };
        out[from].push(arcs.len());
        sibling.push(Some(i ^ 1));
        arcs.push(Arc {
            from,
            to: arc.to,
            link: arc.link,
            sd: arc.sd,
            cost: arc.cost,
        });
    }
    for x in 0..n {
        if x == src || x == dst {
            continue;
        }
        out[x].push(arcs.len());
        sibling.push(None);
        arcs.push(Arc {
            from: x,
            to: x + n,
            link: None,
            sd: true,
            cost: 0.0,
        });
    }
    BaseGraph {
        ag: ArcGraph {
            n: 2 * n,
            arcs,
            out,
        },
        sibling,
        base_node: (0..2 * n).map(|i| i % n).collect(),
    }
}

/// 依目前的解集合改圖：解中弧所屬的連線整條移除，
/// 補上一條反向弧。Bhandari 取負成本；Suurbale 以位勢重新賦權，
/// 反向弧恰為零，全圖非負。
fn transform(base: &BaseGraph, solution: &HashSet<usize>, potentials: Option<&[f64]>) -> Transformed {
    let mut removed = vec![false; base.ag.arcs.len()];
    let mut ordered: Vec<usize> = solution.iter().copied().collect();
    ordered.sort();
    for &ai in ordered.iter() {
        removed[ai] = true;
        if let Some(sib) = base.sibling[ai] {
            removed[sib] = true;
        }
    }

    let mut arcs: Vec<Arc> = vec![];
    let mut origin: Vec<Origin> = vec![];
    let mut out: Vec<Vec<usize>> = vec![vec![]; base.ag.n];
    for (i, arc) in base.ag.arcs.iter().enumerate() {
        if removed[i] {
            continue;
        }
        let cost = match potentials {
            Some(pot) => {
                if pot[arc.from].is_infinite() || pot[arc.to].is_infinite() {
                    continue;
                }
                (arc.cost + pot[arc.from] - pot[arc.to]).max(0.0)
            }
            None => arc.cost,
        };
        out[arc.from].push(arcs.len());
        origin.push(Origin::Base(i));
        arcs.push(Arc { cost, ..arc.clone() });
    }
    for &ai in ordered.iter() {
        let arc = &base.ag.arcs[ai];
        if potentials.is_some()
            && (potentials.unwrap()[arc.from].is_infinite()
                || potentials.unwrap()[arc.to].is_infinite())
        {
            continue;
        }
        let cost = match potentials {
            Some(_) => 0.0,
            None => -arc.cost,
        };
        out[arc.to].push(arcs.len());
        origin.push(Origin::Reversal(ai));
        arcs.push(Arc {
            from: arc.to,
            to: arc.from,
            link: arc.link,
            sd: !arc.sd,
            cost,
        });
    }
    Transformed {
        ag: ArcGraph {
            n: base.ag.n,
            arcs,
            out,
        },
        origin,
    }
}

/// 逐次擴增：每一輪在改過的圖上找一條最短路徑，
/// 與既有解取對稱差。找不到新路徑就提前結束（不相交路徑不足 k 條）。
fn accumulate(
    base: &BaseGraph,
    src: usize,
    dst: usize,
    k: usize,
    suurbale: bool,
) -> Result<HashSet<usize>, SolveError> {
    let mut solution: HashSet<usize> = HashSet::new();
    let mut potentials: Option<Vec<f64>> = if suurbale {
        Some(base.ag.dijkstra(src).0)
    } else {
        None
    };

    for _ in 0..k {
        let t = transform(base, &solution, potentials.as_deref());
        let pred = if suurbale {
            let (dist, pred) = t.ag.dijkstra(src);
            if dist[dst].is_infinite() {
                break;
            }
            let pot = potentials.as_mut().unwrap();
            for v in 0..t.ag.n {
                pot[v] += dist[v];
            }
            pred
        } else {
            let (dist, pred) = bellman_ford(&t.ag, src)?;
            if dist[dst].is_infinite() {
                break;
            }
            pred
        };
        let path_arcs = match walk_back(&t.ag, &pred, src, dst) {
            Some(arcs) => arcs,
            None => break,
        };
        for ai in path_arcs {
            match t.origin[ai] {
                Origin::Base(b) => {
                    solution.insert(b);
                }
                Origin::Reversal(r) => {
                    solution.remove(&r);
                }
            }
        }
    }
    Ok(solution)
}

/// 抵銷完的解集合恰好是若干條弧不相交的 src→dst 路徑，逐條剝離。
/// 節點內部弧不產生輸出，只把拆分的兩半接回同一個模型節點。
fn decompose(
    base: &BaseGraph,
    solution: &HashSet<usize>,
    src: usize,
    dst: usize,
    ranks: &[usize],
) -> Vec<PathResult> {
    let mut ordered: Vec<usize> = solution.iter().copied().collect();
    ordered.sort();
    let mut avail: Vec<Vec<usize>> = vec![vec![]; base.ag.n];
    for &ai in ordered.iter() {
        avail[base.ag.arcs[ai].from].push(ai);
    }
    for list in avail.iter_mut() {
        list.sort_by_key(|&ai| ranks[base.base_node[base.ag.arcs[ai].to]]);
    }

    let mut paths = vec![];
    while !avail[src].is_empty() {
        let mut nodes = vec![NodeId(base.base_node[src])];
        let mut links = vec![];
        let mut cost = 0.0;
        let mut cur = src;
        while cur != dst {
            assert!(!avail[cur].is_empty(), "解集合在中途斷裂，流量不守恆");
            let ai = avail[cur].remove(0);
            let arc = &base.ag.arcs[ai];
            if let Some(id) = arc.link {
                nodes.push(NodeId(base.base_node[arc.to]));
                links.push(id);
                cost += arc.cost;
            }
            cur = arc.to;
        }
        paths.push(PathResult { nodes, links, cost });
    }
    paths.sort_by(|a, b| {
        let ka: Vec<usize> = a.nodes.iter().map(|n| ranks[n.0]).collect();
        let kb: Vec<usize> = b.nodes.iter().map(|n| ranks[n.0]).collect();
        (a.cost, ka).partial_cmp(&(b.cost, kb)).unwrap()
    });
    paths
}

/// k 條連線不相交（可選節點不相交）的最短路徑組，
/// 合計成本最小。中繼點限制對此查詢不適用，一律忽略。
pub struct DisjointPathSolver<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
}

impl<'a> DisjointPathSolver<'a> {
    pub fn new(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        DisjointPathSolver { g, as_ctx }
    }

    /// 存在幾條回傳幾條（至多 k 條），不足不算錯誤。
    pub fn disjoint_paths(
        &self,
        src: NodeId,
        dst: NodeId,
        k: usize,
        algo: DpAlgorithm,
        mode: DisjointMode,
        cons: &ConstraintSet,
    ) -> Result<Vec<PathResult>, SolveError> {
        cons.validate(self.g, src, dst)?;
        if k < 2 {
            return Err(SolveError::InvalidConstraint(
                "不相交路徑查詢需要 k ≥ 2".to_owned(),
            ));
        }
        if src == dst {
            return Err(SolveError::InvalidConstraint(
                "不相交路徑查詢的起點與終點相同".to_owned(),
            ));
        }
        let cons = cons.without_waypoints();

        if let DpAlgorithm::AStarExclusion = algo {
            return self.greedy_exclusion(src, dst, k, mode, &cons);
        }

        let base = match mode {
            DisjointMode::LinkDisjoint => link_base(self.g, self.as_ctx, &cons),
            DisjointMode::NodeDisjoint => {
                node_split_base(self.g, self.as_ctx, &cons, src.0, dst.0)
            }
        };
        let suurbale = match algo {
            DpAlgorithm::Suurbale => true,
            _ => false,
        };
        let solution = accumulate(&base, src.0, dst.0, k, suurbale)?;
        Ok(decompose(
            &base,
            &solution,
            src.0,
            dst.0,
            &self.g.name_ranks(),
        ))
    }

    /// 原始系統的貪婪變體：反覆求最短路徑並把用過的連線
    /// （節點不相交時連同中間節點）加進排除集。合法但不保證合計成本最佳。
    fn greedy_exclusion(
        &self,
        src: NodeId,
        dst: NodeId,
        k: usize,
        mode: DisjointMode,
        cons: &ConstraintSet,
    ) -> Result<Vec<PathResult>, SolveError> {
        let sp = ShortestPathSolver::new(self.g, self.as_ctx);
        let mut cons = cons.clone();
        let mut paths = vec![];
        for _ in 0..k {
            let path = sp.shortest_path(src, dst, &cons)?;
            if path.is_empty() {
                break;
            }
            for &link in path.links.iter() {
                cons.exclude_link(link);
            }
            if let DisjointMode::NodeDisjoint = mode {
                for &node in path.nodes[1..path.nodes.len() - 1].iter() {
                    cons.exclude_node(node);
                }
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::NodeKind;

    const EXACT: [DpAlgorithm; 2] = [DpAlgorithm::Bhandari, DpAlgorithm::Suurbale];

    fn diamond() -> (GraphModel, Vec<NodeId>) {
        let mut g = GraphModel::new();
        let a = g.add_node("A", NodeKind::Router).unwrap();
        let b = g.add_node("B", NodeKind::Router).unwrap();
        let c = g.add_node("C", NodeKind::Router).unwrap();
        let d = g.add_node("D", NodeKind::Router).unwrap();
        g.add_link("A-B", (a, b), 1.0, 5.0).unwrap();
        g.add_link("B-D", (b, d), 1.0, 5.0).unwrap();
        g.add_link("A-C", (a, c), 1.0, 5.0).unwrap();
        g.add_link("C-D", (c, d), 1.0, 5.0).unwrap();
        (g, vec![a, b, c, d])
    }

    /// 貪婪法會踩進去的陷阱：最短路徑 S-A-B-T 用光兩側的便宜連線
    fn trap() -> (GraphModel, NodeId, NodeId) {
        let mut g = GraphModel::new();
        let s = g.add_node("S", NodeKind::Router).unwrap();
        let a = g.add_node("A", NodeKind::Router).unwrap();
        let b = g.add_node("B", NodeKind::Router).unwrap();
        let t = g.add_node("T", NodeKind::Router).unwrap();
        g.add_link("S-A", (s, a), 1.0, 1.0).unwrap();
        g.add_link("A-B", (a, b), 1.0, 1.0).unwrap();
        g.add_link("B-T", (b, t), 1.0, 1.0).unwrap();
        g.add_link("A-T", (a, t), 5.0, 1.0).unwrap();
        g.add_link("S-B", (s, b), 5.0, 1.0).unwrap();
        (g, s, t)
    }

    fn assert_link_disjoint(paths: &[PathResult]) {
        let mut seen = HashSet::new();
        for p in paths.iter() {
            for &l in p.links.iter() {
                assert!(seen.insert(l), "連線 {:?} 被兩條路徑共用", l);
            }
        }
    }

    #[test]
    fn test_diamond_pair() {
        let (g, n) = diamond();
        let solver = DisjointPathSolver::new(&g, None);
        for &algo in EXACT.iter() {
            let paths = solver
                .disjoint_paths(
                    n[0],
                    n[3],
                    2,
                    algo,
                    DisjointMode::LinkDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(2, paths.len(), "{:?}", algo);
            assert_link_disjoint(&paths);
            let total: f64 = paths.iter().map(|p| p.cost).sum();
            assert!((total - 4.0).abs() < 1e-6, "{:?} 合計成本應為 4", algo);
            // 排序決定性：先 A-B-D 再 A-C-D
            assert_eq!(vec![n[0], n[1], n[3]], paths[0].nodes);
            assert_eq!(vec![n[0], n[2], n[3]], paths[1].nodes);
        }
    }

    #[test]
    fn test_trap_graph_exact_beats_greedy() {
        let (g, s, t) = trap();
        let solver = DisjointPathSolver::new(&g, None);
        for &algo in EXACT.iter() {
            let paths = solver
                .disjoint_paths(
                    s,
                    t,
                    2,
                    algo,
                    DisjointMode::LinkDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(2, paths.len(), "{:?} 應找到兩條", algo);
            assert_link_disjoint(&paths);
            let total: f64 = paths.iter().map(|p| p.cost).sum();
            // 最佳解是 S-A-T (6) + S-B-T (6)
            assert!((total - 12.0).abs() < 1e-6, "{:?} 合計 {}", algo, total);
        }
        // 貪婪法先拿走 S-A-B-T，之後無路可走
        let paths = solver
            .disjoint_paths(
                s,
                t,
                2,
                DpAlgorithm::AStarExclusion,
                DisjointMode::LinkDisjoint,
                &ConstraintSet::new(),
            )
            .unwrap();
        assert_eq!(1, paths.len());
    }

    #[test]
    fn test_k_three() {
        let (mut g, n) = diamond();
        // 第三條獨立路徑 A-E-D，成本 6
        let e = g.add_node("E", NodeKind::Router).unwrap();
        g.add_link("A-E", (n[0], e), 3.0, 1.0).unwrap();
        g.add_link("E-D", (e, n[3]), 3.0, 1.0).unwrap();
        let solver = DisjointPathSolver::new(&g, None);
        for &algo in EXACT.iter() {
            let paths = solver
                .disjoint_paths(
                    n[0],
                    n[3],
                    3,
                    algo,
                    DisjointMode::LinkDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(3, paths.len(), "{:?}", algo);
            assert_link_disjoint(&paths);
            let total: f64 = paths.iter().map(|p| p.cost).sum();
            assert!((total - 10.0).abs() < 1e-6, "{:?} 合計 {}", algo, total);
            // 要求四條時只有三條可給
            let paths = solver
                .disjoint_paths(
                    n[0],
                    n[3],
                    4,
                    algo,
                    DisjointMode::LinkDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(3, paths.len(), "{:?}", algo);
        }
    }

    #[test]
    fn test_node_disjoint_stricter_than_link_disjoint() {
        // 兩條平行連線都得穿過 X：連線不相交可以，節點不相交不行
        let mut g = GraphModel::new();
        let s = g.add_node("S", NodeKind::Router).unwrap();
        let x = g.add_node("X", NodeKind::Router).unwrap();
        let t = g.add_node("T", NodeKind::Router).unwrap();
        g.add_link("S-X-1", (s, x), 1.0, 1.0).unwrap();
        g.add_link("S-X-2", (s, x), 2.0, 1.0).unwrap();
        g.add_link("X-T-1", (x, t), 1.0, 1.0).unwrap();
        g.add_link("X-T-2", (x, t), 2.0, 1.0).unwrap();
        let solver = DisjointPathSolver::new(&g, None);
        for &algo in EXACT.iter() {
            let linkwise = solver
                .disjoint_paths(
                    s,
                    t,
                    2,
                    algo,
                    DisjointMode::LinkDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(2, linkwise.len(), "{:?}", algo);
            let nodewise = solver
                .disjoint_paths(
                    s,
                    t,
                    2,
                    algo,
                    DisjointMode::NodeDisjoint,
                    &ConstraintSet::new(),
                )
                .unwrap();
            assert_eq!(1, nodewise.len(), "{:?}", algo);
        }
    }

    #[test]
    fn test_k_below_two_rejected() {
        let (g, n) = diamond();
        let solver = DisjointPathSolver::new(&g, None);
        match solver.disjoint_paths(
            n[0],
            n[3],
            1,
            DpAlgorithm::Bhandari,
            DisjointMode::LinkDisjoint,
            &ConstraintSet::new(),
        ) {
            Err(SolveError::InvalidConstraint(_)) => {}
            other => panic!("應為 InvalidConstraint，卻得到 {:?}", other),
        }
    }
}
