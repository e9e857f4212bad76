use std::collections::HashMap;

use crate::algos::arcs::{ArcGraph, EPS};
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::model::{AsId, FlowResult, GraphModel, LinkId, NodeId, PathResult};

mod simplex;
pub use simplex::SimplexSolver;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// 單條線性限制式：Σ coeffs·x (relation) rhs
#[derive(Clone, Debug)]
pub struct LpConstraint {
    pub coeffs: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// 線性規劃問題。變數下界固定為零，上界逐變數給定（可為無窮大）。
#[derive(Clone, Debug)]
pub struct LinearProgram {
    pub objective: Vec<f64>,
    pub constraints: Vec<LpConstraint>,
    pub upper_bounds: Vec<f64>,
}

impl LinearProgram {
    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }
}

#[derive(Clone, Debug)]
pub struct LpSolution {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// 泛用的線性規劃求解能力。引擎把問題翻譯好之後委託給它，
/// 回傳最佳解或 Infeasible / Unbounded。
pub trait LpSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, SolveError>;
}

/// 把最短路徑、最大流、最小成本流的查詢翻譯成線性規劃。
/// 變數一律是有向弧上的流量。
pub struct LpFormulator<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
}

impl<'a> LpFormulator<'a> {
    pub fn new(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        LpFormulator { g, as_ctx }
    }

    /// 每個節點一條流量守恆等式：流出減流入 = supply
    fn conservation(&self, ag: &ArcGraph, supply: impl Fn(usize) -> f64) -> Vec<LpConstraint> {
        let mut rows = vec![];
        for node in 0..ag.n {
            let mut coeffs: Vec<(usize, f64)> = vec![];
            for (i, arc) in ag.arcs.iter().enumerate() {
                if arc.from == node {
                    coeffs.push((i, 1.0));
                } else if arc.to == node {
                    coeffs.push((i, -1.0));
                }
            }
            rows.push(LpConstraint {
                coeffs,
                relation: Relation::Eq,
                rhs: supply(node),
            });
        }
        rows
    }

    /// 單段最短路徑（中繼點由呼叫端切段）。單位流量從起點流向終點，
    /// 最小化總成本；無可行解即不連通，回傳空路徑。
    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
        solver: &dyn LpSolver,
    ) -> Result<PathResult, SolveError> {
        if src == dst {
            return Ok(PathResult {
                nodes: vec![src],
                links: vec![],
                cost: 0.0,
            });
        }
        let ag = ArcGraph::build(self.g, self.as_ctx, cons);
        let lp = LinearProgram {
            objective: ag.arcs.iter().map(|a| a.cost).collect(),
            constraints: self.conservation(&ag, |node| {
                if node == src.0 {
                    1.0
                } else if node == dst.0 {
                    -1.0
                } else {
                    0.0
                }
            }),
            upper_bounds: vec![1.0; ag.arcs.len()],
        };
        let solution = match solver.solve(&lp) {
            Ok(s) => s,
            Err(SolveError::Infeasible(_)) => return Ok(PathResult::empty()),
            Err(e) => return Err(e),
        };
        Ok(extract_path(&ag, &solution.values, src, dst))
    }

    /// 最大流：最大化源點的淨流出（目標函數取負號後最小化）
    pub fn max_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
        solver: &dyn LpSolver,
    ) -> Result<FlowResult, SolveError> {
        let ag = ArcGraph::build(self.g, self.as_ctx, cons);
        let objective = ag
            .arcs
            .iter()
            .map(|a| {
                if a.from == src.0 {
                    -1.0
                } else if a.to == src.0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        let lp = LinearProgram {
            objective,
            constraints: self.conservation(&ag, |_| 0.0)
                .into_iter()
                .enumerate()
                .filter(|(node, _)| *node != src.0 && *node != dst.0)
                .map(|(_, row)| row)
                .collect(),
            upper_bounds: ag.arcs.iter().map(|a| self.g.capacity(a.link.unwrap())).collect(),
        };
        let solution = solver.solve(&lp)?;
        let value = if -solution.objective > EPS {
            -solution.objective
        } else {
            0.0
        };
        Ok(FlowResult {
            value,
            flows: net_flows(&ag, &solution.values),
        })
    }

    /// 固定需求的最小成本流。需求超過最大流時由呼叫端先行判定 Infeasible，
    /// 這裡的 LP 無可行解同樣回報 Infeasible。
    pub fn min_cost_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        demand: f64,
        cons: &ConstraintSet,
        solver: &dyn LpSolver,
    ) -> Result<(FlowResult, f64), SolveError> {
        let ag = ArcGraph::build(self.g, self.as_ctx, cons);
        let lp = LinearProgram {
            objective: ag.arcs.iter().map(|a| a.cost).collect(),
            constraints: self.conservation(&ag, |node| {
                if node == src.0 {
                    demand
                } else if node == dst.0 {
                    -demand
                } else {
                    0.0
                }
            }),
            upper_bounds: ag.arcs.iter().map(|a| self.g.capacity(a.link.unwrap())).collect(),
        };
        let solution = solver.solve(&lp)?;
        let result = FlowResult {
            value: demand,
            flows: net_flows(&ag, &solution.values),
        };
        Ok((result, solution.objective))
    }
}

/// 每條連線兩方向的弧流量互相抵銷後的淨流
fn net_flows(ag: &ArcGraph, x: &[f64]) -> HashMap<LinkId, (f64, f64)> {
    let mut net: HashMap<LinkId, f64> = HashMap::new();
    for (i, arc) in ag.arcs.iter().enumerate() {
        if let Some(id) = arc.link {
            let signed = if arc.sd { x[i] } else { -x[i] };
            *net.entry(id).or_insert(0.0) += signed;
        }
    }
    net.into_iter()
        .filter(|&(_, v)| v.abs() > EPS)
        .map(|(id, v)| if v > 0.0 { (id, (v, 0.0)) } else { (id, (0.0, -v)) })
        .collect()
}

/// 沿著取值為 1 的弧從起點走到終點。流量多邊形的頂點解必為整數，
/// 所以用 0.5 做門檻即可。
fn extract_path(ag: &ArcGraph, x: &[f64], src: NodeId, dst: NodeId) -> PathResult {
    let mut used = vec![false; ag.arcs.len()];
    let mut nodes = vec![src];
    let mut links = vec![];
    let mut cost = 0.0;
    let mut cur = src.0;
    for _ in 0..ag.arcs.len() {
        if cur == dst.0 {
            return PathResult { nodes, links, cost };
        }
        let mut advanced = false;
        for &ai in ag.out[cur].iter() {
            if !used[ai] && x[ai] > 0.5 {
                used[ai] = true;
                let arc = &ag.arcs[ai];
                nodes.push(NodeId(arc.to));
                links.push(arc.link.expect("路徑弧必有對應連線"));
                cost += arc.cost;
                cur = arc.to;
                advanced = true;
                break;
            }
        }
        if !advanced {
            break;
        }
    }
    if cur == dst.0 {
        PathResult { nodes, links, cost }
    } else {
        PathResult::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::NodeKind;

    fn diamond() -> (GraphModel, Vec<NodeId>) {
        let mut g = GraphModel::new();
        let a = g.add_node("A", NodeKind::Router).unwrap();
        let b = g.add_node("B", NodeKind::Router).unwrap();
        let c = g.add_node("C", NodeKind::Router).unwrap();
        let d = g.add_node("D", NodeKind::Router).unwrap();
        g.add_link("A-B", (a, b), 1.0, 5.0).unwrap();
        g.add_link("B-D", (b, d), 1.0, 5.0).unwrap();
        g.add_link("A-C", (a, c), 2.0, 5.0).unwrap();
        g.add_link("C-D", (c, d), 2.0, 5.0).unwrap();
        (g, vec![a, b, c, d])
    }

    #[test]
    fn test_lp_shortest_path() {
        let (g, n) = diamond();
        let f = LpFormulator::new(&g, None);
        let lp = SimplexSolver::default();
        let path = f
            .shortest_path(n[0], n[3], &ConstraintSet::new(), &lp)
            .unwrap();
        assert_eq!(vec![n[0], n[1], n[3]], path.nodes);
        assert!((path.cost - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_lp_shortest_path_unreachable() {
        let (mut g, n) = diamond();
        let z = g.add_node("Z", NodeKind::Other).unwrap();
        let f = LpFormulator::new(&g, None);
        let lp = SimplexSolver::default();
        assert!(f
            .shortest_path(n[0], z, &ConstraintSet::new(), &lp)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_lp_max_flow_value() {
        let (g, n) = diamond();
        let f = LpFormulator::new(&g, None);
        let lp = SimplexSolver::default();
        let res = f.max_flow(n[0], n[3], &ConstraintSet::new(), &lp).unwrap();
        assert!((res.value - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_lp_min_cost_flow_prefers_cheap_side() {
        let (g, n) = diamond();
        let f = LpFormulator::new(&g, None);
        let lp = SimplexSolver::default();
        // 需求 5 恰好塞滿便宜的 B 側（成本 2/單位）
        let (res, cost) = f
            .min_cost_flow(n[0], n[3], 5.0, &ConstraintSet::new(), &lp)
            .unwrap();
        assert!((res.value - 5.0).abs() < 1e-6);
        assert!((cost - 10.0).abs() < 1e-6, "成本應為 10，實得 {}", cost);
        // 需求 7 得再用貴的 C 側送 2 單位
        let (_, cost) = f
            .min_cost_flow(n[0], n[3], 7.0, &ConstraintSet::new(), &lp)
            .unwrap();
        assert!((cost - 18.0).abs() < 1e-6, "成本應為 18，實得 {}", cost);
    }
}
