use std::collections::HashMap;

use crate::algos::arcs::EPS;
use crate::algos::max_flow::MaxFlowSolver;
use crate::algos::{McfMethod, MfAlgorithm};
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::lp::{LpFormulator, LpSolver};
use crate::model::{AsId, FlowResult, GraphModel, LinkId, NodeId};

/// 帶成本的殘餘邊。每條連線的每個方向各有一條正向邊，
/// 配一條零容量、負成本的反向殘餘邊，收回流量時退還成本。
struct CostArc {
    to: usize,
    cap: f64,
    cost: f64,
    rev: usize,
    link: Option<(LinkId, bool)>,
    forward: bool,
}

struct CostResidual {
    n: usize,
    adj: Vec<Vec<CostArc>>,
}

impl CostResidual {
    fn build(g: &GraphModel, as_ctx: Option<AsId>, cons: &ConstraintSet) -> Self {
        let mut link_ids: Vec<LinkId> = g.link_ids().collect();
        link_ids.sort_by(|&a, &b| g.link(a).name.cmp(&g.link(b).name));

        let mut res = CostResidual {
            n: g.node_count(),
            adj: (0..g.node_count()).map(|_| vec![]).collect(),
        };
        for id in link_ids {
            let link = g.link(id);
            if cons.link_excluded(id)
                || cons.node_excluded(link.src)
                || cons.node_excluded(link.dst)
            {
                continue;
            }
            if let Some(sys) = as_ctx {
                if !g.autonomous_system(sys).contains_link(id) {
                    continue;
                }
            }
            let cost = g.cost(id, as_ctx);
            let (u, v) = (link.src.0, link.dst.0);
            res.add_pair(u, v, link.capacity, cost, Some((id, true)));
            res.add_pair(v, u, link.capacity, cost, Some((id, false)));
        }
        res
    }

    fn add_pair(
        &mut self,
        u: usize,
        v: usize,
        cap: f64,
        cost: f64,
        link: Option<(LinkId, bool)>,
    ) {
        let iu = self.adj[u].len();
        let iv = self.adj[v].len();
        self.adj[u].push(CostArc {
            to: v,
            cap,
            cost,
            rev: iv,
            link,
            forward: true,
        });
        self.adj[v].push(CostArc {
            to: u,
            cap: 0.0,
            cost: -cost,
            rev: iu,
            link,
            forward: false,
        });
    }

    fn push(&mut self, u: usize, ei: usize, amount: f64) {
        let (to, rev) = {
            let e = &mut self.adj[u][ei];
            e.cap -= amount;
            (e.to, e.rev)
        };
        self.adj[to][rev].cap += amount;
    }

    /// 正向邊送出的量等於其反向殘餘邊累積的容量
    fn flows(&self) -> HashMap<LinkId, (f64, f64)> {
        let mut net: HashMap<LinkId, f64> = HashMap::new();
        for u in 0..self.n {
            for e in self.adj[u].iter() {
                if !e.forward {
                    continue;
                }
                if let Some((id, sd)) = e.link {
                    let sent = self.adj[e.to][e.rev].cap;
                    if sent > EPS {
                        *net.entry(id).or_insert(0.0) += if sd { sent } else { -sent };
                    }
                }
            }
        }
        net.into_iter()
            .filter(|&(_, v)| v.abs() > EPS)
            .map(|(id, v)| if v > 0.0 { (id, (v, 0.0)) } else { (id, (0.0, -v)) })
            .collect()
    }
}

/// 逐次最短擴增路徑：每一輪以 Bellman-Ford 在殘餘圖上找
/// 單位成本最低的擴增路徑（反向殘餘邊成本為負），直到送滿需求。
fn successive_shortest_paths(
    res: &mut CostResidual,
    src: usize,
    dst: usize,
    demand: f64,
) -> Result<f64, SolveError> {
    let mut sent = 0.0;
    let mut total_cost = 0.0;
    while sent + EPS < demand {
        let mut dist = vec![f64::INFINITY; res.n];
        let mut pred: Vec<Option<(usize, usize)>> = vec![None; res.n];
        dist[src] = 0.0;
        for _ in 1..res.n.max(2) {
            let mut changed = false;
            for u in 0..res.n {
                if dist[u].is_infinite() {
                    continue;
                }
                for (ei, e) in res.adj[u].iter().enumerate() {
                    if e.cap > EPS && dist[u] + e.cost < dist[e.to] - EPS {
                        dist[e.to] = dist[u] + e.cost;
                        pred[e.to] = Some((u, ei));
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        for u in 0..res.n {
            if dist[u].is_infinite() {
                continue;
            }
            for e in res.adj[u].iter() {
                if e.cap > EPS && dist[u] + e.cost < dist[e.to] - EPS {
                    return Err(SolveError::NegativeCycle);
                }
            }
        }
        if dist[dst].is_infinite() {
            return Err(SolveError::Infeasible(
                "殘餘圖中已無擴增路徑，需求無法滿足".to_owned(),
            ));
        }
        let mut bottleneck = demand - sent;
        let mut cur = dst;
        while cur != src {
            let (u, ei) = pred[cur].unwrap();
            bottleneck = bottleneck.min(res.adj[u][ei].cap);
            cur = u;
        }
        let mut cur = dst;
        while cur != src {
            let (u, ei) = pred[cur].unwrap();
            res.push(u, ei, bottleneck);
            cur = u;
        }
        sent += bottleneck;
        total_cost += bottleneck * dist[dst];
    }
    Ok(total_cost)
}

/// 固定需求的最小成本流。主要策略是翻成線性規劃委託求解；
/// 逐次最短擴增路徑是小圖上較快的組合替代方案，
/// 只保證總成本相同，不保證逐連線分配一致。
pub struct MinCostFlowSolver<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
}

impl<'a> MinCostFlowSolver<'a> {
    pub fn new(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        MinCostFlowSolver { g, as_ctx }
    }

    pub fn min_cost_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        demand: f64,
        method: McfMethod,
        cons: &ConstraintSet,
        lp: &dyn LpSolver,
    ) -> Result<(FlowResult, f64), SolveError> {
        cons.validate(self.g, src, dst)?;
        if src == dst {
            return Err(SolveError::InvalidConstraint(
                "最小成本流查詢的起點與終點相同".to_owned(),
            ));
        }
        if demand < 0.0 {
            return Err(SolveError::InvalidConstraint(format!(
                "需求不可為負: {}",
                demand
            )));
        }
        let cons = cons.without_waypoints();
        if demand <= EPS {
            return Ok((FlowResult::zero(), 0.0));
        }
        // 需求超過最大流就直接判 Infeasible，不回傳部份流量
        let max_flow = MaxFlowSolver::new(self.g, self.as_ctx)
            .max_flow(src, dst, MfAlgorithm::Dinic, &cons, lp)?;
        if max_flow.value + 1e-6 < demand {
            return Err(SolveError::Infeasible(format!(
                "需求 {} 超過最大流量 {}",
                demand, max_flow.value
            )));
        }
        match method {
            McfMethod::LinearProgram => {
                LpFormulator::new(self.g, self.as_ctx).min_cost_flow(src, dst, demand, &cons, lp)
            }
            McfMethod::SuccessiveShortestPaths => {
                let mut res = CostResidual::build(self.g, self.as_ctx, &cons);
                let total_cost = successive_shortest_paths(&mut res, src.0, dst.0, demand)?;
                let result = FlowResult {
                    value: demand,
                    flows: res.flows(),
                };
                Ok((result, total_cost))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lp::SimplexSolver;
    use crate::model::NodeKind;

    const METHODS: [McfMethod; 2] = [McfMethod::LinearProgram, McfMethod::SuccessiveShortestPaths];

    /// B 側每單位成本 2，C 側每單位成本 4，各容量 5
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
    fn test_demand_fills_cheap_side_first() {
        let (g, n) = diamond();
        let solver = MinCostFlowSolver::new(&g, None);
        let lp = SimplexSolver::default();
        for &method in METHODS.iter() {
            let (res, cost) = solver
                .min_cost_flow(n[0], n[3], 5.0, method, &ConstraintSet::new(), &lp)
                .unwrap();
            assert!((res.value - 5.0).abs() < 1e-6);
            assert!((cost - 10.0).abs() < 1e-6, "{:?} 成本 {}", method, cost);

            let (res, cost) = solver
                .min_cost_flow(n[0], n[3], 7.0, method, &ConstraintSet::new(), &lp)
                .unwrap();
            assert!((res.value - 7.0).abs() < 1e-6);
            assert!((cost - 18.0).abs() < 1e-6, "{:?} 成本 {}", method, cost);

            // 守恆與容量
            for id in g.node_ids() {
                let net = res.net_out_of(&g, id);
                let expect = if id == n[0] {
                    7.0
                } else if id == n[3] {
                    -7.0
                } else {
                    0.0
                };
                assert!((net - expect).abs() < 1e-6, "{:?} 節點流量不守恆", method);
            }
            for (&id, &(sd, ds)) in res.flows.iter() {
                assert!(sd <= g.capacity(id) + 1e-9 && ds <= g.capacity(id) + 1e-9);
            }
        }
    }

    #[test]
    fn test_methods_agree_on_total_cost() {
        let (mut g, n) = diamond();
        g.add_link("B-C", (n[1], n[2]), 1.0, 3.0).unwrap();
        let solver = MinCostFlowSolver::new(&g, None);
        let lp = SimplexSolver::default();
        for demand in [1.0, 4.0, 8.0, 10.0].iter() {
            let mut costs = vec![];
            for &method in METHODS.iter() {
                let (_, cost) = solver
                    .min_cost_flow(n[0], n[3], *demand, method, &ConstraintSet::new(), &lp)
                    .unwrap();
                costs.push(cost);
            }
            assert!(
                (costs[0] - costs[1]).abs() < 1e-6,
                "需求 {} 時兩法成本不一致: {:?}",
                demand,
                costs
            );
        }
    }

    #[test]
    fn test_demand_beyond_max_flow_is_infeasible() {
        let (g, n) = diamond();
        let solver = MinCostFlowSolver::new(&g, None);
        let lp = SimplexSolver::default();
        for &method in METHODS.iter() {
            match solver.min_cost_flow(n[0], n[3], 11.0, method, &ConstraintSet::new(), &lp) {
                Err(SolveError::Infeasible(_)) => {}
                other => panic!("應為 Infeasible，卻得到 {:?}", other),
            }
        }
    }

    #[test]
    fn test_zero_demand() {
        let (g, n) = diamond();
        let solver = MinCostFlowSolver::new(&g, None);
        let lp = SimplexSolver::default();
        let (res, cost) = solver
            .min_cost_flow(
                n[0],
                n[3],
                0.0,
                McfMethod::LinearProgram,
                &ConstraintSet::new(),
                &lp,
            )
            .unwrap();
        assert_eq!(0.0, res.value);
        assert_eq!(0.0, cost);
    }
}
