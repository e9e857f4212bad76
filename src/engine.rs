use std::collections::HashMap;

use crate::algos::arcs::ArcGraph;
use crate::algos::bellman_ford::{bellman_ford, walk_back};
use crate::algos::floyd_warshall::floyd_warshall;
use crate::algos::shortest_path::concat_legs;
use crate::algos::{
    DisjointMode, DisjointPathSolver, DpAlgorithm, MaxFlowSolver, McfMethod, MfAlgorithm,
    MinCostFlowSolver, ShortestPathSolver, SpAlgorithm,
};
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::lp::{LpFormulator, LpSolver, SimplexSolver};
use crate::model::{AsId, FlowResult, GraphModel, LinkId, NodeId, PathResult};

/// 查詢引擎門面。借用一份唯讀的拓撲快照與一個 AS 脈絡，
/// 在單次查詢期間提供所有對外的圖分析操作；
/// 查詢期間拓撲不可變動，這點由借用規則保證。
pub struct QueryEngine<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
    lp: Box<dyn LpSolver>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(g: &'a GraphModel) -> Self {
        Self::with_context(g, None)
    }

    pub fn with_context(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        QueryEngine {
            g,
            as_ctx,
            lp: Box::new(SimplexSolver::from_config()),
        }
    }

    /// 替換線性規劃求解能力（預設是內建的單純形法）
    pub fn with_lp_solver(mut self, lp: Box<dyn LpSolver>) -> Self {
        self.lp = lp;
        self
    }

    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
    ) -> Result<PathResult, SolveError> {
        self.shortest_path_with(SpAlgorithm::AStar, src, dst, cons)
    }

    /// 四種最短路徑演算法在非負成本下必須給出相同的路徑成本
    pub fn shortest_path_with(
        &self,
        algo: SpAlgorithm,
        src: NodeId,
        dst: NodeId,
        cons: &ConstraintSet,
    ) -> Result<PathResult, SolveError> {
        cons.validate(self.g, src, dst)?;
        match algo {
            SpAlgorithm::AStar => {
                ShortestPathSolver::new(self.g, self.as_ctx).shortest_path(src, dst, cons)
            }
            SpAlgorithm::BellmanFord => {
                let ag = ArcGraph::build(self.g, self.as_ctx, cons);
                concat_legs(src, cons.waypoints(), dst, |a, b| {
                    let (dist, pred) = bellman_ford(&ag, a.0)?;
                    if dist[b.0].is_infinite() {
                        return Ok(None);
                    }
                    let arcs = match walk_back(&ag, &pred, a.0, b.0) {
                        Some(arcs) => arcs,
                        None => return Ok(None),
                    };
                    Ok(Some(leg_from_arcs(&ag, &arcs, a, dist[b.0])))
                })
            }
            SpAlgorithm::FloydWarshall => {
                let ag = ArcGraph::build(self.g, self.as_ctx, cons);
                let fw = floyd_warshall(&ag)?;
                concat_legs(src, cons.waypoints(), dst, |a, b| {
                    Ok(fw.path(a.0, b.0).map(|(nodes, links)| {
                        (
                            fw.dist[a.0][b.0],
                            nodes.into_iter().map(NodeId).collect(),
                            links,
                        )
                    }))
                })
            }
            SpAlgorithm::LinearProgram => {
                let formulator = LpFormulator::new(self.g, self.as_ctx);
                concat_legs(src, cons.waypoints(), dst, |a, b| {
                    let path = formulator.shortest_path(a, b, cons, &*self.lp)?;
                    if path.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some((path.cost, path.nodes, path.links)))
                    }
                })
            }
        }
    }

    /// Bellman-Ford 單源距離。不連通的節點不在回傳的映射中。
    pub fn single_source_distances(
        &self,
        src: NodeId,
        cons: &ConstraintSet,
    ) -> Result<HashMap<NodeId, f64>, SolveError> {
        if cons.node_excluded(src) {
            return Err(SolveError::InvalidConstraint(format!(
                "起點 {} 被排除集涵蓋",
                self.g.node(src).name
            )));
        }
        let ag = ArcGraph::build(self.g, self.as_ctx, cons);
        let (dist, _) = bellman_ford(&ag, src.0)?;
        Ok(dist
            .into_iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, d)| (NodeId(i), d))
            .collect())
    }

    /// Floyd-Warshall 全點對距離。只含連通的點對。
    pub fn all_pairs_distances(&self) -> Result<HashMap<(NodeId, NodeId), f64>, SolveError> {
        let ag = ArcGraph::build(self.g, self.as_ctx, &ConstraintSet::new());
        let fw = floyd_warshall(&ag)?;
        let mut out = HashMap::new();
        for i in 0..ag.n {
            for j in 0..ag.n {
                if fw.dist[i][j].is_finite() {
                    out.insert((NodeId(i), NodeId(j)), fw.dist[i][j]);
                }
            }
        }
        Ok(out)
    }

    pub fn max_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        algo: MfAlgorithm,
    ) -> Result<FlowResult, SolveError> {
        self.max_flow_constrained(src, dst, algo, &ConstraintSet::new())
    }

    pub fn max_flow_constrained(
        &self,
        src: NodeId,
        dst: NodeId,
        algo: MfAlgorithm,
        cons: &ConstraintSet,
    ) -> Result<FlowResult, SolveError> {
        MaxFlowSolver::new(self.g, self.as_ctx).max_flow(src, dst, algo, cons, &*self.lp)
    }

    pub fn disjoint_paths(
        &self,
        src: NodeId,
        dst: NodeId,
        k: usize,
        algo: DpAlgorithm,
    ) -> Result<Vec<PathResult>, SolveError> {
        self.disjoint_paths_constrained(
            src,
            dst,
            k,
            algo,
            DisjointMode::LinkDisjoint,
            &ConstraintSet::new(),
        )
    }

    pub fn disjoint_paths_constrained(
        &self,
        src: NodeId,
        dst: NodeId,
        k: usize,
        algo: DpAlgorithm,
        mode: DisjointMode,
        cons: &ConstraintSet,
    ) -> Result<Vec<PathResult>, SolveError> {
        DisjointPathSolver::new(self.g, self.as_ctx).disjoint_paths(src, dst, k, algo, mode, cons)
    }

    pub fn min_cost_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        demand: f64,
    ) -> Result<(FlowResult, f64), SolveError> {
        self.min_cost_flow_with(
            src,
            dst,
            demand,
            McfMethod::LinearProgram,
            &ConstraintSet::new(),
        )
    }

    pub fn min_cost_flow_with(
        &self,
        src: NodeId,
        dst: NodeId,
        demand: f64,
        method: McfMethod,
        cons: &ConstraintSet,
    ) -> Result<(FlowResult, f64), SolveError> {
        MinCostFlowSolver::new(self.g, self.as_ctx)
            .min_cost_flow(src, dst, demand, method, cons, &*self.lp)
    }
}

fn leg_from_arcs(
    ag: &ArcGraph,
    arcs: &[usize],
    src: NodeId,
    cost: f64,
) -> (f64, Vec<NodeId>, Vec<LinkId>) {
    let mut nodes = vec![src];
    let mut links = vec![];
    for &ai in arcs.iter() {
        let arc = &ag.arcs[ai];
        nodes.push(NodeId(arc.to));
        links.push(arc.link.expect("路徑弧必有對應連線"));
    }
    (cost, nodes, links)
}
