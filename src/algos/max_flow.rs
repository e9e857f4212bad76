use std::collections::{HashMap, VecDeque};

use crate::algos::arcs::EPS;
use crate::algos::MfAlgorithm;
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::lp::{LpFormulator, LpSolver};
use crate::model::{AsId, FlowResult, GraphModel, LinkId, NodeId};

/// 殘餘圖的邊。無向連線展開成互為殘餘的一對有向邊：
/// 沿一邊推流會減少自身容量、增加對邊容量，先前送出的流量因此可被收回。
struct ResEdge {
    to: usize,
    cap: f64,
    link: Option<LinkId>,
    sd: bool,
    rev: usize,
}

/// 求解器本地的殘餘容量視圖。GraphModel 的容量在整個求解過程不被更動，
/// 只有最終的 FlowResult 會被回傳。
struct Residual {
    n: usize,
    adj: Vec<Vec<ResEdge>>,
}

impl Residual {
    fn build(g: &GraphModel, as_ctx: Option<AsId>, cons: &ConstraintSet) -> Self {
        let mut link_ids: Vec<LinkId> = g.link_ids().collect();
        link_ids.sort_by(|&a, &b| g.link(a).name.cmp(&g.link(b).name));

        let mut adj: Vec<Vec<ResEdge>> = (0..g.node_count()).map(|_| vec![]).collect();
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
            let (u, v) = (link.src.0, link.dst.0);
            let cap = link.capacity;
            let iu = adj[u].len();
            let iv = adj[v].len();
            adj[u].push(ResEdge {
                to: v,
                cap,
                link: Some(id),
                sd: true,
                rev: iv,
            });
            adj[v].push(ResEdge {
                to: u,
                cap,
                link: Some(id),
                sd: false,
                rev: iu,
            });
        }
        Residual {
            n: g.node_count(),
            adj,
        }
    }

    fn push(&mut self, u: usize, ei: usize, amount: f64) {
        let (to, rev) = {
            let e = &mut self.adj[u][ei];
            e.cap -= amount;
            (e.to, e.rev)
        };
        self.adj[to][rev].cap += amount;
    }

    fn into_flow_result(self, g: &GraphModel, value: f64) -> FlowResult {
        let mut flows: HashMap<LinkId, (f64, f64)> = HashMap::new();
        for u in 0..self.n {
            for e in self.adj[u].iter() {
                if !e.sd {
                    continue;
                }
                if let Some(id) = e.link {
                    // 正值代表 source→destination 方向的淨流
                    let net = g.capacity(id) - e.cap;
                    if net > EPS {
                        flows.insert(id, (net, 0.0));
                    } else if net < -EPS {
                        flows.insert(id, (0.0, -net));
                    }
                }
            }
        }
        FlowResult { value, flows }
    }
}

/// 泛用的擴增路徑法：以深度優先在殘餘圖上找任意可擴增路徑，
/// 找不到為止。
fn ford_fulkerson(res: &mut Residual, src: usize, dst: usize) -> f64 {
    fn dfs(res: &mut Residual, u: usize, dst: usize, limit: f64, visited: &mut Vec<bool>) -> f64 {
        if u == dst {
            return limit;
        }
        visited[u] = true;
        for ei in 0..res.adj[u].len() {
            let (to, cap) = (res.adj[u][ei].to, res.adj[u][ei].cap);
            if visited[to] || cap <= EPS {
                continue;
            }
            let pushed = dfs(res, to, dst, limit.min(cap), visited);
            if pushed > EPS {
                res.push(u, ei, pushed);
                return pushed;
            }
        }
        0.0
    }

    let mut total = 0.0;
    loop {
        let mut visited = vec![false; res.n];
        let pushed = dfs(res, src, dst, f64::INFINITY, &mut visited);
        if pushed <= EPS {
            return total;
        }
        total += pushed;
    }
}

/// Ford-Fulkerson 特化成一律選邊數最少的擴增路徑，得到 O(V·E²) 的多項式上界
fn edmonds_karp(res: &mut Residual, src: usize, dst: usize) -> f64 {
    let mut total = 0.0;
    loop {
        let mut pred: Vec<Option<(usize, usize)>> = vec![None; res.n];
        let mut queue = VecDeque::new();
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            if u == dst {
                break;
            }
            for (ei, e) in res.adj[u].iter().enumerate() {
                if e.cap > EPS && pred[e.to].is_none() && e.to != src {
                    pred[e.to] = Some((u, ei));
                    queue.push_back(e.to);
                }
            }
        }
        if pred[dst].is_none() {
            return total;
        }
        let mut bottleneck = f64::INFINITY;
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
        total += bottleneck;
    }
}

/// Dinic：由源點廣度優先分層，對每張層級圖求阻塞流，直到無法再分層
fn dinic(res: &mut Residual, src: usize, dst: usize) -> f64 {
    fn levels(res: &Residual, src: usize) -> Vec<Option<usize>> {
        let mut level = vec![None; res.n];
        let mut queue = VecDeque::new();
        level[src] = Some(0);
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            for e in res.adj[u].iter() {
                if e.cap > EPS && level[e.to].is_none() {
                    level[e.to] = Some(level[u].unwrap() + 1);
                    queue.push_back(e.to);
                }
            }
        }
        level
    }

    fn blocking(
        res: &mut Residual,
        u: usize,
        dst: usize,
        limit: f64,
        level: &[Option<usize>],
        iter: &mut Vec<usize>,
    ) -> f64 {
        if u == dst {
            return limit;
        }
        while iter[u] < res.adj[u].len() {
            let ei = iter[u];
            let (to, cap) = (res.adj[u][ei].to, res.adj[u][ei].cap);
            if cap > EPS && level[to] == level[u].map(|l| l + 1) {
                let pushed = blocking(res, to, dst, limit.min(cap), level, iter);
                if pushed > EPS {
                    res.push(u, ei, pushed);
                    return pushed;
                }
            }
            iter[u] += 1;
        }
        0.0
    }

    let mut total = 0.0;
    loop {
        let level = levels(res, src);
        if level[dst].is_none() {
            return total;
        }
        let mut iter = vec![0; res.n];
        loop {
            let pushed = blocking(res, src, dst, f64::INFINITY, &level, &mut iter);
            if pushed <= EPS {
                break;
            }
            total += pushed;
        }
    }
}

/// 最大流。三種組合演算法對同一輸入必須回傳相同的流量值
/// （最大流最小割定理是彼此的交叉驗證），差別只在擴增策略與產生的流量分配。
pub struct MaxFlowSolver<'a> {
    g: &'a GraphModel,
    as_ctx: Option<AsId>,
}

impl<'a> MaxFlowSolver<'a> {
    pub fn new(g: &'a GraphModel, as_ctx: Option<AsId>) -> Self {
        MaxFlowSolver { g, as_ctx }
    }

    pub fn max_flow(
        &self,
        src: NodeId,
        dst: NodeId,
        algo: MfAlgorithm,
        cons: &ConstraintSet,
        lp: &dyn LpSolver,
    ) -> Result<FlowResult, SolveError> {
        cons.validate(self.g, src, dst)?;
        if src == dst {
            return Err(SolveError::InvalidConstraint(
                "最大流查詢的起點與終點相同".to_owned(),
            ));
        }
        if let MfAlgorithm::LinearProgram = algo {
            return LpFormulator::new(self.g, self.as_ctx).max_flow(src, dst, cons, lp);
        }
        let mut res = Residual::build(self.g, self.as_ctx, cons);
        let value = match algo {
            MfAlgorithm::FordFulkerson => ford_fulkerson(&mut res, src.0, dst.0),
            MfAlgorithm::EdmondsKarp => edmonds_karp(&mut res, src.0, dst.0),
            MfAlgorithm::Dinic => dinic(&mut res, src.0, dst.0),
            MfAlgorithm::LinearProgram => unreachable!(),
        };
        Ok(res.into_flow_result(self.g, value))
    }
}
