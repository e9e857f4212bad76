use crate::constraint::ConstraintSet;
use crate::model::{AsId, GraphModel, LinkId};
use crate::util::KeyedMinHeap;

pub(crate) const EPS: f64 = 1e-9;

/// 有向弧。無向連線在這個視圖中展開成兩條反向的弧。
#[derive(Clone, Debug)]
pub(crate) struct Arc {
    pub from: usize,
    pub to: usize,
    /// None 代表節點拆分產生的內部弧
    pub link: Option<LinkId>,
    /// 弧的方向是否為連線的 source→destination 方向
    pub sd: bool,
    pub cost: f64,
}

/// 求解器共用的有向視圖。弧依連線名稱排序建立，
/// 成對出現（2i 與 2i+1 互為反向），順序與插入歷史無關。
pub(crate) struct ArcGraph {
    pub n: usize,
    pub arcs: Vec<Arc>,
    pub out: Vec<Vec<usize>>,
}

impl ArcGraph {
    pub fn build(g: &GraphModel, as_ctx: Option<AsId>, cons: &ConstraintSet) -> Self {
        let mut link_ids: Vec<LinkId> = g.link_ids().collect();
        link_ids.sort_by(|&a, &b| g.link(a).name.cmp(&g.link(b).name));

        let mut arcs = vec![];
        let mut out = vec![vec![]; g.node_count()];
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
            out[link.src.0].push(arcs.len());
            arcs.push(Arc {
                from: link.src.0,
                to: link.dst.0,
                link: Some(id),
                sd: true,
                cost,
            });
            out[link.dst.0].push(arcs.len());
            arcs.push(Arc {
                from: link.dst.0,
                to: link.src.0,
                link: Some(id),
                sd: false,
                cost,
            });
        }
        ArcGraph {
            n: g.node_count(),
            arcs,
            out,
        }
    }

    /// 非負成本的單源最短距離（供 Suurbale 重新賦權）。
    /// 回傳每個節點的距離與前驅弧，不連通者為無窮大。
    pub fn dijkstra(&self, src: usize) -> (Vec<f64>, Vec<Option<usize>>) {
        let mut dist = vec![f64::INFINITY; self.n];
        let mut pred: Vec<Option<usize>> = vec![None; self.n];
        let mut heap: KeyedMinHeap<f64, usize> = KeyedMinHeap::new();
        let mut settled = vec![false; self.n];
        dist[src] = 0.0;
        heap.push(src, 0.0, ());
        while let Some((u, d, _)) = heap.pop() {
            settled[u] = true;
            for &ai in self.out[u].iter() {
                let arc = &self.arcs[ai];
                if settled[arc.to] {
                    continue;
                }
                let nd = d + arc.cost;
                if nd < dist[arc.to] - EPS {
                    dist[arc.to] = nd;
                    pred[arc.to] = Some(ai);
                    if heap.contains_key(&arc.to) {
                        heap.decrease_priority(&arc.to, nd);
                    } else {
                        heap.push(arc.to, nd, ());
                    }
                }
            }
        }
        (dist, pred)
    }
}
