use crate::algos::arcs::{ArcGraph, EPS};
use crate::error::SolveError;

/// Bellman-Ford 單源最短距離。容許負成本弧；
/// 若查詢可達的子圖內存在負成本迴圈則以 NegativeCycle 失敗。
/// 回傳 (距離, 前驅弧)，不連通者距離為無窮大。
pub(crate) fn bellman_ford(
    ag: &ArcGraph,
    src: usize,
) -> Result<(Vec<f64>, Vec<Option<usize>>), SolveError> {
    let mut dist = vec![f64::INFINITY; ag.n];
    let mut pred: Vec<Option<usize>> = vec![None; ag.n];
    dist[src] = 0.0;

    for _ in 1..ag.n.max(2) {
        let mut changed = false;
        for (ai, arc) in ag.arcs.iter().enumerate() {
            if dist[arc.from].is_infinite() {
                continue;
            }
            let nd = dist[arc.from] + arc.cost;
            if nd < dist[arc.to] - EPS {
                dist[arc.to] = nd;
                pred[arc.to] = Some(ai);
                changed = true;
            }
        }
        if !changed {
            return Ok((dist, pred));
        }
    }
    // 第 n 輪仍可鬆弛，代表可達範圍內有負迴圈
    for arc in ag.arcs.iter() {
        if !dist[arc.from].is_infinite() && dist[arc.from] + arc.cost < dist[arc.to] - EPS {
            return Err(SolveError::NegativeCycle);
        }
    }
    Ok((dist, pred))
}

/// 由前驅弧表回溯 src→dst 的路徑弧序列，不連通時回傳 None
pub(crate) fn walk_back(
    ag: &ArcGraph,
    pred: &[Option<usize>],
    src: usize,
    dst: usize,
) -> Option<Vec<usize>> {
    if src == dst {
        return Some(vec![]);
    }
    let mut arcs = vec![];
    let mut cur = dst;
    while cur != src {
        let ai = pred[cur]?;
        arcs.push(ai);
        cur = ag.arcs[ai].from;
        if arcs.len() > ag.arcs.len() {
            panic!("前驅弧表成環");
        }
    }
    arcs.reverse();
    Some(arcs)
}
