use serde::{Deserialize, Serialize};
use std::fs;

pub mod algos;
pub mod config;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod lp;
pub mod model;
pub mod util;

pub use constraint::ConstraintSet;
pub use engine::QueryEngine;
pub use error::SolveError;
pub use model::{FlowResult, GraphModel, PathResult};

use model::NodeKind;

/// 自 JSON 檔讀入拓撲，餵給查詢引擎。
/// 這是 CLI 驅動程式與測試的進料口，不是外部系統的存檔格式。
pub fn read_topo_from_file(file_name: &str) -> GraphModel {
    let txt = fs::read_to_string(file_name).expect(&format!("找不到檔案: {}", file_name));
    let json: TopoJSON =
        serde_json::from_str(&txt).expect(&format!("無法解析檔案: {}", file_name));
    let mut g = GraphModel::new();
    for node in json.nodes.iter() {
        let kind = match node.kind.as_str() {
            "router" => NodeKind::Router,
            "switch" => NodeKind::Switch,
            _ => NodeKind::Other,
        };
        g.add_node(&node.name, kind).expect("插入節點失敗");
    }
    for link in json.links.iter() {
        let src = g.lookup_node(&link.source).expect("連線端點不存在");
        let dst = g.lookup_node(&link.destination).expect("連線端點不存在");
        let id = g
            .add_link(&link.name, (src, dst), link.cost, link.capacity)
            .expect("插入連線失敗");
        if let Some(bw) = link.bandwidth {
            g.set_bandwidth(id, bw);
        }
    }
    for sys in json.systems.iter() {
        let as_id = g.add_as(&sys.name, sys.has_area).expect("插入 AS 失敗");
        for name in sys.links.iter() {
            let link = g.lookup_link(name).expect("AS 成員連線不存在");
            g.as_add_link(as_id, link);
        }
        for ov in sys.cost_overrides.iter() {
            let link = g.lookup_link(&ov.link).expect("成本覆寫的連線不存在");
            g.set_as_cost(as_id, link, ov.cost).expect("設定 AS 成本失敗");
        }
        for area in sys.areas.iter() {
            let nodes = area
                .nodes
                .iter()
                .map(|n| g.lookup_node(n).expect("區域成員節點不存在"))
                .collect();
            let links = area
                .links
                .iter()
                .map(|l| g.lookup_link(l).expect("區域成員連線不存在"))
                .collect();
            g.add_area(as_id, &area.name, nodes, links)
                .expect("插入區域失敗");
        }
    }
    g
}

#[derive(Serialize, Deserialize)]
struct TopoJSON {
    nodes: Vec<NodeJSON>,
    links: Vec<LinkJSON>,
    #[serde(default)]
    systems: Vec<AsJSON>,
}

#[derive(Serialize, Deserialize)]
struct NodeJSON {
    name: String,
    kind: String,
}

#[derive(Serialize, Deserialize)]
struct LinkJSON {
    name: String,
    source: String,
    destination: String,
    cost: f64,
    capacity: f64,
    bandwidth: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct AsJSON {
    name: String,
    #[serde(default)]
    has_area: bool,
    links: Vec<String>,
    #[serde(default)]
    cost_overrides: Vec<OverrideJSON>,
    #[serde(default)]
    areas: Vec<AreaJSON>,
}

#[derive(Serialize, Deserialize)]
struct OverrideJSON {
    link: String,
    cost: f64,
}

#[derive(Serialize, Deserialize)]
struct AreaJSON {
    name: String,
    nodes: Vec<String>,
    links: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_topo_from_file() {
        let g = read_topo_from_file("test_topo.json");
        assert_eq!(4, g.node_count());
        assert_eq!(4, g.link_count());

        let a = g.lookup_node("A").unwrap();
        let d = g.lookup_node("D").unwrap();
        let engine = QueryEngine::new(&g);
        let path = engine.shortest_path(a, d, &ConstraintSet::new()).unwrap();
        assert_eq!(3, path.nodes.len());
        assert!((path.cost - 2.0).abs() < 1e-6);

        // backbone AS 裡 A-B 被覆寫成 3，最短路徑改走 C 側
        let sys = g.lookup_as("backbone").unwrap();
        assert!((g.cost(g.lookup_link("A-B").unwrap(), Some(sys)) - 3.0).abs() < 1e-9);
    }
}
