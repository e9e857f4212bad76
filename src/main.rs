use std::env;

use net_loom::algos::{DpAlgorithm, MfAlgorithm};
use net_loom::config::Config;
use net_loom::model::{GraphModel, PathResult};
use net_loom::{read_topo_from_file, ConstraintSet, QueryEngine};

fn main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("用法： net_loom [sp|flow|disjoint|mcf|pairs] [topo.json] [起點] [終點] [需求]");
        panic!();
    }
    let query = args[1].clone();
    let g = read_topo_from_file(&args[2]);
    let engine = QueryEngine::new(&g);

    if query == "pairs" {
        let pairs = engine.all_pairs_distances().map_err(|e| e.to_string())?;
        let mut lines: Vec<String> = pairs
            .iter()
            .filter(|((s, d), _)| s != d)
            .map(|((s, d), dist)| {
                format!("{} -> {} : {}", g.node(*s).name, g.node(*d).name, dist)
            })
            .collect();
        lines.sort();
        for line in lines {
            println!("{}", line);
        }
        return Ok(());
    }

    if args.len() < 5 {
        println!("用法： net_loom [sp|flow|disjoint|mcf|pairs] [topo.json] [起點] [終點] [需求]");
        panic!();
    }
    let src = g.lookup_node(&args[3]).map_err(|e| e.to_string())?;
    let dst = g.lookup_node(&args[4]).map_err(|e| e.to_string())?;

    if query == "sp" {
        let path = engine
            .shortest_path(src, dst, &ConstraintSet::new())
            .map_err(|e| e.to_string())?;
        if path.is_empty() {
            println!("{} 與 {} 不連通", args[3], args[4]);
        } else {
            println!("{}", format_path(&g, &path));
        }
    } else if query == "flow" {
        for &(name, algo) in [
            ("Ford-Fulkerson", MfAlgorithm::FordFulkerson),
            ("Edmonds-Karp", MfAlgorithm::EdmondsKarp),
            ("Dinic", MfAlgorithm::Dinic),
            ("LP", MfAlgorithm::LinearProgram),
        ]
        .iter()
        {
            let res = engine.max_flow(src, dst, algo).map_err(|e| e.to_string())?;
            println!("{} 最大流 = {}", name, res.value);
        }
    } else if query == "disjoint" {
        let k = Config::get().default_disjoint_paths;
        let paths = engine
            .disjoint_paths(src, dst, k, DpAlgorithm::Bhandari)
            .map_err(|e| e.to_string())?;
        println!("找到 {} 條不相交路徑:", paths.len());
        for path in paths.iter() {
            println!("  {}", format_path(&g, path));
        }
    } else if query == "mcf" {
        if args.len() < 6 {
            return Err("mcf 查詢需要需求量".to_owned());
        }
        let demand: f64 = args[5].parse().map_err(|_| "需求量必須是數字".to_owned())?;
        let (res, cost) = engine
            .min_cost_flow(src, dst, demand)
            .map_err(|e| e.to_string())?;
        println!("流量 {} 的最小成本 = {}", res.value, cost);
        let mut lines: Vec<String> = res
            .flows
            .iter()
            .map(|(&id, &(sd, ds))| {
                let flow = if sd > 0.0 { sd } else { ds };
                format!("  {} 承載 {}", g.link(id).name, flow)
            })
            .collect();
        lines.sort();
        for line in lines {
            println!("{}", line);
        }
    } else {
        println!("未知的查詢類型: {}", query);
        println!("用法： net_loom [sp|flow|disjoint|mcf|pairs] [topo.json] [起點] [終點] [需求]");
    }

    Ok(())
}

fn format_path(g: &GraphModel, path: &PathResult) -> String {
    let names: Vec<&str> = path.nodes.iter().map(|&n| g.node(n).name.as_str()).collect();
    format!("{} (成本 {})", names.join(" -> "), path.cost)
}
