use std::collections::{HashMap, HashSet};

use crate::error::SolveError;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct NodeId(pub(crate) usize);
impl From<usize> for NodeId {
    fn from(i: usize) -> Self {
        NodeId(i)
    }
}
impl Into<usize> for NodeId {
    fn into(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct LinkId(pub(crate) usize);
impl From<usize> for LinkId {
    fn from(i: usize) -> Self {
        LinkId(i)
    }
}
impl Into<usize> for LinkId {
    fn into(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct AsId(pub(crate) usize);
impl From<usize> for AsId {
    fn from(i: usize) -> Self {
        AsId(i)
    }
}
impl Into<usize> for AsId {
    fn into(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum NodeKind {
    Router,
    Switch,
    Other,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

/// 實體連線。無向，但保留可區分的兩端（source / destination）供介面定址，
/// flow_sd / flow_ds 是唯二由流量提交動作寫入的欄位。
#[derive(Clone, Debug)]
pub struct Link {
    pub name: String,
    pub src: NodeId,
    pub dst: NodeId,
    pub cost: f64,
    pub capacity: f64,
    pub bandwidth: Option<f64>,
    pub flow_sd: f64,
    pub flow_ds: f64,
}

impl Link {
    pub fn other_end(&self, id: NodeId) -> NodeId {
        if id == self.src {
            self.dst
        } else {
            self.src
        }
    }
}

#[derive(Clone, Debug)]
pub struct Area {
    pub name: String,
    pub nodes: HashSet<NodeId>,
    pub links: HashSet<LinkId>,
}

#[derive(Clone, Debug)]
pub struct AutonomousSystem {
    pub name: String,
    pub has_area: bool,
    nodes: HashSet<NodeId>,
    links: HashSet<LinkId>,
    cost_overrides: HashMap<LinkId, f64>,
    areas: Vec<Area>,
}

impl AutonomousSystem {
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }
    pub fn contains_link(&self, id: LinkId) -> bool {
        self.links.contains(&id)
    }
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }
}

/// 一條查詢結果路徑：節點序列與其間的連線交錯。空結果代表不連通。
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
    pub cost: f64,
}

impl PathResult {
    pub fn empty() -> Self {
        PathResult {
            nodes: vec![],
            links: vec![],
            cost: 0.0,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 流量計算結果。flows 以連線為鍵，值為 (source→destination, destination→source)
/// 兩個方向各自的流量，互相抵銷後至多一個方向非零，且都不超過容量。
#[derive(Clone, Debug, PartialEq)]
pub struct FlowResult {
    pub value: f64,
    pub flows: HashMap<LinkId, (f64, f64)>,
}

impl FlowResult {
    pub fn zero() -> Self {
        FlowResult {
            value: 0.0,
            flows: HashMap::new(),
        }
    }
    /// 某節點的淨流出量（流出減流入）。流量守恆時，非端點節點應為零。
    pub fn net_out_of(&self, g: &GraphModel, id: NodeId) -> f64 {
        let mut net = 0.0;
        for (&link_id, &(sd, ds)) in self.flows.iter() {
            let link = g.link(link_id);
            if link.src == id {
                net += sd - ds;
            } else if link.dst == id {
                net += ds - sd;
            }
        }
        net
    }
}

/// 拓撲儲存體。節點、連線、AS 皆由外部的編輯層建立；
/// 求解器在單次查詢期間唯讀借用，只有明確的流量提交會寫回 flow 欄位。
#[derive(Clone, Default)]
pub struct GraphModel {
    nodes: Vec<Node>,
    links: Vec<Link>,
    systems: Vec<AutonomousSystem>,
    adjacency: Vec<Vec<LinkId>>,
    node_index: HashMap<String, NodeId>,
    link_index: HashMap<String, LinkId>,
    as_index: HashMap<String, AsId>,
}

impl GraphModel {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId, String> {
        if self.node_index.contains_key(name) {
            return Err(format!("節點名稱重複: {}", name));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_owned(),
            kind,
        });
        self.adjacency.push(vec![]);
        self.node_index.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn add_link(
        &mut self,
        name: &str,
        endpoints: (NodeId, NodeId),
        cost: f64,
        capacity: f64,
    ) -> Result<LinkId, String> {
        if self.link_index.contains_key(name) {
            return Err(format!("連線名稱重複: {}", name));
        }
        if endpoints.0 == endpoints.1 {
            return Err(format!("連線兩端不可為同一節點: {}", name));
        }
        if endpoints.0 .0 >= self.nodes.len() || endpoints.1 .0 >= self.nodes.len() {
            return Err(format!("加入連線時發現節點不存在: {}", name));
        }
        if capacity < 0.0 {
            return Err(format!("連線容量不可為負: {}", name));
        }
        let id = LinkId(self.links.len());
        self.links.push(Link {
            name: name.to_owned(),
            src: endpoints.0,
            dst: endpoints.1,
            cost,
            capacity,
            bandwidth: None,
            flow_sd: 0.0,
            flow_ds: 0.0,
        });
        self.adjacency[endpoints.0 .0].push(id);
        self.adjacency[endpoints.1 .0].push(id);
        self.link_index.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn set_bandwidth(&mut self, link: LinkId, bandwidth: f64) {
        self.links[link.0].bandwidth = Some(bandwidth);
    }

    pub fn add_as(&mut self, name: &str, has_area: bool) -> Result<AsId, String> {
        if self.as_index.contains_key(name) {
            return Err(format!("AS 名稱重複: {}", name));
        }
        let id = AsId(self.systems.len());
        self.systems.push(AutonomousSystem {
            name: name.to_owned(),
            has_area,
            nodes: HashSet::new(),
            links: HashSet::new(),
            cost_overrides: HashMap::new(),
            areas: vec![],
        });
        self.as_index.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn as_add_node(&mut self, system: AsId, node: NodeId) {
        self.systems[system.0].nodes.insert(node);
    }

    pub fn as_add_link(&mut self, system: AsId, link: LinkId) {
        let l = &self.links[link.0];
        let (src, dst) = (l.src, l.dst);
        let sys = &mut self.systems[system.0];
        sys.links.insert(link);
        // 連線成員隱含兩端節點也是成員
        sys.nodes.insert(src);
        sys.nodes.insert(dst);
    }

    /// 在指定 AS 脈絡下覆寫連線成本。連線必須先是該 AS 的成員。
    pub fn set_as_cost(&mut self, system: AsId, link: LinkId, cost: f64) -> Result<(), String> {
        let sys = &mut self.systems[system.0];
        if !sys.links.contains(&link) {
            return Err(format!(
                "連線 {} 不屬於 AS {}，無法覆寫成本",
                self.links[link.0].name, sys.name
            ));
        }
        sys.cost_overrides.insert(link, cost);
        Ok(())
    }

    pub fn add_area(
        &mut self,
        system: AsId,
        name: &str,
        nodes: Vec<NodeId>,
        links: Vec<LinkId>,
    ) -> Result<(), String> {
        let sys = &mut self.systems[system.0];
        if !sys.has_area {
            return Err(format!("AS {} 未啟用區域劃分", sys.name));
        }
        sys.areas.push(Area {
            name: name.to_owned(),
            nodes: nodes.into_iter().collect(),
            links: links.into_iter().collect(),
        });
        Ok(())
    }

    pub fn lookup_node(&self, name: &str) -> Result<NodeId, SolveError> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| SolveError::NotFound(format!("節點 {}", name)))
    }

    pub fn lookup_link(&self, name: &str) -> Result<LinkId, SolveError> {
        self.link_index
            .get(name)
            .copied()
            .ok_or_else(|| SolveError::NotFound(format!("連線 {}", name)))
    }

    pub fn lookup_as(&self, name: &str) -> Result<AsId, SolveError> {
        self.as_index
            .get(name)
            .copied()
            .ok_or_else(|| SolveError::NotFound(format!("AS {}", name)))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }
    pub fn autonomous_system(&self, id: AsId) -> &AutonomousSystem {
        &self.systems[id.0]
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> {
        (0..self.links.len()).map(LinkId)
    }

    /// 鄰接查詢。回傳 (連線, 對端節點)，依（對端節點名、連線名）排序，
    /// 這是本引擎文件化的決定性順序，與插入順序無關。
    /// 給定 AS 脈絡時只考慮該 AS 的成員連線。
    pub fn neighbors(&self, id: NodeId, as_ctx: Option<AsId>) -> Vec<(LinkId, NodeId)> {
        let mut out: Vec<(LinkId, NodeId)> = self.adjacency[id.0]
            .iter()
            .filter(|&&l| match as_ctx {
                Some(sys) => self.systems[sys.0].links.contains(&l),
                None => true,
            })
            .map(|&l| (l, self.links[l.0].other_end(id)))
            .collect();
        out.sort_by(|a, b| {
            (&self.nodes[(a.1).0].name, &self.links[(a.0).0].name)
                .cmp(&(&self.nodes[(b.1).0].name, &self.links[(b.0).0].name))
        });
        out
    }

    /// 取連線在指定 AS 脈絡下的成本。同一條實體連線在不同 AS 下可以有不同成本。
    pub fn cost(&self, link: LinkId, as_ctx: Option<AsId>) -> f64 {
        if let Some(sys) = as_ctx {
            if let Some(&c) = self.systems[sys.0].cost_overrides.get(&link) {
                return c;
            }
        }
        self.links[link.0].cost
    }

    pub fn capacity(&self, link: LinkId) -> f64 {
        self.links[link.0].capacity
    }

    /// 節點名稱的字典序名次，供等成本路徑的決定性破平手用
    pub(crate) fn name_ranks(&self) -> Vec<usize> {
        let mut by_name: Vec<usize> = (0..self.nodes.len()).collect();
        by_name.sort_by(|&a, &b| self.nodes[a].name.cmp(&self.nodes[b].name));
        let mut ranks = vec![0; self.nodes.len()];
        for (rank, &id) in by_name.iter().enumerate() {
            ranks[id] = rank;
        }
        ranks
    }

    /// 把一份流量計算結果提交回連線上。全有或全無：
    /// 每條連線都會被寫入（結果中的值，或歸零）。
    pub fn commit_flow(&mut self, result: &FlowResult) {
        for link in self.links.iter_mut() {
            link.flow_sd = 0.0;
            link.flow_ds = 0.0;
        }
        for (&id, &(sd, ds)) in result.flows.iter() {
            self.links[id.0].flow_sd = sd;
            self.links[id.0].flow_ds = ds;
        }
    }

    pub fn clear_flows(&mut self) {
        self.commit_flow(&FlowResult::zero());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> (GraphModel, Vec<NodeId>, Vec<LinkId>) {
        let mut g = GraphModel::new();
        let a = g.add_node("A", NodeKind::Router).unwrap();
        let b = g.add_node("B", NodeKind::Router).unwrap();
        let c = g.add_node("C", NodeKind::Switch).unwrap();
        let ab = g.add_link("AB", (a, b), 1.0, 5.0).unwrap();
        let ac = g.add_link("AC", (a, c), 2.0, 3.0).unwrap();
        let bc = g.add_link("BC", (b, c), 4.0, 1.0).unwrap();
        (g, vec![a, b, c], vec![ab, ac, bc])
    }

    #[test]
    fn test_lookup_and_not_found() {
        let (g, nodes, links) = sample();
        assert_eq!(nodes[1], g.lookup_node("B").unwrap());
        assert_eq!(links[2], g.lookup_link("BC").unwrap());
        assert!(g.lookup_node("X").is_err());
        assert!(g.lookup_link("XY").is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (mut g, nodes, _) = sample();
        assert!(g.add_node("A", NodeKind::Other).is_err());
        assert!(g.add_link("AB", (nodes[1], nodes[2]), 1.0, 1.0).is_err());
        assert!(g.add_link("BB", (nodes[1], nodes[1]), 1.0, 1.0).is_err());
        assert!(g.add_link("NEG", (nodes[0], nodes[1]), 1.0, -2.0).is_err());
    }

    #[test]
    fn test_neighbors_sorted_by_name() {
        let (g, nodes, links) = sample();
        // A 的鄰居：B（經 AB）、C（經 AC），依對端名稱排序
        assert_eq!(
            vec![(links[0], nodes[1]), (links[1], nodes[2])],
            g.neighbors(nodes[0], None)
        );
    }

    #[test]
    fn test_as_scoped_cost_and_membership() {
        let (mut g, nodes, links) = sample();
        let sys = g.add_as("core", false).unwrap();
        g.as_add_link(sys, links[0]);
        g.as_add_link(sys, links[2]);
        g.set_as_cost(sys, links[0], 10.0).unwrap();

        // 未入 AS 的連線不可覆寫
        assert!(g.set_as_cost(sys, links[1], 9.0).is_err());
        // 同一條連線，兩種脈絡兩種成本
        assert_eq!(1.0, g.cost(links[0], None));
        assert_eq!(10.0, g.cost(links[0], Some(sys)));
        assert_eq!(4.0, g.cost(links[2], Some(sys)));
        // AS 脈絡下鄰接只剩成員連線
        assert_eq!(vec![(links[0], nodes[1])], g.neighbors(nodes[0], Some(sys)));
        // 連線成員隱含節點成員
        assert!(g.autonomous_system(sys).contains_node(nodes[2]));
    }

    #[test]
    fn test_area_requires_flag() {
        let (mut g, nodes, links) = sample();
        let plain = g.add_as("plain", false).unwrap();
        assert!(g.add_area(plain, "a0", vec![nodes[0]], vec![]).is_err());
        let backbone = g.add_as("backbone", true).unwrap();
        g.as_add_link(backbone, links[0]);
        g.add_area(backbone, "a0", vec![nodes[0], nodes[1]], vec![links[0]])
            .unwrap();
        assert_eq!(1, g.autonomous_system(backbone).areas().len());
    }

    #[test]
    fn test_commit_flow_all_or_nothing() {
        let (mut g, _, links) = sample();
        let mut res = FlowResult::zero();
        res.value = 2.0;
        res.flows.insert(links[0], (2.0, 0.0));
        g.commit_flow(&res);
        assert_eq!(2.0, g.link(links[0]).flow_sd);
        assert_eq!(0.0, g.link(links[1]).flow_sd);

        g.clear_flows();
        assert_eq!(0.0, g.link(links[0]).flow_sd);
    }
}
